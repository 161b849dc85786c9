//! Externally owned run-state and the gate that waits on it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SequencerError};
use crate::wait::guarded;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Shared run-state handle.
///
/// The owning process keeps a clone and calls [`RunStateGate::set`]; the
/// sequencer only observes it, once per command.
#[derive(Clone, Debug)]
pub struct RunStateGate {
    state: Arc<watch::Sender<RunState>>,
}

impl Default for RunStateGate {
    fn default() -> Self {
        Self::new(RunState::Idle)
    }
}

impl RunStateGate {
    pub fn new(initial: RunState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            state: Arc::new(tx),
        }
    }

    pub fn set(&self, state: RunState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::info!("Run state: {} -> {}", previous, state);
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Block until the state is `Running`.
    pub async fn wait_for_running(
        &self,
        cancel: &CancellationToken,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let mut rx = self.state.subscribe();
        let current = *rx.borrow();
        if current == RunState::Running {
            return Ok(());
        }
        tracing::info!("Waiting for running state (currently {})", current);
        guarded(
            "running state",
            async {
                rx.wait_for(|s| *s == RunState::Running)
                    .await
                    .map(|_| ())
                    .map_err(|_| SequencerError::configuration("run state dropped"))
            },
            cancel,
            timeout,
        )
        .await
    }
}
