//! Named binary coordination flags ("depends").
//!
//! Flags are shared by every sequence holding a clone of the same
//! [`DependencyGate`]. Waiting parks the task on a watch channel rather than
//! spinning; a flag that is never raised blocks forever unless a timeout is
//! given or the cancellation token fires.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SequencerError};
use crate::wait::guarded;

#[derive(Clone, Debug)]
pub struct DependencyGate {
    flags: Arc<watch::Sender<HashMap<String, bool>>>,
}

impl Default for DependencyGate {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(HashMap::new());
        Self { flags: Arc::new(tx) }
    }

    /// Mark every named flag true.
    pub fn set(&self, names: &[&str]) {
        if names.is_empty() {
            return;
        }
        self.flags.send_modify(|flags| {
            for name in names {
                flags.insert(name.to_string(), true);
            }
        });
        tracing::debug!("Depends set: {:?}", names);
    }

    /// Mark every named flag false.
    pub fn clear(&self, names: &[&str]) {
        if names.is_empty() {
            return;
        }
        self.flags.send_modify(|flags| {
            for name in names {
                flags.insert(name.to_string(), false);
            }
        });
        tracing::debug!("Depends cleared: {:?}", names);
    }

    /// Unknown flags read as false.
    pub fn is_set(&self, name: &str) -> bool {
        self.flags.borrow().get(name).copied().unwrap_or(false)
    }

    /// Block until every named flag is true.
    pub async fn wait_for(
        &self,
        names: &[&str],
        cancel: &CancellationToken,
        timeout: Option<Duration>,
    ) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let mut rx = self.flags.subscribe();
        if !all_set(&rx.borrow(), names) {
            tracing::info!("Waiting for depends {:?}", names);
        }
        let what = format!("depends {:?}", names);
        guarded(
            &what,
            async {
                rx.wait_for(|flags| all_set(flags, names))
                    .await
                    .map(|_| ())
                    .map_err(|_| SequencerError::configuration("dependency table dropped"))
            },
            cancel,
            timeout,
        )
        .await
    }
}

fn all_set(flags: &HashMap<String, bool>, names: &[&str]) -> bool {
    names
        .iter()
        .all(|name| flags.get(*name).copied().unwrap_or(false))
}
