//! Cancellable, optionally bounded waits.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Result, SequencerError};

/// Run `fut` until it completes, `cancel` fires, or `timeout` elapses.
///
/// `timeout = None` waits without bound. Cancellation wins over a result that
/// becomes ready at the same poll.
pub(crate) async fn guarded<F, T>(
    what: &str,
    fut: F,
    cancel: &CancellationToken,
    timeout: Option<Duration>,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let bounded = async {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| SequencerError::Timeout(what.to_string()))?,
            None => fut.await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SequencerError::Cancelled),
        result = bounded => result,
    }
}

/// Sleep that stops early with `Cancelled`.
pub async fn cancellable_sleep(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    guarded(
        "sleep",
        async {
            tokio::time::sleep(duration).await;
            Ok(())
        },
        cancel,
        None,
    )
    .await
}
