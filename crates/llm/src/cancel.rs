//! Cooperative cancellation for outbound calls.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::provider::LlmError;

/// Run `fut` unless `cancel` fires first.
///
/// An already-cancelled token returns before `fut` is polled, so no request
/// is ever sent. Cancelling mid-flight drops `fut`, which aborts the
/// underlying connection.
pub async fn run_cancellable<F, T>(cancel: &CancellationToken, fut: F) -> Result<T, LlmError>
where
    F: Future<Output = Result<T, LlmError>>,
{
    if cancel.is_cancelled() {
        return Err(LlmError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LlmError::Cancelled),
        result = fut => result,
    }
}
