//! Timeout and cancellation helpers for outbound calls.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::BridgeError;

/// Wrap a future with a timeout.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, BridgeError>>,
) -> Result<T, BridgeError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(BridgeError::Timeout(duration.as_millis() as u64)),
    }
}

/// Abandon a future once `cancel` fires. The future is dropped, not awaited.
pub async fn cancellable<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = Result<T, BridgeError>>,
) -> Result<T, BridgeError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BridgeError::Cancelled),
        result = future => result,
    }
}

/// Bound a future by a timeout and abandon it once `cancel` fires.
pub async fn bounded<T>(
    duration: Duration,
    cancel: &CancellationToken,
    future: impl Future<Output = Result<T, BridgeError>>,
) -> Result<T, BridgeError> {
    cancellable(cancel, with_timeout(duration, future)).await
}
