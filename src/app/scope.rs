//! Cancellation scope tying in-flight requests to the view that issued them.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::domain::AppError;

/// Teardown signal shared by a component and the work it starts.
///
/// Clones observe the same signal. Once closed a scope stays closed, and every
/// future run inside it resolves to [`AppError::Cancelled`].
#[derive(Debug, Clone)]
pub struct ViewScope {
    closed_tx: Arc<watch::Sender<bool>>,
}

impl ViewScope {
    #[must_use]
    pub fn new() -> Self {
        let (closed_tx, _) = watch::channel(false);
        Self {
            closed_tx: Arc::new(closed_tx),
        }
    }

    /// Signal teardown to every run in progress
    pub fn close(&self) {
        if !self.closed_tx.send_replace(true) {
            debug!("View scope closed");
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed_tx.borrow()
    }

    /// Drive `fut` to completion unless the scope closes first.
    ///
    /// A closed scope drops `fut` without polling it further.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        let mut closed_rx = self.closed_tx.subscribe();
        if *closed_rx.borrow_and_update() {
            return Err(AppError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = closed_rx.wait_for(|closed| *closed) => Err(AppError::Cancelled),
            result = fut => result,
        }
    }
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_completes_while_open() {
        let scope = ViewScope::new();
        let result = scope.run(async { Ok::<_, AppError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_run_on_closed_scope_is_cancelled() {
        let scope = ViewScope::new();
        scope.close();
        assert!(scope.is_closed());

        let result = scope.run(async { Ok::<_, AppError>(7) }).await;
        assert_eq!(result, Err(AppError::Cancelled));
    }

    #[tokio::test]
    async fn test_close_cancels_in_flight_run() {
        let scope = ViewScope::new();
        let closer = scope.clone();

        let task = tokio::spawn(async move {
            scope
                .run(async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok::<_, AppError>(())
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        closer.close();

        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("run should observe close promptly")
            .unwrap();
        assert_eq!(result, Err(AppError::Cancelled));
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let scope = ViewScope::new();
        let result: Result<(), _> = scope.run(async { Err(AppError::Internal("boom".into())) }).await;
        assert_eq!(result, Err(AppError::Internal("boom".into())));
    }
}
