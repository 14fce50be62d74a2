use std::{future::Future, sync::atomic::{AtomicU32, Ordering}, time::Duration};

use msgs::{ErrorClass, ServiceError};

use crate::error::SyncError;

/// Fixed-backoff retry of transient service errors.
///
/// The failure counter is shared by every request going through the same policy and is
/// reset by any success, so it counts consecutive failures of the client as a whole.
#[derive(Debug)]
pub struct RetryPolicy {
    limit: u32,
    backoff: Duration,
    failures: AtomicU32,
}

impl RetryPolicy {
    pub fn new(limit: u32, backoff: Duration) -> RetryPolicy {
        RetryPolicy {
            limit,
            backoff,
            failures: AtomicU32::new(0),
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Runs `op` until it succeeds or fails with something that is not worth retrying.
    ///
    /// Session-class errors end the session, conflict and rejected errors are handed back
    /// as [`SyncError::Rejected`], and transient errors are retried after the backoff until
    /// `limit` consecutive failures have been retried.
    pub async fn run<T, F, Fut>(&self, path: &str, mut op: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        loop {
            let error = match op().await {
                Ok(value) => {
                    self.failures.store(0, Ordering::SeqCst);
                    return Ok(value);
                }
                Err(error) => error,
            };

            match error.class() {
                ErrorClass::Session => return Err(SyncError::SessionLost(error)),
                ErrorClass::Conflict | ErrorClass::Rejected => {
                    return Err(SyncError::Rejected { path: path.to_string(), source: error });
                }
                ErrorClass::Transient => {}
            }

            let failures = self.failures.load(Ordering::SeqCst);
            if failures >= self.limit {
                tracing::error!(path, %error, failures, "giving up");
                return Err(SyncError::RetriesExhausted { retries: failures, source: error });
            }
            tracing::warn!(path, %error, attempt = failures + 1, "transient failure, retrying in {:?}", self.backoff);
            tokio::time::sleep(self.backoff).await;
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn policy(limit: u32) -> RetryPolicy {
        RetryPolicy::new(limit, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn recovers_and_resets_the_counter() {
        let policy = policy(5);
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result = policy.run("/p", move || async move {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0 | 1 => Err(ServiceError::ConnectionLoss),
                _ => Ok(7),
            }
        }).await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(policy.consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn exhaustion_is_fatal() {
        let policy = policy(5);
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<(), _> = policy.run("/p", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::OperationTimeout)
        }).await;

        let error = result.unwrap_err();
        assert_eq!(error, SyncError::RetriesExhausted { retries: 5, source: ServiceError::OperationTimeout });
        assert!(error.is_fatal());
        assert_eq!(error.exit_code(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn non_transient_errors_are_not_retried() {
        let policy = policy(5);
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let conflict: Result<(), _> = policy.run("/p", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::NodeExists)
        }).await;
        assert_eq!(conflict, Err(SyncError::Rejected { path: "/p".into(), source: ServiceError::NodeExists }));

        let session: Result<(), _> = policy.run("/p", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::SessionExpired)
        }).await;
        assert_eq!(session, Err(SyncError::SessionLost(ServiceError::SessionExpired)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
