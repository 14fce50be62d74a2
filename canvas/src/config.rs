use std::time::Duration;

/// Tuning for the synchronization engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Consecutive transient failures tolerated before giving up for good.
    ///
    /// Default: `5`
    pub retry_limit: u32,

    /// Fixed delay before re-issuing a request that failed transiently.
    ///
    /// Default: `5s`
    pub retry_backoff: Duration,

    /// How long a single request may wait for its reply before it counts as
    /// timed out. Only used by network-backed services.
    ///
    /// Default: `10s`
    pub request_timeout: Duration,

    /// Upper bound on in-flight cell writes issued by one drawing command.
    ///
    /// Default: `64`
    pub max_parallel_writes: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            retry_limit: 5,
            retry_backoff: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            max_parallel_writes: 64,
        }
    }
}

impl SyncConfig {
    /// Same limits with millisecond delays, for tests.
    pub fn testing() -> Self {
        SyncConfig {
            retry_backoff: Duration::from_millis(1),
            request_timeout: Duration::from_millis(500),
            ..SyncConfig::default()
        }
    }
}
