use msgs::ServiceError;

/// Errors surfaced by the dispatcher and the engine.
///
/// Fatal variants mean the client cannot make progress and the process should exit with
/// [`SyncError::exit_code`]. Everything else is a local, one-line report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("could not reach the coordination service after retrying {retries} times: {source}")]
    RetriesExhausted { retries: u32, source: ServiceError },

    #[error("coordination session lost: {0}")]
    SessionLost(ServiceError),

    #[error("request for {path} was rejected: {source}")]
    Rejected { path: String, source: ServiceError },

    #[error("cell ({cx}, {cy}) is outside the region")]
    CellOutOfRange { cx: i32, cy: i32 },

    #[error("no region is being viewed")]
    NoActiveRegion,
}

impl SyncError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::RetriesExhausted { .. } | SyncError::SessionLost(_))
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_fatal() { 1 } else { 0 }
    }
}
