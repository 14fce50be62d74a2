use async_trait::async_trait;
use msgs::{CreateMode, ServiceError, WatchKind, WatchedEvent};
use tokio::sync::mpsc;

/// The primitives of the hierarchical coordination service.
///
/// Watches armed through these calls are one-shot; when one fires the implementation
/// pushes [`Event::DataChanged`] or [`Event::ChildrenChanged`] onto the event channel it
/// was created with.
#[async_trait]
pub trait Coordination: Send + Sync {
    async fn exists(&self, path: &str, watch: bool) -> Result<bool, ServiceError>;

    /// `Ok(None)` when the node does not exist.
    async fn get_data(&self, path: &str, watch: bool) -> Result<Option<Vec<u8>>, ServiceError>;

    async fn get_children(&self, path: &str, watch: bool) -> Result<Vec<String>, ServiceError>;

    async fn create(&self, path: &str, mode: CreateMode, data: Option<&[u8]>) -> Result<String, ServiceError>;

    async fn set_data(&self, path: &str, data: &[u8]) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Disconnected,
    Expired,
    AuthFailed,
}

/// Everything the engine reacts to, delivered in order on one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ChildrenChanged (String),
    DataChanged (String),
    SessionState (SessionState),
    SessionClosed (ServiceError),
    /// Completion of an asynchronous cell read. `Ok(None)` means the node is gone.
    DataLoaded { path: String, result: Result<Option<Vec<u8>>, ServiceError> },
    /// An asynchronous cell write failed after being issued.
    WriteFailed { path: String, error: ServiceError },
}

impl From<WatchedEvent> for Event {
    fn from(event: WatchedEvent) -> Self {
        match event.kind {
            WatchKind::Data => Event::DataChanged(event.path),
            WatchKind::Children => Event::ChildrenChanged(event.path),
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
