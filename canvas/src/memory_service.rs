use std::{collections::{HashMap, VecDeque}, sync::Arc};

use async_trait::async_trait;
use msgs::{namespace::{Fired, Namespace, SessionId}, CreateMode, ServiceError};
use parking_lot::Mutex;

use crate::service::{event_channel, Coordination, Event, EventReceiver, EventSender, SessionState};

struct ClusterInner {
    namespace: Namespace,
    sessions: HashMap<SessionId, EventSender>,
    next_session: SessionId,
}

impl ClusterInner {
    fn deliver(&self, fired: Fired) {
        for (session, event) in fired {
            if let Some(events) = self.sessions.get(&session) {
                let _ = events.send(event.into());
            }
        }
    }
}

/// An in-process coordination service shared by any number of [`MemoryService`] sessions.
#[derive(Clone)]
pub struct MemoryCluster {
    inner: Arc<Mutex<ClusterInner>>,
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCluster {
    pub fn new() -> MemoryCluster {
        MemoryCluster {
            inner: Arc::new(Mutex::new(ClusterInner {
                namespace: Namespace::new(),
                sessions: HashMap::new(),
                next_session: 1,
            })),
        }
    }

    /// Opens a new session. Its watch notifications arrive on the returned receiver.
    pub fn connect(&self) -> (MemoryService, EventReceiver) {
        let (events, receiver) = event_channel();
        (self.connect_with(events), receiver)
    }

    /// Opens a new session that reports on an existing event channel.
    pub fn connect_with(&self, events: EventSender) -> MemoryService {
        let _ = events.send(Event::SessionState(SessionState::Connected));
        let session = {
            let mut inner = self.inner.lock();
            let session = inner.next_session;
            inner.next_session += 1;
            inner.sessions.insert(session, events.clone());
            session
        };
        MemoryService {
            cluster: self.inner.clone(),
            session,
            events,
            faults: Mutex::new(VecDeque::new()),
            calls: Mutex::new(HashMap::new()),
            data_reads: Mutex::new(Vec::new()),
        }
    }

    /// Data of `path`, bypassing watches.
    pub fn data(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.lock().namespace.get_data(0, path, false).ok()
    }

    pub fn children(&self, path: &str) -> Vec<String> {
        self.inner.lock().namespace.get_children(0, path, false).unwrap_or_default()
    }

    /// Removes a childless node outside any session, firing the watches on it and its parent.
    pub fn delete(&self, path: &str) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock();
        let fired = inner.namespace.delete(path)?;
        inner.deliver(fired);
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.inner.lock().namespace.len()
    }
}

/// One session on a [`MemoryCluster`].
///
/// Calls can be made to fail on demand with [`MemoryService::fail_next`], and every call is
/// counted per operation name (`"exists"`, `"get_data"`, `"get_children"`, `"create"`,
/// `"set_data"`). Paths passed to `get_data` are kept in call order.
pub struct MemoryService {
    cluster: Arc<Mutex<ClusterInner>>,
    session: SessionId,
    events: EventSender,
    faults: Mutex<VecDeque<ServiceError>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    data_reads: Mutex<Vec<String>>,
}

impl MemoryService {
    pub fn session_id(&self) -> SessionId {
        self.session
    }

    /// The next `times` calls, of any kind, fail with `error`.
    pub fn fail_next(&self, error: ServiceError, times: usize) {
        self.faults.lock().extend(std::iter::repeat(error).take(times));
    }

    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().get(op).copied().unwrap_or(0)
    }

    pub fn data_reads(&self) -> Vec<String> {
        self.data_reads.lock().clone()
    }

    /// Ends the session: ephemeral nodes go away and the session observes `SessionClosed`.
    pub fn close(&self) {
        let mut cluster = self.cluster.lock();
        cluster.sessions.remove(&self.session);
        let fired = cluster.namespace.close_session(self.session);
        cluster.deliver(fired);
        let _ = self.events.send(Event::SessionClosed(ServiceError::SessionExpired));
    }

    fn enter(&self, op: &'static str) -> Result<(), ServiceError> {
        *self.calls.lock().entry(op).or_default() += 1;
        match self.faults.lock().pop_front() {
            Some(error) => {
                tracing::debug!(op, %error, "injected failure");
                Err(error)
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Coordination for MemoryService {
    async fn exists(&self, path: &str, watch: bool) -> Result<bool, ServiceError> {
        self.enter("exists")?;
        self.cluster.lock().namespace.exists(self.session, path, watch)
    }

    async fn get_data(&self, path: &str, watch: bool) -> Result<Option<Vec<u8>>, ServiceError> {
        self.data_reads.lock().push(path.to_string());
        self.enter("get_data")?;
        match self.cluster.lock().namespace.get_data(self.session, path, watch) {
            Ok(data) => Ok(Some(data)),
            Err(ServiceError::NoNode) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_children(&self, path: &str, watch: bool) -> Result<Vec<String>, ServiceError> {
        self.enter("get_children")?;
        self.cluster.lock().namespace.get_children(self.session, path, watch)
    }

    async fn create(&self, path: &str, mode: CreateMode, data: Option<&[u8]>) -> Result<String, ServiceError> {
        self.enter("create")?;
        let mut cluster = self.cluster.lock();
        let (created, fired) = cluster.namespace.create(self.session, path, mode, data)?;
        cluster.deliver(fired);
        Ok(created)
    }

    async fn set_data(&self, path: &str, data: &[u8]) -> Result<(), ServiceError> {
        self.enter("set_data")?;
        let mut cluster = self.cluster.lock();
        let fired = cluster.namespace.set_data(path, data)?;
        cluster.deliver(fired);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_see_each_others_writes_through_watches() {
        let cluster = MemoryCluster::new();
        let (a, mut a_events) = cluster.connect();
        let (b, _b_events) = cluster.connect();
        assert_eq!(a_events.recv().await, Some(Event::SessionState(SessionState::Connected)));

        b.create("/n", CreateMode::Persistent, Some(b"RED")).await.unwrap();
        assert_eq!(a.get_data("/n", true).await.unwrap(), Some(b"RED".to_vec()));
        b.set_data("/n", b"BLUE").await.unwrap();

        assert_eq!(a_events.recv().await, Some(Event::DataChanged("/n".into())));
        assert_eq!(cluster.data("/n"), Some(b"BLUE".to_vec()));
    }

    #[tokio::test]
    async fn injected_faults_are_consumed_in_order() {
        let (service, _events) = MemoryCluster::new().connect();
        service.fail_next(ServiceError::ConnectionLoss, 2);

        assert_eq!(service.exists("/", false).await, Err(ServiceError::ConnectionLoss));
        assert_eq!(service.get_data("/", false).await, Err(ServiceError::ConnectionLoss));
        assert_eq!(service.get_data("/missing", false).await, Ok(None));
        assert_eq!(service.calls("get_data"), 2);
        assert_eq!(service.calls("exists"), 1);
    }

    #[tokio::test]
    async fn closing_a_session_removes_ephemerals() {
        let cluster = MemoryCluster::new();
        let (a, mut a_events) = cluster.connect();
        let (b, _) = cluster.connect();
        a.create("/e", CreateMode::Ephemeral, None).await.unwrap();
        assert_eq!(b.get_children("/", false).await.unwrap(), vec!["e".to_string()]);

        a.close();
        assert!(cluster.children("/").is_empty());
        assert_eq!(a_events.recv().await, Some(Event::SessionState(SessionState::Connected)));
        assert_eq!(a_events.recv().await, Some(Event::SessionClosed(ServiceError::SessionExpired)));
    }
}
