use std::{collections::HashMap, sync::{atomic::{AtomicBool, AtomicU32, Ordering}, Arc}, time::Duration};

use async_trait::async_trait;
use canvas::{Coordination, Event, EventSender, SessionState};
use msgs::{client_server_msg::ClientServerMsg, server_client_msg::{Reply, ServerClientMsg}, server_connection_process::spawn_server_connection_process, CreateMode, ServiceError};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

type Pending = Arc<Mutex<HashMap<u32, oneshot::Sender<Result<Reply, ServiceError>>>>>;

/// [`Coordination`] over a TCP session with the coordination server.
///
/// Requests carry an id and wait for the reply with that id. Watch notifications and the
/// end of the connection are pushed onto the event channel given to [`RemoteService::connect`].
pub struct RemoteService {
    to_server: mpsc::Sender<Vec<u8>>,
    pending: Pending,
    closed: Arc<AtomicBool>,
    request_id_counter: AtomicU32,
    request_timeout: Duration,
}

impl RemoteService {
    pub async fn connect(addr: &str, events: EventSender, request_timeout: Duration) -> anyhow::Result<RemoteService> {
        let (server_to_main, main_from_server) = mpsc::channel(100);
        let to_server = spawn_server_connection_process(addr, server_to_main).await?;
        let pending = Pending::default();
        let closed = Arc::new(AtomicBool::new(false));
        tokio::spawn(route_server_msgs(main_from_server, pending.clone(), closed.clone(), events));
        Ok(RemoteService {
            to_server,
            pending,
            closed,
            request_id_counter: AtomicU32::new(1),
            request_timeout,
        })
    }

    fn next_request_id(&self) -> u32 {
        self.request_id_counter.fetch_add(1, Ordering::SeqCst)
    }

    async fn request(&self, request_id: u32, msg: ClientServerMsg) -> Result<Reply, ServiceError> {
        let mut frame = Vec::new();
        if let Err(e) = msg.pack(&mut frame) {
            tracing::warn!(%e, request_id, "failed to pack request");
            return Err(ServiceError::Marshalling);
        }

        let (reply_sender, reply_receiver) = oneshot::channel();
        self.pending.lock().insert(request_id, reply_sender);
        if self.closed.load(Ordering::SeqCst) || self.to_server.send(frame).await.is_err() {
            self.pending.lock().remove(&request_id);
            return Err(ServiceError::ConnectionLoss);
        }

        match tokio::time::timeout(self.request_timeout, reply_receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ServiceError::ConnectionLoss),
            Err(_) => {
                self.pending.lock().remove(&request_id);
                tracing::warn!(request_id, "request timed out");
                Err(ServiceError::OperationTimeout)
            }
        }
    }
}

async fn route_server_msgs(mut main_from_server: mpsc::Receiver<Vec<u8>>, pending: Pending, closed: Arc<AtomicBool>, events: EventSender) {
    while let Some(frame) = main_from_server.recv().await {
        match ServerClientMsg::decode(&frame) {
            Ok(ServerClientMsg::Hello { session_id }) => {
                tracing::info!(session_id, "session established");
                let _ = events.send(Event::SessionState(SessionState::Connected));
            }
            Ok(ServerClientMsg::Reply { request_id, result }) => {
                let Some(reply_sender) = pending.lock().remove(&request_id) else {
                    tracing::debug!(request_id, "reply for a request nobody waits for");
                    continue;
                };
                let _ = reply_sender.send(result);
            }
            Ok(ServerClientMsg::Watch(event)) => {
                tracing::debug!(?event, "watch fired");
                let _ = events.send(event.into());
            }
            Err(e) => tracing::warn!(%e, "undecodable message from server"),
        }
    }

    // dropping the senders fails every request still waiting
    closed.store(true, Ordering::SeqCst);
    pending.lock().clear();
    tracing::warn!("connection to coordination server lost");
    let _ = events.send(Event::SessionClosed(ServiceError::ConnectionLoss));
}

fn unexpected(reply: Reply) -> ServiceError {
    tracing::warn!(?reply, "reply does not match the request");
    ServiceError::Marshalling
}

#[async_trait]
impl Coordination for RemoteService {
    async fn exists(&self, path: &str, watch: bool) -> Result<bool, ServiceError> {
        let request_id = self.next_request_id();
        match self.request(request_id, ClientServerMsg::Exists { request_id, path: path.to_string(), watch }).await? {
            Reply::Exists(exists) => Ok(exists),
            reply => Err(unexpected(reply)),
        }
    }

    async fn get_data(&self, path: &str, watch: bool) -> Result<Option<Vec<u8>>, ServiceError> {
        let request_id = self.next_request_id();
        match self.request(request_id, ClientServerMsg::GetData { request_id, path: path.to_string(), watch }).await {
            Ok(Reply::Data(data)) => Ok(Some(data)),
            Ok(reply) => Err(unexpected(reply)),
            Err(ServiceError::NoNode) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_children(&self, path: &str, watch: bool) -> Result<Vec<String>, ServiceError> {
        let request_id = self.next_request_id();
        match self.request(request_id, ClientServerMsg::GetChildren { request_id, path: path.to_string(), watch }).await? {
            Reply::Children(children) => Ok(children),
            reply => Err(unexpected(reply)),
        }
    }

    async fn create(&self, path: &str, mode: CreateMode, data: Option<&[u8]>) -> Result<String, ServiceError> {
        let request_id = self.next_request_id();
        let msg = ClientServerMsg::Create { request_id, path: path.to_string(), mode, data: data.map(<[u8]>::to_vec) };
        match self.request(request_id, msg).await? {
            Reply::Created(created) => Ok(created),
            reply => Err(unexpected(reply)),
        }
    }

    async fn set_data(&self, path: &str, data: &[u8]) -> Result<(), ServiceError> {
        let request_id = self.next_request_id();
        match self.request(request_id, ClientServerMsg::SetData { request_id, path: path.to_string(), data: data.to_vec() }).await? {
            Reply::Done => Ok(()),
            reply => Err(unexpected(reply)),
        }
    }
}
