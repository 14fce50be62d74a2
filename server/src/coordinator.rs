use std::collections::HashMap;

use msgs::{client_server_msg::ClientServerMsg, namespace::{Fired, Namespace, SessionId}, server_client_msg::{Reply, ServerClientMsg}};
use tokio::sync::mpsc;

/// Shared server state: the node tree and the outgoing channel of every live session.
pub struct Coordinator {
    pub namespace: Namespace,
    pub sessions: HashMap<SessionId, mpsc::UnboundedSender<ServerClientMsg>>,
}

impl Coordinator {
    pub fn new() -> Coordinator {
        Coordinator {
            namespace: Namespace::new(),
            sessions: HashMap::new(),
        }
    }

    pub fn open_session(&mut self, session_id: SessionId, to_client: mpsc::UnboundedSender<ServerClientMsg>) {
        self.sessions.insert(session_id, to_client);
    }

    pub fn close_session(&mut self, session_id: SessionId) {
        self.sessions.remove(&session_id);
        let fired = self.namespace.close_session(session_id);
        self.notify(fired);
    }

    /// Applies one request and returns the reply for the requesting session.
    pub fn process(&mut self, session_id: SessionId, msg: ClientServerMsg) -> Option<ServerClientMsg> {
        let (request_id, result) = match msg {
            ClientServerMsg::Disconnect => return None,
            ClientServerMsg::Exists { request_id, path, watch } => {
                (request_id, self.namespace.exists(session_id, &path, watch).map(Reply::Exists))
            }
            ClientServerMsg::GetData { request_id, path, watch } => {
                (request_id, self.namespace.get_data(session_id, &path, watch).map(Reply::Data))
            }
            ClientServerMsg::GetChildren { request_id, path, watch } => {
                (request_id, self.namespace.get_children(session_id, &path, watch).map(Reply::Children))
            }
            ClientServerMsg::Create { request_id, path, mode, data } => {
                let result = self.namespace.create(session_id, &path, mode, data.as_deref()).map(|(created, fired)| {
                    self.notify(fired);
                    Reply::Created(created)
                });
                (request_id, result)
            }
            ClientServerMsg::SetData { request_id, path, data } => {
                let result = self.namespace.set_data(&path, &data).map(|fired| {
                    self.notify(fired);
                    Reply::Done
                });
                (request_id, result)
            }
        };
        Some(ServerClientMsg::Reply { request_id, result })
    }

    fn notify(&self, fired: Fired) {
        for (session_id, event) in fired {
            let Some(to_client) = self.sessions.get(&session_id) else { continue };
            tracing::debug!(session_id, ?event, "watch fired");
            if to_client.send(ServerClientMsg::Watch(event)).is_err() {
                tracing::debug!(session_id, "session gone before watch delivery");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use msgs::{error_code::ServiceError, CreateMode, WatchKind, WatchedEvent};

    use super::*;

    #[test]
    fn create_race_reports_node_exists_to_the_loser() {
        let mut coordinator = Coordinator::new();
        let create = |request_id| ClientServerMsg::Create { request_id, path: "/canvas".into(), mode: CreateMode::Persistent, data: None };

        let first = coordinator.process(1, create(1)).unwrap();
        assert_eq!(first, ServerClientMsg::Reply { request_id: 1, result: Ok(Reply::Created("/canvas".into())) });
        let second = coordinator.process(2, create(1)).unwrap();
        assert_eq!(second, ServerClientMsg::Reply { request_id: 1, result: Err(ServiceError::NodeExists) });
    }

    #[test]
    fn watch_is_delivered_to_the_session_that_armed_it() {
        let mut coordinator = Coordinator::new();
        let (to_watcher, mut watcher) = mpsc::unbounded_channel();
        let (to_writer, mut writer) = mpsc::unbounded_channel();
        coordinator.open_session(1, to_watcher);
        coordinator.open_session(2, to_writer);

        coordinator.process(2, ClientServerMsg::Create { request_id: 1, path: "/n".into(), mode: CreateMode::Persistent, data: Some(b"RED".to_vec()) });
        coordinator.process(1, ClientServerMsg::GetData { request_id: 1, path: "/n".into(), watch: true });
        coordinator.process(2, ClientServerMsg::SetData { request_id: 2, path: "/n".into(), data: b"BLUE".to_vec() });

        assert_eq!(watcher.try_recv().unwrap(), ServerClientMsg::Watch(WatchedEvent { kind: WatchKind::Data, path: "/n".into() }));
        assert!(writer.try_recv().is_err());
    }

    #[test]
    fn closing_session_notifies_others_of_removed_ephemerals() {
        let mut coordinator = Coordinator::new();
        let (to_watcher, mut watcher) = mpsc::unbounded_channel();
        let (to_owner, _owner) = mpsc::unbounded_channel();
        coordinator.open_session(1, to_watcher);
        coordinator.open_session(2, to_owner);

        coordinator.process(2, ClientServerMsg::Create { request_id: 1, path: "/e".into(), mode: CreateMode::Ephemeral, data: None });
        coordinator.process(1, ClientServerMsg::GetChildren { request_id: 1, path: "/".into(), watch: true });
        coordinator.close_session(2);

        assert_eq!(watcher.try_recv().unwrap(), ServerClientMsg::Watch(WatchedEvent { kind: WatchKind::Children, path: "/".into() }));
    }
}
