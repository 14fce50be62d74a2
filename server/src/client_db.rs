use std::{net::SocketAddr, sync::Arc};

use msgs::{client_server_msg::ClientServerMsg, namespace::SessionId, server_client_msg::ServerClientMsg};
use parking_lot::Mutex;
use tokio::{io::{AsyncReadExt, AsyncWriteExt}, net::TcpStream, sync::mpsc};

use crate::coordinator::Coordinator;

pub struct ClientDb {
    pub session_id_counter: SessionId,
    pub coordinator: Arc<Mutex<Coordinator>>,
}

impl ClientDb {
    pub fn new() -> ClientDb {
        ClientDb {
            session_id_counter: 0,
            coordinator: Arc::new(Mutex::new(Coordinator::new())),
        }
    }

    pub fn new_client(&mut self, socket: TcpStream, addr: SocketAddr) {
        let session_id = self.session_id_counter;
        self.session_id_counter += 1;
        let (to_client, from_coordinator) = mpsc::unbounded_channel();
        self.coordinator.lock().open_session(session_id, to_client);
        spawn_client_process(socket, self.coordinator.clone(), session_id, addr, from_coordinator);
        tracing::info!(session_id, %addr, "accepted client");
    }
}

pub fn spawn_client_process(mut socket: TcpStream, coordinator: Arc<Mutex<Coordinator>>, session_id: SessionId, addr: SocketAddr, mut from_coordinator: mpsc::UnboundedReceiver<ServerClientMsg>) {
    tokio::spawn(async move {
        let mut static_buffer = [0; 1024];
        let mut input_buffer = Vec::new();
        let mut output_buffer = Vec::new();

        if let Err(e) = send_client_msg(ServerClientMsg::Hello { session_id }, &mut socket, &mut output_buffer).await {
            tracing::warn!(session_id, %e, "disconnecting because of error while writing to client");
            coordinator.lock().close_session(session_id);
            return;
        }

        'session: loop {
            tokio::select! {
                result = socket.read(&mut static_buffer) => {
                    let len = match result {
                        Ok(len) => len,
                        Err(e) => {
                            tracing::warn!(session_id, %e, "error while reading from socket");
                            break;
                        }
                    };
                    if len == 0 {
                        tracing::info!(session_id, %addr, "client died");
                        break;
                    }
                    input_buffer.extend(&static_buffer[..len]);

                    while let Some((cursor, msg)) = ClientServerMsg::dequeue_and_decode(&input_buffer) {
                        input_buffer.drain(..cursor);
                        let msg = match msg {
                            Ok(msg) => msg,
                            Err(e) => {
                                tracing::warn!(session_id, %e, "error while decoding msg");
                                break 'session;
                            }
                        };
                        if msg == ClientServerMsg::Disconnect {
                            tracing::info!(session_id, %addr, "client disconnected");
                            break 'session;
                        }

                        let reply = coordinator.lock().process(session_id, msg);
                        if let Some(reply) = reply {
                            if let Err(e) = send_client_msg(reply, &mut socket, &mut output_buffer).await {
                                tracing::warn!(session_id, %e, "error while writing to socket");
                                break 'session;
                            }
                        }
                    }
                }
                result = from_coordinator.recv() => {
                    let Some(msg) = result else { break };
                    if let Err(e) = send_client_msg(msg, &mut socket, &mut output_buffer).await {
                        tracing::warn!(session_id, %e, "error while writing to socket");
                        break;
                    }
                }
            }
        }

        coordinator.lock().close_session(session_id);
    });
}

pub async fn send_client_msg(msg: ServerClientMsg, socket: &mut TcpStream, output_buffer: &mut Vec<u8>) -> std::io::Result<()> {
    output_buffer.clear();
    msg.pack(output_buffer)?;
    socket.write_all(&output_buffer[..]).await
}
