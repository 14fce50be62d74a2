use tokio::{io::{AsyncReadExt, AsyncWriteExt}, net::TcpStream, sync::mpsc};

use crate::dequeue::dequeue_msg;

/// Connects to the coordination server and spawns the task that shuttles frames.
///
/// Frames written to the returned sender go to the server as-is; every complete frame
/// body received from the server is forwarded to `server_to_main`. When the connection
/// ends, `server_to_main` is dropped so the receiving side observes the loss.
pub async fn spawn_server_connection_process(addr: &str, server_to_main: mpsc::Sender<Vec<u8>>) -> anyhow::Result<mpsc::Sender<Vec<u8>>> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    tracing::info!(addr, "connected to coordination server");

    let (main_to_server, mut server_from_main) = mpsc::channel::<Vec<u8>>(100);
    tokio::spawn(async move {
        let mut static_buffer = [0; 1024];
        let mut input_buffer = Vec::new();

        'connected: loop {
            tokio::select! {
                result = stream.read(&mut static_buffer) => {
                    let len = match result {
                        Ok(len) => len,
                        Err(e) => {
                            tracing::warn!(%e, "error while reading from socket");
                            break 'connected;
                        }
                    };
                    if len == 0 {
                        tracing::warn!("server closed the connection");
                        break;
                    }
                    input_buffer.extend(&static_buffer[..len]);

                    while let Some((begin, end)) = dequeue_msg(&input_buffer) {
                        let bytes = input_buffer[begin..end].to_vec();
                        input_buffer.drain(..end);
                        if server_to_main.send(bytes).await.is_err() {
                            break 'connected;
                        }
                    }
                }
                result = server_from_main.recv() => {
                    let Some(msg) = result else {
                        tracing::debug!("connection handle dropped");
                        break;
                    };

                    if let Err(e) = stream.write_all(&msg).await {
                        tracing::warn!(%e, "error while writing to stream");
                        break 'connected;
                    }
                }
            }
        }
    });
    Ok(main_to_server)
}
