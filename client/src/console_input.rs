use std::io::{stdin, BufRead};
use std::thread;

use tokio::sync::mpsc::{self, Receiver};

/// Reads stdin on a dedicated thread. The receiver closes once stdin reaches end of input.
pub fn console_input_thread() -> Receiver<String> {
    let (sender, receiver) = mpsc::channel(100);
    thread::spawn(move || {
        pollster::block_on(console_input_loop(stdin().lock(), sender))
    });
    receiver
}

pub async fn console_input_loop(mut reader: impl BufRead, sender: mpsc::Sender<String>) {
    loop {
        let mut input = String::new();
        match reader.read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(%e, "failed to read console input");
                break;
            }
        }
        if sender.send(input).await.is_err() {
            break;
        }
    }
    tracing::debug!("console input closed");
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[tokio::test]
    async fn forwards_lines_until_end_of_input() {
        let (sender, mut receiver) = mpsc::channel(10);
        console_input_loop(Cursor::new("view 1 2\nset 0 0 red\n"), sender).await;

        assert_eq!(receiver.recv().await.as_deref(), Some("view 1 2\n"));
        assert_eq!(receiver.recv().await.as_deref(), Some("set 0 0 red\n"));
        assert_eq!(receiver.recv().await, None);
    }
}
