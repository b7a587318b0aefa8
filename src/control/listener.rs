//! Control socket worker
//!
//! Receives datagrams, parses each into a [`Command`] and publishes it into
//! the control inbox. Unknown text is logged and dropped.

use super::MAX_PAYLOAD;
use crate::inbox::Outbox;
use crate::state::Command;
use tokio::net::UnixDatagram;

/// Listens on the daemon's control socket
pub struct ControlListener {
    socket: UnixDatagram,
}

impl ControlListener {
    pub fn new(socket: UnixDatagram) -> Self {
        Self { socket }
    }

    /// Run until the inbox is dropped or the socket fails
    pub async fn run(self, outbox: Outbox<Command>) {
        let mut buf = [0u8; MAX_PAYLOAD];
        loop {
            let len = match self.socket.recv(&mut buf).await {
                Ok(len) => len,
                Err(e) => {
                    tracing::error!("Control socket receive failed: {}", e);
                    return;
                }
            };

            let text = String::from_utf8_lossy(&buf[..len]);
            match Command::parse(&text) {
                Ok(command) => {
                    tracing::debug!("Received command: {}", command);
                    if !outbox.publish(command) {
                        return;
                    }
                }
                Err(e) => tracing::warn!("{}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Mode, Orientation};
    use std::time::Duration;

    async fn next(rx: &crate::inbox::Inbox<Command>) -> Option<Command> {
        for _ in 0..100 {
            if let Some(command) = rx.take() {
                return Some(command);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        None
    }

    #[tokio::test]
    async fn test_commands_reach_inbox() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("control.socket");
        let socket = crate::control::bind(&path).unwrap();
        let (tx, rx) = crate::inbox::channel("control");
        let task = tokio::spawn(ControlListener::new(socket).run(tx));

        let client = UnixDatagram::unbound().unwrap();
        client.send_to(b"  LEFT\n", &path).await.unwrap();
        assert_eq!(
            next(&rx).await,
            Some(Command::SetOrientation(Orientation::Left))
        );

        client.send_to(b"bogus", &path).await.unwrap();
        client.send_to(b"tablet", &path).await.unwrap();
        assert_eq!(next(&rx).await, Some(Command::SetMode(Mode::Tablet)));

        task.abort();
    }
}
