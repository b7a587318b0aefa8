//! Command sender used by the client subcommands

use crate::error::ControlError;
use crate::state::Command;
use std::io::ErrorKind;
use std::path::Path;
use tokio::net::UnixDatagram;

/// Send one command to the daemon listening on `path`
pub async fn send(path: &Path, command: Command) -> Result<(), ControlError> {
    if !path.exists() {
        return Err(ControlError::NotRunning(path.to_path_buf()));
    }

    let socket = UnixDatagram::unbound().map_err(ControlError::Send)?;
    match socket.send_to(command.payload().as_bytes(), path).await {
        Ok(_) => {
            tracing::debug!("Sent '{}' to {:?}", command, path);
            Ok(())
        }
        Err(e) if matches!(e.kind(), ErrorKind::ConnectionRefused | ErrorKind::NotFound) => {
            Err(ControlError::NotRunning(path.to_path_buf()))
        }
        Err(e) => Err(ControlError::Send(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        let err = send(&dir.path().join("control.socket"), Command::Toggle)
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::NotRunning(_)));
    }

    #[tokio::test]
    async fn test_dead_socket_refuses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("control.socket");
        drop(crate::control::bind(&path).unwrap());

        let err = send(&path, Command::ToggleLock).await.unwrap_err();
        assert!(matches!(err, ControlError::NotRunning(_)));
    }

    #[tokio::test]
    async fn test_payload_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("control.socket");
        let server = crate::control::bind(&path).unwrap();

        send(&path, Command::SetLock(false)).await.unwrap();
        let mut buf = [0u8; 64];
        let len = server.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"lockoff");
    }
}
