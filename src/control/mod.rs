//! Local control channel
//!
//! The daemon binds a Unix datagram socket; clients (`spin toggle`,
//! `spin rotate left`, ...) send one short text command per datagram.
//! There are no replies.
//!
//! A socket file left behind by a crashed daemon is detected by probing it:
//! if nothing answers the connect, the file is stale and replaced.

pub mod client;
pub mod listener;

use crate::error::ControlError;
use std::path::Path;
use tokio::net::UnixDatagram;

pub use client::send;
pub use listener::ControlListener;

/// Largest accepted command datagram
pub const MAX_PAYLOAD: usize = 1024;

/// Whether a daemon is currently bound to `path`
pub fn probe(path: &Path) -> bool {
    let Ok(socket) = std::os::unix::net::UnixDatagram::unbound() else {
        return false;
    };
    socket.connect(path).is_ok()
}

/// Bind the daemon's control socket, refusing if another daemon owns it
pub fn bind(path: &Path) -> Result<UnixDatagram, ControlError> {
    if path.exists() {
        if probe(path) {
            return Err(ControlError::AlreadyRunning(path.to_path_buf()));
        }
        tracing::debug!("Removing stale control socket {:?}", path);
        std::fs::remove_file(path).map_err(|source| ControlError::Bind {
            path: path.to_path_buf(),
            source,
        })?;
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ControlError::Bind {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let socket = UnixDatagram::bind(path).map_err(|source| ControlError::Bind {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("Control socket: {:?}", path);
    Ok(socket)
}

/// Remove the control socket file, ignoring a file that is already gone
pub fn cleanup(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed control socket {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove control socket {:?}: {}", path, e),
    }
}
