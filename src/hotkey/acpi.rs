//! acpid-based hinge listener
//!
//! Connects to acpid's event socket and matches each event line against
//! the configured display-position and rotation-lock events. Any other
//! traffic on the socket is ignored.

use super::{HingeEvent, HingeListener};
use crate::config::HingeConfig;
use crate::error::HotkeyError;
use crate::inbox::Outbox;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UnixStream;
use tokio::task::JoinHandle;

/// Maps acpid event lines to hinge events
#[derive(Debug, Clone)]
pub struct AcpiMatcher {
    display_position: String,
    rotation_lock: String,
    repeat_window: Duration,
    last_lock: Option<Instant>,
}

impl AcpiMatcher {
    pub fn new(config: &HingeConfig) -> Self {
        Self {
            display_position: config.display_position_event.trim().to_string(),
            rotation_lock: config.rotation_lock_event.trim().to_string(),
            repeat_window: Duration::from_millis(config.rotation_lock_repeat_ms),
            last_lock: None,
        }
    }

    /// Match one event line received at `now`.
    ///
    /// The rotation-lock key reports twice per press; a repeat inside the
    /// window is swallowed.
    pub fn match_line(&mut self, line: &str, now: Instant) -> Option<HingeEvent> {
        let line = line.trim();
        if line == self.rotation_lock {
            if let Some(last) = self.last_lock {
                if now.duration_since(last) < self.repeat_window {
                    tracing::trace!("Ignoring repeated rotation-lock event");
                    self.last_lock = None;
                    return None;
                }
            }
            self.last_lock = Some(now);
            Some(HingeEvent::RotationLock)
        } else if line == self.display_position {
            tracing::info!("Display position change");
            Some(HingeEvent::DisplayPosition(None))
        } else {
            tracing::debug!("Unknown ACPI event: {:?}", line);
            None
        }
    }
}

/// Hinge listener reading acpid's event socket
pub struct AcpiListener {
    socket: PathBuf,
    matcher: AcpiMatcher,
    task: Option<JoinHandle<()>>,
}

impl AcpiListener {
    pub fn new(config: &HingeConfig) -> Self {
        Self {
            socket: config.acpid_socket.clone(),
            matcher: AcpiMatcher::new(config),
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl HingeListener for AcpiListener {
    async fn start(&mut self, outbox: Outbox<HingeEvent>) -> Result<(), HotkeyError> {
        let stream = UnixStream::connect(&self.socket)
            .await
            .map_err(|source| HotkeyError::Acpid {
                path: self.socket.clone(),
                source,
            })?;
        tracing::info!("Listening for ACPI events on {:?}", self.socket);

        let mut matcher = self.matcher.clone();
        self.task = Some(tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Some(event) = matcher.match_line(&line, Instant::now()) {
                            if !outbox.publish(event) {
                                return;
                            }
                        }
                    }
                    Ok(None) => {
                        tracing::warn!("acpid closed the event socket");
                        return;
                    }
                    Err(e) => {
                        tracing::warn!("Reading ACPI events failed: {}", e);
                        return;
                    }
                }
            }
        }));

        Ok(())
    }

    async fn stop(&mut self) -> Result<(), HotkeyError> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::UnixListener;

    fn matcher() -> AcpiMatcher {
        AcpiMatcher::new(&HingeConfig::default())
    }

    #[test]
    fn test_display_position_event() {
        let mut m = matcher();
        let now = Instant::now();
        assert_eq!(
            m.match_line("ibm/hotkey LEN0068:00 00000080 000060c0\n", now),
            Some(HingeEvent::DisplayPosition(None))
        );
    }

    #[test]
    fn test_unknown_event_ignored() {
        let mut m = matcher();
        assert_eq!(
            m.match_line("button/power PBTN 00000080 00000000", Instant::now()),
            None
        );
    }

    #[test]
    fn test_rotation_lock_double_report() {
        let mut m = matcher();
        let line = "ibm/hotkey LEN0068:00 00000080 00006020";
        let t0 = Instant::now();
        assert_eq!(m.match_line(line, t0), Some(HingeEvent::RotationLock));
        assert_eq!(m.match_line(line, t0 + Duration::from_millis(20)), None);
        // next real press
        assert_eq!(
            m.match_line(line, t0 + Duration::from_secs(3)),
            Some(HingeEvent::RotationLock)
        );
    }

    #[test]
    fn test_rotation_lock_after_window() {
        let mut m = matcher();
        let line = "ibm/hotkey LEN0068:00 00000080 00006020";
        let t0 = Instant::now();
        assert!(m.match_line(line, t0).is_some());
        assert!(m.match_line(line, t0 + Duration::from_millis(800)).is_some());
    }

    #[tokio::test]
    async fn test_listener_reads_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acpid.socket");
        let server = UnixListener::bind(&path).unwrap();

        let config = HingeConfig {
            acpid_socket: path.clone(),
            ..HingeConfig::default()
        };
        let mut listener = AcpiListener::new(&config);
        let (tx, rx) = crate::inbox::channel("hinge");
        listener.start(tx).await.unwrap();

        let (mut conn, _) = server.accept().await.unwrap();
        conn.write_all(b"ac_adapter ACPI0003:00 00000080 00000001\n")
            .await
            .unwrap();
        conn.write_all(b"ibm/hotkey LEN0068:00 00000080 000060c0\n")
            .await
            .unwrap();

        let mut seen = None;
        for _ in 0..100 {
            if let Some(event) = rx.take() {
                seen = Some(event);
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        listener.stop().await.unwrap();
        assert_eq!(seen, Some(HingeEvent::DisplayPosition(None)));
    }

    #[tokio::test]
    async fn test_missing_acpid_socket() {
        let config = HingeConfig {
            acpid_socket: PathBuf::from("/nonexistent/acpid.socket"),
            ..HingeConfig::default()
        };
        let mut listener = AcpiListener::new(&config);
        let (tx, _rx) = crate::inbox::channel("hinge");
        assert!(matches!(
            listener.start(tx).await,
            Err(HotkeyError::Acpid { .. })
        ));
    }
}
