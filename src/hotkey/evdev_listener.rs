//! evdev-based hinge listener
//!
//! Reads the tablet-mode switch (`SW_TABLET_MODE`) and the rotation-lock
//! key straight from the kernel input layer. Unlike acpid events the
//! switch reports the new position, so the daemon gets `SetMode` rather
//! than a bare toggle.
//!
//! The user must be in the 'input' group to access /dev/input/* devices.

use super::{HingeEvent, HingeListener};
use crate::error::HotkeyError;
use crate::inbox::Outbox;
use crate::state::Mode;
use evdev::{Device, InputEventKind, Key, SwitchType};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use tokio::sync::oneshot;

/// KEY_ROTATE_LOCK_TOGGLE from linux/input-event-codes.h
const ROTATE_LOCK_TOGGLE: Key = Key::new(0x231);

/// evdev-based hinge listener
pub struct EvdevListener {
    /// Devices exposing the tablet-mode switch or the rotation-lock key
    device_paths: Vec<PathBuf>,
    /// Signal to stop the listener task
    stop_signal: Option<oneshot::Sender<()>>,
}

impl EvdevListener {
    pub fn new() -> Result<Self, HotkeyError> {
        let device_paths = find_hinge_devices()?;

        if device_paths.is_empty() {
            return Err(HotkeyError::NoSwitch);
        }

        tracing::debug!(
            "Found {} hinge device(s): {:?}",
            device_paths.len(),
            device_paths
        );

        Ok(Self {
            device_paths,
            stop_signal: None,
        })
    }
}

#[async_trait::async_trait]
impl HingeListener for EvdevListener {
    async fn start(&mut self, outbox: Outbox<HingeEvent>) -> Result<(), HotkeyError> {
        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_signal = Some(stop_tx);

        let device_paths = self.device_paths.clone();
        tokio::task::spawn_blocking(move || {
            evdev_listener_loop(device_paths, outbox, stop_rx);
        });

        Ok(())
    }

    async fn stop(&mut self) -> Result<(), HotkeyError> {
        if let Some(stop) = self.stop_signal.take() {
            let _ = stop.send(());
        }
        Ok(())
    }
}

/// Map one input event to a hinge event. Key repeats (value 2) and
/// releases are ignored.
fn classify(kind: InputEventKind, value: i32) -> Option<HingeEvent> {
    match kind {
        InputEventKind::Switch(SwitchType::SW_TABLET_MODE) => {
            let mode = if value != 0 { Mode::Tablet } else { Mode::Laptop };
            Some(HingeEvent::DisplayPosition(Some(mode)))
        }
        InputEventKind::Key(key) if key == ROTATE_LOCK_TOGGLE && value == 1 => {
            Some(HingeEvent::RotationLock)
        }
        _ => None,
    }
}

/// Main listener loop running in a blocking task
fn evdev_listener_loop(
    device_paths: Vec<PathBuf>,
    outbox: Outbox<HingeEvent>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut devices: Vec<Device> = device_paths
        .iter()
        .filter_map(|path| match Device::open(path) {
            Ok(device) => {
                // fetch_events must not block the stop check
                let fd = device.as_raw_fd();
                unsafe {
                    let flags = libc::fcntl(fd, libc::F_GETFL);
                    if flags != -1 {
                        libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                    }
                }
                tracing::debug!("Opened device (non-blocking): {:?}", path);
                Some(device)
            }
            Err(e) => {
                tracing::warn!("Failed to open {:?}: {}", path, e);
                None
            }
        })
        .collect();

    if devices.is_empty() {
        tracing::error!("No hinge devices could be opened");
        return;
    }

    tracing::info!("Listening for tablet-mode switch and rotation-lock key");

    loop {
        match stop_rx.try_recv() {
            Ok(_) | Err(oneshot::error::TryRecvError::Closed) => {
                tracing::debug!("Hinge listener stopping");
                return;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
        }

        for device in &mut devices {
            if let Ok(events) = device.fetch_events() {
                for event in events {
                    if let Some(hinge) = classify(event.kind(), event.value()) {
                        tracing::debug!("Hinge event: {:?}", hinge);
                        if !outbox.publish(hinge) {
                            return;
                        }
                    }
                }
            }
        }

        std::thread::sleep(std::time::Duration::from_millis(5));
    }
}

/// Find input devices reporting the tablet-mode switch or the rotation-lock key
fn find_hinge_devices() -> Result<Vec<PathBuf>, HotkeyError> {
    let mut found = Vec::new();

    let input_dir = std::fs::read_dir("/dev/input")
        .map_err(|e| HotkeyError::DeviceAccess(format!("/dev/input: {}", e)))?;

    for entry in input_dir {
        let entry = entry.map_err(|e| HotkeyError::DeviceAccess(e.to_string()))?;
        let path = entry.path();

        let is_event_device = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false);

        if !is_event_device {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                let has_switch = device
                    .supported_switches()
                    .map(|switches| switches.contains(SwitchType::SW_TABLET_MODE))
                    .unwrap_or(false);
                let has_lock_key = device
                    .supported_keys()
                    .map(|keys| keys.contains(ROTATE_LOCK_TOGGLE))
                    .unwrap_or(false);

                if has_switch || has_lock_key {
                    tracing::debug!(
                        "Found hinge device: {:?} ({:?})",
                        path,
                        device.name().unwrap_or("unknown")
                    );
                    found.push(path);
                }
            }
            Err(e) => {
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    return Err(HotkeyError::DeviceAccess(path.display().to_string()));
                }
                tracing::trace!("Skipping {:?}: {}", path, e);
            }
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tablet_switch() {
        let kind = InputEventKind::Switch(SwitchType::SW_TABLET_MODE);
        assert_eq!(
            classify(kind, 1),
            Some(HingeEvent::DisplayPosition(Some(Mode::Tablet)))
        );
        assert_eq!(
            classify(kind, 0),
            Some(HingeEvent::DisplayPosition(Some(Mode::Laptop)))
        );
    }

    #[test]
    fn test_rotation_lock_press_only() {
        let kind = InputEventKind::Key(ROTATE_LOCK_TOGGLE);
        assert_eq!(classify(kind, 1), Some(HingeEvent::RotationLock));
        assert_eq!(classify(kind, 0), None);
        assert_eq!(classify(kind, 2), None);
    }

    #[test]
    fn test_other_events_ignored() {
        assert_eq!(classify(InputEventKind::Key(Key::KEY_A), 1), None);
        assert_eq!(
            classify(InputEventKind::Switch(SwitchType::SW_LID), 1),
            None
        );
    }
}
