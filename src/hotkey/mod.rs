//! Hinge and hotkey detection module
//!
//! Two hardware signals matter: the display being folded over (laptop ↔
//! tablet) and the rotation-lock key. They can be read from:
//! - acpid's event socket (default; matches configured event lines)
//! - the kernel input layer via evdev (`SW_TABLET_MODE` switch and
//!   `KEY_ROTATE_LOCK_TOGGLE`); requires the 'input' group

pub mod acpi;
#[cfg(target_os = "linux")]
pub mod evdev_listener;

use crate::config::{HingeBackend, HingeConfig};
use crate::error::HotkeyError;
use crate::inbox::Outbox;
use crate::state::{Command, Mode};

/// Events emitted by the hinge listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HingeEvent {
    /// The rotation-lock key was pressed
    RotationLock,
    /// The display changed position; the new mode when the source knows it
    DisplayPosition(Option<Mode>),
}

impl HingeEvent {
    /// The command this event asks the engine for
    pub fn command(self) -> Command {
        match self {
            HingeEvent::RotationLock => Command::ToggleLock,
            HingeEvent::DisplayPosition(Some(mode)) => Command::SetMode(mode),
            HingeEvent::DisplayPosition(None) => Command::Toggle,
        }
    }
}

/// Trait for hinge detection implementations
#[async_trait::async_trait]
pub trait HingeListener: Send + Sync {
    /// Start listening, publishing events into `outbox`
    async fn start(&mut self, outbox: Outbox<HingeEvent>) -> Result<(), HotkeyError>;

    /// Stop listening and clean up
    async fn stop(&mut self) -> Result<(), HotkeyError>;
}

/// Factory function to create the configured hinge listener
pub fn create_listener(config: &HingeConfig) -> Result<Box<dyn HingeListener>, HotkeyError> {
    match config.backend {
        HingeBackend::Acpi => Ok(Box::new(acpi::AcpiListener::new(config))),
        #[cfg(target_os = "linux")]
        HingeBackend::Evdev => Ok(Box::new(evdev_listener::EvdevListener::new()?)),
        #[cfg(not(target_os = "linux"))]
        HingeBackend::Evdev => Err(HotkeyError::NoSwitch),
    }
}
