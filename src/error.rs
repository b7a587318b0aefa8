//! Error types for spin
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the spin application
#[derive(Error, Debug)]
pub enum SpinError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Device inventory error: {0}")]
    Inventory(#[from] InventoryError),

    #[error("Device control error: {0}")]
    Device(#[from] DeviceError),

    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),

    #[error("Control channel error: {0}")]
    Control(#[from] ControlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while resolving logical device roles
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Cannot list input devices: {0}\n  Is xinput installed and is an X session reachable (DISPLAY)?")]
    Unavailable(String),
}

/// Errors from the external device-control commands
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("{0} not found in PATH. Install it via your package manager.")]
    NotFound(String),

    #[error("'{command}' failed: {message}")]
    Failed { command: String, message: String },

    #[error("Unsupported orientation: '{0}'. Use normal, inverted, left or right.")]
    UnsupportedOrientation(String),
}

/// Errors from the accelerometer and stylus proximity sources
#[derive(Error, Debug)]
pub enum SensorError {
    #[error("No accel_3d device found under {0}")]
    NoAccelerometer(PathBuf),

    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse '{value}' from {path}")]
    Parse { path: PathBuf, value: String },

    #[error("Proximity query failed: {0}")]
    Query(String),

    #[error("Unsupported stylus proximity status: '{0}'")]
    UnsupportedStatus(String),
}

/// Errors related to hinge and hotkey detection
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Cannot connect to acpid at {path}: {source}\n  Is acpid running?")]
    Acpid {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot open input device '{0}'. Is the user in the 'input' group?\n  Run: sudo usermod -aG input $USER\n  Then log out and back in.")]
    DeviceAccess(String),

    #[error("No input device reports a tablet-mode switch or rotation-lock key")]
    NoSwitch,
}

/// Errors on the local control channel
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Another spin daemon is already listening on {0}")]
    AlreadyRunning(PathBuf),

    #[error("Cannot bind control socket {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Socket {0} does not exist or refuses commands. Is the spin daemon running?\n  Start it with: spin daemon")]
    NotRunning(PathBuf),

    #[error("Unknown command: '{0}'")]
    UnknownCommand(String),

    #[error("Failed to send command: {0}")]
    Send(#[source] std::io::Error),
}

/// Result type alias using SpinError
pub type Result<T> = std::result::Result<T, SpinError>;
