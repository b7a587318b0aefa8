//! Spin: laptop/tablet mode daemon for convertible laptops
//!
//! This library provides the core functionality for:
//! - Reading the screen orientation from the IIO accelerometer
//! - Detecting the hinge position and rotation-lock key (acpid or evdev)
//! - Switching input devices and rotating the display via xrandr/xinput/xsetwacom
//! - Disabling touch while the stylus is in proximity
//! - Accepting commands over a local Unix datagram socket
//!
//! # Architecture
//!
//! ```text
//!   ┌─────────────┐ ┌─────────────┐ ┌─────────────┐ ┌─────────────┐
//!   │ Orientation │ │   Control   │ │    Hinge    │ │  Proximity  │
//!   │   (IIO)     │ │  (socket)   │ │(acpid/evdev)│ │  (xinput)   │
//!   └─────────────┘ └─────────────┘ └─────────────┘ └─────────────┘
//!          │ publish       │               │               │
//!          ▼               ▼               ▼               ▼
//!   ┌─────────────┐ ┌─────────────┐ ┌─────────────┐ ┌─────────────┐
//!   │    inbox    │ │    inbox    │ │    inbox    │ │    inbox    │
//!   └─────────────┘ └─────────────┘ └─────────────┘ └─────────────┘
//!          │ 100 ms        │ 105 ms        │ 110 ms        │ 150 ms
//!          └───────────────┴───────┬───────┴───────────────┘
//!                                  ▼
//!                         ┌─────────────────┐
//!                         │     Daemon      │  select! over the timers
//!                         └─────────────────┘
//!                                  │ Request { command, origin }
//!                                  ▼
//!                         ┌─────────────────┐
//!                         │   Mode Engine   │  owns DaemonState
//!                         └─────────────────┘
//!                                  │
//!                                  ▼
//!                         ┌─────────────────┐
//!                         │  DeviceControl  │  xrandr / xinput / xsetwacom
//!                         └─────────────────┘
//! ```

pub mod calibration;
pub mod cli;
pub mod config;
pub mod control;
pub mod daemon;
pub mod device;
pub mod engine;
pub mod error;
pub mod hotkey;
pub mod inbox;
pub mod inventory;
pub mod notification;
pub mod sensor;
pub mod state;

pub use cli::{Cli, Commands, LockAction, OrientationArg, StatusFormat};
pub use config::Config;
pub use daemon::Daemon;
pub use error::{Result, SpinError};
