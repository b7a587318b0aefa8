//! State model for the spin daemon
//!
//! The daemon tracks one tuple of (mode, orientation, rotation lock,
//! touch enablement). Every request reaching the engine is first parsed
//! into a closed [`Command`] at the boundary where it entered.

use crate::error::{ControlError, DeviceError};
use crate::inventory::DeviceMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Physical usage mode of the convertible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Keyboard in front, pointing devices enabled, rotation locked
    #[default]
    Laptop,
    /// Keyboard folded away, pointing devices disabled
    Tablet,
}

impl Mode {
    /// The other mode
    pub fn flipped(self) -> Self {
        match self {
            Mode::Laptop => Mode::Tablet,
            Mode::Tablet => Mode::Laptop,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Laptop => write!(f, "laptop"),
            Mode::Tablet => write!(f, "tablet"),
        }
    }
}

/// Screen orientation, named after `xrandr -o` arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Normal,
    Inverted,
    Left,
    Right,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::Normal,
        Orientation::Inverted,
        Orientation::Left,
        Orientation::Right,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Normal => "normal",
            Orientation::Inverted => "inverted",
            Orientation::Left => "left",
            Orientation::Right => "right",
        }
    }

    /// Coordinate Transformation Matrix for the touchscreen, row-major 3x3
    pub fn transform_matrix(self) -> [f32; 9] {
        match self {
            Orientation::Normal => [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            Orientation::Inverted => [-1.0, 0.0, 1.0, 0.0, -1.0, 1.0, 0.0, 0.0, 1.0],
            Orientation::Left => [0.0, -1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0],
            Orientation::Right => [0.0, 1.0, 0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 1.0],
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(Orientation::Normal),
            "inverted" => Ok(Orientation::Inverted),
            "left" => Ok(Orientation::Left),
            "right" => Ok(Orientation::Right),
            other => Err(DeviceError::UnsupportedOrientation(other.to_string())),
        }
    }
}

/// A request understood by the mode engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Flip between laptop and tablet
    Toggle,
    SetMode(Mode),
    SetOrientation(Orientation),
    ToggleLock,
    SetLock(bool),
    ToggleTouch,
    /// Run the stylus calibrator for the current orientation
    Calibrate,
}

impl Command {
    /// Parse a control-socket payload
    pub fn parse(payload: &str) -> Result<Self, ControlError> {
        let word = payload.trim().to_lowercase();
        let command = match word.as_str() {
            "toggle" => Command::Toggle,
            "laptop" => Command::SetMode(Mode::Laptop),
            "tablet" => Command::SetMode(Mode::Tablet),
            "togglelock" => Command::ToggleLock,
            "lockon" => Command::SetLock(true),
            "lockoff" => Command::SetLock(false),
            "toggletouch" => Command::ToggleTouch,
            "calibrate" => Command::Calibrate,
            other => match other.parse::<Orientation>() {
                Ok(orientation) => Command::SetOrientation(orientation),
                Err(_) => return Err(ControlError::UnknownCommand(other.to_string())),
            },
        };
        Ok(command)
    }

    /// Wire form sent over the control socket
    pub fn payload(&self) -> &'static str {
        match self {
            Command::Toggle => "toggle",
            Command::SetMode(Mode::Laptop) => "laptop",
            Command::SetMode(Mode::Tablet) => "tablet",
            Command::SetOrientation(o) => o.as_str(),
            Command::ToggleLock => "togglelock",
            Command::SetLock(true) => "lockon",
            Command::SetLock(false) => "lockoff",
            Command::ToggleTouch => "toggletouch",
            Command::Calibrate => "calibrate",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.payload())
    }
}

/// Where a request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The accelerometer worker
    Sensor,
    /// A client on the control socket
    Control,
    /// The hinge / hotkey listener
    Hinge,
}

/// A command tagged with its origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    pub origin: Origin,
}

impl Request {
    pub fn new(command: Command, origin: Origin) -> Self {
        Self { command, origin }
    }

    /// An orientation reading from the accelerometer
    pub fn sensor(orientation: Orientation) -> Self {
        Self::new(Command::SetOrientation(orientation), Origin::Sensor)
    }

    pub fn control(command: Command) -> Self {
        Self::new(command, Origin::Control)
    }
}

/// The single authoritative daemon state, owned by the mode engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonState {
    pub mode: Mode,
    pub orientation: Orientation,
    pub rotation_lock: bool,
    pub touch_enabled: bool,
    pub devices: DeviceMap,
}

impl DaemonState {
    /// Startup state: laptop, normal, locked, touch enabled
    pub fn new(devices: DeviceMap) -> Self {
        Self {
            mode: Mode::Laptop,
            orientation: Orientation::Normal,
            rotation_lock: true,
            touch_enabled: true,
            devices,
        }
    }

    pub fn snapshot(&self) -> DaemonSnapshot {
        DaemonSnapshot {
            mode: self.mode,
            orientation: self.orientation,
            rotation_lock: self.rotation_lock,
            touch_enabled: self.touch_enabled,
        }
    }
}

/// Serializable view of the daemon state, written to the state file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct DaemonSnapshot {
    pub mode: Mode,
    pub orientation: Orientation,
    pub rotation_lock: bool,
    pub touch_enabled: bool,
}

impl fmt::Display for DaemonSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} touch-{}",
            self.mode,
            self.orientation,
            if self.rotation_lock { "locked" } else { "unlocked" },
            if self.touch_enabled { "on" } else { "off" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_defaults() {
        let state = DaemonState::new(DeviceMap::default());
        assert_eq!(state.mode, Mode::Laptop);
        assert_eq!(state.orientation, Orientation::Normal);
        assert!(state.rotation_lock);
        assert!(state.touch_enabled);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("toggle").unwrap(), Command::Toggle);
        assert_eq!(Command::parse("togglelock\n").unwrap(), Command::ToggleLock);
        assert_eq!(Command::parse(" ToggleTouch ").unwrap(), Command::ToggleTouch);
        assert_eq!(Command::parse("calibrate").unwrap(), Command::Calibrate);
        assert_eq!(
            Command::parse("left").unwrap(),
            Command::SetOrientation(Orientation::Left)
        );
        assert_eq!(
            Command::parse("tablet").unwrap(),
            Command::SetMode(Mode::Tablet)
        );
        assert_eq!(Command::parse("lockoff").unwrap(), Command::SetLock(false));
    }

    #[test]
    fn test_parse_unknown_command() {
        let err = Command::parse("sideways").unwrap_err();
        assert!(matches!(err, ControlError::UnknownCommand(ref s) if s == "sideways"));
    }

    #[test]
    fn test_payload_parses_back() {
        let commands = [
            Command::Toggle,
            Command::SetMode(Mode::Laptop),
            Command::SetOrientation(Orientation::Inverted),
            Command::SetLock(true),
            Command::Calibrate,
        ];
        for command in commands {
            assert_eq!(Command::parse(command.payload()).unwrap(), command);
        }
    }

    #[test]
    fn test_unsupported_orientation() {
        let err = "diagonal".parse::<Orientation>().unwrap_err();
        assert!(matches!(err, DeviceError::UnsupportedOrientation(_)));
    }

    #[test]
    fn test_snapshot_display() {
        let snapshot = DaemonState::new(DeviceMap::default()).snapshot();
        assert_eq!(format!("{}", snapshot), "laptop normal locked touch-on");
    }

    #[test]
    fn test_snapshot_json() {
        let snapshot = DaemonSnapshot {
            mode: Mode::Tablet,
            orientation: Orientation::Left,
            rotation_lock: false,
            touch_enabled: true,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains(r#""mode":"tablet""#));
        assert!(json.contains(r#""orientation":"left""#));
        let back: DaemonSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
