//! Configuration loading and types for spin
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/spin/config.toml)
//! 3. Environment variables (SPIN_*)
//! 4. CLI arguments (highest priority)

use crate::error::SpinError;
use crate::inventory::Role;
use crate::state::Orientation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Spin Configuration
#
# Location: ~/.config/spin/config.toml
# All settings can be overridden via CLI flags

# State file for external integrations (Waybar, polybar, etc.)
# Use "auto" for default location ($XDG_RUNTIME_DIR/spin/state),
# a custom path, or "disabled" to turn off. The daemon writes its
# mode, orientation, lock and touch state as JSON whenever it changes.
state_file = "auto"

[daemon]
# Pause after each mode transition, in milliseconds.
# Switching modes too fast upsets xrandr/xinput; keep this around 2000.
throttle_ms = 2000

# What to do when a worker sees a value it cannot handle at runtime
# (e.g. an unexpected stylus proximity status):
# - skip: log it and carry on (default)
# - exit: shut the daemon down gracefully with a non-zero status
on_unsupported = "skip"

# Log device commands instead of running them
dry_run = false

[control]
# Control socket used by `spin toggle` and friends
# "auto" resolves to $XDG_RUNTIME_DIR/spin/control.socket
socket = "auto"

[orientation]
# Follow the accelerometer when the rotation lock is off
enabled = true

# IIO sysfs root searched for an accel_3d device
iio_dir = "/sys/bus/iio/devices"

# Readings averaged per classification, and the delay before each one
samples = 6
sample_interval_ms = 250

# Pause between classification cycles
cycle_pause_ms = 150

[proximity]
# Disable the touchscreen while the stylus is near the screen
enabled = true
poll_interval_ms = 150

[hinge]
# Listen for the hinge (display position) and rotation-lock key
enabled = true

# Event source: "acpi" (acpid socket) or "evdev" (SW_TABLET_MODE switch)
backend = "acpi"
acpid_socket = "/var/run/acpid.socket"

# acpid event lines (ThinkPad Yoga defaults)
display_position_event = "ibm/hotkey LEN0068:00 00000080 000060c0"
rotation_lock_event = "ibm/hotkey LEN0068:00 00000080 00006020"

# The rotation-lock key reports twice; repeats within this window are dropped
rotation_lock_repeat_ms = 500

[tablet]
# Orientation applied when entering tablet mode:
# "automatic" follows the accelerometer, or one of normal, inverted, left, right
orientation = "automatic"

[devices]
# xinput device-name keywords per role; the first one present wins
touchscreen = ["SYNAPTICS Synaptics Touch Digitizer V04", "ELAN Touchscreen"]
touchpad = ["SynPS/2 Synaptics TouchPad", "PS/2 Synaptics TouchPad"]
trackpoint = ["TPPS/2 IBM TrackPoint"]
stylus = ["Wacom ISDv4 EC Pen stylus"]

[calibration]
# Stylus calibrator; {device} is replaced by the stylus device name.
# Its output is scanned for an "Area" line with four integers.
command = "xinput_calibrator --device {device}"

# Where calibrated areas are stored ("auto" = ~/.local/share/spin/calibration.json)
profile = "auto"

[notification]
# Show a notification when the rotation lock changes
on_rotation_lock = true

# Show a notification when switching between laptop and tablet
on_mode_change = false
"#;

/// Policy for values a worker cannot handle at runtime
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedPolicy {
    /// Log and drop the action for this cycle
    #[default]
    Skip,
    /// Shut the daemon down with a non-zero exit status
    Exit,
}

/// Hinge event backend
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HingeBackend {
    /// Line events from the acpid socket
    #[default]
    Acpi,
    /// Kernel tablet-mode switch and rotation-lock key via evdev
    Evdev,
}

/// Orientation to use when entering tablet mode
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TabletOrientation {
    /// Unlock rotation and follow the accelerometer
    #[default]
    Automatic,
    Normal,
    Inverted,
    Left,
    Right,
}

impl std::str::FromStr for TabletOrientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "automatic" => Ok(Self::Automatic),
            "normal" => Ok(Self::Normal),
            "inverted" => Ok(Self::Inverted),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(format!(
                "'{}' (expected automatic, normal, inverted, left or right)",
                other
            )),
        }
    }
}

impl TabletOrientation {
    /// Fixed orientation, or `None` for automatic
    pub fn fixed(self) -> Option<Orientation> {
        match self {
            TabletOrientation::Automatic => None,
            TabletOrientation::Normal => Some(Orientation::Normal),
            TabletOrientation::Inverted => Some(Orientation::Inverted),
            TabletOrientation::Left => Some(Orientation::Left),
            TabletOrientation::Right => Some(Orientation::Right),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Optional path to state file for external integrations (e.g., Waybar)
    /// "auto" resolves to $XDG_RUNTIME_DIR/spin/state, "disabled" turns it off
    #[serde(default = "default_state_file")]
    pub state_file: Option<String>,

    pub daemon: DaemonConfig,
    pub control: ControlConfig,
    pub orientation: OrientationConfig,
    pub proximity: ProximityConfig,
    pub hinge: HingeConfig,
    pub tablet: TabletConfig,
    pub devices: DevicesConfig,
    pub calibration: CalibrationConfig,
    pub notification: NotificationConfig,
}

fn default_state_file() -> Option<String> {
    Some("auto".to_string())
}

/// Engine behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Pause after every applied transition (ms)
    pub throttle_ms: u64,

    /// Runtime handling of unsupported values
    pub on_unsupported: UnsupportedPolicy,

    /// Log device commands instead of executing them
    pub dry_run: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            throttle_ms: 2000,
            on_unsupported: UnsupportedPolicy::default(),
            dry_run: false,
        }
    }
}

/// Control socket configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Socket path or "auto"
    pub socket: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            socket: "auto".to_string(),
        }
    }
}

/// Accelerometer sampling
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OrientationConfig {
    pub enabled: bool,
    pub iio_dir: PathBuf,
    pub samples: usize,
    pub sample_interval_ms: u64,
    pub cycle_pause_ms: u64,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            iio_dir: PathBuf::from("/sys/bus/iio/devices"),
            samples: 6,
            sample_interval_ms: 250,
            cycle_pause_ms: 150,
        }
    }
}

/// Stylus proximity polling
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProximityConfig {
    pub enabled: bool,
    pub poll_interval_ms: u64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 150,
        }
    }
}

/// Hinge and rotation-lock key detection
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HingeConfig {
    pub enabled: bool,
    pub backend: HingeBackend,
    pub acpid_socket: PathBuf,
    pub display_position_event: String,
    pub rotation_lock_event: String,
    pub rotation_lock_repeat_ms: u64,
}

impl Default for HingeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: HingeBackend::default(),
            acpid_socket: PathBuf::from("/var/run/acpid.socket"),
            display_position_event: "ibm/hotkey LEN0068:00 00000080 000060c0".to_string(),
            rotation_lock_event: "ibm/hotkey LEN0068:00 00000080 00006020".to_string(),
            rotation_lock_repeat_ms: 500,
        }
    }
}

/// Tablet mode preferences
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TabletConfig {
    pub orientation: TabletOrientation,
}

/// Device-name keywords per logical role
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DevicesConfig {
    pub touchscreen: Vec<String>,
    pub touchpad: Vec<String>,
    pub trackpoint: Vec<String>,
    pub stylus: Vec<String>,
}

impl DevicesConfig {
    pub fn keywords(&self, role: Role) -> &[String] {
        match role {
            Role::Touchscreen => &self.touchscreen,
            Role::Touchpad => &self.touchpad,
            Role::Trackpoint => &self.trackpoint,
            Role::Stylus => &self.stylus,
        }
    }
}

impl Default for DevicesConfig {
    fn default() -> Self {
        // SynPS/2 must precede its own substring "PS/2 Synaptics TouchPad"
        Self {
            touchscreen: vec![
                "SYNAPTICS Synaptics Touch Digitizer V04".to_string(),
                "ELAN Touchscreen".to_string(),
            ],
            touchpad: vec![
                "SynPS/2 Synaptics TouchPad".to_string(),
                "PS/2 Synaptics TouchPad".to_string(),
            ],
            trackpoint: vec!["TPPS/2 IBM TrackPoint".to_string()],
            stylus: vec!["Wacom ISDv4 EC Pen stylus".to_string()],
        }
    }
}

/// Stylus calibration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Calibrator command line; `{device}` is substituted
    pub command: String,
    /// Profile path or "auto"
    pub profile: String,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            command: "xinput_calibrator --device {device}".to_string(),
            profile: "auto".to_string(),
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Notify when the rotation lock changes
    pub on_rotation_lock: bool,

    /// Notify on laptop/tablet switches
    pub on_mode_change: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            on_rotation_lock: true,
            on_mode_change: false,
        }
    }
}

impl Config {
    /// Config with the built-in defaults and the state file enabled
    pub fn with_defaults() -> Self {
        Self {
            state_file: Some("auto".to_string()),
            ..Self::default()
        }
    }

    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "spin")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the runtime directory for ephemeral files (state, sockets)
    pub fn runtime_dir() -> PathBuf {
        // Use XDG_RUNTIME_DIR if available, otherwise fall back to /tmp
        std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
            .join("spin")
    }

    /// Get the data directory path (for the calibration profile)
    pub fn data_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "spin")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolve the state file path from config
    /// Returns None if state_file is not configured or explicitly disabled
    pub fn resolve_state_file(&self) -> Option<PathBuf> {
        self.state_file.as_ref().and_then(|path| {
            match path.to_lowercase().as_str() {
                "disabled" | "none" | "off" | "false" => None,
                "auto" => Some(Self::runtime_dir().join("state")),
                _ => Some(PathBuf::from(path)),
            }
        })
    }

    /// Resolve the control socket path
    pub fn resolve_socket(&self) -> PathBuf {
        match self.control.socket.as_str() {
            "auto" | "" => Self::runtime_dir().join("control.socket"),
            path => PathBuf::from(path),
        }
    }

    /// Resolve the calibration profile path
    pub fn resolve_calibration_profile(&self) -> PathBuf {
        match self.calibration.profile.as_str() {
            "auto" | "" => Self::data_dir().join("calibration.json"),
            path => PathBuf::from(path),
        }
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, SpinError> {
    // Start with defaults
    let mut config = Config::with_defaults();

    // Determine config file path
    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    // Load from file if it exists
    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| SpinError::Config(format!("Failed to read config: {}", e)))?;

            config = parse_config(&contents)?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    // Override from environment variables
    if let Ok(socket) = std::env::var("SPIN_SOCKET") {
        config.control.socket = socket;
    }
    if let Ok(value) = std::env::var("SPIN_DRY_RUN") {
        config.daemon.dry_run = matches!(value.to_lowercase().as_str(), "1" | "true" | "yes");
    }
    if let Ok(orientation) = std::env::var("SPIN_TABLET_ORIENTATION") {
        config.tablet.orientation = orientation.parse().map_err(|e| {
            SpinError::Config(format!("Invalid SPIN_TABLET_ORIENTATION: {}", e))
        })?;
    }

    Ok(config)
}

/// Parse a TOML document into a config
pub fn parse_config(contents: &str) -> Result<Config, SpinError> {
    toml::from_str(contents).map_err(|e| SpinError::Config(format!("Invalid config: {}", e)))
}
