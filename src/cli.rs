// Command-line interface definitions for spin
//
// This module is separate so it can be used by both the binary (main.rs)
// and build.rs for generating man pages.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "spin")]
#[command(author, version, about = "Laptop/tablet mode daemon for convertible laptops")]
#[command(long_about = "
Spin follows the posture of a convertible laptop and switches the input
devices to match: in tablet mode the touchpad and trackpoint are disabled and
the screen follows the accelerometer; in laptop mode everything is back to
normal. While the stylus is near the screen, touch input is ignored.

SETUP:
  1. Install xrandr, xinput and xsetwacom (and xinput_calibrator for calibration)
  2. Make sure acpid is running, or set hinge.backend = \"evdev\"
  3. Run: spin check (to see which devices were detected)
  4. Run: spin (to start the daemon)

USAGE:
  Fold the screen over to enter tablet mode, press the rotation-lock key to
  freeze the orientation. The same actions are available as commands for
  keybindings and scripts: spin toggle, spin lock, spin rotate left, ...
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Log device commands instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Override the control socket path
    #[arg(long, value_name = "PATH")]
    pub socket: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as daemon (default if no command specified)
    Daemon,

    /// Toggle between laptop and tablet mode
    Toggle,

    /// Switch to laptop mode
    Laptop,

    /// Switch to tablet mode
    Tablet,

    /// Change the rotation lock
    Lock {
        /// on, off or toggle
        #[arg(value_enum, default_value = "toggle")]
        action: LockAction,
    },

    /// Toggle touchscreen input on/off
    Touch,

    /// Calibrate the stylus for the current orientation
    Calibrate,

    /// Rotate the screen, regardless of the rotation lock
    Rotate {
        #[arg(value_enum)]
        orientation: OrientationArg,
    },

    /// Show daemon status (for status bar integration)
    Status {
        /// Keep printing the status whenever it changes
        #[arg(long)]
        follow: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: StatusFormat,
    },

    /// Show current configuration
    Config,

    /// Check tools, sensors and detected devices
    Check {
        /// Write the default config file if none exists
        #[arg(long)]
        write_config: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LockAction {
    On,
    Off,
    Toggle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OrientationArg {
    Normal,
    Inverted,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StatusFormat {
    Text,
    Json,
}
