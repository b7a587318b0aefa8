//! Spin - laptop/tablet mode daemon for convertible laptops
//!
//! Run with `spin` or `spin daemon` to start the daemon.
//! Use `spin toggle`, `spin lock`, `spin rotate <orientation>` ... to control it.
//! Use `spin check` to see which tools, sensors and devices were found.

use clap::Parser;
use spin::cli::{Cli, Commands, LockAction, OrientationArg, StatusFormat};
use spin::config::{self, Config, HingeBackend};
use spin::control;
use spin::device::xorg::XorgControl;
use spin::inventory::{self, Role};
use spin::sensor::IioAccelerometer;
use spin::state::{Command, DaemonSnapshot, Mode, Orientation};
use spin::Daemon;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("spin={},warn", log_level))),
        )
        .with_target(false)
        .init();

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if cli.dry_run {
        config.daemon.dry_run = true;
    }
    if let Some(socket) = cli.socket {
        config.control.socket = socket.to_string_lossy().into_owned();
    }

    // Run the appropriate command
    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => {
            let mut daemon = Daemon::new(config);
            daemon.run().await?;
        }

        Commands::Toggle => send(&config, Command::Toggle).await?,
        Commands::Laptop => send(&config, Command::SetMode(Mode::Laptop)).await?,
        Commands::Tablet => send(&config, Command::SetMode(Mode::Tablet)).await?,
        Commands::Lock { action } => {
            let command = match action {
                LockAction::On => Command::SetLock(true),
                LockAction::Off => Command::SetLock(false),
                LockAction::Toggle => Command::ToggleLock,
            };
            send(&config, command).await?;
        }
        Commands::Touch => send(&config, Command::ToggleTouch).await?,
        Commands::Calibrate => send(&config, Command::Calibrate).await?,
        Commands::Rotate { orientation } => {
            send(&config, Command::SetOrientation(orientation_of(orientation))).await?;
        }

        Commands::Status { follow, format } => {
            run_status(&config, follow, format)?;
        }

        Commands::Config => {
            show_config(&config)?;
        }

        Commands::Check { write_config } => {
            run_check(&config, write_config).await?;
        }
    }

    Ok(())
}

fn orientation_of(arg: OrientationArg) -> Orientation {
    match arg {
        OrientationArg::Normal => Orientation::Normal,
        OrientationArg::Inverted => Orientation::Inverted,
        OrientationArg::Left => Orientation::Left,
        OrientationArg::Right => Orientation::Right,
    }
}

/// Send a command to the running daemon
async fn send(config: &Config, command: Command) -> anyhow::Result<()> {
    let socket = config.resolve_socket();
    control::send(&socket, command).await?;
    tracing::info!("Sent '{}' to the spin daemon", command);
    Ok(())
}

/// Render the state file contents (or its absence) for output
fn format_status(contents: Option<&str>, format: StatusFormat) -> String {
    let snapshot = contents.and_then(|c| serde_json::from_str::<DaemonSnapshot>(c).ok());
    match (format, snapshot) {
        (StatusFormat::Text, Some(snapshot)) => snapshot.to_string(),
        (StatusFormat::Text, None) => "stopped".to_string(),
        (StatusFormat::Json, Some(snapshot)) => serde_json::json!({
            "text": snapshot.mode.to_string(),
            "class": snapshot.mode.to_string(),
            "tooltip": snapshot.to_string(),
            "state": snapshot,
        })
        .to_string(),
        (StatusFormat::Json, None) => serde_json::json!({
            "text": "",
            "class": "stopped",
            "tooltip": "spin not running",
        })
        .to_string(),
    }
}

fn read_status(path: &Path, format: StatusFormat) -> String {
    let contents = std::fs::read_to_string(path).ok();
    format_status(contents.as_deref(), format)
}

/// Run the status command - show current daemon state
fn run_status(config: &Config, follow: bool, format: StatusFormat) -> anyhow::Result<()> {
    let Some(state_path) = config.resolve_state_file() else {
        eprintln!("Error: state_file is not configured.");
        eprintln!();
        eprintln!("To enable status monitoring, add to your config.toml:");
        eprintln!();
        eprintln!("  state_file = \"auto\"");
        std::process::exit(1);
    };

    let status = read_status(&state_path, format);
    println!("{}", status);
    if !follow {
        return Ok(());
    }

    // Follow mode: watch for changes
    use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
    use std::sync::mpsc::channel;
    use std::time::Duration;

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        NotifyConfig::default().with_poll_interval(Duration::from_millis(100)),
    )?;

    // Watch the state file's parent directory (file may not exist yet)
    if let Some(parent) = state_path.parent() {
        std::fs::create_dir_all(parent)?;
        watcher.watch(parent, RecursiveMode::NonRecursive)?;
    }

    let mut last = status;

    loop {
        match rx.recv_timeout(Duration::from_millis(500)) {
            Ok(Ok(_)) | Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                let status = read_status(&state_path, format);
                if status != last {
                    println!("{}", status);
                    last = status;
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("Watch error: {:?}", e);
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                break;
            }
        }
    }

    Ok(())
}

/// Show current configuration
fn show_config(config: &Config) -> anyhow::Result<()> {
    println!("Current Configuration\n");
    println!("=====================\n");
    println!("{}", toml::to_string_pretty(config)?);

    println!("---");
    println!(
        "Config file: {:?}",
        Config::default_path().unwrap_or_else(|| PathBuf::from("(not found)"))
    );
    println!("Control socket: {:?}", config.resolve_socket());
    if let Some(state_file) = config.resolve_state_file() {
        println!("State file: {:?}", state_file);
    }
    println!(
        "Calibration profile: {:?}",
        config.resolve_calibration_profile()
    );

    Ok(())
}

/// Check tools, sensors and devices
async fn run_check(config: &Config, write_config: bool) -> anyhow::Result<()> {
    println!("Spin Check\n");
    println!("==========\n");

    let mut all_ok = true;

    if let Some(config_path) = Config::default_path() {
        if config_path.exists() {
            println!("Config file exists: {:?}", config_path);
        } else if write_config {
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&config_path, config::DEFAULT_CONFIG)?;
            println!("  ✓ Created: {:?}", config_path);
        } else {
            println!("No config file, using defaults (create one with: spin check --write-config)");
        }
    }

    println!("\nChecking tools...");
    for (tool, required) in [
        ("xrandr", true),
        ("xinput", true),
        ("xsetwacom", false),
        ("xinput_calibrator", false),
        ("notify-send", false),
    ] {
        match which::which(tool) {
            Ok(path) => println!("  ✓ {} found: {:?}", tool, path),
            Err(_) if required => {
                println!("  ✗ {} not found", tool);
                all_ok = false;
            }
            Err(_) => println!("  - {} not found (optional)", tool),
        }
    }

    println!("\nChecking accelerometer...");
    match IioAccelerometer::discover(&config.orientation.iio_dir) {
        Ok(accel) => println!("  ✓ Found at {:?}", accel.dir()),
        Err(e) => println!("  ✗ {} (automatic rotation unavailable)", e),
    }

    println!("\nChecking hinge events...");
    match config.hinge.backend {
        HingeBackend::Acpi => {
            if config.hinge.acpid_socket.exists() {
                println!("  ✓ acpid socket: {:?}", config.hinge.acpid_socket);
            } else {
                println!("  ✗ acpid socket not found: {:?}", config.hinge.acpid_socket);
                all_ok = false;
            }
        }
        HingeBackend::Evdev => match spin::hotkey::create_listener(&config.hinge) {
            Ok(_) => println!("  ✓ Tablet-mode switch found"),
            Err(e) => {
                println!("  ✗ {}", e);
                all_ok = false;
            }
        },
    }

    println!("\nChecking input devices...");
    let control = XorgControl::new(true, &config.calibration.command);
    match inventory::resolve(&control, &config.devices).await {
        Ok(devices) => {
            for role in Role::ALL {
                match devices.get(role) {
                    Some(name) => println!("  ✓ {}: {}", role, name),
                    None => println!("  - {}: not detected", role),
                }
            }
        }
        Err(e) => {
            println!("  ✗ {}", e);
            all_ok = false;
        }
    }

    println!("\nChecking daemon...");
    let socket = config.resolve_socket();
    if control::probe(&socket) {
        println!("  ✓ Running ({:?})", socket);
    } else {
        println!("  - Not running");
    }

    println!("\n---");
    if all_ok {
        println!("✓ All checks passed! Run 'spin' to start.");
    } else {
        println!("✗ Some checks failed. Please fix the issues above.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATE: &str =
        r#"{"mode":"tablet","orientation":"left","rotation_lock":false,"touch_enabled":true}"#;

    #[test]
    fn test_status_text() {
        assert_eq!(format_status(None, StatusFormat::Text), "stopped");
        let text = format_status(Some(STATE), StatusFormat::Text);
        assert!(text.starts_with("tablet left"));
    }

    #[test]
    fn test_status_json() {
        let json: serde_json::Value =
            serde_json::from_str(&format_status(Some(STATE), StatusFormat::Json)).unwrap();
        assert_eq!(json["class"], "tablet");
        assert_eq!(json["state"]["orientation"], "left");

        let json: serde_json::Value =
            serde_json::from_str(&format_status(Some("garbage"), StatusFormat::Json)).unwrap();
        assert_eq!(json["class"], "stopped");
    }
}
