//! X11 device control via xrandr, xinput and xsetwacom
//!
//! Requires:
//! - xrandr and xinput (x11-xserver-utils, xinput)
//! - xsetwacom (xserver-xorg-input-wacom) for the stylus area
//! - xinput_calibrator for `spin calibrate`

use super::DeviceControl;
use crate::calibration::StylusArea;
use crate::error::DeviceError;
use crate::state::Orientation;
use std::process::Stdio;
use tokio::process::Command;

/// xrandr/xinput/xsetwacom device control
pub struct XorgControl {
    /// Log mutating commands instead of running them
    dry_run: bool,
    /// Calibrator command split into words; `{device}` is substituted
    calibrator: Vec<String>,
}

impl XorgControl {
    pub fn new(dry_run: bool, calibrator: &str) -> Self {
        Self {
            dry_run,
            calibrator: calibrator.split_whitespace().map(String::from).collect(),
        }
    }

    /// Run a command that changes device state
    async fn apply(&self, program: &str, args: &[String]) -> Result<(), DeviceError> {
        if self.dry_run {
            tracing::info!("command: {}", display_command(program, args));
            return Ok(());
        }
        self.query(program, args).await.map(|_| ())
    }

    /// Run a command and return its stdout
    async fn query(&self, program: &str, args: &[String]) -> Result<String, DeviceError> {
        tracing::debug!("Running: {}", display_command(program, args));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DeviceError::NotFound(program.to_string())
                } else {
                    DeviceError::Failed {
                        command: display_command(program, args),
                        message: e.to_string(),
                    }
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeviceError::Failed {
                command: display_command(program, args),
                message: if stderr.trim().is_empty() {
                    output.status.to_string()
                } else {
                    stderr.trim().to_string()
                },
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait::async_trait]
impl DeviceControl for XorgControl {
    async fn list_devices(&self) -> Result<String, DeviceError> {
        self.query("xinput", &["--list".to_string()]).await
    }

    async fn rotate_display(&self, orientation: Orientation) -> Result<(), DeviceError> {
        tracing::info!("Change display to {}", orientation);
        self.apply("xrandr", &["-o".to_string(), orientation.to_string()])
            .await
    }

    async fn set_enabled(&self, device: &str, enabled: bool) -> Result<(), DeviceError> {
        let action = if enabled { "enable" } else { "disable" };
        tracing::info!("Change {:?} to {}", device, action);
        self.apply("xinput", &[action.to_string(), device.to_string()])
            .await
    }

    async fn set_transform(&self, device: &str, matrix: [f32; 9]) -> Result<(), DeviceError> {
        let mut args = vec![
            "set-prop".to_string(),
            device.to_string(),
            "Coordinate Transformation Matrix".to_string(),
        ];
        args.extend(matrix.iter().map(|v| v.to_string()));
        self.apply("xinput", &args).await
    }

    async fn set_stylus_area(
        &self,
        device: &str,
        area: Option<StylusArea>,
    ) -> Result<(), DeviceError> {
        let mut args = vec!["--set".to_string(), device.to_string()];
        match area {
            Some(area) => {
                args.push("Area".to_string());
                args.extend(
                    [area.min_x, area.min_y, area.max_x, area.max_y]
                        .iter()
                        .map(|v| v.to_string()),
                );
            }
            None => args.push("ResetArea".to_string()),
        }
        self.apply("xsetwacom", &args).await
    }

    async fn query_proximity(&self, device: &str) -> Result<String, DeviceError> {
        self.query("xinput", &["query-state".to_string(), device.to_string()])
            .await
    }

    async fn calibrate(&self, device: &str) -> Result<Option<StylusArea>, DeviceError> {
        let Some((program, args)) = self.calibrator.split_first() else {
            tracing::warn!("No calibration command configured");
            return Ok(None);
        };
        let args: Vec<String> = args.iter().map(|a| a.replace("{device}", device)).collect();

        if self.dry_run {
            tracing::info!("command: {}", display_command(program, &args));
            return Ok(None);
        }

        let output = self.query(program, &args).await?;
        Ok(StylusArea::from_calibrator_output(&output))
    }

    async fn notify(&self, title: &str, body: &str) {
        crate::notification::send(title, body).await;
    }

    fn name(&self) -> &'static str {
        "xorg"
    }
}

/// Render a command line for logs, quoting arguments with spaces
fn display_command(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        if arg.contains(' ') {
            line.push('"');
            line.push_str(arg);
            line.push('"');
        } else {
            line.push_str(arg);
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_command_quotes() {
        let line = display_command(
            "xinput",
            &["disable".to_string(), "TPPS/2 IBM TrackPoint".to_string()],
        );
        assert_eq!(line, r#"xinput disable "TPPS/2 IBM TrackPoint""#);
    }

    #[test]
    fn test_calibrator_words() {
        let control = XorgControl::new(true, "xinput_calibrator --device {device}");
        assert_eq!(
            control.calibrator,
            vec!["xinput_calibrator", "--device", "{device}"]
        );
    }

    #[tokio::test]
    async fn test_dry_run_skips_mutations() {
        let control = XorgControl::new(true, "definitely-not-a-calibrator {device}");
        control.rotate_display(Orientation::Left).await.unwrap();
        control.set_enabled("ELAN Touchscreen", false).await.unwrap();
        control
            .set_transform("ELAN Touchscreen", Orientation::Left.transform_matrix())
            .await
            .unwrap();
        control.set_stylus_area("Wacom", None).await.unwrap();
        assert_eq!(control.calibrate("Wacom").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_program() {
        let control = XorgControl::new(false, "definitely-not-a-calibrator {device}");
        let err = control.calibrate("Wacom").await.unwrap_err();
        assert!(matches!(err, DeviceError::NotFound(ref p) if p == "definitely-not-a-calibrator"));
    }
}
