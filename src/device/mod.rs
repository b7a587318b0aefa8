//! Device control module
//!
//! Everything the daemon does to the outside world goes through
//! [`DeviceControl`]: rotating the display, enabling and disabling input
//! devices, the touchscreen coordinate transform, the stylus area, plus the
//! two queries the workers need (device listing and stylus proximity).
//! Desktop notifications go through it as well.
//!
//! The X11 implementation shells out to xrandr, xinput and xsetwacom.

pub mod xorg;

use crate::calibration::StylusArea;
use crate::config::Config;
use crate::error::DeviceError;
use crate::state::Orientation;
use std::sync::Arc;

/// Trait for device-control implementations
#[async_trait::async_trait]
pub trait DeviceControl: Send + Sync {
    /// Full text dump of the input devices (`xinput --list`)
    async fn list_devices(&self) -> Result<String, DeviceError>;

    /// Rotate the display
    async fn rotate_display(&self, orientation: Orientation) -> Result<(), DeviceError>;

    /// Enable or disable an input device
    async fn set_enabled(&self, device: &str, enabled: bool) -> Result<(), DeviceError>;

    /// Set the touchscreen Coordinate Transformation Matrix
    async fn set_transform(&self, device: &str, matrix: [f32; 9]) -> Result<(), DeviceError>;

    /// Set the stylus input area, or reset it to the digitizer default
    async fn set_stylus_area(
        &self,
        device: &str,
        area: Option<StylusArea>,
    ) -> Result<(), DeviceError>;

    /// Raw output of the stylus state query (`xinput query-state`)
    async fn query_proximity(&self, device: &str) -> Result<String, DeviceError>;

    /// Run the interactive calibrator; `None` when it produced no area
    async fn calibrate(&self, device: &str) -> Result<Option<StylusArea>, DeviceError>;

    /// Show a desktop notification (best-effort)
    async fn notify(&self, title: &str, body: &str);

    /// Human-readable name for logging
    fn name(&self) -> &'static str;

    /// Whether `device` currently appears in the device listing.
    ///
    /// A failed listing counts as "not present yet".
    async fn is_present(&self, device: &str) -> bool {
        match self.list_devices().await {
            Ok(listing) => listing.contains(device),
            Err(e) => {
                tracing::debug!("Device listing failed, retrying: {}", e);
                false
            }
        }
    }
}

/// Factory function for the configured device control
pub fn create_control(config: &Config) -> Arc<dyn DeviceControl> {
    let control = xorg::XorgControl::new(config.daemon.dry_run, &config.calibration.command);
    if config.daemon.dry_run {
        tracing::info!("Dry run: device commands are logged, not executed");
    }
    Arc::new(control)
}
