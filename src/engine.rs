//! Mode engine
//!
//! Owns the [`DaemonState`] and turns requests into device commands. The
//! daemon loop is the only caller, so transitions never interleave: each
//! one is awaited to completion before the next inbox is looked at.
//!
//! Device failures are logged per sub-step; the remaining sub-steps of a
//! transition still run. Roles missing from the device map are skipped
//! silently.

use crate::calibration::CalibrationStore;
use crate::config::{Config, NotificationConfig};
use crate::device::DeviceControl;
use crate::error::DeviceError;
use crate::inventory::Role;
use crate::notification;
use crate::state::{Command, DaemonSnapshot, DaemonState, Mode, Orientation, Origin, Request};
use std::sync::Arc;
use std::time::Duration;

/// How often the device listing is polled while the touchscreen reconnects
pub const RECONNECT_POLL: Duration = Duration::from_millis(500);

/// How long shutdown waits for the touchscreen before giving up on it
pub const SHUTDOWN_RECONNECT_WAIT: Duration = Duration::from_secs(3);

/// What the daemon has to do after a request was handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    /// The request was dropped without touching any device
    pub ignored: bool,
    /// Start (`Some(true)`) or stop (`Some(false)`) the proximity worker
    pub proximity: Option<bool>,
}

impl Applied {
    fn done() -> Self {
        Self::default()
    }

    fn ignored() -> Self {
        Self {
            ignored: true,
            proximity: None,
        }
    }
}

/// The mode state machine
pub struct ModeEngine {
    state: DaemonState,
    control: Arc<dyn DeviceControl>,
    calibration: CalibrationStore,
    tablet_orientation: Option<Orientation>,
    notifications: NotificationConfig,
    reconnect_poll: Duration,
    /// Unbounded while running; set by `shutdown`
    reconnect_limit: Option<Duration>,
    shutdown_wait: Duration,
}

impl ModeEngine {
    pub fn new(
        state: DaemonState,
        control: Arc<dyn DeviceControl>,
        calibration: CalibrationStore,
        config: &Config,
    ) -> Self {
        Self {
            state,
            control,
            calibration,
            tablet_orientation: config.tablet.orientation.fixed(),
            notifications: config.notification.clone(),
            reconnect_poll: RECONNECT_POLL,
            reconnect_limit: None,
            shutdown_wait: SHUTDOWN_RECONNECT_WAIT,
        }
    }

    /// Override the touchscreen reconnect poll interval
    pub fn with_reconnect_poll(mut self, interval: Duration) -> Self {
        self.reconnect_poll = interval;
        self
    }

    /// Override how long shutdown waits for the touchscreen
    pub fn with_shutdown_wait(mut self, limit: Duration) -> Self {
        self.shutdown_wait = limit;
        self
    }

    pub fn state(&self) -> &DaemonState {
        &self.state
    }

    pub fn snapshot(&self) -> DaemonSnapshot {
        self.state.snapshot()
    }

    pub fn calibration(&self) -> &CalibrationStore {
        &self.calibration
    }

    /// Handle one request
    pub async fn apply(&mut self, request: Request) -> Applied {
        tracing::info!("Engage {} ({:?})", request.command, request.origin);

        match request.command {
            Command::Toggle => {
                self.set_mode(self.state.mode.flipped()).await;
                Applied::done()
            }
            Command::SetMode(mode) => {
                self.set_mode(mode).await;
                Applied::done()
            }
            Command::SetOrientation(orientation) => {
                if request.origin == Origin::Sensor && self.state.rotation_lock {
                    tracing::debug!("Rotation locked, ignoring {}", orientation);
                    return Applied::ignored();
                }
                self.set_orientation(orientation).await;
                Applied::done()
            }
            Command::ToggleLock => {
                self.set_lock(!self.state.rotation_lock).await;
                Applied::done()
            }
            Command::SetLock(locked) => {
                self.set_lock(locked).await;
                Applied::done()
            }
            Command::ToggleTouch => {
                let enabled = self.toggle_touch().await;
                Applied {
                    ignored: false,
                    proximity: Some(enabled),
                }
            }
            Command::Calibrate => {
                if !self.state.devices.contains(Role::Stylus) {
                    tracing::warn!("No stylus found, nothing to calibrate");
                    return Applied::ignored();
                }
                self.calibrate().await;
                Applied::done()
            }
        }
    }

    /// Stylus proximity edge: the touchscreen is off while the pen is near
    pub async fn on_proximity(&mut self, active: bool) {
        if !self.state.touch_enabled {
            tracing::debug!("Touch disabled, ignoring stylus proximity");
            return;
        }
        self.switch(Role::Touchscreen, !active).await;
    }

    /// Leave the machine in laptop mode, normal orientation.
    ///
    /// Best effort: the X server may already be gone, so the touchscreen
    /// wait is bounded here.
    pub async fn shutdown(&mut self) {
        if self.state.mode == Mode::Tablet || self.state.orientation != Orientation::Normal {
            tracing::info!("Restoring laptop mode before exit");
            self.reconnect_limit = Some(self.shutdown_wait);
            self.set_mode(Mode::Laptop).await;
        }
    }

    async fn set_mode(&mut self, mode: Mode) {
        let previous = self.state.mode;
        self.state.mode = mode;

        match mode {
            Mode::Tablet => {
                tracing::info!("Tablet mode");
                self.switch(Role::Trackpoint, false).await;
                self.switch(Role::Touchpad, false).await;
                match self.tablet_orientation {
                    None => self.state.rotation_lock = false,
                    Some(orientation) => self.set_orientation(orientation).await,
                }
            }
            Mode::Laptop => {
                tracing::info!("Laptop mode");
                self.state.rotation_lock = true;
                self.switch(Role::Touchpad, true).await;
                self.switch(Role::Trackpoint, true).await;
                self.set_orientation(Orientation::Normal).await;
            }
        }

        if previous != mode && self.notifications.on_mode_change {
            let body = format!("Switched to {} mode", mode);
            self.control.notify("Spin", &body).await;
        }
    }

    async fn set_orientation(&mut self, orientation: Orientation) {
        self.state.orientation = orientation;
        log_failure(
            "display rotation",
            self.control.rotate_display(orientation).await,
        );

        if let Some(touchscreen) = self.device(Role::Touchscreen) {
            if self.wait_for(&touchscreen).await {
                log_failure(
                    "touchscreen transform",
                    self.control
                        .set_transform(&touchscreen, orientation.transform_matrix())
                        .await,
                );
            } else {
                tracing::warn!("{:?} did not come back, transform skipped", touchscreen);
            }
        }

        if let Some(stylus) = self.device(Role::Stylus) {
            let area = self.calibration.area(orientation);
            log_failure(
                "stylus area",
                self.control.set_stylus_area(&stylus, area).await,
            );
        }
    }

    async fn set_lock(&mut self, locked: bool) {
        self.state.rotation_lock = locked;
        tracing::info!(
            "Rotation lock {}",
            if locked { "enabled" } else { "disabled" }
        );
        if self.notifications.on_rotation_lock {
            let (title, body) = notification::rotation_lock_message(locked);
            self.control.notify(title, body).await;
        }
    }

    /// Flip touch enablement; returns the new value
    async fn toggle_touch(&mut self) -> bool {
        let enabled = !self.state.touch_enabled;
        self.state.touch_enabled = enabled;
        tracing::info!("Touch {}", if enabled { "enabled" } else { "disabled" });
        self.switch(Role::Touchscreen, enabled).await;
        enabled
    }

    async fn calibrate(&mut self) {
        let Some(stylus) = self.device(Role::Stylus) else {
            return;
        };
        let orientation = self.state.orientation;

        let area = match self.control.calibrate(&stylus).await {
            Ok(Some(area)) => area,
            Ok(None) => {
                tracing::warn!("Calibrator reported no stylus area");
                return;
            }
            Err(e) => {
                tracing::warn!("Calibration failed: {}", e);
                return;
            }
        };

        tracing::info!("Calibrated {} area: {}", orientation, area);
        if let Err(e) = self.calibration.update(orientation, area) {
            tracing::warn!("Failed to save calibration profile: {}", e);
        }
        log_failure(
            "stylus area",
            self.control.set_stylus_area(&stylus, Some(area)).await,
        );
    }

    /// Enable or disable the device behind `role`, if there is one
    async fn switch(&self, role: Role, enabled: bool) {
        if let Some(device) = self.state.devices.get(role) {
            log_failure(
                &format!("{} switch", role),
                self.control.set_enabled(device, enabled).await,
            );
        }
    }

    /// Wait until `device` shows up in the listing again; false if the
    /// shutdown limit ran out first
    async fn wait_for(&self, device: &str) -> bool {
        let wait = async {
            let mut announced = false;
            while !self.control.is_present(device).await {
                if !announced {
                    tracing::info!("Waiting for {:?} to respond", device);
                    announced = true;
                }
                tokio::time::sleep(self.reconnect_poll).await;
            }
        };

        match self.reconnect_limit {
            None => {
                wait.await;
                true
            }
            Some(limit) => tokio::time::timeout(limit, wait).await.is_ok(),
        }
    }

    fn device(&self, role: Role) -> Option<String> {
        self.state.devices.get(role).map(str::to_owned)
    }
}

fn log_failure(step: &str, result: Result<(), DeviceError>) {
    if let Err(e) = result {
        tracing::warn!("{} failed: {}", step, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{CalibrationProfile, StylusArea};
    use crate::inventory::DeviceMap;
    use std::sync::Mutex;

    /// Records mutating calls; listing always shows every device
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        calibrated: Option<StylusArea>,
    }

    impl Recorder {
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.calls.lock().unwrap())
        }

        fn push(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait::async_trait]
    impl DeviceControl for Recorder {
        async fn list_devices(&self) -> Result<String, DeviceError> {
            Ok("touch pad point pen".to_string())
        }
        async fn rotate_display(&self, o: Orientation) -> Result<(), DeviceError> {
            self.push(format!("rotate {}", o));
            Ok(())
        }
        async fn set_enabled(&self, device: &str, enabled: bool) -> Result<(), DeviceError> {
            self.push(format!("{} {}", device, if enabled { "on" } else { "off" }));
            Ok(())
        }
        async fn set_transform(&self, device: &str, _m: [f32; 9]) -> Result<(), DeviceError> {
            self.push(format!("transform {}", device));
            Ok(())
        }
        async fn set_stylus_area(
            &self,
            device: &str,
            area: Option<StylusArea>,
        ) -> Result<(), DeviceError> {
            match area {
                Some(a) => self.push(format!("area {} {}", device, a)),
                None => self.push(format!("reset {}", device)),
            }
            Ok(())
        }
        async fn query_proximity(&self, _device: &str) -> Result<String, DeviceError> {
            Ok("Proximity=out".to_string())
        }
        async fn calibrate(&self, _device: &str) -> Result<Option<StylusArea>, DeviceError> {
            Ok(self.calibrated)
        }
        async fn notify(&self, title: &str, _body: &str) {
            self.push(format!("notify {}", title));
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    fn devices() -> DeviceMap {
        DeviceMap::new()
            .with(Role::Touchscreen, "touch")
            .with(Role::Touchpad, "pad")
            .with(Role::Trackpoint, "point")
            .with(Role::Stylus, "pen")
    }

    fn engine(recorder: Arc<Recorder>) -> ModeEngine {
        ModeEngine::new(
            DaemonState::new(devices()),
            recorder,
            CalibrationStore::in_memory(CalibrationProfile::default()),
            &Config::default(),
        )
    }

    #[tokio::test]
    async fn test_tablet_unlocks_rotation() {
        let recorder = Arc::new(Recorder::default());
        let mut engine = engine(recorder.clone());

        engine.apply(Request::control(Command::Toggle)).await;
        assert_eq!(engine.state().mode, Mode::Tablet);
        assert!(!engine.state().rotation_lock);
        assert_eq!(recorder.take(), ["point off", "pad off"]);
    }

    #[tokio::test]
    async fn test_fixed_tablet_orientation() {
        let recorder = Arc::new(Recorder::default());
        let mut config = Config::default();
        config.tablet.orientation = crate::config::TabletOrientation::Inverted;
        let mut engine = ModeEngine::new(
            DaemonState::new(devices()),
            recorder.clone(),
            CalibrationStore::in_memory(CalibrationProfile::default()),
            &config,
        );

        engine.apply(Request::control(Command::SetMode(Mode::Tablet))).await;
        assert!(engine.state().rotation_lock);
        assert_eq!(engine.state().orientation, Orientation::Inverted);
        assert_eq!(
            recorder.take(),
            [
                "point off",
                "pad off",
                "rotate inverted",
                "transform touch",
                "reset pen"
            ]
        );
    }

    #[tokio::test]
    async fn test_sensor_gated_by_lock() {
        let recorder = Arc::new(Recorder::default());
        let mut engine = engine(recorder.clone());

        let applied = engine.apply(Request::sensor(Orientation::Left)).await;
        assert!(applied.ignored);
        assert_eq!(engine.state().orientation, Orientation::Normal);
        assert!(recorder.take().is_empty());

        // a client may still rotate a locked screen
        let applied = engine
            .apply(Request::control(Command::SetOrientation(Orientation::Left)))
            .await;
        assert!(!applied.ignored);
        assert_eq!(engine.state().orientation, Orientation::Left);
    }

    #[tokio::test]
    async fn test_lock_notifies() {
        let recorder = Arc::new(Recorder::default());
        let mut engine = engine(recorder.clone());

        engine.apply(Request::control(Command::ToggleLock)).await;
        assert!(!engine.state().rotation_lock);
        engine.apply(Request::control(Command::SetLock(true))).await;
        assert!(engine.state().rotation_lock);
        assert_eq!(recorder.take(), ["notify Rotation lock", "notify Rotation lock"]);
    }

    #[tokio::test]
    async fn test_proximity_edges() {
        let recorder = Arc::new(Recorder::default());
        let mut engine = engine(recorder.clone());

        engine.on_proximity(true).await;
        engine.on_proximity(false).await;
        assert_eq!(recorder.take(), ["touch off", "touch on"]);

        engine.apply(Request::control(Command::ToggleTouch)).await;
        recorder.take();
        engine.on_proximity(false).await;
        assert!(recorder.take().is_empty());
    }

    #[tokio::test]
    async fn test_calibrate_stores_area() {
        let area = StylusArea::new(10, 20, 27000, 15000);
        let recorder = Arc::new(Recorder {
            calibrated: Some(area),
            ..Recorder::default()
        });
        let mut engine = engine(recorder.clone());

        engine.apply(Request::control(Command::Calibrate)).await;
        assert_eq!(engine.calibration().area(Orientation::Normal), Some(area));
        assert_eq!(recorder.take(), [format!("area pen {}", area)]);

        // rotating back to normal reapplies the stored area
        engine
            .apply(Request::control(Command::SetOrientation(Orientation::Normal)))
            .await;
        assert_eq!(recorder.take().last(), Some(&format!("area pen {}", area)));
    }

    #[tokio::test]
    async fn test_shutdown_restores_laptop() {
        let recorder = Arc::new(Recorder::default());
        let mut engine = engine(recorder.clone());

        engine.shutdown().await;
        assert!(recorder.take().is_empty());

        engine.apply(Request::control(Command::Toggle)).await;
        recorder.take();
        engine.shutdown().await;
        assert_eq!(engine.state().mode, Mode::Laptop);
        assert!(engine.state().rotation_lock);
        assert!(!recorder.take().is_empty());
    }
}
