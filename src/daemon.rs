//! Daemon module - main event loop orchestration
//!
//! Starts the workers (orientation sensor, stylus proximity, hinge
//! listener, control socket), then polls each worker's inbox on its own
//! timer and feeds what it finds to the mode engine.

use crate::calibration::CalibrationStore;
use crate::config::Config;
use crate::control::{self, ControlListener};
use crate::device::{self, DeviceControl};
use crate::engine::ModeEngine;
use crate::error::{Result, SpinError};
use crate::hotkey::{self, HingeEvent, HingeListener};
use crate::inbox::{self, Inbox, Outbox};
use crate::inventory::{self, Role};
use crate::sensor::{FaultSender, IioAccelerometer, OrientationSensor, ProximitySensor};
use crate::state::{Command, DaemonSnapshot, DaemonState, Orientation, Origin, Request};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Inbox polling cadences
const ORIENTATION_POLL: Duration = Duration::from_millis(100);
const CONTROL_POLL: Duration = Duration::from_millis(105);
const HINGE_POLL: Duration = Duration::from_millis(110);
const PROXIMITY_POLL: Duration = Duration::from_millis(150);

/// Write state to file for external integrations (status bars, scripts)
fn write_state_file(path: &Path, snapshot: &DaemonSnapshot) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create state file directory: {}", e);
            return;
        }
    }

    let json = match serde_json::to_string(snapshot) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!("Failed to serialize state: {}", e);
            return;
        }
    };

    if let Err(e) = std::fs::write(path, json) {
        tracing::warn!("Failed to write state file: {}", e);
    } else {
        tracing::trace!("State file updated: {}", snapshot);
    }
}

/// Remove state file on shutdown
fn cleanup_state_file(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove state file: {}", e);
        }
    }
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// The proximity worker, which `toggletouch` starts and stops at runtime
struct ProximityWorker {
    control: Arc<dyn DeviceControl>,
    stylus: Option<String>,
    config: Config,
    faults: FaultSender,
    outbox: Outbox<bool>,
    inbox: Inbox<bool>,
    task: Option<JoinHandle<()>>,
}

impl ProximityWorker {
    fn new(
        control: Arc<dyn DeviceControl>,
        stylus: Option<String>,
        config: &Config,
        faults: FaultSender,
    ) -> Self {
        let (outbox, inbox) = inbox::channel("proximity");
        Self {
            control,
            stylus,
            config: config.clone(),
            faults,
            outbox,
            inbox,
            task: None,
        }
    }

    fn start(&mut self) {
        if self.task.is_some() || !self.config.proximity.enabled {
            return;
        }
        let Some(stylus) = self.stylus.clone() else {
            return;
        };
        let sensor = ProximitySensor::new(
            self.control.clone(),
            stylus,
            Duration::from_millis(self.config.proximity.poll_interval_ms),
            self.config.daemon.on_unsupported,
            self.faults.clone(),
        );
        self.task = Some(tokio::spawn(sensor.run(self.outbox.clone())));
        tracing::info!("Stylus proximity control enabled");
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.inbox.clear();
            tracing::info!("Stylus proximity control disabled");
        }
    }

    fn take(&self) -> Option<bool> {
        self.inbox.take()
    }
}

/// What one poll of the inboxes produced
enum Polled {
    Request(Request),
    Proximity(bool),
}

/// Main daemon that orchestrates all components
pub struct Daemon {
    config: Config,
    control: Arc<dyn DeviceControl>,
    state_file_path: Option<PathBuf>,
    socket_path: PathBuf,
}

impl Daemon {
    /// Create a new daemon with the given configuration
    pub fn new(config: Config) -> Self {
        let control = device::create_control(&config);
        Self::with_control(config, control)
    }

    /// Create a daemon driving a specific device control
    pub fn with_control(config: Config, control: Arc<dyn DeviceControl>) -> Self {
        let state_file_path = config.resolve_state_file();
        let socket_path = config.resolve_socket();
        Self {
            config,
            control,
            state_file_path,
            socket_path,
        }
    }

    fn update_state(&self, snapshot: &DaemonSnapshot) {
        if let Some(ref path) = self.state_file_path {
            write_state_file(path, snapshot);
        }
    }

    /// Start the orientation worker if an accelerometer is present
    fn start_orientation(&self, workers: &mut Vec<JoinHandle<()>>) -> Option<Inbox<Orientation>> {
        if !self.config.orientation.enabled {
            tracing::info!("Orientation sensor disabled");
            return None;
        }
        match IioAccelerometer::discover(&self.config.orientation.iio_dir) {
            Ok(accel) => {
                let (outbox, inbox) = inbox::channel("orientation");
                let sensor = OrientationSensor::new(accel, &self.config.orientation);
                workers.push(tokio::spawn(sensor.run(outbox)));
                Some(inbox)
            }
            Err(e) => {
                tracing::warn!("{}; automatic rotation unavailable", e);
                None
            }
        }
    }

    /// Start the hinge listener; a missing backend is not fatal
    async fn start_hinge(&self) -> Option<(Box<dyn HingeListener>, Inbox<HingeEvent>)> {
        if !self.config.hinge.enabled {
            tracing::info!("Hinge listener disabled");
            return None;
        }
        let mut listener = match hotkey::create_listener(&self.config.hinge) {
            Ok(listener) => listener,
            Err(e) => {
                tracing::warn!("{}; laptop/tablet switching only via 'spin' commands", e);
                return None;
            }
        };
        let (outbox, inbox) = inbox::channel("hinge");
        match listener.start(outbox).await {
            Ok(()) => Some((listener, inbox)),
            Err(e) => {
                tracing::warn!("{}; laptop/tablet switching only via 'spin' commands", e);
                None
            }
        }
    }

    /// Run the daemon until SIGINT or SIGTERM
    pub async fn run(&mut self) -> Result<()> {
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| SpinError::Config(format!("Failed to set up SIGINT handler: {}", e)))?;
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| SpinError::Config(format!("Failed to set up SIGTERM handler: {}", e)))?;

        self.run_until(async move {
            tokio::select! {
                _ = sigint.recv() => tracing::info!("Received SIGINT, shutting down..."),
                _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down..."),
            }
        })
        .await
    }

    /// Run the daemon main loop until `shutdown` completes or a worker
    /// reports a fatal fault
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!("Starting spin daemon");
        tokio::pin!(shutdown);

        tracing::debug!("Device control: {}", self.control.name());
        let devices = inventory::resolve(self.control.as_ref(), &self.config.devices).await?;
        let socket = control::bind(&self.socket_path)?;

        if let Some(ref path) = self.state_file_path {
            tracing::info!("State file: {:?}", path);
        }

        let calibration = CalibrationStore::load(&self.config.resolve_calibration_profile());
        let stylus = devices.get(Role::Stylus).map(str::to_owned);
        let mut engine = ModeEngine::new(
            DaemonState::new(devices),
            self.control.clone(),
            calibration,
            &self.config,
        );

        let (fault_tx, mut fault_rx) = mpsc::channel::<SpinError>(4);
        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        let (control_outbox, control_inbox) = inbox::channel::<Command>("control");
        workers.push(tokio::spawn(ControlListener::new(socket).run(control_outbox)));

        let orientation_inbox = self.start_orientation(&mut workers);
        let mut hinge = self.start_hinge().await;

        let mut proximity =
            ProximityWorker::new(self.control.clone(), stylus, &self.config, fault_tx);
        if engine.state().touch_enabled {
            proximity.start();
        }

        let throttle = Duration::from_millis(self.config.daemon.throttle_ms);
        let mut orientation_tick = ticker(ORIENTATION_POLL);
        let mut control_tick = ticker(CONTROL_POLL);
        let mut hinge_tick = ticker(HINGE_POLL);
        let mut proximity_tick = ticker(PROXIMITY_POLL);

        self.update_state(&engine.snapshot());
        tracing::info!("Ready ({})", engine.snapshot());

        let mut fault: Option<SpinError> = None;

        loop {
            let polled = tokio::select! {
                _ = orientation_tick.tick() => orientation_inbox
                    .as_ref()
                    .and_then(Inbox::take)
                    .map(|o| Polled::Request(Request::sensor(o))),

                _ = control_tick.tick() => control_inbox
                    .take()
                    .map(|c| Polled::Request(Request::control(c))),

                _ = hinge_tick.tick() => hinge
                    .as_ref()
                    .and_then(|(_, inbox)| inbox.take())
                    .map(|e| Polled::Request(Request::new(e.command(), Origin::Hinge))),

                _ = proximity_tick.tick() => proximity.take().map(Polled::Proximity),

                Some(e) = fault_rx.recv() => {
                    tracing::error!("Fatal: {}", e);
                    fault = Some(e);
                    break;
                }

                _ = &mut shutdown => break,
            };

            match polled {
                Some(Polled::Request(request)) => {
                    let applied = engine.apply(request).await;
                    match applied.proximity {
                        Some(true) => proximity.start(),
                        Some(false) => proximity.stop(),
                        None => {}
                    }
                    self.update_state(&engine.snapshot());
                    if !applied.ignored {
                        tokio::time::sleep(throttle).await;
                    }
                }
                Some(Polled::Proximity(active)) => engine.on_proximity(active).await,
                None => {}
            }
        }

        // Cleanup
        engine.shutdown().await;

        if let Some((mut listener, _)) = hinge.take() {
            if let Err(e) = listener.stop().await {
                tracing::warn!("Failed to stop hinge listener: {}", e);
            }
        }
        proximity.stop();
        for worker in workers {
            worker.abort();
        }

        control::cleanup(&self.socket_path);
        if let Some(ref path) = self.state_file_path {
            cleanup_state_file(path);
        }

        tracing::info!("Daemon stopped");

        match fault {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
