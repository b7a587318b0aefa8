//! Sensor workers
//!
//! - [`orientation`]: accelerometer sampling and orientation classification
//! - [`proximity`]: stylus in/out edge detection
//!
//! Both run as independent tokio tasks that only publish into their own
//! [`Outbox`](crate::inbox::Outbox). They never see the daemon state.

pub mod accel;
pub mod orientation;
pub mod proximity;

use crate::error::SpinError;
use tokio::sync::mpsc;

/// Channel on which workers report errors that must stop the daemon
pub type FaultSender = mpsc::Sender<SpinError>;

pub use accel::{AccelSource, IioAccelerometer, Vector};
pub use orientation::OrientationSensor;
pub use proximity::ProximitySensor;
