//! IIO accelerometer access
//!
//! The kernel exposes the accelerometer under
//! `/sys/bus/iio/devices/iio:deviceN/` with a `name` of `accel_3d`, a
//! `in_accel_scale` factor and one `in_accel_{x,y,z}_raw` file per axis.
//! Readings are polled; IIO does not notify on change here. Discovery runs
//! once at startup and reads synchronously; per-cycle reads go through
//! `tokio::fs`.

use crate::error::SensorError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A 3-axis acceleration reading, already scaled
pub type Vector = [f64; 3];

/// Source of acceleration readings
#[async_trait]
pub trait AccelSource: Send {
    async fn read(&mut self) -> Result<Vector, SensorError>;
}

/// accel_3d device in IIO sysfs
#[derive(Debug, Clone)]
pub struct IioAccelerometer {
    dir: PathBuf,
    scale: f64,
}

impl IioAccelerometer {
    /// Find the accel_3d device under `iio_dir` and read its scale
    pub fn discover(iio_dir: &Path) -> Result<Self, SensorError> {
        let entries = std::fs::read_dir(iio_dir).map_err(|source| SensorError::Read {
            path: iio_dir.to_path_buf(),
            source,
        })?;

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("iio:device"))
                    .unwrap_or(false)
            })
            .collect();
        candidates.sort();

        let dir = candidates
            .into_iter()
            .find(|dir| {
                std::fs::read_to_string(dir.join("name"))
                    .map(|name| name.contains("accel_3d"))
                    .unwrap_or(false)
            })
            .ok_or_else(|| SensorError::NoAccelerometer(iio_dir.to_path_buf()))?;

        let scale_path = dir.join("in_accel_scale");
        let raw = std::fs::read_to_string(&scale_path).map_err(|source| SensorError::Read {
            path: scale_path.clone(),
            source,
        })?;
        let scale = parse_value(&scale_path, &raw)?;
        tracing::info!("Accelerometer found at {:?} (scale {})", dir, scale);

        Ok(Self { dir, scale })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl AccelSource for IioAccelerometer {
    async fn read(&mut self) -> Result<Vector, SensorError> {
        let x = read_value(&self.dir.join("in_accel_x_raw")).await?;
        let y = read_value(&self.dir.join("in_accel_y_raw")).await?;
        let z = read_value(&self.dir.join("in_accel_z_raw")).await?;
        Ok([x * self.scale, y * self.scale, z * self.scale])
    }
}

/// Read a single numeric sysfs value
async fn read_value(path: &Path) -> Result<f64, SensorError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SensorError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_value(path, &raw)
}

fn parse_value(path: &Path, raw: &str) -> Result<f64, SensorError> {
    raw.trim().parse::<f64>().map_err(|_| SensorError::Parse {
        path: path.to_path_buf(),
        value: raw.trim().to_string(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Lay out a fake IIO device directory
    pub(crate) fn fake_device(root: &Path, index: u32, name: &str, scale: &str, raw: [&str; 3]) {
        let dir = root.join(format!("iio:device{}", index));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("name"), format!("{}\n", name)).unwrap();
        std::fs::write(dir.join("in_accel_scale"), format!("{}\n", scale)).unwrap();
        for (axis, value) in ["x", "y", "z"].iter().zip(raw) {
            std::fs::write(dir.join(format!("in_accel_{}_raw", axis)), format!("{}\n", value))
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_discover_and_read() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("iio:device0")).unwrap();
        std::fs::write(root.path().join("iio:device0/name"), "als\n").unwrap();
        fake_device(root.path(), 1, "accel_3d", "0.5", ["2", "-20", "4"]);

        let mut accel = IioAccelerometer::discover(root.path()).unwrap();
        assert!(accel.dir().ends_with("iio:device1"));
        assert_eq!(accel.read().await.unwrap(), [1.0, -10.0, 2.0]);
    }

    #[tokio::test]
    async fn test_read_follows_updates() {
        let root = tempfile::tempdir().unwrap();
        fake_device(root.path(), 0, "accel_3d", "1", ["0", "-9", "0"]);
        let mut accel = IioAccelerometer::discover(root.path()).unwrap();
        assert_eq!(accel.read().await.unwrap(), [0.0, -9.0, 0.0]);

        std::fs::write(root.path().join("iio:device0/in_accel_x_raw"), "9\n").unwrap();
        std::fs::write(root.path().join("iio:device0/in_accel_y_raw"), "0\n").unwrap();
        assert_eq!(accel.read().await.unwrap(), [9.0, 0.0, 0.0]);
    }

    #[test]
    fn test_no_accelerometer() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("iio:device0")).unwrap();
        std::fs::write(root.path().join("iio:device0/name"), "gyro_3d\n").unwrap();

        let err = IioAccelerometer::discover(root.path()).unwrap_err();
        assert!(matches!(err, SensorError::NoAccelerometer(_)));
    }

    #[tokio::test]
    async fn test_garbage_value() {
        let root = tempfile::tempdir().unwrap();
        fake_device(root.path(), 0, "accel_3d", "1", ["x", "0", "0"]);
        let mut accel = IioAccelerometer::discover(root.path()).unwrap();
        assert!(matches!(accel.read().await, Err(SensorError::Parse { .. })));
    }
}
