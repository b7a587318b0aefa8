//! Orientation sensor worker
//!
//! Each cycle averages a handful of accelerometer readings and picks the
//! canonical gravity direction with the highest cosine similarity to the
//! mean. Averaging smooths out shaking; cosine similarity ignores the
//! magnitude of the reading, so the sensor's scale does not matter, but a
//! tilt beyond 45 degrees off-axis flips the result.
//!
//! A (near) zero mean vector has no direction; every similarity is NaN and
//! the classification is arbitrary. That is a known limitation and is not
//! corrected.

use super::accel::{AccelSource, Vector};
use crate::config::OrientationConfig;
use crate::error::SensorError;
use crate::inbox::Outbox;
use crate::state::Orientation;
use std::cmp::Ordering;
use std::time::Duration;

/// Gravity direction for each orientation, in accelerometer axes
pub fn reference(orientation: Orientation) -> Vector {
    match orientation {
        Orientation::Normal => [0.0, -1.0, 0.0],
        Orientation::Inverted => [0.0, 1.0, 0.0],
        Orientation::Left => [1.0, 0.0, 0.0],
        Orientation::Right => [-1.0, 0.0, 0.0],
    }
}

fn dot(a: &Vector, b: &Vector) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &Vector) -> f64 {
    dot(v, v).sqrt()
}

/// Cosine similarity of `v` with every reference direction
pub fn similarities(v: &Vector) -> [(Orientation, f64); 4] {
    Orientation::ALL.map(|o| {
        let r = reference(o);
        (o, dot(v, &r) / (norm(v) * norm(&r)))
    })
}

/// Nearest reference direction to `v`
pub fn classify(v: &Vector) -> Orientation {
    similarities(v)
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        .map(|(o, _)| o)
        .unwrap_or_default()
}

/// Element-wise mean of the readings
pub fn mean(readings: &[Vector]) -> Option<Vector> {
    if readings.is_empty() {
        return None;
    }
    let n = readings.len() as f64;
    let mut sum = [0.0; 3];
    for reading in readings {
        for (acc, value) in sum.iter_mut().zip(reading) {
            *acc += value;
        }
    }
    Some(sum.map(|s| s / n))
}

/// Accelerometer worker that publishes orientation changes
pub struct OrientationSensor<S> {
    source: S,
    samples: usize,
    sample_interval: Duration,
    cycle_pause: Duration,
    previous: Orientation,
}

impl<S: AccelSource> OrientationSensor<S> {
    pub fn new(source: S, config: &OrientationConfig) -> Self {
        Self {
            source,
            samples: config.samples.max(1),
            sample_interval: Duration::from_millis(config.sample_interval_ms),
            cycle_pause: Duration::from_millis(config.cycle_pause_ms),
            previous: Orientation::Normal,
        }
    }

    /// Classify a smoothed reading; `Some` only when it differs from the last one
    pub fn observe(&mut self, smoothed: &Vector) -> Option<Orientation> {
        let orientation = classify(smoothed);
        if orientation == self.previous {
            return None;
        }
        self.previous = orientation;
        Some(orientation)
    }

    /// Take one cycle's worth of readings and average them
    async fn sample(&mut self) -> Result<Vector, SensorError> {
        let mut readings = Vec::with_capacity(self.samples);
        for _ in 0..self.samples {
            tokio::time::sleep(self.sample_interval).await;
            readings.push(self.source.read().await?);
        }
        Ok(mean(&readings).unwrap_or_default())
    }

    /// Run until the inbox is dropped
    pub async fn run(mut self, outbox: Outbox<Orientation>) {
        tracing::debug!("Orientation sensor started");
        loop {
            match self.sample().await {
                Ok(smoothed) => {
                    tracing::trace!("Stable acceleration vector: {:?}", smoothed);
                    if let Some(orientation) = self.observe(&smoothed) {
                        tracing::debug!("Orientation changed to {}", orientation);
                        if !outbox.publish(orientation) {
                            return;
                        }
                    }
                }
                Err(e) => tracing::warn!("Accelerometer read failed: {}", e),
            }
            tokio::time::sleep(self.cycle_pause).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<Result<Vector, SensorError>>);

    #[async_trait::async_trait]
    impl AccelSource for Scripted {
        async fn read(&mut self) -> Result<Vector, SensorError> {
            self.0
                .pop_front()
                .unwrap_or(Err(SensorError::Query("script exhausted".into())))
        }
    }

    fn sensor(readings: Vec<Vector>) -> OrientationSensor<Scripted> {
        let config = OrientationConfig {
            samples: 2,
            sample_interval_ms: 0,
            cycle_pause_ms: 0,
            ..OrientationConfig::default()
        };
        OrientationSensor::new(Scripted(readings.into_iter().map(Ok).collect()), &config)
    }

    #[test]
    fn test_aligned_vectors_classify_exactly() {
        for orientation in Orientation::ALL {
            let v = reference(orientation).map(|x| x * 9.81);
            assert_eq!(classify(&v), orientation);
            for (o, similarity) in similarities(&v) {
                if o == orientation {
                    assert!((similarity - 1.0).abs() < 1e-12);
                } else {
                    assert!(similarity <= 1.0);
                }
            }
        }
    }

    #[test]
    fn test_magnitude_does_not_matter() {
        assert_eq!(classify(&[0.2, -0.9, 0.3]), Orientation::Normal);
        assert_eq!(classify(&[2.0, -9.0, 3.0]), Orientation::Normal);
        assert_eq!(classify(&[-700.0, 100.0, 50.0]), Orientation::Right);
    }

    #[test]
    fn test_tilt_picks_nearest_axis() {
        // 30 degrees off Left towards Inverted
        assert_eq!(classify(&[0.866, 0.5, 0.0]), Orientation::Left);
        // past 45 degrees
        assert_eq!(classify(&[0.5, 0.866, 0.0]), Orientation::Inverted);
    }

    #[test]
    fn test_mean() {
        let m = mean(&[[1.0, 2.0, 3.0], [3.0, 4.0, 5.0]]).unwrap();
        assert_eq!(m, [2.0, 3.0, 4.0]);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_observe_emits_only_on_change() {
        let mut s = sensor(vec![]);
        assert_eq!(s.observe(&[0.0, -9.8, 0.0]), None);
        assert_eq!(s.observe(&[9.8, 0.0, 0.0]), Some(Orientation::Left));
        assert_eq!(s.observe(&[9.5, 0.4, 0.0]), None);
        assert_eq!(s.observe(&[0.0, -9.8, 0.0]), Some(Orientation::Normal));
    }

    #[tokio::test]
    async fn test_sample_averages_readings() {
        let mut s = sensor(vec![[8.0, 2.0, 0.0], [10.0, -2.0, 0.0]]);
        assert_eq!(s.sample().await.unwrap(), [9.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_run_publishes_change() {
        // one cycle pointing left, then the script runs dry and cycles fail
        let s = sensor(vec![[9.8, 0.0, 0.0], [9.6, 0.1, 0.0]]);
        let (tx, rx) = crate::inbox::channel("orientation");
        let task = tokio::spawn(s.run(tx));

        let mut seen = None;
        for _ in 0..100 {
            if let Some(o) = rx.take() {
                seen = Some(o);
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        task.abort();
        assert_eq!(seen, Some(Orientation::Left));
    }
}
