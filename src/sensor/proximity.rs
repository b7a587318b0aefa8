//! Stylus proximity worker
//!
//! Polls `xinput query-state` for the stylus and publishes `true` when the
//! pen comes into range and `false` when it leaves. Only edges are
//! published; the first successful poll always is.

use super::FaultSender;
use crate::config::UnsupportedPolicy;
use crate::device::DeviceControl;
use crate::error::SensorError;
use crate::inbox::Outbox;
use std::sync::Arc;
use std::time::Duration;

/// Parse the `Proximity=in|out` field of an `xinput query-state` dump
pub fn parse_status(output: &str) -> Result<bool, SensorError> {
    let status = output
        .split_whitespace()
        .find_map(|token| token.strip_prefix("Proximity="))
        .ok_or_else(|| SensorError::Query("no Proximity field in device state".to_string()))?;

    match status.to_lowercase().as_str() {
        "in" => Ok(true),
        "out" => Ok(false),
        other => Err(SensorError::UnsupportedStatus(other.to_string())),
    }
}

/// Edge detector over successive proximity polls
#[derive(Debug, Default)]
pub struct ProximityEdge {
    previous: Option<bool>,
}

impl ProximityEdge {
    /// `Some(active)` when `active` differs from the previous poll
    pub fn observe(&mut self, active: bool) -> Option<bool> {
        if self.previous == Some(active) {
            return None;
        }
        self.previous = Some(active);
        Some(active)
    }
}

/// Stylus proximity polling worker
pub struct ProximitySensor {
    control: Arc<dyn DeviceControl>,
    stylus: String,
    interval: Duration,
    policy: UnsupportedPolicy,
    faults: FaultSender,
}

impl ProximitySensor {
    pub fn new(
        control: Arc<dyn DeviceControl>,
        stylus: impl Into<String>,
        interval: Duration,
        policy: UnsupportedPolicy,
        faults: FaultSender,
    ) -> Self {
        Self {
            control,
            stylus: stylus.into(),
            interval,
            policy,
            faults,
        }
    }

    async fn poll(&self) -> Result<bool, SensorError> {
        let output = self
            .control
            .query_proximity(&self.stylus)
            .await
            .map_err(|e| SensorError::Query(e.to_string()))?;
        parse_status(&output)
    }

    /// Run until the inbox is dropped or a fatal fault is reported
    pub async fn run(self, outbox: Outbox<bool>) {
        tracing::debug!("Stylus proximity control started for {:?}", self.stylus);
        let mut edge = ProximityEdge::default();

        loop {
            match self.poll().await {
                Ok(active) => {
                    if let Some(active) = edge.observe(active) {
                        tracing::debug!("Stylus {}", if active { "active" } else { "inactive" });
                        if !outbox.publish(active) {
                            return;
                        }
                    }
                }
                Err(e @ SensorError::UnsupportedStatus(_)) => match self.policy {
                    UnsupportedPolicy::Skip => tracing::warn!("{}, skipping", e),
                    UnsupportedPolicy::Exit => {
                        tracing::error!("{}", e);
                        let _ = self.faults.send(e.into()).await;
                        return;
                    }
                },
                Err(e) => tracing::warn!("Stylus proximity query failed: {}", e),
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATE_IN: &str = "2 classes :\nButtonClass\n\tbutton[1]=up\n\
        ValuatorClass Mode=Absolute Proximity=In\n\tvaluator[0]=12034\n";

    #[test]
    fn test_parse_status() {
        assert!(parse_status(STATE_IN).unwrap());
        assert!(!parse_status("ValuatorClass Mode=Absolute Proximity=Out").unwrap());
    }

    #[test]
    fn test_parse_unsupported_status() {
        let err = parse_status("Proximity=Hovering").unwrap_err();
        assert!(matches!(err, SensorError::UnsupportedStatus(ref s) if s == "hovering"));
    }

    #[test]
    fn test_parse_missing_field() {
        let err = parse_status("unable to find device Wacom").unwrap_err();
        assert!(matches!(err, SensorError::Query(_)));
    }

    #[test]
    fn test_first_poll_always_emits() {
        let mut edge = ProximityEdge::default();
        assert_eq!(edge.observe(false), Some(false));

        let mut edge = ProximityEdge::default();
        assert_eq!(edge.observe(true), Some(true));
    }

    #[test]
    fn test_emits_iff_state_differs() {
        let polls = [false, false, true, true, true, false, true, false, false];
        let mut edge = ProximityEdge::default();
        let mut previous: Option<bool> = None;
        for poll in polls {
            let emitted = edge.observe(poll);
            if previous != Some(poll) {
                assert_eq!(emitted, Some(poll));
            } else {
                assert_eq!(emitted, None);
            }
            previous = Some(poll);
        }
    }
}
