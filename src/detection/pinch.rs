// src/detection/pinch.rs
//! Synchronized thumb/index pinch detector
//!
//! Both fingertip force channels must cross their thresholds within a short
//! sync window of each other. One event fires per pinch, and pinches closer
//! together than the cooldown are swallowed.

use crate::config::constants::calibration::DEFAULT_DETECTION_THRESHOLD;
use crate::config::constants::detection::*;
use crate::detection::edge::{Cooldown, RisingEdge};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pinch timing settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinchConfig {
    /// Max gap between the two threshold crossings
    #[serde(default = "defaults::sync_window_s")]
    pub sync_window_s: f64,
    /// Min time between two events
    #[serde(default = "defaults::cooldown_s")]
    pub cooldown_s: f64,
}

mod defaults {
    use crate::config::constants::detection::*;

    pub fn sync_window_s() -> f64 { DEFAULT_SYNC_WINDOW_S }
    pub fn cooldown_s() -> f64 { DEFAULT_COOLDOWN_S }
}

impl Default for PinchConfig {
    fn default() -> Self {
        Self {
            sync_window_s: DEFAULT_SYNC_WINDOW_S,
            cooldown_s: DEFAULT_COOLDOWN_S,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PinchEvent {
    /// Session time in seconds
    pub time: f64,
    /// Weaker of the two normalized forces
    pub strength: f64,
}

#[derive(Debug, Clone)]
pub struct PinchDetector {
    config: PinchConfig,
    thumb_threshold: f64,
    index_threshold: f64,
    thumb_since: Option<f64>,
    index_since: Option<f64>,
    edge: RisingEdge,
    cooldown: Cooldown,
    pub thumb_active: bool,
    pub index_active: bool,
    pub pinch_active: bool,
}

impl PinchDetector {
    pub fn new(config: PinchConfig) -> Self {
        Self {
            config,
            thumb_threshold: DEFAULT_DETECTION_THRESHOLD,
            index_threshold: DEFAULT_DETECTION_THRESHOLD,
            thumb_since: None,
            index_since: None,
            edge: RisingEdge::new(),
            cooldown: Cooldown::new(config.cooldown_s),
            thumb_active: false,
            index_active: false,
            pinch_active: false,
        }
    }

    pub fn set_thresholds(&mut self, thumb: f64, index: f64) {
        self.thumb_threshold = thumb;
        self.index_threshold = index;
    }

    /// Feed normalized thumb and index forces observed at `now`
    pub fn update(&mut self, now: f64, thumb: f64, index: f64) -> Option<PinchEvent> {
        self.thumb_active = thumb > self.thumb_threshold;
        self.index_active = index > self.index_threshold;

        track_crossing(&mut self.thumb_since, self.thumb_active, now);
        track_crossing(&mut self.index_since, self.index_active, now);

        self.pinch_active = match (self.thumb_since, self.index_since) {
            (Some(t), Some(i)) => (t - i).abs() <= self.config.sync_window_s,
            _ => false,
        };

        if !self.edge.update(self.pinch_active) {
            return None;
        }
        if !self.cooldown.try_fire(now) {
            debug!(now, "pinch inside cooldown ignored");
            return None;
        }

        let event = PinchEvent {
            time: now,
            strength: thumb.min(index),
        };
        debug!(?event, "pinch");
        Some(event)
    }

    pub fn config(&self) -> &PinchConfig {
        &self.config
    }

    pub fn reset(&mut self) {
        self.thumb_since = None;
        self.index_since = None;
        self.edge.reset();
        self.cooldown.reset();
        self.thumb_active = false;
        self.index_active = false;
        self.pinch_active = false;
    }
}

impl Default for PinchDetector {
    fn default() -> Self {
        Self::new(PinchConfig::default())
    }
}

fn track_crossing(since: &mut Option<f64>, pressed: bool, now: f64) {
    if pressed {
        since.get_or_insert(now);
    } else {
        *since = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinch_fires_once_then_cooldown() {
        let mut detector = PinchDetector::default();

        assert!(detector.update(1.00, 0.9, 0.1).is_none());
        assert!(detector.thumb_active);
        assert!(!detector.pinch_active);

        let event = detector.update(1.05, 0.9, 0.8).expect("pinch at 1.05");
        assert_eq!(event.time, 1.05);
        assert_eq!(event.strength, 0.8);

        // Holding the pinch does not repeat
        assert!(detector.update(1.10, 0.9, 0.8).is_none());
        assert!(detector.pinch_active);

        // Release and pinch again inside the cooldown
        assert!(detector.update(1.15, 0.1, 0.1).is_none());
        assert!(detector.update(1.20, 0.9, 0.9).is_none());
        assert!(detector.update(1.25, 0.1, 0.1).is_none());

        // After the cooldown a fresh pinch fires
        assert!(detector.update(1.35, 0.9, 0.9).is_some());
    }

    #[test]
    fn test_consumed_edge_does_not_fire_late() {
        let mut detector = PinchDetector::default();
        assert!(detector.update(0.0, 0.9, 0.9).is_some());
        detector.update(0.05, 0.0, 0.0);

        // Rising edge inside cooldown, then held past it
        assert!(detector.update(0.10, 0.9, 0.9).is_none());
        assert!(detector.update(0.50, 0.9, 0.9).is_none());
    }

    #[test]
    fn test_crossings_too_far_apart() {
        let mut detector = PinchDetector::default();
        detector.update(0.0, 0.9, 0.0);
        assert!(detector.update(0.5, 0.9, 0.9).is_none());
        assert!(detector.thumb_active && detector.index_active);
        assert!(!detector.pinch_active);
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut detector = PinchDetector::default();
        detector.set_thresholds(0.5, 0.5);
        assert!(detector.update(0.0, 0.5, 0.5).is_none());
        assert!(detector.update(0.1, 0.51, 0.51).is_some());
    }

    #[test]
    fn test_reset_clears_cooldown() {
        let mut detector = PinchDetector::default();
        assert!(detector.update(0.0, 0.9, 0.9).is_some());
        detector.reset();
        assert!(detector.update(0.01, 0.9, 0.9).is_some());
    }
}
