// src/detection/steering.rs
//! Wrist-roll steering from the X gyro

use crate::config::constants::detection::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteeringConfig {
    /// Angular rate in deg/s that maps to full lock
    #[serde(default = "default_sensitivity")]
    pub sensitivity_deg_s: f64,
    /// Weight of the newest reading in the exponential filter, in (0, 1]
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,
}

fn default_sensitivity() -> f64 {
    DEFAULT_STEERING_SENSITIVITY_DEG_S
}

fn default_smoothing() -> f64 {
    DEFAULT_STEERING_SMOOTHING
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            sensitivity_deg_s: default_sensitivity(),
            smoothing: default_smoothing(),
        }
    }
}

/// Exponentially smoothed steering value in [-1, 1]
#[derive(Debug, Clone)]
pub struct SteeringFilter {
    config: SteeringConfig,
    value: f64,
}

impl SteeringFilter {
    pub fn new(config: SteeringConfig) -> Self {
        Self { config, value: 0.0 }
    }

    /// Raw steer for a bias-corrected angular rate
    pub fn raw(&self, rate_deg_s: f64) -> f64 {
        if self.config.sensitivity_deg_s <= 0.0 {
            return 0.0;
        }
        (rate_deg_s / self.config.sensitivity_deg_s).clamp(-1.0, 1.0)
    }

    pub fn update(&mut self, rate_deg_s: f64) -> f64 {
        let alpha = self.config.smoothing.clamp(0.0, 1.0);
        let target = self.raw(rate_deg_s);
        self.value += alpha * (target - self.value);
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

impl Default for SteeringFilter {
    fn default() -> Self {
        Self::new(SteeringConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_is_clamped() {
        let filter = SteeringFilter::default();
        assert_eq!(filter.raw(22.5), 0.5);
        assert_eq!(filter.raw(200.0), 1.0);
        assert_eq!(filter.raw(-90.0), -1.0);
    }

    #[test]
    fn test_smoothing_converges() {
        let mut filter = SteeringFilter::default();
        let first = filter.update(45.0);
        assert!((first - 0.3).abs() < 1e-12);

        for _ in 0..100 {
            filter.update(45.0);
        }
        assert!((filter.value() - 1.0).abs() < 1e-6);

        filter.reset();
        assert_eq!(filter.value(), 0.0);
    }

    #[test]
    fn test_unsmoothed_follows_input() {
        let mut filter = SteeringFilter::new(SteeringConfig {
            sensitivity_deg_s: 90.0,
            smoothing: 1.0,
        });
        assert_eq!(filter.update(-45.0), -0.5);
    }
}
