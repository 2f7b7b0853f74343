// src/detection/press.rs
//! Single-channel press detector

use crate::config::constants::detection::*;
use crate::detection::edge::{Cooldown, RisingEdge};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressConfig {
    #[serde(default = "default_cooldown_s")]
    pub cooldown_s: f64,
}

fn default_cooldown_s() -> f64 {
    DEFAULT_COOLDOWN_S
}

impl Default for PressConfig {
    fn default() -> Self {
        Self { cooldown_s: DEFAULT_COOLDOWN_S }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PressEvent {
    pub time: f64,
    /// Normalized value on the tick the press started
    pub strength: f64,
}

/// Fires once each time a normalized channel rises above its threshold
#[derive(Debug, Clone)]
pub struct PressDetector {
    threshold: f64,
    edge: RisingEdge,
    cooldown: Cooldown,
    pub active: bool,
}

impl PressDetector {
    pub fn new(config: PressConfig) -> Self {
        Self {
            threshold: DEFAULT_PRESS_THRESHOLD,
            edge: RisingEdge::new(),
            cooldown: Cooldown::new(config.cooldown_s),
            active: false,
        }
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn update(&mut self, now: f64, value: f64) -> Option<PressEvent> {
        self.active = value > self.threshold;
        if !self.edge.update(self.active) || !self.cooldown.try_fire(now) {
            return None;
        }
        debug!(now, value, "press");
        Some(PressEvent {
            time: now,
            strength: value,
        })
    }

    pub fn reset(&mut self) {
        self.edge.reset();
        self.cooldown.reset();
        self.active = false;
    }
}

impl Default for PressDetector {
    fn default() -> Self {
        Self::new(PressConfig::default())
    }
}
