// src/detection/tap.rs
//! Dominant-finger tap detection for the piano game
//!
//! Index and middle fingers flex together anatomically, so a finger only
//! counts as pressed when it is above its own threshold *and* flexed more
//! than the other one. At most one finger is pressed on any tick.

use crate::config::constants::calibration::DEFAULT_DETECTION_THRESHOLD;
use crate::config::constants::detection::*;
use crate::detection::edge::RisingEdge;
use crate::hal::Finger;
use serde::{Deserialize, Serialize};

/// How taps are turned into gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapMode {
    /// Every tap counts
    Continuous,
    /// Taps are judged against a generated finger sequence
    TurnBased,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TapConfig {
    #[serde(default = "defaults::mode")]
    pub mode: TapMode,
    /// Time allowed per turn in turn-based mode
    #[serde(default = "defaults::turn_window_s")]
    pub turn_window_s: f64,
    #[serde(default = "defaults::sequence_length")]
    pub sequence_length: usize,
    /// Continuous-mode cue switches finger at this period
    #[serde(default = "defaults::cue_period_s")]
    pub cue_period_s: f64,
    #[serde(default = "defaults::cue_blink_hz")]
    pub cue_blink_hz: f64,
}

mod defaults {
    use super::TapMode;
    use crate::config::constants::detection::*;

    pub fn mode() -> TapMode { TapMode::Continuous }
    pub fn turn_window_s() -> f64 { DEFAULT_TURN_WINDOW_S }
    pub fn sequence_length() -> usize { DEFAULT_SEQUENCE_LENGTH }
    pub fn cue_period_s() -> f64 { DEFAULT_CUE_PERIOD_S }
    pub fn cue_blink_hz() -> f64 { DEFAULT_CUE_BLINK_HZ }
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            mode: defaults::mode(),
            turn_window_s: defaults::turn_window_s(),
            sequence_length: defaults::sequence_length(),
            cue_period_s: defaults::cue_period_s(),
            cue_blink_hz: defaults::cue_blink_hz(),
        }
    }
}

/// Apply the dominance rule; returns `(index_pressed, middle_pressed)`
pub fn dominant_pressed(
    index: f64,
    middle: f64,
    index_threshold: f64,
    middle_threshold: f64,
) -> (bool, bool) {
    (
        index > index_threshold && index > middle,
        middle > middle_threshold && middle > index,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TapEvent {
    pub time: f64,
    pub finger: Finger,
}

#[derive(Debug, Clone)]
pub struct TapDetector {
    index_threshold: f64,
    middle_threshold: f64,
    index_edge: RisingEdge,
    middle_edge: RisingEdge,
    pub index_active: bool,
    pub middle_active: bool,
}

impl TapDetector {
    pub fn new() -> Self {
        Self {
            index_threshold: DEFAULT_DETECTION_THRESHOLD,
            middle_threshold: DEFAULT_DETECTION_THRESHOLD,
            index_edge: RisingEdge::new(),
            middle_edge: RisingEdge::new(),
            index_active: false,
            middle_active: false,
        }
    }

    pub fn set_thresholds(&mut self, index: f64, middle: f64) {
        self.index_threshold = index;
        self.middle_threshold = middle;
    }

    /// Feed normalized index and middle flexion observed at `now`
    pub fn update(&mut self, now: f64, index: f64, middle: f64) -> Option<TapEvent> {
        let (index_pressed, middle_pressed) =
            dominant_pressed(index, middle, self.index_threshold, self.middle_threshold);
        self.index_active = index_pressed;
        self.middle_active = middle_pressed;

        let index_tap = self.index_edge.update(index_pressed);
        let middle_tap = self.middle_edge.update(middle_pressed);

        let finger = if index_tap {
            Finger::Index
        } else if middle_tap {
            Finger::Middle
        } else {
            return None;
        };
        Some(TapEvent { time: now, finger })
    }

    pub fn reset(&mut self) {
        self.index_edge.reset();
        self.middle_edge.reset();
        self.index_active = false;
        self.middle_active = false;
    }
}

impl Default for TapDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Suggested finger for continuous play: alternates every period and blinks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerCue {
    period_s: f64,
    blink_hz: f64,
}

impl FingerCue {
    pub fn new(period_s: f64, blink_hz: f64) -> Self {
        Self { period_s, blink_hz }
    }

    pub fn finger_at(&self, t: f64) -> Finger {
        if self.period_s <= 0.0 {
            return Finger::Index;
        }
        if (t / self.period_s).floor() as i64 % 2 == 0 {
            Finger::Index
        } else {
            Finger::Middle
        }
    }

    /// Toggles `blink_hz` times per second, starting visible
    pub fn visible_at(&self, t: f64) -> bool {
        if self.blink_hz <= 0.0 {
            return true;
        }
        (t * self.blink_hz).floor() as i64 % 2 == 0
    }
}

impl Default for FingerCue {
    fn default() -> Self {
        Self::new(DEFAULT_CUE_PERIOD_S, DEFAULT_CUE_BLINK_HZ)
    }
}
