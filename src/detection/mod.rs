// src/detection/mod.rs
//! Gameplay event detectors over normalized channels
//!
//! Detectors are plain state machines fed with session time and normalized
//! values; they never touch the device or the profile themselves.

pub mod edge;
pub mod pinch;
pub mod press;
pub mod sequence;
pub mod steering;
pub mod tap;
pub mod window;

pub use edge::{Cooldown, RisingEdge};
pub use pinch::{PinchConfig, PinchDetector, PinchEvent};
pub use press::{PressConfig, PressDetector, PressEvent};
pub use sequence::{TurnOutcome, TurnSequence};
pub use steering::{SteeringConfig, SteeringFilter};
pub use tap::{dominant_pressed, FingerCue, TapConfig, TapDetector, TapEvent, TapMode};
pub use window::SlidingWindow;

use crate::calibration::{normalize, CalibrationProfile};
use crate::config::constants::detection::*;
use crate::hal::{Channel, SensorSample};
use serde::{Deserialize, Serialize};

/// Raw ranges used while the profile still holds built-in defaults
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackRanges {
    #[serde(default = "defaults::flex_min")]
    pub flex_min: f64,
    #[serde(default = "defaults::flex_max")]
    pub flex_max: f64,
    #[serde(default = "defaults::fsr_min")]
    pub fsr_min: f64,
    #[serde(default = "defaults::fsr_max")]
    pub fsr_max: f64,
}

mod defaults {
    use crate::config::constants::detection::*;

    pub fn flex_min() -> f64 { FALLBACK_FLEX_MIN }
    pub fn flex_max() -> f64 { FALLBACK_FLEX_MAX }
    pub fn fsr_min() -> f64 { FALLBACK_FSR_MIN }
    pub fn fsr_max() -> f64 { FALLBACK_FSR_MAX }
}

impl Default for FallbackRanges {
    fn default() -> Self {
        Self {
            flex_min: FALLBACK_FLEX_MIN,
            flex_max: FALLBACK_FLEX_MAX,
            fsr_min: FALLBACK_FSR_MIN,
            fsr_max: FALLBACK_FSR_MAX,
        }
    }
}

impl FallbackRanges {
    /// Full ADC scale on every channel
    pub fn full_scale() -> Self {
        Self {
            flex_min: DISPLAY_FALLBACK_MIN,
            flex_max: DISPLAY_FALLBACK_MAX,
            fsr_min: DISPLAY_FALLBACK_MIN,
            fsr_max: DISPLAY_FALLBACK_MAX,
        }
    }

    /// Normalize one channel of `sample`, preferring the user's own range
    pub fn normalize(
        &self,
        profile: &CalibrationProfile,
        sample: &SensorSample,
        channel: Channel,
    ) -> f64 {
        let value = sample.value(channel);
        if profile.has_user_ranges() {
            return profile.normalize_channel(channel, value);
        }
        if channel.is_flex() {
            normalize(value, self.flex_min, self.flex_max)
        } else {
            normalize(value, self.fsr_min, self.fsr_max)
        }
    }
}
