// src/games/mod.rs
//! Minigame controllers
//!
//! Each controller is ticked by the host at a fixed rate, reads the latest
//! sample, runs its detectors and exposes plain fields for rendering. None of
//! them blocks or touches the device directly.

pub mod car;
pub mod follow_up;
pub mod jump;
pub mod piano;

pub use car::CarGame;
pub use follow_up::{FlexFollowUp, FollowUpConfig, PressureFollowUp, WristFollowUp};
pub use jump::{JumpEvent, JumpGame, JumpTrigger};
pub use piano::PianoGame;

use crate::acquisition::SampleSource;
use crate::calibration::{SharedProfile, Threshold};
use crate::detection::FallbackRanges;
use crate::hal::{Channel, ChannelMap, SensorSample};
use std::sync::Arc;

/// What every controller reads from: the sample source, the session profile,
/// the finger-to-channel map and the uncalibrated fallback ranges
#[derive(Clone)]
pub struct GameContext {
    pub source: Arc<dyn SampleSource>,
    pub profile: SharedProfile,
    pub channels: ChannelMap,
    pub fallback: FallbackRanges,
}

impl GameContext {
    pub fn new(source: Arc<dyn SampleSource>, profile: SharedProfile) -> Self {
        Self {
            source,
            profile,
            channels: ChannelMap::default(),
            fallback: FallbackRanges::default(),
        }
    }

    pub fn with_channels(mut self, channels: ChannelMap) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackRanges) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn latest(&self) -> Option<SensorSample> {
        self.source.latest()
    }

    pub fn normalize(&self, sample: &SensorSample, channel: Channel) -> f64 {
        self.fallback.normalize(&self.profile.read(), sample, channel)
    }

    /// Profile threshold that applies to `channel` under the current map
    pub fn threshold_for(&self, channel: Channel) -> f64 {
        let which = if channel == self.channels.thumb_force {
            Threshold::ThumbForce
        } else if channel == self.channels.index_force {
            Threshold::IndexForce
        } else if channel == self.channels.index_flex {
            Threshold::IndexFlex
        } else {
            Threshold::MiddleFlex
        };
        self.profile.read().threshold(which)
    }
}

impl std::fmt::Debug for GameContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameContext")
            .field("channels", &self.channels)
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::acquisition::LatestSlot;
    use crate::hal::SensorSample;

    pub fn sample() -> SensorSample {
        SensorSample {
            t_ms: 0,
            flex_thumb: 300,
            flex_index: 300,
            fsr_thumb: 100,
            fsr_index: 100,
            ax: 0.0,
            ay: 0.0,
            az: 9.81,
            gx: 0.0,
            gy: 0.0,
            gz: 0.0,
        }
    }

    pub fn publish(slot: &LatestSlot, f: impl FnOnce(&mut SensorSample)) {
        let mut s = sample();
        f(&mut s);
        slot.publish(s);
    }
}
