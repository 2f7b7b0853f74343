// src/hal/types.rs
//! Core types for glove sensor data

use serde::{Deserialize, Serialize};

/// One parsed glove reading.
///
/// Built only by the frame parser, which is all-or-nothing: a sample always
/// carries all eleven fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    /// Device timestamp in milliseconds, monotonic per device
    pub t_ms: u64,
    pub flex_thumb: i32,
    pub flex_index: i32,
    pub fsr_thumb: i32,
    pub fsr_index: i32,
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
    /// Angular rate around X, degrees/second
    pub gx: f64,
    pub gy: f64,
    pub gz: f64,
}

impl SensorSample {
    /// Raw value of one analog channel
    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::FlexThumb => self.flex_thumb as f64,
            Channel::FlexIndex => self.flex_index as f64,
            Channel::FsrThumb => self.fsr_thumb as f64,
            Channel::FsrIndex => self.fsr_index as f64,
        }
    }

    /// Gyro command in [-1, 1] from the X angular rate.
    /// -1 is full left, +1 full right.
    pub fn steering_from_gyro(&self, sensitivity_deg_per_s: f64) -> f64 {
        if sensitivity_deg_per_s <= 0.0 {
            return 0.0;
        }
        (self.gx / sensitivity_deg_per_s).clamp(-1.0, 1.0)
    }
}

/// The four analog channels of the glove
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    FlexThumb,
    FlexIndex,
    FsrThumb,
    FsrIndex,
}

impl Channel {
    /// All analog channels in wire order
    pub const ALL: [Channel; 4] = [
        Channel::FlexThumb,
        Channel::FlexIndex,
        Channel::FsrThumb,
        Channel::FsrIndex,
    ];

    /// Field name used on the wire and in the profile file
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::FlexThumb => "flex_thumb",
            Channel::FlexIndex => "flex_index",
            Channel::FsrThumb => "fsr_thumb",
            Channel::FsrIndex => "fsr_index",
        }
    }

    /// Whether this is a flexion (bend) channel
    pub fn is_flex(&self) -> bool {
        matches!(self, Channel::FlexThumb | Channel::FlexIndex)
    }
}

/// Logical fingers the minigames talk about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Finger {
    Thumb,
    Index,
    Middle,
}

impl Finger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
        }
    }
}

/// Mapping from physical sensor channels to logical fingers.
///
/// The glove's flex sensor labelled "thumb" is worn on the middle finger, so
/// the default maps `middle_flex` to [`Channel::FlexThumb`]. Every minigame
/// reads fingers through this map instead of picking raw fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMap {
    #[serde(default = "defaults::index_flex")]
    pub index_flex: Channel,
    #[serde(default = "defaults::middle_flex")]
    pub middle_flex: Channel,
    #[serde(default = "defaults::thumb_force")]
    pub thumb_force: Channel,
    #[serde(default = "defaults::index_force")]
    pub index_force: Channel,
}

mod defaults {
    use super::Channel;

    pub fn index_flex() -> Channel { Channel::FlexIndex }
    pub fn middle_flex() -> Channel { Channel::FlexThumb }
    pub fn thumb_force() -> Channel { Channel::FsrThumb }
    pub fn index_force() -> Channel { Channel::FsrIndex }
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            index_flex: defaults::index_flex(),
            middle_flex: defaults::middle_flex(),
            thumb_force: defaults::thumb_force(),
            index_force: defaults::index_force(),
        }
    }
}

impl ChannelMap {
    /// Flex channel worn on `finger`, if the glove has one
    pub fn flex(&self, finger: Finger) -> Option<Channel> {
        match finger {
            Finger::Index => Some(self.index_flex),
            Finger::Middle => Some(self.middle_flex),
            Finger::Thumb => None,
        }
    }

    /// Force channel under `finger`, if the glove has one
    pub fn force(&self, finger: Finger) -> Option<Channel> {
        match finger {
            Finger::Thumb => Some(self.thumb_force),
            Finger::Index => Some(self.index_force),
            Finger::Middle => None,
        }
    }
}
