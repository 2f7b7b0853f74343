// src/config/mod.rs
//! Configuration for the glove pipeline
//!
//! Every section and key has a default, so an empty TOML file is a valid
//! configuration. [`ConfigLoader`] layers files and `GLOVE_` environment
//! overrides on top of the defaults.

pub mod constants;
pub mod loader;

pub use loader::{ConfigError, ConfigLoader};

use crate::acquisition::{AcquisitionChannel, AcquisitionSettings};
use crate::calibration::{CalibrationMode, CalibrationSettings};
use crate::detection::{FallbackRanges, PinchConfig, PressConfig, SteeringConfig, TapConfig, TapMode};
use crate::error::GloveResult;
use crate::games::FollowUpConfig;
use crate::hal::serial_driver::SerialConfig;
use crate::hal::simulator::{SimulatedConnector, SimulatorConfig};
use crate::hal::{Channel, ChannelMap};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Complete configuration
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub acquisition: AcquisitionSettings,
    #[serde(default)]
    pub calibration: CalibrationSettings,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub channels: ChannelMap,
    /// When present, a simulated glove replaces the serial port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulator: Option<SimulatorConfig>,
}

/// Detector and minigame settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DetectionConfig {
    #[serde(default = "defaults::game_tick_rate_hz")]
    pub game_tick_rate_hz: f64,
    #[serde(default)]
    pub pinch: PinchConfig,
    #[serde(default)]
    pub press: PressConfig,
    #[serde(default)]
    pub tap: TapConfig,
    #[serde(default)]
    pub steering: SteeringConfig,
    #[serde(default)]
    pub follow_up: FollowUpConfig,
    #[serde(default)]
    pub fallback: FallbackRanges,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;

    pub fn game_tick_rate_hz() -> f64 { detection::DEFAULT_GAME_TICK_RATE_HZ }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            game_tick_rate_hz: defaults::game_tick_rate_hz(),
            pinch: PinchConfig::default(),
            press: PressConfig::default(),
            tap: TapConfig::default(),
            steering: SteeringConfig::default(),
            follow_up: FollowUpConfig::default(),
            fallback: FallbackRanges::default(),
        }
    }
}

impl SystemConfig {
    /// Check every section; returns one message per problem
    pub fn validate_consistency(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.simulator.is_none() {
            if let Err(e) = self.serial.validate() {
                errors.push(e.to_string());
            }
        }

        if self.acquisition.stop_timeout_ms == 0 {
            errors.push("acquisition.stop_timeout_ms must be positive".to_string());
        }

        let calibration = &self.calibration;
        if !is_positive(calibration.phase_duration_s) {
            errors.push(format!(
                "calibration.phase_duration_s must be positive, got {}",
                calibration.phase_duration_s
            ));
        }
        if !is_positive(calibration.tick_rate_hz) {
            errors.push(format!(
                "calibration.tick_rate_hz must be positive, got {}",
                calibration.tick_rate_hz
            ));
        }
        if calibration.profile_path.as_os_str().is_empty() {
            errors.push("calibration.profile_path cannot be empty".to_string());
        }

        self.validate_detection(&mut errors);
        self.validate_channels(&mut errors);
        self.validate_simulator(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_detection(&self, errors: &mut Vec<String>) {
        let detection = &self.detection;

        if !is_positive(detection.game_tick_rate_hz) {
            errors.push("detection.game_tick_rate_hz must be positive".to_string());
        }
        if !is_non_negative(detection.pinch.sync_window_s) {
            errors.push("detection.pinch.sync_window_s cannot be negative".to_string());
        }
        if !is_non_negative(detection.pinch.cooldown_s) || !is_non_negative(detection.press.cooldown_s) {
            errors.push("detection cooldowns cannot be negative".to_string());
        }
        if detection.tap.sequence_length == 0 {
            errors.push("detection.tap.sequence_length must be at least 1".to_string());
        }
        if !is_positive(detection.tap.turn_window_s) {
            errors.push("detection.tap.turn_window_s must be positive".to_string());
        }
        if !is_positive(detection.steering.sensitivity_deg_s) {
            errors.push("detection.steering.sensitivity_deg_s must be positive".to_string());
        }
        let smoothing = detection.steering.smoothing;
        if !is_positive(smoothing) || smoothing > 1.0 {
            errors.push(format!(
                "detection.steering.smoothing must be in (0, 1], got {}",
                smoothing
            ));
        }
        if !is_positive(detection.follow_up.window_s) || !is_positive(detection.follow_up.tick_rate_hz) {
            errors.push("detection.follow_up window and rate must be positive".to_string());
        }

        check_fallback("detection.fallback", &detection.fallback, errors);
        check_fallback("detection.follow_up.fallback", &detection.follow_up.fallback, errors);
    }

    fn validate_simulator(&self, errors: &mut Vec<String>) {
        let Some(simulator) = &self.simulator else {
            return;
        };
        if simulator.rate_hz == 0 {
            errors.push("simulator.rate_hz must be positive".to_string());
        }
        if !is_non_negative(simulator.noise_counts) || !simulator.noise_counts.is_finite() {
            errors.push(format!(
                "simulator.noise_counts must be a finite, non-negative number, got {}",
                simulator.noise_counts
            ));
        }
    }

    fn validate_channels(&self, errors: &mut Vec<String>) {
        let channels = &self.channels;
        let check = |name: &str, channel: Channel, flex: bool, errors: &mut Vec<String>| {
            if channel.is_flex() != flex {
                let kind = if flex { "flex" } else { "force" };
                errors.push(format!(
                    "channels.{} must be a {} channel, got {}",
                    name,
                    kind,
                    channel.as_str()
                ));
            }
        };
        check("index_flex", channels.index_flex, true, errors);
        check("middle_flex", channels.middle_flex, true, errors);
        check("thumb_force", channels.thumb_force, false, errors);
        check("index_force", channels.index_force, false, errors);

        if channels.index_flex == channels.middle_flex {
            errors.push("channels.index_flex and channels.middle_flex must differ".to_string());
        }
        if channels.thumb_force == channels.index_force {
            errors.push("channels.thumb_force and channels.index_force must differ".to_string());
        }
    }

    /// Build the acquisition channel this configuration describes
    pub fn open_channel(&self) -> GloveResult<AcquisitionChannel> {
        match &self.simulator {
            Some(simulator) => Ok(AcquisitionChannel::new(
                Arc::new(SimulatedConnector::new(simulator.clone())),
                self.acquisition.clone(),
            )),
            None => AcquisitionChannel::serial(self.serial.clone(), self.acquisition.clone()),
        }
    }

    /// Get configuration summary
    pub fn get_summary(&self) -> ConfigSummary {
        ConfigSummary {
            port_name: self.serial.port_name.clone(),
            baud_rate: self.serial.baud_rate,
            simulated: self.simulator.is_some(),
            calibration_mode: self.calibration.mode,
            tap_mode: self.detection.tap.mode,
            game_tick_rate_hz: self.detection.game_tick_rate_hz,
        }
    }
}

fn check_fallback(section: &str, fallback: &FallbackRanges, errors: &mut Vec<String>) {
    if !is_positive(fallback.flex_max - fallback.flex_min) {
        errors.push(format!(
            "{} flex range is empty: {}..{}",
            section, fallback.flex_min, fallback.flex_max
        ));
    }
    if !is_positive(fallback.fsr_max - fallback.fsr_min) {
        errors.push(format!(
            "{} fsr range is empty: {}..{}",
            section, fallback.fsr_min, fallback.fsr_max
        ));
    }
}

// NaN fails both checks
fn is_positive(value: f64) -> bool {
    value > 0.0
}

fn is_non_negative(value: f64) -> bool {
    value >= 0.0
}

/// Configuration summary for display/logging
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub port_name: String,
    pub baud_rate: u32,
    pub simulated: bool,
    pub calibration_mode: CalibrationMode,
    pub tap_mode: TapMode,
    pub game_tick_rate_hz: f64,
}
