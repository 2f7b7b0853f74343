// src/games/follow_up.rs
//! Follow-up monitors: scrolling graphs of finger flexion, pad pressure and
//! wrist angle
//!
//! Unlike the games, an uncalibrated follow-up plots readings against the full
//! ADC scale so the therapist sees raw amplitude.

use crate::config::constants::detection::*;
use crate::detection::{FallbackRanges, SlidingWindow};
use crate::games::GameContext;
use crate::hal::{Channel, SensorSample};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FollowUpConfig {
    /// Seconds of history kept on screen
    #[serde(default = "defaults::window_s")]
    pub window_s: f64,
    #[serde(default = "defaults::tick_rate_hz")]
    pub tick_rate_hz: f64,
    /// Ranges used while the profile holds no user ranges
    #[serde(default = "FallbackRanges::full_scale")]
    pub fallback: FallbackRanges,
}

mod defaults {
    use crate::config::constants::detection::*;

    pub fn window_s() -> f64 { DEFAULT_FOLLOW_UP_WINDOW_S }
    pub fn tick_rate_hz() -> f64 { DEFAULT_FOLLOW_UP_TICK_RATE_HZ }
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        Self {
            window_s: DEFAULT_FOLLOW_UP_WINDOW_S,
            tick_rate_hz: DEFAULT_FOLLOW_UP_TICK_RATE_HZ,
            fallback: FallbackRanges::full_scale(),
        }
    }
}

impl FollowUpConfig {
    pub fn tick_interval(&self) -> Duration {
        let rate = if self.tick_rate_hz > 0.0 {
            self.tick_rate_hz
        } else {
            DEFAULT_FOLLOW_UP_TICK_RATE_HZ
        };
        Duration::from_secs_f64(1.0 / rate)
    }

    fn normalize(&self, ctx: &GameContext, sample: &SensorSample, channel: Channel) -> f64 {
        self.fallback.normalize(&ctx.profile.read(), sample, channel)
    }
}

/// Normalized index and middle flexion over time
#[derive(Debug)]
pub struct FlexFollowUp {
    ctx: GameContext,
    config: FollowUpConfig,
    clock_s: f64,
    index: SlidingWindow,
    middle: SlidingWindow,
    pub current_index: f64,
    pub current_middle: f64,
}

impl FlexFollowUp {
    pub fn new(ctx: GameContext, config: FollowUpConfig) -> Self {
        Self {
            ctx,
            config,
            clock_s: 0.0,
            index: SlidingWindow::new(config.window_s),
            middle: SlidingWindow::new(config.window_s),
            current_index: 0.0,
            current_middle: 0.0,
        }
    }

    pub fn tick(&mut self, dt: f64) {
        self.clock_s += dt;
        let Some(sample) = self.ctx.latest() else {
            return;
        };
        let channels = self.ctx.channels;
        self.current_index = self.config.normalize(&self.ctx, &sample, channels.index_flex);
        self.current_middle = self.config.normalize(&self.ctx, &sample, channels.middle_flex);
        self.index.push(self.clock_s, self.current_index);
        self.middle.push(self.clock_s, self.current_middle);
    }

    /// Index series, time rebased to the oldest point
    pub fn index_points(&self) -> Vec<(f64, f64)> {
        self.index.points()
    }

    pub fn middle_points(&self) -> Vec<(f64, f64)> {
        self.middle.points()
    }

    pub fn reset(&mut self) {
        self.clock_s = 0.0;
        self.index.clear();
        self.middle.clear();
        self.current_index = 0.0;
        self.current_middle = 0.0;
    }
}

/// Normalized index pad pressure over time
#[derive(Debug)]
pub struct PressureFollowUp {
    ctx: GameContext,
    config: FollowUpConfig,
    clock_s: f64,
    pressure: SlidingWindow,
    pub current_pressure: f64,
}

impl PressureFollowUp {
    pub fn new(ctx: GameContext, config: FollowUpConfig) -> Self {
        Self {
            ctx,
            config,
            clock_s: 0.0,
            pressure: SlidingWindow::new(config.window_s),
            current_pressure: 0.0,
        }
    }

    pub fn tick(&mut self, dt: f64) {
        self.clock_s += dt;
        let Some(sample) = self.ctx.latest() else {
            return;
        };
        let channel = self.ctx.channels.index_force;
        self.current_pressure = self.config.normalize(&self.ctx, &sample, channel);
        self.pressure.push(self.clock_s, self.current_pressure);
    }

    pub fn points(&self) -> Vec<(f64, f64)> {
        self.pressure.points()
    }

    pub fn reset(&mut self) {
        self.clock_s = 0.0;
        self.pressure.clear();
        self.current_pressure = 0.0;
    }
}

/// Wrist yaw obtained by integrating the bias-corrected X gyro
#[derive(Debug)]
pub struct WristFollowUp {
    ctx: GameContext,
    clock_s: f64,
    angles: SlidingWindow,
    /// Degrees, wrapped to [-180, 180]
    pub current_angle: f64,
    /// Degrees per second
    pub current_rate: f64,
}

impl WristFollowUp {
    pub fn new(ctx: GameContext, config: FollowUpConfig) -> Self {
        Self {
            ctx,
            clock_s: 0.0,
            angles: SlidingWindow::new(config.window_s),
            current_angle: 0.0,
            current_rate: 0.0,
        }
    }

    pub fn tick(&mut self, dt: f64) {
        self.clock_s += dt;
        let Some(sample) = self.ctx.latest() else {
            return;
        };
        let offset = self.ctx.profile.read().gx_offset;
        self.current_rate = sample.gx - offset;
        self.current_angle = wrap_degrees(self.current_angle + self.current_rate * dt);
        self.angles.push(self.clock_s, self.current_angle);
    }

    pub fn points(&self) -> Vec<(f64, f64)> {
        self.angles.points()
    }

    pub fn reset(&mut self) {
        self.clock_s = 0.0;
        self.angles.clear();
        self.current_angle = 0.0;
        self.current_rate = 0.0;
    }
}

fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = (angle + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid maps +180 onto -180; keep the sign of the input there
    if wrapped == -180.0 && angle > 0.0 {
        180.0
    } else {
        wrapped
    }
}
