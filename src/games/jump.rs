// src/games/jump.rs
//! Jump game: a pinch (or a single press) makes the character jump

use crate::detection::{PinchConfig, PinchDetector, PressConfig, PressDetector};
use crate::games::GameContext;
use crate::hal::{Channel, Finger};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Gesture that triggers a jump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JumpTrigger {
    /// Thumb and index fingertips pressed together
    Pinch,
    /// One finger pressed on its own
    Press(Finger),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JumpEvent {
    pub time: f64,
    pub strength: f64,
}

#[derive(Debug)]
pub struct JumpGame {
    ctx: GameContext,
    trigger: JumpTrigger,
    pinch: PinchDetector,
    press: PressDetector,
    clock_s: f64,
    pub last_event: Option<JumpEvent>,
    pub jumps: u32,
    pub thumb_active: bool,
    pub index_active: bool,
    pub pinch_active: bool,
}

impl JumpGame {
    pub fn new(ctx: GameContext, trigger: JumpTrigger, pinch: PinchConfig, press: PressConfig) -> Self {
        Self {
            ctx,
            trigger,
            pinch: PinchDetector::new(pinch),
            press: PressDetector::new(press),
            clock_s: 0.0,
            last_event: None,
            jumps: 0,
            thumb_active: false,
            index_active: false,
            pinch_active: false,
        }
    }

    pub fn trigger(&self) -> JumpTrigger {
        self.trigger
    }

    /// Channel watched in press mode; force sensor if the finger has one
    fn press_channel(&self, finger: Finger) -> Channel {
        let channels = &self.ctx.channels;
        channels
            .force(finger)
            .or_else(|| channels.flex(finger))
            .unwrap_or(channels.index_force)
    }

    /// Advance by `dt` seconds; returns a jump fired on this tick
    pub fn tick(&mut self, dt: f64) -> Option<JumpEvent> {
        self.clock_s += dt;
        let sample = self.ctx.latest()?;
        let now = self.clock_s;

        let event = match self.trigger {
            JumpTrigger::Pinch => {
                let thumb_ch = self.ctx.channels.thumb_force;
                let index_ch = self.ctx.channels.index_force;
                self.pinch.set_thresholds(
                    self.ctx.threshold_for(thumb_ch),
                    self.ctx.threshold_for(index_ch),
                );
                let thumb = self.ctx.normalize(&sample, thumb_ch);
                let index = self.ctx.normalize(&sample, index_ch);
                let event = self.pinch.update(now, thumb, index);

                self.thumb_active = self.pinch.thumb_active;
                self.index_active = self.pinch.index_active;
                self.pinch_active = self.pinch.pinch_active;
                event.map(|e| JumpEvent { time: e.time, strength: e.strength })
            }
            JumpTrigger::Press(finger) => {
                let channel = self.press_channel(finger);
                self.press.set_threshold(self.ctx.threshold_for(channel));
                let value = self.ctx.normalize(&sample, channel);
                let event = self.press.update(now, value);

                self.thumb_active = finger == Finger::Thumb && self.press.active;
                self.index_active = finger == Finger::Index && self.press.active;
                self.pinch_active = false;
                event.map(|e| JumpEvent { time: e.time, strength: e.strength })
            }
        };

        if let Some(event) = event {
            self.jumps += 1;
            self.last_event = Some(event);
            info!(jumps = self.jumps, strength = event.strength, "jump");
        }
        event
    }

    pub fn reset(&mut self) {
        self.pinch.reset();
        self.press.reset();
        self.clock_s = 0.0;
        self.last_event = None;
        self.jumps = 0;
        self.thumb_active = false;
        self.index_active = false;
        self.pinch_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::LatestSlot;
    use crate::calibration::CalibrationProfile;
    use crate::games::test_support::publish;
    use std::sync::Arc;

    fn game(trigger: JumpTrigger) -> (Arc<LatestSlot>, JumpGame) {
        let slot = Arc::new(LatestSlot::new());
        let ctx = GameContext::new(slot.clone(), CalibrationProfile::default().shared());
        let game = JumpGame::new(ctx, trigger, PinchConfig::default(), PressConfig::default());
        (slot, game)
    }

    #[test]
    fn test_no_sample_no_jump() {
        let (_slot, mut game) = game(JumpTrigger::Pinch);
        assert!(game.tick(0.1).is_none());
        assert_eq!(game.jumps, 0);
    }

    #[test]
    fn test_pinch_jumps_once() {
        let (slot, mut game) = game(JumpTrigger::Pinch);
        publish(&slot, |_| {});
        assert!(game.tick(0.1).is_none());

        // 820 in the 100..900 fallback range is 0.9
        publish(&slot, |s| {
            s.fsr_thumb = 820;
            s.fsr_index = 820;
        });
        let event = game.tick(0.1).expect("jump");
        assert!((event.strength - 0.9).abs() < 1e-9);
        assert!(game.pinch_active);

        assert!(game.tick(0.1).is_none());
        assert_eq!(game.jumps, 1);
        assert_eq!(game.last_event, Some(event));

        game.reset();
        assert_eq!(game.jumps, 0);
        assert!(game.last_event.is_none());
    }

    #[test]
    fn test_press_on_thumb() {
        let (slot, mut game) = game(JumpTrigger::Press(Finger::Thumb));
        publish(&slot, |s| s.fsr_thumb = 820);
        assert!(game.tick(0.1).is_some());
        assert!(game.thumb_active);
        assert!(!game.index_active);
    }

    #[test]
    fn test_trigger_serialization() {
        let trigger: JumpTrigger = serde_json::from_str(r#"{"press":"index"}"#).unwrap();
        assert_eq!(trigger, JumpTrigger::Press(Finger::Index));
    }
}
