// src/games/piano.rs
//! Piano game: tap with the index or middle finger

use crate::detection::{FingerCue, TapConfig, TapDetector, TapEvent, TapMode, TurnOutcome, TurnSequence};
use crate::games::GameContext;
use crate::hal::Finger;

#[derive(Debug)]
pub struct PianoGame {
    ctx: GameContext,
    config: TapConfig,
    detector: TapDetector,
    sequence: TurnSequence,
    cue: FingerCue,
    clock_s: f64,
    pub index_active: bool,
    pub middle_active: bool,
    pub last_tap: Option<TapEvent>,
    pub last_outcome: Option<TurnOutcome>,
    /// Taps on the cued finger (continuous) or correct steps (turn-based)
    pub score: u32,
    pub taps: u32,
}

impl PianoGame {
    pub fn new(ctx: GameContext, config: TapConfig) -> Self {
        let sequence = TurnSequence::new(config.sequence_length, config.turn_window_s);
        Self::with_sequence(ctx, config, sequence)
    }

    /// Use a prepared sequence, e.g. a seeded one
    pub fn with_sequence(ctx: GameContext, config: TapConfig, sequence: TurnSequence) -> Self {
        Self {
            ctx,
            config,
            detector: TapDetector::new(),
            sequence,
            cue: FingerCue::new(config.cue_period_s, config.cue_blink_hz),
            clock_s: 0.0,
            index_active: false,
            middle_active: false,
            last_tap: None,
            last_outcome: None,
            score: 0,
            taps: 0,
        }
    }

    pub fn mode(&self) -> TapMode {
        self.config.mode
    }

    /// Advance by `dt` seconds; returns the tap detected on this tick
    pub fn tick(&mut self, dt: f64) -> Option<TapEvent> {
        self.clock_s += dt;

        let tap = self.detect();
        if let Some(tap) = tap {
            self.on_tap(tap);
        } else if self.config.mode == TapMode::TurnBased {
            // A tap landing on the expiring tick still counts for the turn
            if let Some(outcome) = self.sequence.tick(dt) {
                self.last_outcome = Some(outcome);
            }
        }
        tap
    }

    fn detect(&mut self) -> Option<TapEvent> {
        let sample = self.ctx.latest()?;
        let index_ch = self.ctx.channels.index_flex;
        let middle_ch = self.ctx.channels.middle_flex;
        self.detector.set_thresholds(
            self.ctx.threshold_for(index_ch),
            self.ctx.threshold_for(middle_ch),
        );
        let index = self.ctx.normalize(&sample, index_ch);
        let middle = self.ctx.normalize(&sample, middle_ch);

        let tap = self.detector.update(self.clock_s, index, middle);
        self.index_active = self.detector.index_active;
        self.middle_active = self.detector.middle_active;
        tap
    }

    fn on_tap(&mut self, tap: TapEvent) {
        self.taps += 1;
        self.last_tap = Some(tap);
        match self.config.mode {
            TapMode::Continuous => {
                if tap.finger == self.cue.finger_at(self.clock_s) {
                    self.score += 1;
                }
            }
            TapMode::TurnBased => {
                let outcome = self.sequence.on_tap(tap.finger);
                self.score = self.sequence.score;
                self.last_outcome = Some(outcome);
            }
        }
    }

    /// Finger the player should use now
    pub fn expected_finger(&self) -> Finger {
        match self.config.mode {
            TapMode::Continuous => self.cue.finger_at(self.clock_s),
            TapMode::TurnBased => self.sequence.expected(),
        }
    }

    /// Continuous-mode cue finger
    pub fn cue_finger(&self) -> Finger {
        self.cue.finger_at(self.clock_s)
    }

    /// Whether the cue badge is lit on this tick
    pub fn cue_visible(&self) -> bool {
        self.cue.visible_at(self.clock_s)
    }

    pub fn sequence(&self) -> &TurnSequence {
        &self.sequence
    }

    pub fn reset(&mut self) {
        self.detector.reset();
        self.sequence.reset();
        self.clock_s = 0.0;
        self.index_active = false;
        self.middle_active = false;
        self.last_tap = None;
        self.last_outcome = None;
        self.score = 0;
        self.taps = 0;
    }
}
