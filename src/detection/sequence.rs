// src/detection/sequence.rs
//! Turn-based finger sequence for the piano game

use crate::hal::Finger;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

/// Result of a tap or a turn timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TurnOutcome {
    Hit { finger: Finger },
    Miss { expected: Finger, got: Finger },
    Timeout { expected: Finger },
}

/// Random sequence of fingers to tap in order, each within a turn window
#[derive(Debug, Clone)]
pub struct TurnSequence {
    fingers: Vec<Finger>,
    step: usize,
    length: usize,
    turn_window_s: f64,
    turn_elapsed_s: f64,
    rng: StdRng,
    pub score: u32,
    pub misses: u32,
    pub failures: u32,
    pub rounds: u32,
}

impl TurnSequence {
    pub fn new(length: usize, turn_window_s: f64) -> Self {
        Self::with_rng(length, turn_window_s, StdRng::from_entropy())
    }

    /// Reproducible sequences
    pub fn seeded(length: usize, turn_window_s: f64, seed: u64) -> Self {
        Self::with_rng(length, turn_window_s, StdRng::seed_from_u64(seed))
    }

    fn with_rng(length: usize, turn_window_s: f64, rng: StdRng) -> Self {
        let mut sequence = Self {
            fingers: Vec::new(),
            step: 0,
            length: length.max(1),
            turn_window_s,
            turn_elapsed_s: 0.0,
            rng,
            score: 0,
            misses: 0,
            failures: 0,
            rounds: 0,
        };
        sequence.regenerate();
        sequence
    }

    /// Replace the current sequence with `fingers` and restart at its first step
    pub fn set_sequence(&mut self, fingers: Vec<Finger>) {
        if fingers.is_empty() {
            return;
        }
        self.length = fingers.len();
        self.fingers = fingers;
        self.step = 0;
        self.turn_elapsed_s = 0.0;
    }

    fn regenerate(&mut self) {
        let rng = &mut self.rng;
        self.fingers = (0..self.length)
            .map(|_| if rng.gen_bool(0.5) { Finger::Index } else { Finger::Middle })
            .collect();
        self.step = 0;
        self.turn_elapsed_s = 0.0;
        debug!(sequence = ?self.fingers, "new piano sequence");
    }

    pub fn expected(&self) -> Finger {
        self.fingers[self.step]
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn fingers(&self) -> &[Finger] {
        &self.fingers
    }

    /// Seconds left before the current turn times out
    pub fn time_remaining(&self) -> f64 {
        (self.turn_window_s - self.turn_elapsed_s).max(0.0)
    }

    /// Judge a tap against the expected finger
    pub fn on_tap(&mut self, finger: Finger) -> TurnOutcome {
        let expected = self.expected();
        if finger != expected {
            self.misses += 1;
            return TurnOutcome::Miss { expected, got: finger };
        }

        self.score += 1;
        self.step += 1;
        self.turn_elapsed_s = 0.0;
        if self.step >= self.fingers.len() {
            self.rounds += 1;
            info!(score = self.score, rounds = self.rounds, "piano sequence completed");
            self.regenerate();
        }
        TurnOutcome::Hit { finger }
    }

    /// Advance the turn timer; a timeout keeps the same expected finger
    pub fn tick(&mut self, dt: f64) -> Option<TurnOutcome> {
        self.turn_elapsed_s += dt;
        if self.turn_elapsed_s < self.turn_window_s {
            return None;
        }
        self.failures += 1;
        self.turn_elapsed_s = 0.0;
        Some(TurnOutcome::Timeout {
            expected: self.expected(),
        })
    }

    pub fn reset(&mut self) {
        self.score = 0;
        self.misses = 0;
        self.failures = 0;
        self.rounds = 0;
        self.regenerate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_sequence_uses_piano_fingers() {
        let sequence = TurnSequence::seeded(8, 2.0, 7);
        assert_eq!(sequence.fingers().len(), 8);
        assert!(sequence
            .fingers()
            .iter()
            .all(|f| matches!(f, Finger::Index | Finger::Middle)));
        assert_eq!(sequence.step(), 0);
    }

    #[test]
    fn test_seeded_sequences_repeat() {
        let a = TurnSequence::seeded(8, 2.0, 42);
        let b = TurnSequence::seeded(8, 2.0, 42);
        assert_eq!(a.fingers(), b.fingers());
    }

    #[test]
    fn test_timeout_retries_same_finger() {
        let mut sequence = TurnSequence::seeded(8, 2.0, 1);
        sequence.set_sequence(vec![Finger::Index, Finger::Middle]);

        for _ in 0..3 {
            assert!(sequence.tick(0.5).is_none());
        }
        assert_eq!(
            sequence.tick(0.5),
            Some(TurnOutcome::Timeout { expected: Finger::Index })
        );
        assert_eq!(sequence.expected(), Finger::Index);
        assert_eq!(sequence.step(), 0);
        assert_eq!(sequence.failures, 1);
        assert_eq!(sequence.time_remaining(), 2.0);
    }

    #[test]
    fn test_miss_does_not_advance() {
        let mut sequence = TurnSequence::seeded(8, 2.0, 1);
        sequence.set_sequence(vec![Finger::Index, Finger::Middle]);

        assert_eq!(
            sequence.on_tap(Finger::Middle),
            TurnOutcome::Miss { expected: Finger::Index, got: Finger::Middle }
        );
        assert_eq!(sequence.step(), 0);
        assert_eq!(sequence.misses, 1);
    }

    #[test]
    fn test_completing_sequence_starts_new_round() {
        let mut sequence = TurnSequence::seeded(8, 2.0, 1);
        sequence.set_sequence(vec![Finger::Index, Finger::Middle]);

        sequence.tick(1.5);
        assert_eq!(sequence.on_tap(Finger::Index), TurnOutcome::Hit { finger: Finger::Index });
        assert_eq!(sequence.time_remaining(), 2.0);
        sequence.on_tap(Finger::Middle);

        assert_eq!(sequence.score, 2);
        assert_eq!(sequence.rounds, 1);
        assert_eq!(sequence.step(), 0);
        assert_eq!(sequence.fingers().len(), 2);
    }
}
