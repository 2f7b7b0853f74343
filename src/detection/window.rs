// src/detection/window.rs
//! Time-bounded series of recent values for the follow-up graphs

use std::collections::VecDeque;

/// Keeps `(t, value)` points no older than `span_s` behind the newest one
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    span_s: f64,
    points: VecDeque<(f64, f64)>,
}

impl SlidingWindow {
    pub fn new(span_s: f64) -> Self {
        Self {
            span_s,
            points: VecDeque::new(),
        }
    }

    pub fn push(&mut self, t: f64, value: f64) {
        self.points.push_back((t, value));
        while let Some(&(front, _)) = self.points.front() {
            if t - front > self.span_s {
                self.points.pop_front();
            } else {
                break;
            }
        }
    }

    /// Points with time rebased so the oldest is at 0
    pub fn points(&self) -> Vec<(f64, f64)> {
        let Some(&(t0, _)) = self.points.front() else {
            return Vec::new();
        };
        self.points.iter().map(|&(t, v)| (t - t0, v)).collect()
    }

    pub fn last(&self) -> Option<f64> {
        self.points.back().map(|&(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn span_s(&self) -> f64 {
        self.span_s
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}
