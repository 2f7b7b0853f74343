// src/detection/edge.rs
//! Edge and cooldown primitives shared by the detectors

/// Reports `false -> true` transitions of a boolean input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RisingEdge {
    previous: bool,
}

impl RisingEdge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current level; true only on the tick it becomes true
    pub fn update(&mut self, level: bool) -> bool {
        let rising = level && !self.previous;
        self.previous = level;
        rising
    }

    /// Level seen on the last update
    pub fn level(&self) -> bool {
        self.previous
    }

    pub fn reset(&mut self) {
        self.previous = false;
    }
}

/// Minimum interval between two fired events
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cooldown {
    interval_s: f64,
    last_fired: f64,
}

impl Cooldown {
    pub fn new(interval_s: f64) -> Self {
        Self {
            interval_s,
            last_fired: f64::NEG_INFINITY,
        }
    }

    /// Whether an event at `now` is allowed
    pub fn ready(&self, now: f64) -> bool {
        now - self.last_fired >= self.interval_s
    }

    /// Fire at `now` if the interval has elapsed; returns whether it fired
    pub fn try_fire(&mut self, now: f64) -> bool {
        if self.ready(now) {
            self.last_fired = now;
            true
        } else {
            false
        }
    }

    pub fn last_fired(&self) -> Option<f64> {
        self.last_fired.is_finite().then_some(self.last_fired)
    }

    pub fn interval_s(&self) -> f64 {
        self.interval_s
    }

    pub fn reset(&mut self) {
        self.last_fired = f64::NEG_INFINITY;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rising_edge_fires_once_per_press() {
        let mut edge = RisingEdge::new();
        let levels = [false, true, true, false, true];
        let fired: Vec<bool> = levels.iter().map(|&l| edge.update(l)).collect();
        assert_eq!(fired, [false, true, false, false, true]);
        assert!(edge.level());

        edge.reset();
        assert!(edge.update(true));
    }

    #[test]
    fn test_cooldown_starts_ready() {
        let mut cooldown = Cooldown::new(0.25);
        assert!(cooldown.ready(0.0));
        assert_eq!(cooldown.last_fired(), None);

        assert!(cooldown.try_fire(1.0));
        assert!(!cooldown.try_fire(1.2));
        assert!(cooldown.try_fire(1.25));
        assert_eq!(cooldown.last_fired(), Some(1.25));

        cooldown.reset();
        assert!(cooldown.ready(1.3));
    }
}
