// src/games/car.rs
//! Car game: rolling the wrist steers

use crate::detection::{SteeringConfig, SteeringFilter};
use crate::games::GameContext;

#[derive(Debug)]
pub struct CarGame {
    ctx: GameContext,
    filter: SteeringFilter,
    clock_s: f64,
    /// Smoothed steering in [-1, 1], negative is left
    pub steer: f64,
    /// Bias-corrected X rate of the last sample, deg/s
    pub rate_deg_s: f64,
}

impl CarGame {
    pub fn new(ctx: GameContext, config: SteeringConfig) -> Self {
        Self {
            ctx,
            filter: SteeringFilter::new(config),
            clock_s: 0.0,
            steer: 0.0,
            rate_deg_s: 0.0,
        }
    }

    pub fn tick(&mut self, dt: f64) -> f64 {
        self.clock_s += dt;
        if let Some(sample) = self.ctx.latest() {
            let offset = self.ctx.profile.read().gx_offset;
            self.rate_deg_s = sample.gx - offset;
            self.steer = self.filter.update(self.rate_deg_s);
        }
        self.steer
    }

    pub fn elapsed_s(&self) -> f64 {
        self.clock_s
    }

    pub fn reset(&mut self) {
        self.filter.reset();
        self.clock_s = 0.0;
        self.steer = 0.0;
        self.rate_deg_s = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::LatestSlot;
    use crate::calibration::CalibrationProfile;
    use crate::games::test_support::publish;
    use std::sync::Arc;

    #[test]
    fn test_steer_uses_gyro_offset() {
        let slot = Arc::new(LatestSlot::new());
        let profile = CalibrationProfile::default().shared();
        profile.write().gx_offset = 5.0;
        let ctx = GameContext::new(slot.clone(), profile);
        let mut game = CarGame::new(
            ctx,
            SteeringConfig {
                sensitivity_deg_s: 45.0,
                smoothing: 1.0,
            },
        );

        assert_eq!(game.tick(0.1), 0.0);

        publish(&slot, |s| s.gx = 27.5);
        assert_eq!(game.tick(0.1), 0.5);
        assert_eq!(game.rate_deg_s, 22.5);

        publish(&slot, |s| s.gx = -100.0);
        assert_eq!(game.tick(0.1), -1.0);

        game.reset();
        assert_eq!(game.steer, 0.0);
    }
}
