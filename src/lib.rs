//! glove-core: sensor pipeline for a glove-controlled rehabilitation game suite
//!
//! The glove streams CSV frames over a serial link. This library turns them
//! into gameplay input:
//!
//! - Frame parsing and a background acquisition channel with a latest-sample slot
//! - Per-user calibration profiles and a timed two-phase calibration procedure
//! - Event detectors (pinch, press, dominant-finger tap, steering)
//! - Tick-driven minigame controllers and follow-up graphs
//! - Layered TOML configuration with environment overrides
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use glove_core::acquisition::AcquisitionChannel;
//! use glove_core::calibration::CalibrationProfile;
//! use glove_core::config::SystemConfig;
//! use glove_core::games::{GameContext, JumpGame, JumpTrigger};
//! use glove_core::utils::FixedRateTicker;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SystemConfig::default();
//!     let channel: Arc<AcquisitionChannel> = Arc::new(config.open_channel()?);
//!     channel.start()?;
//!
//!     let mut profile = CalibrationProfile::default();
//!     profile.load_or_keep(&config.calibration.profile_path);
//!
//!     let ctx = GameContext::new(channel.clone(), profile.shared());
//!     let mut game = JumpGame::new(
//!         ctx,
//!         JumpTrigger::Pinch,
//!         config.detection.pinch,
//!         config.detection.press,
//!     );
//!
//!     let mut ticker = FixedRateTicker::new(config.detection.game_tick_rate_hz);
//!     for _ in 0..600 {
//!         if let Some(jump) = game.tick(ticker.wait()) {
//!             println!("jump: {:?}", jump);
//!         }
//!     }
//!
//!     channel.stop();
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod calibration;
pub mod config;
pub mod detection;
pub mod error;
pub mod games;
pub mod hal;
pub mod utils;

// Re-export commonly used types for convenience
pub use acquisition::{AcquisitionChannel, LatestSlot, SampleSource, SampleStream};
pub use calibration::{
    CalibrationProcedure, CalibrationProfile, CalibrationState, SharedProfile,
};
pub use error::{GloveError, GloveResult};
pub use hal::{parse_frame, Channel, ChannelMap, Finger, FrameError, SensorSample};

pub use utils::time::{FixedRateTicker, TimeProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Sensor pipeline for a glove-controlled rehabilitation game suite".to_string(),
        features: vec![
            "Serial CSV frame acquisition".to_string(),
            "Two-phase user calibration".to_string(),
            "Pinch, press and tap detection".to_string(),
            "Minigame controllers".to_string(),
            "Layered TOML configuration".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}
