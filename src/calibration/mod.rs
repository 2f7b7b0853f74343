// src/calibration/mod.rs
//! User calibration: the persisted profile and the procedure that measures it

pub mod procedure;
pub mod profile;

pub use procedure::{
    compute_calibration, CalibrationFailure, CalibrationMode, CalibrationPhase,
    CalibrationProcedure, CalibrationResult, CalibrationSettings, CalibrationState, ChannelMeans,
};
pub use profile::{
    normalize, CalibrationProfile, ChannelRange, ProfileError, ProfileOrigin, SharedProfile,
    Threshold,
};
