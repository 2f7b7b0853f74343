// src/error.rs
//! Unified error handling for glove-core
//!
//! Each layer owns a small error enum ([`SerialError`], [`FrameError`],
//! [`ProfileError`], [`ConfigError`]). Only user-actionable failures are
//! converted into [`GloveError`] and escape to the calling screen. Frame
//! decode failures stay inside the acquisition thread, which only counts
//! them; [`GloveError::Frame`] exists for callers that run
//! [`parse_frame`](crate::hal::parse_frame) on lines they read themselves.

use crate::calibration::profile::ProfileError;
use crate::config::loader::ConfigError;
use crate::hal::frame::FrameError;
use crate::hal::serial_driver::SerialError;
use thiserror::Error;

/// Result type used across the public API
pub type GloveResult<T> = Result<T, GloveError>;

/// Unified error type for the glove pipeline
#[derive(Debug, Error)]
pub enum GloveError {
    /// The device could not be opened (invalid path, busy, permission denied)
    #[error("device open failed on {port}: {reason}")]
    DeviceOpen {
        /// Port or connector description
        port: String,
        /// Underlying cause as reported by the connector
        reason: String,
    },

    /// A frame could not be decoded
    ///
    /// Never produced by the acquisition channel; lets code that calls
    /// `parse_frame` directly use `?` inside a [`GloveResult`] function.
    #[error("frame decode error: {0}")]
    Frame(#[from] FrameError),

    /// Calibration profile persistence failed
    #[error("calibration profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Configuration could not be loaded or validated
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Acquisition worker could not be spawned
    #[error("acquisition worker error: {0}")]
    Worker(String),
}

impl GloveError {
    /// Whether the error is something the user can fix and retry
    /// (re-plug the glove, pick another port).
    pub fn is_retryable(&self) -> bool {
        matches!(self, GloveError::DeviceOpen { .. } | GloveError::Worker(_))
    }
}

impl From<SerialError> for GloveError {
    fn from(error: SerialError) -> Self {
        match error {
            SerialError::PortOpen { port, reason } => GloveError::DeviceOpen { port, reason },
            SerialError::Configuration(reason) => GloveError::DeviceOpen {
                port: "<invalid configuration>".to_string(),
                reason,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_error_becomes_device_open() {
        let error: GloveError = SerialError::PortOpen {
            port: "/dev/ttyACM9".to_string(),
            reason: "No such file or directory".to_string(),
        }
        .into();

        match &error {
            GloveError::DeviceOpen { port, reason } => {
                assert_eq!(port, "/dev/ttyACM9");
                assert!(reason.contains("No such file"));
            }
            other => panic!("Expected DeviceOpen, got {:?}", other),
        }
        assert!(error.is_retryable());
        assert!(error.to_string().contains("/dev/ttyACM9"));
    }

    #[test]
    fn test_frame_error_is_not_retryable() {
        let error: GloveError = FrameError::Empty.into();
        assert!(!error.is_retryable());
        assert!(error.to_string().starts_with("frame decode error"));
    }
}
