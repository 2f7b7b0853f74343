// src/calibration/profile.rs
//! Per-user calibration profile
//!
//! Holds rest/min/max for each analog channel, gyro offsets and detection
//! thresholds. One instance lives for the whole session and is handed to every
//! minigame as a [`SharedProfile`].
//!
//! Persisted as plain `key=value` lines:
//!
//! ```text
//! flex_thumb_rest=251.5
//! flex_thumb_min=251.5
//! flex_thumb_max=748.0
//! gx_offset=-0.42
//! index_threshold=0.6
//! ```

use crate::config::constants::calibration::*;
use crate::hal::Channel;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Handle to the session's single profile
pub type SharedProfile = Arc<RwLock<CalibrationProfile>>;

/// Map `value` from `[min, max]` onto `[0, 1]`, clamped.
///
/// A degenerate range (`max <= min`) yields 0 instead of dividing by zero; a
/// user who keeps a finger still through both calibration phases produces
/// exactly that.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max <= min || min.is_nan() || max.is_nan() {
        return 0.0;
    }
    let x = (value - min) / (max - min);
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Calibrated levels of one analog channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelRange {
    pub rest: f64,
    pub min: f64,
    pub max: f64,
}

impl ChannelRange {
    pub fn new(rest: f64, min: f64, max: f64) -> Self {
        Self { rest, min, max }
    }

    pub fn normalize(&self, value: f64) -> f64 {
        normalize(value, self.min, self.max)
    }
}

/// Per-gesture detection thresholds stored in the profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    /// Index finger flexion
    IndexFlex,
    /// Middle finger flexion
    MiddleFlex,
    /// Thumb pad pressure
    ThumbForce,
    /// Index pad pressure
    IndexForce,
}

impl Threshold {
    pub const ALL: [Threshold; 4] = [
        Threshold::IndexFlex,
        Threshold::MiddleFlex,
        Threshold::ThumbForce,
        Threshold::IndexForce,
    ];

    /// Key used in the profile file
    pub fn key(&self) -> &'static str {
        match self {
            Threshold::IndexFlex => "index_threshold",
            Threshold::MiddleFlex => "majeur_threshold",
            Threshold::ThumbForce => "thumb_fsr_threshold",
            Threshold::IndexForce => "index_fsr_threshold",
        }
    }
}

/// Where the profile's ranges came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProfileOrigin {
    /// Built-in defaults only
    Defaults,
    /// Ranges read from a profile file or set by the host
    Loaded,
    /// Ranges measured by a completed calibration this session
    Calibrated,
}

/// Errors while persisting or reading a profile
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("cannot access calibration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid value for `{key}` on line {line}")]
    InvalidValue { line: usize, key: String },
}

/// Calibration profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationProfile {
    pub flex_thumb: ChannelRange,
    pub flex_index: ChannelRange,
    pub fsr_thumb: ChannelRange,
    pub fsr_index: ChannelRange,

    pub gx_offset: f64,
    pub gy_offset: f64,
    pub gz_offset: f64,

    pub index_threshold: Option<f64>,
    pub majeur_threshold: Option<f64>,
    pub thumb_fsr_threshold: Option<f64>,
    pub index_fsr_threshold: Option<f64>,

    calibrated: bool,
    origin: ProfileOrigin,
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        let flex = ChannelRange::new(0.0, DEFAULT_FLEX_MIN, DEFAULT_FLEX_MAX);
        let fsr = ChannelRange::new(0.0, DEFAULT_FSR_MIN, DEFAULT_FSR_MAX);
        Self {
            flex_thumb: flex,
            flex_index: flex,
            fsr_thumb: fsr,
            fsr_index: fsr,
            gx_offset: 0.0,
            gy_offset: 0.0,
            gz_offset: 0.0,
            index_threshold: None,
            majeur_threshold: None,
            thumb_fsr_threshold: None,
            index_fsr_threshold: None,
            calibrated: false,
            origin: ProfileOrigin::Defaults,
        }
    }
}

impl CalibrationProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the profile for sharing across screens
    pub fn shared(self) -> SharedProfile {
        Arc::new(RwLock::new(self))
    }

    /// True only after a calibration procedure completed this session
    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn origin(&self) -> ProfileOrigin {
        self.origin
    }

    /// Whether the ranges describe this user (loaded or measured) rather than
    /// built-in defaults
    pub fn has_user_ranges(&self) -> bool {
        self.origin != ProfileOrigin::Defaults
    }

    pub(crate) fn mark_calibrated(&mut self) {
        self.calibrated = true;
        self.origin = ProfileOrigin::Calibrated;
    }

    pub fn range(&self, channel: Channel) -> ChannelRange {
        match channel {
            Channel::FlexThumb => self.flex_thumb,
            Channel::FlexIndex => self.flex_index,
            Channel::FsrThumb => self.fsr_thumb,
            Channel::FsrIndex => self.fsr_index,
        }
    }

    pub fn range_mut(&mut self, channel: Channel) -> &mut ChannelRange {
        match channel {
            Channel::FlexThumb => &mut self.flex_thumb,
            Channel::FlexIndex => &mut self.flex_index,
            Channel::FsrThumb => &mut self.fsr_thumb,
            Channel::FsrIndex => &mut self.fsr_index,
        }
    }

    /// Replace the min/max of one channel; the profile now carries user ranges
    pub fn set_range(&mut self, channel: Channel, min: f64, max: f64) {
        let range = self.range_mut(channel);
        range.min = min;
        range.max = max;
        if self.origin == ProfileOrigin::Defaults {
            self.origin = ProfileOrigin::Loaded;
        }
    }

    pub fn rest(&self, channel: Channel) -> f64 {
        self.range(channel).rest
    }

    /// Normalize a raw channel reading against this profile's range
    pub fn normalize_channel(&self, channel: Channel, value: f64) -> f64 {
        self.range(channel).normalize(value)
    }

    /// Threshold for `which`, falling back to the default when unset
    pub fn threshold(&self, which: Threshold) -> f64 {
        self.threshold_slot(which)
            .unwrap_or(DEFAULT_DETECTION_THRESHOLD)
    }

    pub fn set_threshold(&mut self, which: Threshold, value: f64) {
        *self.threshold_slot_mut(which) = Some(value);
    }

    /// Give every unset threshold its default value
    pub fn fill_default_thresholds(&mut self) {
        for which in Threshold::ALL {
            self.threshold_slot_mut(which)
                .get_or_insert(DEFAULT_DETECTION_THRESHOLD);
        }
    }

    fn threshold_slot(&self, which: Threshold) -> Option<f64> {
        match which {
            Threshold::IndexFlex => self.index_threshold,
            Threshold::MiddleFlex => self.majeur_threshold,
            Threshold::ThumbForce => self.thumb_fsr_threshold,
            Threshold::IndexForce => self.index_fsr_threshold,
        }
    }

    fn threshold_slot_mut(&mut self, which: Threshold) -> &mut Option<f64> {
        match which {
            Threshold::IndexFlex => &mut self.index_threshold,
            Threshold::MiddleFlex => &mut self.majeur_threshold,
            Threshold::ThumbForce => &mut self.thumb_fsr_threshold,
            Threshold::IndexForce => &mut self.index_fsr_threshold,
        }
    }

    /// Every persisted field as `(key, value)`, in file order
    pub fn entries(&self) -> Vec<(String, f64)> {
        let mut entries = Vec::with_capacity(19);
        for channel in Channel::ALL {
            entries.push((format!("{}_rest", channel.as_str()), self.range(channel).rest));
        }
        entries.push(("gx_offset".to_string(), self.gx_offset));
        entries.push(("gy_offset".to_string(), self.gy_offset));
        entries.push(("gz_offset".to_string(), self.gz_offset));
        for channel in Channel::ALL {
            let range = self.range(channel);
            entries.push((format!("{}_min", channel.as_str()), range.min));
            entries.push((format!("{}_max", channel.as_str()), range.max));
        }
        for which in Threshold::ALL {
            entries.push((which.key().to_string(), self.threshold(which)));
        }
        entries
    }

    /// Set one field by its file key. Returns false for unknown keys.
    fn set_entry(&mut self, key: &str, value: f64) -> bool {
        match key {
            "gx_offset" => self.gx_offset = value,
            "gy_offset" => self.gy_offset = value,
            "gz_offset" => self.gz_offset = value,
            _ => {
                if let Some(which) = Threshold::ALL.into_iter().find(|t| t.key() == key) {
                    self.set_threshold(which, value);
                    return true;
                }
                let Some((name, field)) = key.rsplit_once('_') else {
                    return false;
                };
                let Some(channel) = Channel::ALL.into_iter().find(|c| c.as_str() == name) else {
                    return false;
                };
                let range = self.range_mut(channel);
                match field {
                    "rest" => range.rest = value,
                    "min" => range.min = value,
                    "max" => range.max = value,
                    _ => return false,
                }
            }
        }
        true
    }

    /// Write every field to `path`, replacing any existing file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ProfileError> {
        let path = path.as_ref();
        let mut content = String::new();
        for (key, value) in self.entries() {
            // Debug formatting always keeps a fractional part ("200.0")
            let _ = writeln!(content, "{}={:?}", key, value);
        }
        std::fs::write(path, content).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "calibration profile saved");
        Ok(())
    }

    /// Read a profile file and apply the keys it contains.
    ///
    /// The whole file is validated before anything is applied: a value that is
    /// not a finite decimal rejects the file and leaves the profile untouched.
    /// Unknown keys are ignored, missing keys keep their current values.
    /// Returns the number of fields applied.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<usize, ProfileError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut parsed = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value: f64 = value
                .trim()
                .parse()
                .ok()
                .filter(|v: &f64| v.is_finite())
                .ok_or_else(|| ProfileError::InvalidValue {
                    line: index + 1,
                    key: key.to_string(),
                })?;
            parsed.push((key, value));
        }

        let mut applied = 0;
        let mut ranges_applied = false;
        for (key, value) in parsed {
            if self.set_entry(key, value) {
                applied += 1;
                ranges_applied |= key.ends_with("_min") || key.ends_with("_max");
            } else {
                debug!(key, "ignoring unknown calibration key");
            }
        }

        if ranges_applied && self.origin == ProfileOrigin::Defaults {
            self.origin = ProfileOrigin::Loaded;
        }
        info!(path = %path.display(), applied, "calibration profile loaded");
        Ok(applied)
    }

    /// [`load`](Self::load) reporting only success. On failure the profile is
    /// unchanged and a warning is logged.
    pub fn load_or_keep(&mut self, path: impl AsRef<Path>) -> bool {
        match self.load(path) {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "keeping current calibration profile");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_normalize_basics() {
        assert_eq!(normalize(500.0, 200.0, 800.0), 0.5);
        assert_eq!(normalize(100.0, 200.0, 800.0), 0.0);
        assert_eq!(normalize(900.0, 200.0, 800.0), 1.0);
        assert_eq!(normalize(500.0, 800.0, 800.0), 0.0);
        assert_eq!(normalize(500.0, 800.0, 200.0), 0.0);
        assert_eq!(normalize(f64::NAN, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_defaults() {
        let profile = CalibrationProfile::default();
        assert!(!profile.is_calibrated());
        assert!(!profile.has_user_ranges());
        assert_eq!(profile.range(Channel::FlexIndex), ChannelRange::new(0.0, 200.0, 800.0));
        assert_eq!(profile.range(Channel::FsrThumb), ChannelRange::new(0.0, 50.0, 900.0));
        assert_eq!(profile.threshold(Threshold::MiddleFlex), 0.6);
        assert_eq!(profile.majeur_threshold, None);
    }

    #[test]
    fn test_set_range_gives_user_ranges() {
        let mut profile = CalibrationProfile::default();
        profile.set_range(Channel::FlexThumb, 280.0, 720.0);
        assert!(profile.has_user_ranges());
        assert!(!profile.is_calibrated());
        assert_eq!(profile.normalize_channel(Channel::FlexThumb, 500.0), 0.5);
        assert_eq!(profile.rest(Channel::FlexThumb), 0.0);
    }

    #[test]
    fn test_fill_default_thresholds_keeps_set_values() {
        let mut profile = CalibrationProfile::default();
        profile.set_threshold(Threshold::IndexForce, 0.4);
        profile.fill_default_thresholds();
        assert_eq!(profile.index_fsr_threshold, Some(0.4));
        assert_eq!(profile.thumb_fsr_threshold, Some(0.6));
    }

    #[test]
    fn test_save_then_load_restores_fields() {
        let mut profile = CalibrationProfile::default();
        profile.flex_index = ChannelRange::new(210.5, 210.5, 744.25);
        profile.gz_offset = -1.75;
        profile.set_threshold(Threshold::ThumbForce, 0.55);

        let file = NamedTempFile::new().unwrap();
        profile.save(file.path()).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("flex_index_max=744.25\n"));
        assert!(content.contains("flex_thumb_rest=0.0\n"));
        assert!(content.contains("majeur_threshold=0.6\n"));

        let mut restored = CalibrationProfile::default();
        assert_eq!(restored.load(file.path()).unwrap(), 19);
        assert_eq!(restored.flex_index, profile.flex_index);
        assert_eq!(restored.gz_offset, -1.75);
        assert_eq!(restored.thumb_fsr_threshold, Some(0.55));
        assert_eq!(restored.origin(), ProfileOrigin::Loaded);
        assert!(!restored.is_calibrated());
    }

    #[test]
    fn test_load_partial_file_keeps_missing_keys() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "flex_thumb_rest=312.0").unwrap();
        writeln!(file, "gx_offset=0.8").unwrap();
        writeln!(file, "# comment without separator").unwrap();
        writeln!(file, "wrist_offset=12.0").unwrap();

        let mut profile = CalibrationProfile::default();
        assert_eq!(profile.load(file.path()).unwrap(), 2);
        assert_eq!(profile.flex_thumb.rest, 312.0);
        assert_eq!(profile.flex_thumb.max, 800.0);
        assert_eq!(profile.gx_offset, 0.8);
        // Rest values alone do not make the ranges user-specific
        assert_eq!(profile.origin(), ProfileOrigin::Defaults);
    }

    #[test]
    fn test_corrupt_file_leaves_profile_unchanged() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "flex_thumb_rest=312.0").unwrap();
        writeln!(file, "fsr_index_max=lots").unwrap();

        let mut profile = CalibrationProfile::default();
        match profile.load(file.path()) {
            Err(ProfileError::InvalidValue { line, key }) => {
                assert_eq!(line, 2);
                assert_eq!(key, "fsr_index_max");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
        assert_eq!(profile, CalibrationProfile::default());
    }

    #[test]
    fn test_missing_file_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut profile = CalibrationProfile::default();
        assert!(!profile.load_or_keep(dir.path().join("absent.txt")));
        assert_eq!(profile, CalibrationProfile::default());
    }

    proptest! {
        #[test]
        fn prop_normalize_is_bounded(
            value in -1e6f64..1e6,
            min in -1e4f64..1e4,
            width in 1e-3f64..1e4,
        ) {
            let max = min + width;
            let x = normalize(value, min, max);
            prop_assert!((0.0..=1.0).contains(&x));
            if value <= min { prop_assert_eq!(x, 0.0); }
            if value >= max { prop_assert_eq!(x, 1.0); }
        }

        #[test]
        fn prop_degenerate_range_is_zero(value in -1e6f64..1e6, min in -1e4f64..1e4, below in 0f64..1e4) {
            prop_assert_eq!(normalize(value, min, min - below), 0.0);
        }
    }
}
