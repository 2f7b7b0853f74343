// src/calibration/procedure.rs
//! Timed calibration procedure
//!
//! Two deliberately posed hand shapes give the user's range: an open, relaxed
//! hand (phase 0) and a closed fist (phase 1). Each phase samples the
//! acquisition stream for a fixed duration and the per-channel means become
//! the profile's rest/min/max values.
//!
//! ```text
//! Idle ──begin──▶ Collecting(open) ──elapsed──▶ AwaitingNextPhase
//!                                                    │ begin
//!      Done ◀── Finalizing ◀──elapsed── Collecting(closed)
//! ```
//!
//! The host drives [`CalibrationProcedure::tick`] at
//! [`CalibrationProcedure::tick_interval`]; the procedure never blocks.

use crate::acquisition::SampleStream;
use crate::calibration::profile::{CalibrationProfile, SharedProfile};
use crate::config::constants::calibration::*;
use crate::hal::{Channel, SensorSample};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Number of posed phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMode {
    /// Open hand then closed hand; measures rest, min and max
    TwoPhase,
    /// Resting hand only; measures rest values and gyro offsets
    SinglePhase,
}

/// Hand shape being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CalibrationPhase {
    Open = 0,
    Closed = 1,
}

/// Why a calibration did not complete
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalibrationFailure {
    #[error("serial port error: {0}")]
    DeviceOpen(String),
    #[error("no data received during calibration")]
    NoData,
}

/// Procedure state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalibrationState {
    Idle,
    Collecting { phase: CalibrationPhase },
    AwaitingNextPhase,
    Finalizing,
    Done,
    Failed(CalibrationFailure),
}

/// Calibration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSettings {
    #[serde(default = "defaults::mode")]
    pub mode: CalibrationMode,
    #[serde(default = "defaults::phase_duration_s")]
    pub phase_duration_s: f64,
    #[serde(default = "defaults::tick_rate_hz")]
    pub tick_rate_hz: f64,
    /// Where a completed calibration is persisted
    #[serde(default = "defaults::profile_path")]
    pub profile_path: PathBuf,
}

mod defaults {
    use super::CalibrationMode;
    use crate::config::constants::calibration::*;
    use std::path::PathBuf;

    pub fn mode() -> CalibrationMode { CalibrationMode::TwoPhase }
    pub fn phase_duration_s() -> f64 { DEFAULT_PHASE_DURATION_S }
    pub fn tick_rate_hz() -> f64 { DEFAULT_TICK_RATE_HZ }
    pub fn profile_path() -> PathBuf { PathBuf::from(DEFAULT_PROFILE_PATH) }
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            mode: defaults::mode(),
            phase_duration_s: defaults::phase_duration_s(),
            tick_rate_hz: defaults::tick_rate_hz(),
            profile_path: defaults::profile_path(),
        }
    }
}

/// Arithmetic means of one phase's samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelMeans {
    pub flex_thumb: f64,
    pub flex_index: f64,
    pub fsr_thumb: f64,
    pub fsr_index: f64,
    pub gx: f64,
    pub gy: f64,
    pub gz: f64,
}

impl ChannelMeans {
    /// Means over `samples`, or `None` when there are none
    pub fn of(samples: &[SensorSample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let mean = |f: fn(&SensorSample) -> f64| samples.iter().map(f).sum::<f64>() / n;
        Some(Self {
            flex_thumb: mean(|s| s.flex_thumb as f64),
            flex_index: mean(|s| s.flex_index as f64),
            fsr_thumb: mean(|s| s.fsr_thumb as f64),
            fsr_index: mean(|s| s.fsr_index as f64),
            gx: mean(|s| s.gx),
            gy: mean(|s| s.gy),
            gz: mean(|s| s.gz),
        })
    }

    pub fn channel(&self, channel: Channel) -> f64 {
        match channel {
            Channel::FlexThumb => self.flex_thumb,
            Channel::FlexIndex => self.flex_index,
            Channel::FsrThumb => self.fsr_thumb,
            Channel::FsrIndex => self.fsr_index,
        }
    }
}

/// Values measured by a calibration, ready to be written to a profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationResult {
    pub open: ChannelMeans,
    /// Absent in single-phase mode
    pub closed: Option<ChannelMeans>,
}

impl CalibrationResult {
    /// Write the measured fields into `profile` and mark it calibrated
    pub fn apply_to(&self, profile: &mut CalibrationProfile) {
        for channel in Channel::ALL {
            let range = profile.range_mut(channel);
            range.rest = self.open.channel(channel);
            if let Some(closed) = &self.closed {
                range.min = self.open.channel(channel);
                range.max = closed.channel(channel);
            }
        }
        profile.gx_offset = self.open.gx;
        profile.gy_offset = self.open.gy;
        profile.gz_offset = self.open.gz;
        profile.fill_default_thresholds();
        profile.mark_calibrated();
    }
}

/// Compute calibration values from collected phases.
///
/// `closed` is `None` in single-phase mode. Returns `None` if any required
/// phase collected no samples.
pub fn compute_calibration(
    open: &[SensorSample],
    closed: Option<&[SensorSample]>,
) -> Option<CalibrationResult> {
    let open = ChannelMeans::of(open)?;
    let closed = match closed {
        Some(samples) => Some(ChannelMeans::of(samples)?),
        None => None,
    };
    Some(CalibrationResult { open, closed })
}

struct CalibrationSession {
    phase: CalibrationPhase,
    elapsed_s: f64,
    current: Vec<SensorSample>,
    open: Vec<SensorSample>,
}

impl CalibrationSession {
    fn new() -> Self {
        Self {
            phase: CalibrationPhase::Open,
            elapsed_s: 0.0,
            current: Vec::new(),
            open: Vec::new(),
        }
    }
}

const STATUS_READY: &str = "Relax your hand, open it, then press Start.";
const STATUS_OPEN: &str = "Calibrating open hand... keep still.";
const STATUS_AWAITING: &str = "Open hand recorded. Close your hand into a fist, then press Start.";
const STATUS_CLOSED: &str = "Calibrating closed hand... keep the fist closed.";
const STATUS_REST: &str = "Calibrating rest position... keep still.";
const STATUS_NO_DATA: &str = "No data received. Check the serial port.";

/// Calibration state machine
pub struct CalibrationProcedure {
    stream: Arc<dyn SampleStream>,
    profile: SharedProfile,
    settings: CalibrationSettings,
    state: CalibrationState,
    session: Option<CalibrationSession>,
    progress: f64,
    status: String,
    persist_error: Option<String>,
}

impl CalibrationProcedure {
    pub fn new(
        stream: Arc<dyn SampleStream>,
        profile: SharedProfile,
        settings: CalibrationSettings,
    ) -> Self {
        Self {
            stream,
            profile,
            settings,
            state: CalibrationState::Idle,
            session: None,
            progress: 0.0,
            status: STATUS_READY.to_string(),
            persist_error: None,
        }
    }

    /// Start collecting the next phase.
    ///
    /// From `Idle`, `Done` or `Failed` this starts over at the open-hand
    /// phase; from `AwaitingNextPhase` it starts the closed-hand phase.
    /// Ignored while a phase is being collected.
    pub fn begin(&mut self) -> &CalibrationState {
        let phase = match self.state {
            CalibrationState::Collecting { .. } | CalibrationState::Finalizing => {
                warn!("calibration already collecting, ignoring begin");
                return &self.state;
            }
            CalibrationState::AwaitingNextPhase => CalibrationPhase::Closed,
            CalibrationState::Idle | CalibrationState::Done | CalibrationState::Failed(_) => {
                self.session = Some(CalibrationSession::new());
                self.persist_error = None;
                CalibrationPhase::Open
            }
        };

        if let Err(e) = self.stream.start() {
            warn!(error = %e, "calibration could not open the device");
            self.session = None;
            self.progress = 0.0;
            self.status = format!("Serial port error: {}", e);
            self.state = CalibrationState::Failed(CalibrationFailure::DeviceOpen(e.to_string()));
            return &self.state;
        }

        let session = self.session.get_or_insert_with(CalibrationSession::new);
        session.phase = phase;
        session.elapsed_s = 0.0;
        session.current.clear();

        self.progress = 0.0;
        self.status = match (self.settings.mode, phase) {
            (CalibrationMode::SinglePhase, _) => STATUS_REST,
            (CalibrationMode::TwoPhase, CalibrationPhase::Open) => STATUS_OPEN,
            (CalibrationMode::TwoPhase, CalibrationPhase::Closed) => STATUS_CLOSED,
        }
        .to_string();
        self.state = CalibrationState::Collecting { phase };
        info!(?phase, mode = ?self.settings.mode, "calibration phase started");
        &self.state
    }

    /// Advance the phase timer by `dt` seconds and record the latest sample
    pub fn tick(&mut self, dt: f64) -> &CalibrationState {
        if !matches!(self.state, CalibrationState::Collecting { .. }) {
            return &self.state;
        }
        let Some(session) = self.session.as_mut() else {
            return &self.state;
        };

        if let Some(sample) = self.stream.latest() {
            session.current.push(sample);
        }
        session.elapsed_s += dt;

        let duration = self.settings.phase_duration_s;
        self.progress = if duration > 0.0 {
            (session.elapsed_s / duration).min(1.0)
        } else {
            1.0
        };

        if session.elapsed_s >= duration {
            self.finish_phase();
        }
        &self.state
    }

    /// Abandon the calibration and release the device
    pub fn abort(&mut self) {
        if matches!(self.state, CalibrationState::Collecting { .. }) {
            self.stream.stop();
        }
        self.session = None;
        self.progress = 0.0;
        self.status = STATUS_READY.to_string();
        self.state = CalibrationState::Idle;
    }

    fn finish_phase(&mut self) {
        self.stream.stop();
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if self.settings.mode == CalibrationMode::TwoPhase
            && session.phase == CalibrationPhase::Open
        {
            session.open = std::mem::take(&mut session.current);
            info!(samples = session.open.len(), "open-hand phase recorded");
            self.status = STATUS_AWAITING.to_string();
            self.state = CalibrationState::AwaitingNextPhase;
            return;
        }

        self.state = CalibrationState::Finalizing;
        self.finalize();
    }

    fn finalize(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        let result = match self.settings.mode {
            CalibrationMode::TwoPhase => compute_calibration(&session.open, Some(&session.current)),
            CalibrationMode::SinglePhase => compute_calibration(&session.current, None),
        };

        let Some(result) = result else {
            warn!(
                open = session.open.len(),
                current = session.current.len(),
                "calibration finished without data"
            );
            self.progress = 0.0;
            self.status = STATUS_NO_DATA.to_string();
            self.state = CalibrationState::Failed(CalibrationFailure::NoData);
            return;
        };

        let path = &self.settings.profile_path;
        let saved = {
            let mut profile = self.profile.write();
            result.apply_to(&mut profile);
            profile.save(path)
        };

        self.persist_error = match saved {
            Ok(()) => {
                self.status = format!("Calibration complete (saved to {}).", path.display());
                None
            }
            Err(e) => {
                warn!(error = %e, "calibration applied but not persisted");
                self.status = "Calibration complete, but the profile could not be saved.".to_string();
                Some(e.to_string())
            }
        };
        info!(?result, "calibration complete");
        self.state = CalibrationState::Done;
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    /// Phase being collected or awaited, `None` when idle or finished
    pub fn phase(&self) -> Option<CalibrationPhase> {
        match self.state {
            CalibrationState::Collecting { phase } => Some(phase),
            CalibrationState::AwaitingNextPhase => Some(CalibrationPhase::Closed),
            _ => None,
        }
    }

    /// Fraction of the current phase elapsed, in [0, 1]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// User-facing status line
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Samples gathered in the phase being collected
    pub fn samples_collected(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.current.len())
    }

    /// Set when the profile was updated but could not be written to disk
    pub fn persist_error(&self) -> Option<&str> {
        self.persist_error.as_deref()
    }

    pub fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    /// Interval at which the host should call [`tick`](Self::tick)
    pub fn tick_interval(&self) -> Duration {
        let rate = if self.settings.tick_rate_hz > 0.0 {
            self.settings.tick_rate_hz
        } else {
            DEFAULT_TICK_RATE_HZ
        };
        Duration::from_secs_f64(1.0 / rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::SampleSource;
    use crate::calibration::profile::ProfileOrigin;
    use crate::error::{GloveError, GloveResult};
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Stream that yields one scripted sample per `latest()` call, one script
    /// per `start()`
    struct ScriptedStream {
        scripts: Mutex<VecDeque<Vec<SensorSample>>>,
        current: Mutex<VecDeque<SensorSample>>,
        fail_open: bool,
        stops: Mutex<usize>,
    }

    impl ScriptedStream {
        fn new(scripts: Vec<Vec<SensorSample>>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts.into()),
                current: Mutex::new(VecDeque::new()),
                fail_open: false,
                stops: Mutex::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(VecDeque::new()),
                current: Mutex::new(VecDeque::new()),
                fail_open: true,
                stops: Mutex::new(0),
            })
        }
    }

    impl SampleSource for ScriptedStream {
        fn latest(&self) -> Option<SensorSample> {
            self.current.lock().pop_front()
        }
    }

    impl SampleStream for ScriptedStream {
        fn start(&self) -> GloveResult<()> {
            if self.fail_open {
                return Err(GloveError::DeviceOpen {
                    port: "COM3".to_string(),
                    reason: "access denied".to_string(),
                });
            }
            let script = self.scripts.lock().pop_front().unwrap_or_default();
            *self.current.lock() = script.into();
            Ok(())
        }

        fn stop(&self) {
            *self.stops.lock() += 1;
        }
    }

    fn flex_index(values: &[i32]) -> Vec<SensorSample> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| SensorSample {
                t_ms: i as u64 * 10,
                flex_thumb: v / 2,
                flex_index: v,
                fsr_thumb: 100,
                fsr_index: 100,
                ax: 0.0,
                ay: 0.0,
                az: 9.81,
                gx: 1.5,
                gy: -0.5,
                gz: 0.0,
            })
            .collect()
    }

    fn settings(dir: &tempfile::TempDir, mode: CalibrationMode) -> CalibrationSettings {
        CalibrationSettings {
            mode,
            phase_duration_s: 1.0,
            tick_rate_hz: 60.0,
            profile_path: dir.path().join("calibration.txt"),
        }
    }

    fn run_phase(procedure: &mut CalibrationProcedure) {
        for _ in 0..4 {
            procedure.tick(0.25);
        }
    }

    #[test]
    fn test_two_phase_means() {
        let dir = tempfile::tempdir().unwrap();
        let stream = ScriptedStream::new(vec![
            flex_index(&[100, 200, 300]),
            flex_index(&[700, 800]),
        ]);
        let profile = CalibrationProfile::default().shared();
        let mut procedure = CalibrationProcedure::new(
            stream.clone(),
            profile.clone(),
            settings(&dir, CalibrationMode::TwoPhase),
        );

        assert_eq!(
            procedure.begin(),
            &CalibrationState::Collecting { phase: CalibrationPhase::Open }
        );
        procedure.tick(0.25);
        assert_eq!(procedure.progress(), 0.25);
        assert_eq!(procedure.samples_collected(), 1);
        for _ in 0..3 {
            procedure.tick(0.25);
        }
        assert_eq!(procedure.state(), &CalibrationState::AwaitingNextPhase);
        assert_eq!(*stream.stops.lock(), 1);

        // Waiting for the user does not advance anything
        procedure.tick(0.25);
        assert_eq!(procedure.state(), &CalibrationState::AwaitingNextPhase);

        procedure.begin();
        assert_eq!(procedure.phase(), Some(CalibrationPhase::Closed));
        run_phase(&mut procedure);
        assert_eq!(procedure.state(), &CalibrationState::Done);
        assert!(procedure.persist_error().is_none());

        let profile = profile.read();
        assert_eq!(profile.flex_index.min, 200.0);
        assert_eq!(profile.flex_index.max, 750.0);
        assert_eq!(profile.flex_index.rest, 200.0);
        assert_eq!(profile.gx_offset, 1.5);
        assert_eq!(profile.gy_offset, -0.5);
        assert_eq!(profile.index_threshold, Some(0.6));
        assert!(profile.is_calibrated());
        assert_eq!(profile.origin(), ProfileOrigin::Calibrated);

        let mut reloaded = CalibrationProfile::default();
        reloaded.load(dir.path().join("calibration.txt")).unwrap();
        assert_eq!(reloaded.flex_index.max, 750.0);
    }

    #[test]
    fn test_empty_phase_leaves_profile_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let stream = ScriptedStream::new(vec![Vec::new(), flex_index(&[700, 800])]);
        let profile = CalibrationProfile::default().shared();
        let mut procedure = CalibrationProcedure::new(
            stream,
            profile.clone(),
            settings(&dir, CalibrationMode::TwoPhase),
        );

        procedure.begin();
        run_phase(&mut procedure);
        procedure.begin();
        run_phase(&mut procedure);

        assert_eq!(
            procedure.state(),
            &CalibrationState::Failed(CalibrationFailure::NoData)
        );
        assert_eq!(procedure.status(), STATUS_NO_DATA);
        assert_eq!(*profile.read(), CalibrationProfile::default());
        assert!(!profile.read().is_calibrated());
        assert!(!dir.path().join("calibration.txt").exists());
    }

    #[test]
    fn test_device_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let profile = CalibrationProfile::default().shared();
        let mut procedure = CalibrationProcedure::new(
            ScriptedStream::failing(),
            profile.clone(),
            settings(&dir, CalibrationMode::TwoPhase),
        );

        let state = procedure.begin().clone();
        assert!(matches!(
            state,
            CalibrationState::Failed(CalibrationFailure::DeviceOpen(ref reason)) if reason.contains("access denied")
        ));
        assert!(procedure.status().starts_with("Serial port error"));

        // Ticks after a failed open collect nothing
        procedure.tick(0.5);
        assert_eq!(procedure.samples_collected(), 0);
        assert_eq!(*profile.read(), CalibrationProfile::default());
    }

    #[test]
    fn test_single_phase_sets_rests_only() {
        let dir = tempfile::tempdir().unwrap();
        let stream = ScriptedStream::new(vec![flex_index(&[400, 420, 440])]);
        let profile = CalibrationProfile::default().shared();
        let mut procedure = CalibrationProcedure::new(
            stream,
            profile.clone(),
            settings(&dir, CalibrationMode::SinglePhase),
        );

        procedure.begin();
        run_phase(&mut procedure);
        assert_eq!(procedure.state(), &CalibrationState::Done);

        let profile = profile.read();
        assert_eq!(profile.flex_index.rest, 420.0);
        assert_eq!(profile.flex_thumb.rest, 210.0);
        assert_eq!(profile.flex_index.min, DEFAULT_FLEX_MIN);
        assert_eq!(profile.flex_index.max, DEFAULT_FLEX_MAX);
        assert!(profile.is_calibrated());
    }

    #[test]
    fn test_unwritable_profile_path_still_completes() {
        let dir = tempfile::tempdir().unwrap();
        let stream = ScriptedStream::new(vec![flex_index(&[400])]);
        let profile = CalibrationProfile::default().shared();
        let mut settings = settings(&dir, CalibrationMode::SinglePhase);
        settings.profile_path = dir.path().join("missing-dir").join("calibration.txt");
        let mut procedure = CalibrationProcedure::new(stream, profile.clone(), settings);

        procedure.begin();
        run_phase(&mut procedure);

        assert_eq!(procedure.state(), &CalibrationState::Done);
        assert!(procedure.persist_error().is_some());
        assert!(profile.read().is_calibrated());
    }

    #[test]
    fn test_abort_returns_to_idle() {
        let dir = tempfile::tempdir().unwrap();
        let stream = ScriptedStream::new(vec![flex_index(&[400, 410])]);
        let mut procedure = CalibrationProcedure::new(
            stream.clone(),
            CalibrationProfile::default().shared(),
            settings(&dir, CalibrationMode::TwoPhase),
        );

        procedure.begin();
        procedure.tick(0.25);
        procedure.abort();

        assert_eq!(procedure.state(), &CalibrationState::Idle);
        assert_eq!(procedure.progress(), 0.0);
        assert_eq!(procedure.samples_collected(), 0);
        assert_eq!(*stream.stops.lock(), 1);
    }

    #[test]
    fn test_compute_calibration_requires_both_phases() {
        let open = flex_index(&[100, 200, 300]);
        assert!(compute_calibration(&open, Some(&[])).is_none());
        assert!(compute_calibration(&[], None).is_none());

        let result = compute_calibration(&open, Some(&flex_index(&[700, 800]))).unwrap();
        assert_eq!(result.open.flex_index, 200.0);
        assert_eq!(result.closed.map(|c| c.flex_index), Some(750.0));
    }

    #[test]
    fn test_tick_interval_matches_rate() {
        let dir = tempfile::tempdir().unwrap();
        let procedure = CalibrationProcedure::new(
            ScriptedStream::new(Vec::new()),
            CalibrationProfile::default().shared(),
            settings(&dir, CalibrationMode::TwoPhase),
        );
        let interval = procedure.tick_interval().as_secs_f64();
        assert!((interval - 1.0 / 60.0).abs() < 1e-9);
    }
}
