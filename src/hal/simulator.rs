// src/hal/simulator.rs
//! Glove simulator and scripted connectors
//!
//! [`SimulatedConnector`] streams synthetic CSV frames at a fixed rate so the
//! games and the calibration procedure can run without hardware.
//! [`ScriptedConnector`] replays a fixed list of lines once, which is what the
//! acquisition tests feed through the real read loop.

use crate::config::constants::simulation::*;
use crate::hal::serial_driver::SerialError;
use crate::hal::traits::{DeviceConnector, LineStream};
use crate::hal::types::SensorSample;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::io::{self, BufReader, Cursor, Read};
use std::time::{Duration, Instant};

/// Hand motion the simulator plays back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GesturePattern {
    /// Open relaxed hand
    Rest,
    /// Closed fist, both flex sensors bent and both pads pressed
    Fist,
    /// Thumb and index press together, `period_s` per cycle
    Pinch { period_s: f64 },
    /// Index and middle bend in turn, `period_s` per finger
    AlternatingFlex { period_s: f64 },
    /// Wrist rotates back and forth
    WristSweep { amplitude_deg_s: f64, period_s: f64 },
}

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub rate_hz: u32,
    pub pattern: GesturePattern,
    /// Raw counts of uniform noise added to analog channels
    pub noise_counts: f64,
    /// Fixed seed for reproducible noise
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            rate_hz: DEFAULT_FRAME_RATE_HZ,
            pattern: GesturePattern::Pinch { period_s: 1.0 },
            noise_counts: DEFAULT_NOISE_COUNTS,
            seed: None,
        }
    }
}

/// Deterministic model of the glove's raw output
pub struct GloveSimulator {
    config: SimulatorConfig,
    rng: StdRng,
}

impl GloveSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Sample the pattern at `t_s` seconds since start
    pub fn sample_at(&mut self, t_s: f64) -> SensorSample {
        let (flex_thumb, flex_index, fsr_thumb, fsr_index, gx) = match self.config.pattern {
            GesturePattern::Rest => (FLEX_OPEN, FLEX_OPEN, FSR_RELEASED, FSR_RELEASED, 0.0),
            GesturePattern::Fist => (FLEX_CLOSED, FLEX_CLOSED, FSR_PRESSED, FSR_PRESSED, 0.0),
            GesturePattern::Pinch { period_s } => {
                let pressed = phase(t_s, period_s) < 0.5;
                let force = if pressed { FSR_PRESSED } else { FSR_RELEASED };
                (FLEX_OPEN, FLEX_OPEN, force, force, 0.0)
            }
            GesturePattern::AlternatingFlex { period_s } => {
                let index_turn = phase(t_s, 2.0 * period_s) < 0.5;
                if index_turn {
                    (FLEX_OPEN, FLEX_CLOSED, FSR_RELEASED, FSR_RELEASED, 0.0)
                } else {
                    (FLEX_CLOSED, FLEX_OPEN, FSR_RELEASED, FSR_RELEASED, 0.0)
                }
            }
            GesturePattern::WristSweep { amplitude_deg_s, period_s } => {
                let gx = amplitude_deg_s * (TAU * phase(t_s, period_s)).sin();
                (FLEX_OPEN, FLEX_OPEN, FSR_RELEASED, FSR_RELEASED, gx)
            }
        };

        SensorSample {
            t_ms: (t_s * 1000.0).max(0.0) as u64,
            flex_thumb: self.noisy(flex_thumb),
            flex_index: self.noisy(flex_index),
            fsr_thumb: self.noisy(fsr_thumb),
            fsr_index: self.noisy(fsr_index),
            ax: 0.0,
            ay: 0.0,
            az: GRAVITY_MS2,
            gx,
            gy: 0.0,
            gz: 0.0,
        }
    }

    fn noisy(&mut self, base: f64) -> i32 {
        // NaN and infinite amplitudes would make the range invalid
        let noise = if self.config.noise_counts > 0.0 && self.config.noise_counts.is_finite() {
            self.rng
                .gen_range(-self.config.noise_counts..=self.config.noise_counts)
        } else {
            0.0
        };
        (base + noise).round().clamp(0.0, ADC_MAX) as i32
    }
}

fn phase(t_s: f64, period_s: f64) -> f64 {
    if period_s <= 0.0 {
        return 0.0;
    }
    (t_s / period_s).rem_euclid(1.0)
}

/// Connector producing an endless, rate-limited stream of simulated frames
#[derive(Debug, Clone, Default)]
pub struct SimulatedConnector {
    config: SimulatorConfig,
}

impl SimulatedConnector {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }
}

impl DeviceConnector for SimulatedConnector {
    fn connect(&self) -> Result<LineStream, SerialError> {
        if self.config.rate_hz == 0 {
            return Err(SerialError::Configuration(
                "Simulator frame rate must be greater than 0".to_string(),
            ));
        }
        let stream = SimulatedStream {
            simulator: GloveSimulator::new(self.config.clone()),
            period: Duration::from_secs_f64(1.0 / self.config.rate_hz as f64),
            started: Instant::now(),
            next_frame: Instant::now(),
            pending: Vec::new(),
            cursor: 0,
            header_sent: false,
        };
        Ok(Box::new(BufReader::new(stream)))
    }

    fn describe(&self) -> String {
        format!("simulated glove @ {} Hz", self.config.rate_hz)
    }
}

/// Byte source pacing frames like the real firmware does
struct SimulatedStream {
    simulator: GloveSimulator,
    period: Duration,
    started: Instant,
    next_frame: Instant,
    pending: Vec<u8>,
    cursor: usize,
    header_sent: bool,
}

impl Read for SimulatedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cursor >= self.pending.len() {
            let now = Instant::now();
            if now < self.next_frame {
                std::thread::sleep(self.next_frame - now);
            }
            self.next_frame += self.period;

            self.pending.clear();
            self.cursor = 0;
            if !self.header_sent {
                // The firmware announces its columns once after reset
                self.pending.extend_from_slice(CSV_HEADER.as_bytes());
                self.pending.push(b'\n');
                self.header_sent = true;
            }
            let t_s = self.started.elapsed().as_secs_f64();
            let line = self.simulator.sample_at(t_s).to_csv_line();
            self.pending.extend_from_slice(line.as_bytes());
            self.pending.push(b'\n');
        }

        let available = &self.pending[self.cursor..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.cursor += n;
        Ok(n)
    }
}

/// Connector replaying a fixed script of lines, or failing to open
#[derive(Debug, Clone)]
pub struct ScriptedConnector {
    lines: Vec<String>,
    open_error: Option<String>,
}

impl ScriptedConnector {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            open_error: None,
        }
    }

    /// A connector whose `connect` always fails with `reason`
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            lines: Vec::new(),
            open_error: Some(reason.into()),
        }
    }
}

impl DeviceConnector for ScriptedConnector {
    fn connect(&self) -> Result<LineStream, SerialError> {
        if let Some(reason) = &self.open_error {
            return Err(SerialError::PortOpen {
                port: self.describe(),
                reason: reason.clone(),
            });
        }
        let mut bytes = Vec::new();
        for line in &self.lines {
            bytes.extend_from_slice(line.as_bytes());
            bytes.push(b'\n');
        }
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn describe(&self) -> String {
        "scripted glove".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::frame::parse_frame;
    use std::io::BufRead;

    fn quiet(pattern: GesturePattern) -> GloveSimulator {
        GloveSimulator::new(SimulatorConfig {
            rate_hz: 100,
            pattern,
            noise_counts: 0.0,
            seed: Some(7),
        })
    }

    #[test]
    fn test_rest_and_fist_levels() {
        let rest = quiet(GesturePattern::Rest).sample_at(0.5);
        let fist = quiet(GesturePattern::Fist).sample_at(0.5);
        assert!(fist.flex_index > rest.flex_index);
        assert!(fist.fsr_thumb > rest.fsr_thumb);
        assert_eq!(rest.t_ms, 500);
    }

    #[test]
    fn test_non_finite_noise_is_ignored() {
        for noise in [f64::NAN, f64::INFINITY] {
            let mut sim = GloveSimulator::new(SimulatorConfig {
                noise_counts: noise,
                pattern: GesturePattern::Rest,
                ..SimulatorConfig::default()
            });
            assert_eq!(sim.sample_at(0.2).flex_index as f64, FLEX_OPEN);
        }
    }

    #[test]
    fn test_pinch_pattern_toggles() {
        let mut sim = quiet(GesturePattern::Pinch { period_s: 1.0 });
        let pressed = sim.sample_at(0.1);
        let released = sim.sample_at(0.7);
        assert!(pressed.fsr_thumb > released.fsr_thumb);
        assert_eq!(pressed.fsr_thumb, pressed.fsr_index);
    }

    #[test]
    fn test_alternating_flex_never_bends_both() {
        let mut sim = quiet(GesturePattern::AlternatingFlex { period_s: 0.5 });
        for step in 0..40 {
            let s = sim.sample_at(step as f64 * 0.05);
            assert_ne!(s.flex_index, s.flex_thumb);
        }
    }

    #[test]
    fn test_noise_stays_in_adc_range() {
        let mut sim = GloveSimulator::new(SimulatorConfig {
            noise_counts: 2000.0,
            seed: Some(1),
            ..SimulatorConfig::default()
        });
        for step in 0..100 {
            let s = sim.sample_at(step as f64 * 0.01);
            assert!((0..=1023).contains(&s.flex_thumb));
            assert!((0..=1023).contains(&s.fsr_index));
        }
    }

    #[test]
    fn test_simulated_stream_emits_header_then_frames() {
        let connector = SimulatedConnector::new(SimulatorConfig {
            rate_hz: 1000,
            seed: Some(3),
            ..SimulatorConfig::default()
        });
        let mut stream = connector.connect().unwrap();

        let mut header = String::new();
        stream.read_line(&mut header).unwrap();
        assert!(header.starts_with("t_ms"));

        let mut line = String::new();
        stream.read_line(&mut line).unwrap();
        assert!(parse_frame(&line).is_ok());
    }

    #[test]
    fn test_scripted_connector_failure() {
        let connector = ScriptedConnector::failing("device busy");
        assert!(matches!(
            connector.connect(),
            Err(SerialError::PortOpen { reason, .. }) if reason == "device busy"
        ));
    }
}
