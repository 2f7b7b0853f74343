// src/hal/serial_driver.rs
//! Serial glove connector
//!
//! Opens the glove's USB-CDC serial port with the `serialport` crate and hands
//! the acquisition channel a buffered line stream. Opening is attempted once;
//! retrying is left to the calling screen.

use crate::config::constants::serial::*;
use crate::hal::traits::{DeviceConnector, LineStream};
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

/// Serial port configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SerialConfig {
    #[serde(default = "defaults::port_name")]
    pub port_name: String,
    #[serde(default = "defaults::baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "defaults::data_bits")]
    pub data_bits: u8,
    #[serde(default = "defaults::stop_bits")]
    pub stop_bits: u8,
    #[serde(default = "defaults::parity")]
    pub parity: Parity,
    #[serde(default = "defaults::flow_control")]
    pub flow_control: FlowControl,
    /// Per-read timeout; bounds how long the read loop takes to notice a stop
    #[serde(default = "defaults::timeout_ms")]
    pub timeout_ms: u32,
    #[serde(default = "defaults::read_buffer_size")]
    pub read_buffer_size: usize,
}

/// Serial parity settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Serial flow control settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

mod defaults {
    use super::{FlowControl, Parity};
    use crate::config::constants::serial::*;

    pub fn port_name() -> String { DEFAULT_PORT_NAME.to_string() }
    pub fn baud_rate() -> u32 { DEFAULT_BAUD_RATE }
    pub fn data_bits() -> u8 { 8 }
    pub fn stop_bits() -> u8 { 1 }
    pub fn parity() -> Parity { Parity::None }
    pub fn flow_control() -> FlowControl { FlowControl::None }
    pub fn timeout_ms() -> u32 { DEFAULT_READ_TIMEOUT_MS }
    pub fn read_buffer_size() -> usize { DEFAULT_READ_BUFFER_SIZE }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: defaults::port_name(),
            baud_rate: defaults::baud_rate(),
            data_bits: defaults::data_bits(),
            stop_bits: defaults::stop_bits(),
            parity: defaults::parity(),
            flow_control: defaults::flow_control(),
            timeout_ms: defaults::timeout_ms(),
            read_buffer_size: defaults::read_buffer_size(),
        }
    }
}

impl SerialConfig {
    /// Configuration for `port_name` at `baud_rate`, other settings default
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            ..Self::default()
        }
    }

    /// Check settings before touching the hardware
    pub fn validate(&self) -> Result<(), SerialError> {
        if self.port_name.is_empty() {
            return Err(SerialError::Configuration(
                "Port name cannot be empty".to_string(),
            ));
        }

        if self.baud_rate == 0 || self.baud_rate > MAX_BAUD_RATE {
            return Err(SerialError::Configuration(format!(
                "Invalid baud rate: {}",
                self.baud_rate
            )));
        }

        if !(5..=8).contains(&self.data_bits) {
            return Err(SerialError::Configuration(format!(
                "Invalid data bits: {}",
                self.data_bits
            )));
        }

        if !(1..=2).contains(&self.stop_bits) {
            return Err(SerialError::Configuration(format!(
                "Invalid stop bits: {}",
                self.stop_bits
            )));
        }

        if self.timeout_ms == 0 || self.timeout_ms > MAX_READ_TIMEOUT_MS {
            return Err(SerialError::Configuration(format!(
                "Invalid timeout: {} ms",
                self.timeout_ms
            )));
        }

        if self.read_buffer_size < MIN_READ_BUFFER_SIZE {
            return Err(SerialError::Configuration(format!(
                "Invalid buffer size: {}",
                self.read_buffer_size
            )));
        }

        Ok(())
    }
}

/// Errors raised while opening the serial device
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerialError {
    /// Device path invalid, busy, or permission denied
    #[error("cannot open serial port {port}: {reason}")]
    PortOpen { port: String, reason: String },
    #[error("invalid serial configuration: {0}")]
    Configuration(String),
}

/// Connector for the physical glove
#[derive(Debug, Clone)]
pub struct SerialConnector {
    config: SerialConfig,
}

impl SerialConnector {
    /// Validate `config` and build a connector. Does not open the port.
    pub fn new(config: SerialConfig) -> Result<Self, SerialError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

impl DeviceConnector for SerialConnector {
    fn connect(&self) -> Result<LineStream, SerialError> {
        let config = &self.config;
        debug!(port = %config.port_name, baud = config.baud_rate, "opening serial port");

        let port = serialport::new(&config.port_name, config.baud_rate)
            .data_bits(data_bits(config.data_bits))
            .stop_bits(stop_bits(config.stop_bits))
            .parity(parity(config.parity))
            .flow_control(flow_control(config.flow_control))
            .timeout(Duration::from_millis(config.timeout_ms as u64))
            .open()
            .map_err(|e| {
                error!(port = %config.port_name, error = %e, "failed to open serial port");
                SerialError::PortOpen {
                    port: config.port_name.clone(),
                    reason: e.to_string(),
                }
            })?;

        info!(port = %config.port_name, baud = config.baud_rate, "serial port opened");
        Ok(Box::new(BufReader::with_capacity(config.read_buffer_size, port)))
    }

    fn describe(&self) -> String {
        format!("{} @ {} baud", self.config.port_name, self.config.baud_rate)
    }
}

/// Names of the serial ports currently present on the system.
///
/// Enumeration failures yield an empty list; the host UI only uses this to
/// offer choices.
pub fn available_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            debug!(error = %e, "serial port enumeration failed");
            Vec::new()
        }
    }
}

fn data_bits(bits: u8) -> serialport::DataBits {
    match bits {
        5 => serialport::DataBits::Five,
        6 => serialport::DataBits::Six,
        7 => serialport::DataBits::Seven,
        _ => serialport::DataBits::Eight,
    }
}

fn stop_bits(bits: u8) -> serialport::StopBits {
    match bits {
        2 => serialport::StopBits::Two,
        _ => serialport::StopBits::One,
    }
}

fn parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
        Parity::Odd => serialport::Parity::Odd,
        Parity::Even => serialport::Parity::Even,
    }
}

fn flow_control(flow: FlowControl) -> serialport::FlowControl {
    match flow {
        FlowControl::None => serialport::FlowControl::None,
        FlowControl::Software => serialport::FlowControl::Software,
        FlowControl::Hardware => serialport::FlowControl::Hardware,
    }
}
