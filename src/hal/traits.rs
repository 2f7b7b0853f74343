// src/hal/traits.rs
//! Core HAL traits for glove device abstraction

use crate::hal::serial_driver::SerialError;
use std::io::BufRead;

/// Line-oriented byte stream produced by an open device
pub type LineStream = Box<dyn BufRead + Send>;

/// Something that can open a connection to the glove.
///
/// Each call to [`connect`](DeviceConnector::connect) opens a fresh stream;
/// the acquisition channel calls it on every `start()` and drops the stream
/// when its read loop exits. Reads on the returned stream must time out
/// (return `TimedOut`/`WouldBlock`) rather than block forever, so the read
/// loop can observe a stop request.
pub trait DeviceConnector: Send + Sync {
    /// Open the device
    fn connect(&self) -> Result<LineStream, SerialError>;

    /// Human-readable device description (port name) for logs and errors
    fn describe(&self) -> String;
}
