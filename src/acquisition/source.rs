// src/acquisition/source.rs
//! Traits consumed by calibration and the minigames

use crate::error::GloveResult;
use crate::hal::SensorSample;

/// Anything that can hand out the freshest known sample without blocking
pub trait SampleSource: Send + Sync {
    /// Most recent sample, or `None` if nothing arrived yet
    fn latest(&self) -> Option<SensorSample>;
}

/// A sample source whose device can be opened and closed
pub trait SampleStream: SampleSource {
    /// Open the device and begin acquisition
    fn start(&self) -> GloveResult<()>;

    /// Stop acquisition and release the device. Idempotent.
    fn stop(&self);
}
