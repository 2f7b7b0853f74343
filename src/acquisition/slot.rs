// src/acquisition/slot.rs
//! Single-writer, many-reader "latest sample" slot

use crate::acquisition::source::SampleSource;
use crate::hal::SensorSample;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Holds only the newest sample.
///
/// There is no queue behind it: a reader either sees "nothing yet" or one
/// complete sample, and the writer never waits on a reader for longer than a
/// copy of a `SensorSample`.
///
/// Writers that belong to an acquisition session publish through
/// [`publish_in`](LatestSlot::publish_in); once the session is ended or a new
/// one begins, their writes are dropped.
#[derive(Debug, Default)]
pub struct LatestSlot {
    state: RwLock<SlotState>,
    published: AtomicU64,
}

#[derive(Debug, Default)]
struct SlotState {
    session: u64,
    sample: Option<SensorSample>,
}

impl LatestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current sample
    pub fn publish(&self, sample: SensorSample) {
        self.state.write().sample = Some(sample);
        self.published.fetch_add(1, Ordering::Release);
    }

    /// Replace the current sample if `session` is still the active one.
    /// Returns whether the sample was stored.
    pub fn publish_in(&self, session: u64, sample: SensorSample) -> bool {
        let mut state = self.state.write();
        if state.session != session {
            return false;
        }
        state.sample = Some(sample);
        self.published.fetch_add(1, Ordering::Release);
        true
    }

    /// Forget the current sample and open a new session
    pub fn begin_session(&self) -> u64 {
        let mut state = self.state.write();
        state.session += 1;
        state.sample = None;
        state.session
    }

    /// Close the active session; the last sample stays readable
    pub fn end_session(&self) {
        self.state.write().session += 1;
    }

    /// Forget the current sample
    pub fn clear(&self) {
        self.state.write().sample = None;
    }

    /// Copy of the newest sample, if any
    pub fn get(&self) -> Option<SensorSample> {
        self.state.read().sample
    }

    /// Number of samples published since creation
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Acquire)
    }
}

impl SampleSource for LatestSlot {
    fn latest(&self) -> Option<SensorSample> {
        self.get()
    }
}
