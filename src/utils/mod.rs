//! Common utilities for glove-core

pub mod time;

pub use time::{FixedRateTicker, MockTimeProvider, SystemTimeProvider, TimeProvider};
