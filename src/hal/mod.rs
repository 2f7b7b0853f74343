// src/hal/mod.rs
//! Hardware abstraction layer for the glove

pub mod frame;
pub mod serial_driver;
pub mod simulator;
pub mod traits;
pub mod types;


pub use frame::{decode_line, parse_frame, FrameError};
pub use traits::*;
pub use types::*;
