// src/acquisition/mod.rs
//! Sample acquisition: background reader and latest-sample slot

pub mod channel;
pub mod slot;
pub mod source;

pub use channel::*;
pub use slot::*;
pub use source::*;
