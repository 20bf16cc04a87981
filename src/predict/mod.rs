//! Prediction recomputation.
//!
//! - pure baseline/edited recompute (`engine`)
//! - debounced background worker (`worker`)

pub mod engine;
pub mod worker;

pub use engine::*;
pub use worker::*;
