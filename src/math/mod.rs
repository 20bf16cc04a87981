//! Numeric utilities: interpolation, kernels, and NaN-tolerant statistics.

pub mod interp;
pub mod kernel;
pub mod stats;

pub use interp::*;
pub use kernel::*;
pub use stats::*;
