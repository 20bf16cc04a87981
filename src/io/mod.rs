//! Input/output helpers.
//!
//! - model result JSON read/write and baseline reconstruction (`model`)
//! - HTTP artifact client (`artifact`)
//! - JSON edit scripts (`script`)

pub mod artifact;
pub mod model;
pub mod script;

pub use artifact::*;
pub use model::*;
pub use script::*;
