//! Knot editing.
//!
//! Responsibilities:
//!
//! - resolve click/brush/drag gestures into a knot selection (`selection`)
//! - pure curve-to-curve edit operations (`ops`)
//! - the weighted drag gesture (`drag`)
//! - the time-stepped smoothing brush (`smooth`)

pub mod drag;
pub mod ops;
pub mod selection;
pub mod smooth;

pub use drag::*;
pub use ops::*;
pub use selection::*;
pub use smooth::*;
