//! Edit history.
//!
//! - diff-based undo/redo ledger (`ledger`)
//! - history cache encode/decode and file store (`cache`)

pub mod cache;
pub mod ledger;

pub use cache::*;
pub use ledger::*;
