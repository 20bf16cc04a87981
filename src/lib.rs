//! `shape-editor` library crate.
//!
//! The binary (`shapes`) is a thin wrapper around this library, so editing,
//! history and prediction logic is testable without a terminal.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod edit;
pub mod error;
pub mod history;
pub mod io;
pub mod math;
pub mod plot;
pub mod predict;
pub mod report;
pub mod session;
pub mod tui;
