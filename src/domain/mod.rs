//! Domain types used throughout the editor.
//!
//! This module defines:
//!
//! - curve and feature types (`KnotSet`, `FeatureDescriptor`, `ScatterValue`)
//! - the model file schema (`ModelResult`, `Partial`)
//! - recompute outputs (`ModelSnapshot`, `PredictionReport`)
//! - editor tunables (`EditorConfig`)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
