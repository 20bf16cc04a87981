//! Editor tunables.
//!
//! Everything here has a sensible default so a session can be opened with
//! `EditorConfig::default()`; the CLI overrides individual fields and a JSON
//! file can replace the whole set.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Maximum number of history entries kept per session.
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Prediction requests arriving within this window are coalesced.
pub const DEFAULT_DEBOUNCE_MS: u64 = 120;

/// Grid density used when a feature has no editable points of its own.
pub const DEFAULT_GRID_POINTS: usize = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub history_limit: usize,
    pub debounce_ms: u64,

    /// Width (in knot indices) of the half-cosine taper beyond the drag radius.
    pub drag_fade: f64,
    /// Radius growth per unit of net horizontal pointer travel.
    pub drag_growth: f64,
    /// Upper bound on the dynamic drag radius (knot indices).
    pub drag_max_radius: f64,

    /// Maximum brush radius as a fraction of the feature's x-span.
    pub smooth_max_radius: f64,
    /// Approach rate toward the local average, per second at `amount = 1`.
    pub smooth_rate: f64,
    /// Largest fraction of the remaining gap closed in a single tick.
    pub smooth_max_step: f64,
    /// Half-width (knot indices) of the min/max envelope used to clamp targets.
    pub smooth_envelope: usize,

    pub grid_points: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            drag_fade: 2.0,
            drag_growth: 0.5,
            drag_max_radius: 64.0,
            smooth_max_radius: 0.25,
            smooth_rate: 6.0,
            smooth_max_step: 0.5,
            smooth_envelope: 1,
            grid_points: DEFAULT_GRID_POINTS,
        }
    }
}

impl EditorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Reject settings that would make the kernels misbehave.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.history_limit == 0 {
            return Err(AppError::new(2, "history_limit must be > 0."));
        }
        let non_negative = [
            ("drag_fade", self.drag_fade),
            ("drag_growth", self.drag_growth),
            ("drag_max_radius", self.drag_max_radius),
            ("smooth_max_radius", self.smooth_max_radius),
            ("smooth_rate", self.smooth_rate),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(AppError::new(2, format!("{name} must be finite and >= 0 (got {value}).")));
            }
        }
        if !(self.smooth_max_step.is_finite() && self.smooth_max_step > 0.0 && self.smooth_max_step <= 1.0) {
            return Err(AppError::new(2, "smooth_max_step must be in (0, 1]."));
        }
        Ok(())
    }

    /// Load a config file (JSON). Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path)
            .map_err(|e| AppError::new(2, format!("Failed to open config '{}': {e}", path.display())))?;
        let config: EditorConfig = serde_json::from_reader(file)
            .map_err(|e| AppError::new(2, format!("Invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EditorConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: EditorConfig = serde_json::from_str(r#"{"debounce_ms": 50}"#).unwrap();
        assert_eq!(config.debounce_ms, 50);
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn rejects_zero_step() {
        let config = EditorConfig {
            smooth_max_step: 0.0,
            ..EditorConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().exit_code(), 2);
    }
}
