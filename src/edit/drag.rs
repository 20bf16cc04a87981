//! Weighted drag of a knot group.
//!
//! A drag moves its target knots by the full pointer delta and drags their
//! neighbours along with a Gaussian falloff in index distance. The falloff
//! radius widens with net horizontal pointer travel since the drag started.
//!
//! Pointer positions are expressed in (fractional) knot-index units.

use crate::domain::{EditorConfig, KnotSet};
use crate::math::windowed_gaussian;

/// An in-progress drag.
///
/// Every update is computed from the curve as it was when the drag began, so
/// moving the pointer back and forth never accumulates error.
#[derive(Debug, Clone, PartialEq)]
pub struct DragGesture {
    start: KnotSet,
    targets: Vec<usize>,
    origin: f64,
    radius: f64,
}

impl DragGesture {
    /// Start a drag of `targets` at pointer position `origin` with a raw
    /// falloff `radius` (knot indices). Out-of-range targets are dropped.
    pub fn begin(curve: &KnotSet, targets: &[usize], origin: f64, radius: f64) -> Self {
        let mut targets: Vec<usize> = targets.iter().copied().filter(|&i| i < curve.len()).collect();
        targets.sort_unstable();
        targets.dedup();
        Self {
            start: curve.clone(),
            targets,
            origin,
            radius: if radius.is_finite() { radius.max(0.0) } else { 0.0 },
        }
    }

    pub fn start(&self) -> &KnotSet {
        &self.start
    }

    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    /// Raw radius widened by net horizontal travel, capped by the config.
    pub fn dynamic_radius(&self, pointer: f64, config: &EditorConfig) -> f64 {
        let travel = (pointer - self.origin).abs();
        let travel = if travel.is_finite() { travel } else { 0.0 };
        let cap = config.drag_max_radius.max(self.radius);
        (self.radius + config.drag_growth * travel).min(cap)
    }

    /// Per-knot weight for a given radius.
    ///
    /// Distance is measured to the nearest drag target, so a multi-knot drag
    /// moves as one group weighted toward its centre.
    pub fn weights(&self, radius: f64, fade: f64) -> Vec<f64> {
        let sigma = radius / 2.0;
        (0..self.start.len())
            .map(|i| match nearest_distance(&self.targets, i) {
                Some(d) => windowed_gaussian(d, sigma, radius, fade),
                None => 0.0,
            })
            .collect()
    }

    /// Curve after moving the targets by `delta` with the pointer at `pointer`.
    pub fn apply(&self, delta: f64, pointer: f64, config: &EditorConfig) -> KnotSet {
        let mut out = self.start.clone();
        if !delta.is_finite() {
            return out;
        }
        let radius = self.dynamic_radius(pointer, config);
        for (i, w) in self.weights(radius, config.drag_fade).into_iter().enumerate() {
            if w > 0.0 {
                out.y[i] = self.start.y[i] + delta * w;
            }
        }
        out
    }
}

/// Index distance from `i` to the closest entry of the sorted `targets`.
fn nearest_distance(targets: &[usize], i: usize) -> Option<f64> {
    if targets.is_empty() {
        return None;
    }
    let pos = targets.partition_point(|&t| t < i);
    let right = targets.get(pos).map(|&t| t - i);
    let left = pos.checked_sub(1).map(|p| i - targets[p]);
    let d = match (left, right) {
        (Some(l), Some(r)) => l.min(r),
        (Some(l), None) => l,
        (None, Some(r)) => r,
        (None, None) => return None,
    };
    Some(d as f64)
}
