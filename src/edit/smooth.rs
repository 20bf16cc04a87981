//! Continuous smoothing brush as a discrete-time simulation.
//!
//! The host calls [`SmoothingBrush::step`] once per tick with the elapsed time
//! and feeds the result back in as the next tick's input, so successive ticks
//! compound. There is no timer in here; tests drive it with fixed `dt` values.
//!
//! Per tick, every knot inside the brush moves toward a Gaussian-weighted local
//! average of its neighbours. The approach fraction is `1 - exp(-rate·dt)`,
//! which makes the result independent of how the elapsed time is split into
//! ticks, and is capped per tick by `smooth_max_step`. Targets are clamped to
//! the min/max of a small neighbourhood so smoothing never creates new extrema.

use crate::domain::{EditorConfig, KnotSet};
use crate::math::{half_cosine_taper, windowed_gaussian};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingBrush {
    /// Brush centre in x units.
    pub center: f64,
    /// Strength in `[0, 1]`; scales both radius and rate.
    pub amount: f64,
    /// Neighbour window size in knot indices.
    pub neighbors: f64,
}

impl SmoothingBrush {
    pub fn new(center: f64, amount: f64, neighbors: f64) -> Self {
        let amount = if amount.is_finite() { amount.clamp(0.0, 1.0) } else { 0.0 };
        let neighbors = if neighbors.is_finite() { neighbors.max(1.0) } else { 1.0 };
        Self {
            center,
            amount,
            neighbors,
        }
    }

    /// Brush radius in x units: `amount × max_radius × x-span`.
    pub fn radius(&self, curve: &KnotSet, config: &EditorConfig) -> f64 {
        let span = match curve.x_range() {
            Some((lo, hi)) if hi > lo => hi - lo,
            _ => 1.0,
        };
        self.amount * config.smooth_max_radius * span
    }

    /// Advance the curve by `dt` seconds.
    pub fn step(&self, curve: &KnotSet, dt: f64, config: &EditorConfig) -> KnotSet {
        let mut out = curve.clone();
        let n = curve.len();
        if n < 3 || !(dt > 0.0 && dt.is_finite()) || self.amount <= 0.0 || !self.center.is_finite() {
            return out;
        }
        let radius = self.radius(curve, config);
        if !(radius > 0.0) {
            return out;
        }
        let alpha = approach_fraction(self.amount * config.smooth_rate, dt).min(config.smooth_max_step);
        if alpha <= 0.0 {
            return out;
        }

        let sigma = self.neighbors / 2.0;
        let fade = (self.neighbors / 2.0).max(1.0);
        let reach = (self.neighbors + fade).ceil() as usize;

        for i in 0..n {
            let y = curve.y[i];
            let dist = (curve.x[i] - self.center).abs();
            if !y.is_finite() || !(dist <= radius) {
                continue;
            }
            let influence = half_cosine_taper(dist, 0.0, radius);
            if influence <= 0.0 {
                continue;
            }

            let lo = i.saturating_sub(reach);
            let hi = i.saturating_add(reach).min(n - 1);
            let mut sum = 0.0;
            let mut weight = 0.0;
            for j in lo..=hi {
                let yj = curve.y[j];
                if !yj.is_finite() {
                    continue;
                }
                let w = windowed_gaussian(i.abs_diff(j) as f64, sigma, self.neighbors, fade);
                sum += w * yj;
                weight += w;
            }
            if weight <= 0.0 {
                continue;
            }

            let (env_lo, env_hi) = envelope(&curve.y, i, config.smooth_envelope);
            let target = (sum / weight).clamp(env_lo, env_hi);
            out.y[i] = y + (target - y) * alpha * influence;
        }
        out
    }
}

/// Fraction of the remaining gap closed after `dt` seconds at `rate` per second.
pub fn approach_fraction(rate: f64, dt: f64) -> f64 {
    if !(rate > 0.0 && dt > 0.0) {
        return 0.0;
    }
    -(-rate * dt).exp_m1()
}

/// Finite min/max of `y` within `half_width` indices of `i` (inclusive).
fn envelope(y: &[f64], i: usize, half_width: usize) -> (f64, f64) {
    let lo = i.saturating_sub(half_width);
    let hi = i.saturating_add(half_width).min(y.len() - 1);
    crate::math::finite_min_max(&y[lo..=hi]).unwrap_or((y[i], y[i]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn spike() -> KnotSet {
        let mut y = vec![0.0; 21];
        y[10] = 10.0;
        KnotSet::new((0..21).map(|i| i as f64).collect(), y).unwrap()
    }

    #[test]
    fn spike_is_pulled_down() {
        let config = EditorConfig::default();
        let brush = SmoothingBrush::new(10.0, 1.0, 2.0);
        let out = brush.step(&spike(), 1.0 / 60.0, &config);
        assert!(out.y[10] < 10.0);
        assert!(out.y[10] > 0.0);
    }

    #[test]
    fn ticks_compound() {
        let config = EditorConfig::default();
        let brush = SmoothingBrush::new(10.0, 1.0, 2.0);
        let once = brush.step(&spike(), 0.05, &config);
        let twice = brush.step(&once, 0.05, &config);
        assert!(twice.y[10] < once.y[10]);
    }

    #[test]
    fn never_leaves_the_local_envelope() {
        let config = EditorConfig::default();
        let brush = SmoothingBrush::new(10.0, 1.0, 3.0);
        let mut curve = spike();
        for _ in 0..200 {
            curve = brush.step(&curve, 0.1, &config);
            for &v in &curve.y {
                assert!((0.0..=10.0).contains(&v));
            }
        }
    }

    #[test]
    fn zero_dt_or_amount_is_a_no_op() {
        let config = EditorConfig::default();
        assert_eq!(SmoothingBrush::new(10.0, 1.0, 2.0).step(&spike(), 0.0, &config), spike());
        assert_eq!(SmoothingBrush::new(10.0, 0.0, 2.0).step(&spike(), 0.1, &config), spike());
        assert_eq!(SmoothingBrush::new(10.0, 1.0, 2.0).step(&spike(), f64::NAN, &config), spike());
    }

    #[test]
    fn knots_outside_the_brush_do_not_move() {
        let config = EditorConfig::default();
        let mut curve = spike();
        curve.y[0] = 4.0;
        let brush = SmoothingBrush::new(10.0, 0.5, 2.0);
        let out = brush.step(&curve, 0.1, &config);
        assert_eq!(out.y[0], 4.0);
    }

    #[test]
    fn huge_neighbor_window_covers_the_whole_curve() {
        let config = EditorConfig {
            smooth_envelope: usize::MAX,
            ..EditorConfig::default()
        };
        let out = SmoothingBrush::new(10.0, 1.0, 1e20).step(&spike(), 0.1, &config);
        assert_eq!(out.len(), spike().len());
        assert!(out.y.iter().all(|y| y.is_finite()));
        assert!(out.y[10] < 10.0);
    }

    #[test]
    fn approach_fraction_splits_evenly_over_ticks() {
        let full = approach_fraction(6.0, 0.1);
        let half = approach_fraction(6.0, 0.05);
        assert_relative_eq!(1.0 - (1.0 - half) * (1.0 - half), full, epsilon = 1e-12);
        assert_eq!(approach_fraction(6.0, 0.0), 0.0);
    }
}
