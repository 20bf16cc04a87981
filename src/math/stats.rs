//! NaN-tolerant summary statistics.
//!
//! Non-finite values are treated as absent everywhere in this module; nothing
//! here panics or errors on NaN/Infinity input.

/// Domain used when the data has no usable range at all.
const DEFAULT_DOMAIN: (f64, f64) = (0.0, 1.0);

/// Min and max of the finite values, or `None` if there are none.
pub fn finite_min_max(values: &[f64]) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        if v.is_finite() {
            min = min.min(v);
            max = max.max(v);
        }
    }
    if min.is_finite() && max.is_finite() {
        Some((min, max))
    } else {
        None
    }
}

/// Mean of the finite values, or `None` if there are none.
pub fn finite_mean(values: &[f64]) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for &v in values {
        if v.is_finite() {
            sum += v;
            n += 1;
        }
    }
    if n == 0 { None } else { Some(sum / n as f64) }
}

/// Finite range padded by `frac` of its span on both sides.
///
/// A single distinct value is widened by `±1` (scaled by `frac` when the value
/// is large) and an empty input falls back to `[0, 1]`.
pub fn padded_domain(values: &[f64], frac: f64) -> (f64, f64) {
    let Some((min, max)) = finite_min_max(values) else {
        return DEFAULT_DOMAIN;
    };
    pad_range(min, max, frac)
}

/// Pad an explicit range; degenerate ranges are widened around their center.
pub fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    if span < 1e-12 {
        let half = (min.abs() * frac).max(1.0);
        return (min - half, max + half);
    }
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n as f64 - 1.0);
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Resample a dense curve at `n` evenly spaced x positions.
///
/// `grid` must be sorted ascending. Positions are linearly interpolated from
/// the bracketing grid pair; a zero-width pair takes the left value.
pub fn discretize(grid: &[f64], curve: &[f64], n: usize) -> (Vec<f64>, Vec<f64>) {
    let len = grid.len().min(curve.len());
    if len == 0 || n == 0 {
        return (Vec::new(), Vec::new());
    }
    let xs = linspace(grid[0], grid[len - 1], n);
    let ys = xs
        .iter()
        .map(|&x| {
            for j in 0..len.saturating_sub(1) {
                if grid[j] <= x && x <= grid[j + 1] {
                    let width = grid[j + 1] - grid[j];
                    if width <= 0.0 {
                        return curve[j];
                    }
                    let t = (x - grid[j]) / width;
                    return curve[j] * (1.0 - t) + curve[j + 1] * t;
                }
            }
            curve[len - 1]
        })
        .collect();
    (xs, ys)
}
