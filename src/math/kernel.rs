//! Weight kernels shared by the drag and smoothing tools.
//!
//! Both tools weight knots by a Gaussian in index distance and cut the tail
//! off with a half-cosine window so influence reaches exactly zero at a finite
//! distance instead of decaying forever.

use std::f64::consts::PI;

/// Unnormalised Gaussian `exp(-d² / 2σ²)`.
///
/// `d = 0` always weighs 1; a non-positive sigma gives 0 everywhere else.
pub fn gaussian(d: f64, sigma: f64) -> f64 {
    if d == 0.0 {
        return 1.0;
    }
    if !(sigma > 0.0) {
        return 0.0;
    }
    (-(d * d) / (2.0 * sigma * sigma)).exp()
}

/// 1 inside `radius`, half-cosine roll-off over `(radius, radius + fade]`, 0 beyond.
pub fn half_cosine_taper(d: f64, radius: f64, fade: f64) -> f64 {
    let d = d.abs();
    if d <= radius {
        1.0
    } else if fade > 0.0 && d <= radius + fade {
        0.5 * (1.0 + (PI * (d - radius) / fade).cos())
    } else {
        0.0
    }
}

/// Gaussian weight with the half-cosine tail applied.
pub fn windowed_gaussian(d: f64, sigma: f64, radius: f64, fade: f64) -> f64 {
    gaussian(d, sigma) * half_cosine_taper(d, radius, fade)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gaussian_at_one_sigma() {
        assert_relative_eq!(gaussian(2.0, 2.0), (-0.5f64).exp(), epsilon = 1e-15);
        assert_eq!(gaussian(0.0, 0.0), 1.0);
        assert_eq!(gaussian(1.0, 0.0), 0.0);
    }

    #[test]
    fn taper_is_continuous_at_both_edges() {
        assert_eq!(half_cosine_taper(3.0, 3.0, 2.0), 1.0);
        assert_relative_eq!(half_cosine_taper(4.0, 3.0, 2.0), 0.5, epsilon = 1e-12);
        assert!(half_cosine_taper(5.0, 3.0, 2.0).abs() < 1e-12);
        assert_eq!(half_cosine_taper(5.1, 3.0, 2.0), 0.0);
    }

    #[test]
    fn zero_fade_is_a_hard_cutoff() {
        assert_eq!(half_cosine_taper(1.0, 1.0, 0.0), 1.0);
        assert_eq!(half_cosine_taper(1.5, 1.0, 0.0), 0.0);
    }
}
