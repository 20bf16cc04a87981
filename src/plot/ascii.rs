//! ASCII plotting of a shape function for terminal output.
//!
//! Fixed-size grid, deterministic output. Plot elements:
//! - baseline curve: `.`
//! - edited curve: `-`
//! - edited knots: `o`
//! - selected knots: `*`
//!
//! Categorical features are drawn as one column per category.

use crate::domain::{FeatureDescriptor, KnotSet};
use crate::math::{evaluate, pad_range};

/// Render one feature's baseline and edited curves.
pub fn render_shape_plot(
    feature: &FeatureDescriptor,
    baseline: &KnotSet,
    edited: &KnotSet,
    selection: &[usize],
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = if feature.is_categorical() {
        (-0.5, edited.len().max(baseline.len()).max(1) as f64 - 0.5)
    } else {
        x_domain(baseline, edited)
    };
    let (y_min, y_max) = match y_bounds(baseline, edited) {
        Some((lo, hi)) => pad_range(lo, hi, 0.05),
        None => (-1.0, 1.0),
    };

    let mut grid = vec![vec![' '; width]; height];

    if feature.is_categorical() {
        for (x, y) in baseline.points() {
            put(&mut grid, x, y, (x_min, x_max), (y_min, y_max), '.');
        }
    } else {
        // Edited first so it wins where the two overlap.
        for (curve, ch) in [(edited, '-'), (baseline, '.')] {
            let samples = sample_curve(curve, x_min, x_max, width);
            draw_curve(&mut grid, &samples, (x_min, x_max), (y_min, y_max), ch);
        }
    }

    for (i, (x, y)) in edited.points().enumerate() {
        let ch = if selection.contains(&i) { '*' } else { 'o' };
        put(&mut grid, x, y, (x_min, x_max), (y_min, y_max), ch);
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {} | x=[{x_min:.3}, {x_max:.3}] | y=[{y_min:.3}, {y_max:.3}]\n",
        feature.display_label()
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    if let Some(categories) = &feature.categories {
        out.push_str(&format!("Categories: {}\n", categories.join(", ")));
    }
    out
}

fn x_domain(baseline: &KnotSet, edited: &KnotSet) -> (f64, f64) {
    let xs: Vec<f64> = baseline.x.iter().chain(&edited.x).copied().collect();
    match crate::math::finite_min_max(&xs) {
        Some((lo, hi)) if hi > lo => (lo, hi),
        _ => crate::math::padded_domain(&xs, 0.05),
    }
}

fn y_bounds(baseline: &KnotSet, edited: &KnotSet) -> Option<(f64, f64)> {
    let ys: Vec<f64> = baseline.y.iter().chain(&edited.y).copied().collect();
    crate::math::finite_min_max(&ys)
}

fn sample_curve(curve: &KnotSet, x_min: f64, x_max: f64, n: usize) -> Vec<(f64, f64)> {
    let xs = crate::math::linspace(x_min, x_max, n);
    match evaluate(curve, &xs) {
        Ok(ys) => xs.into_iter().zip(ys).collect(),
        Err(_) => Vec::new(),
    }
}

fn put(grid: &mut [Vec<char>], x: f64, y: f64, xr: (f64, f64), yr: (f64, f64), ch: char) {
    if !(x.is_finite() && y.is_finite()) {
        return;
    }
    let col = map_x(x, xr.0, xr.1, grid[0].len());
    let row = map_y(y, yr.0, yr.1, grid.len());
    grid[row][col] = ch;
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], xr: (f64, f64), yr: (f64, f64), ch: char) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        if !y.is_finite() {
            prev = None;
            continue;
        }
        let col = map_x(x, xr.0, xr.1, width);
        let row = map_y(y, yr.0, yr.1, height);
        match prev {
            Some((c0, r0)) => draw_line(grid, c0, r0, col, row, ch),
            None if grid[row][col] == ' ' => grid[row][col] = ch,
            None => {}
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish); only fills blank cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(categories: Option<Vec<String>>) -> FeatureDescriptor {
        FeatureDescriptor {
            key: "age".to_string(),
            label: "Age".to_string(),
            scatter_x: Vec::new(),
            categories,
        }
    }

    fn rows(txt: &str) -> Vec<Vec<char>> {
        txt.lines().skip(1).map(|l| l.chars().collect()).collect()
    }

    #[test]
    fn knots_and_selection_are_marked() {
        let k = KnotSet::new(vec![0.0, 10.0], vec![0.0, 10.0]).unwrap();
        let txt = render_shape_plot(&feature(None), &k, &k, &[1], 11, 5);
        assert!(txt.starts_with("Plot: Age | x=[0.000, 10.000] | y=[-0.500, 10.500]\n"));
        let grid = rows(&txt);
        assert_eq!(grid.len(), 5);
        assert_eq!(grid[0][10], '*');
        assert_eq!(grid[4][0], 'o');
        assert!(grid.iter().flatten().all(|&c| c != '.'));
    }

    #[test]
    fn baseline_shows_where_edited_moved_away() {
        let baseline = KnotSet::new(vec![0.0, 10.0], vec![0.0, 0.0]).unwrap();
        let edited = KnotSet::new(vec![0.0, 10.0], vec![10.0, 10.0]).unwrap();
        let grid = rows(&render_shape_plot(&feature(None), &baseline, &edited, &[], 12, 6));
        assert!(grid[5][1..11].iter().all(|&c| c == '.'));
        assert!(grid[0][1..11].iter().all(|&c| c == '-'));
    }

    #[test]
    fn categorical_plot_uses_one_column_per_category() {
        let f = feature(Some(vec!["a".into(), "b".into()]));
        let baseline = KnotSet::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
        let txt = render_shape_plot(&f, &baseline, &baseline, &[0], 10, 5);
        assert!(txt.ends_with("Categories: a, b\n"));
        let cells: Vec<char> = rows(&txt).into_iter().take(5).flatten().collect();
        assert_eq!(cells.iter().filter(|&&c| c == '*').count(), 1);
        assert_eq!(cells.iter().filter(|&&c| c == 'o').count(), 1);
    }
}
