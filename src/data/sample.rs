//! Deterministic synthetic additive models.
//!
//! Used by the editor when no model file is given, by `shapes sample`, and by
//! tests. Each feature has a known true shape; the editable knots are the true
//! shape resampled from a dense grid, so the baseline fits the data well.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Bernoulli, Normal};
use serde_json::{Map, Value};

use crate::domain::{ModelResult, Partial, ScatterValue, Task};
use crate::error::AppError;
use crate::math::{discretize, linspace};

const REGION_LABELS: [&str; 4] = ["north", "south", "east", "west"];
const REGION_EFFECTS: [f64; 4] = [0.5, -0.3, 0.1, -0.4];
const TRUE_INTERCEPT: f64 = 2.0;
const NOISE_SD: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct SampleSpec {
    pub seed: u64,
    pub rows: usize,
    pub task: Task,
    /// Editable knots per continuous feature.
    pub knots: usize,
    /// Dense grid size per continuous feature.
    pub grid_points: usize,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            seed: 42,
            rows: 500,
            task: Task::Regression,
            knots: 12,
            grid_points: crate::domain::DEFAULT_GRID_POINTS,
        }
    }
}

struct ContinuousFeature {
    key: &'static str,
    label: &'static str,
    range: (f64, f64),
    shape: fn(f64) -> f64,
}

fn age_shape(x: f64) -> f64 {
    1.5 * ((x - 45.0) / 12.0).tanh()
}

fn hours_shape(x: f64) -> f64 {
    0.8 * (x / 10.0).sin()
}

fn tenure_shape(x: f64) -> f64 {
    -0.05 * x + 0.5 * (1.0 + x).ln() - 0.6
}

const CONTINUOUS: [ContinuousFeature; 3] = [
    ContinuousFeature {
        key: "age",
        label: "Age",
        range: (18.0, 80.0),
        shape: age_shape,
    },
    ContinuousFeature {
        key: "hours",
        label: "Hours per week",
        range: (0.0, 60.0),
        shape: hours_shape,
    },
    ContinuousFeature {
        key: "tenure",
        label: "Tenure (years)",
        range: (0.0, 30.0),
        shape: tenure_shape,
    },
];

pub fn generate_model(spec: &SampleSpec) -> Result<ModelResult, AppError> {
    if spec.rows == 0 {
        return Err(AppError::new(2, "Sample rows must be > 0."));
    }
    if spec.knots < 2 || spec.grid_points < spec.knots {
        return Err(AppError::new(2, "Sample needs >= 2 knots and at least as many grid points."));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let noise = Normal::new(0.0, NOISE_SD).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut totals = vec![0.0; spec.rows];
    let mut partials = Vec::with_capacity(CONTINUOUS.len() + 1);

    for feature in &CONTINUOUS {
        let (lo, hi) = feature.range;
        let xs: Vec<f64> = (0..spec.rows).map(|_| rng.gen_range(lo..=hi)).collect();
        for (t, &x) in totals.iter_mut().zip(&xs) {
            *t += (feature.shape)(x);
        }
        let grid = linspace(lo, hi, spec.grid_points);
        let curve: Vec<f64> = grid.iter().map(|&x| (feature.shape)(x)).collect();
        let (editable_x, editable_y) = discretize(&grid, &curve, spec.knots);
        partials.push(Partial {
            key: feature.key.to_string(),
            label: feature.label.to_string(),
            categories: None,
            scatter_x: xs.into_iter().map(ScatterValue::Number).collect(),
            editable_x: Some(editable_x),
            editable_y: Some(editable_y),
            grid_x: Some(grid),
            curve: Some(curve),
            extra: Map::new(),
        });
    }

    let regions: Vec<usize> = (0..spec.rows).map(|_| rng.gen_range(0..REGION_LABELS.len())).collect();
    for (t, &r) in totals.iter_mut().zip(&regions) {
        *t += REGION_EFFECTS[r];
    }
    partials.push(Partial {
        key: "region".to_string(),
        label: "Region".to_string(),
        categories: Some(REGION_LABELS.iter().map(|s| s.to_string()).collect()),
        scatter_x: regions
            .iter()
            .map(|&r| ScatterValue::Label(REGION_LABELS[r].to_string()))
            .collect(),
        editable_x: Some((0..REGION_LABELS.len()).map(|i| i as f64).collect()),
        editable_y: Some(REGION_EFFECTS.to_vec()),
        grid_x: None,
        curve: None,
        extra: Map::new(),
    });

    let y = match spec.task {
        Task::Regression => totals
            .iter()
            .map(|&t| t + TRUE_INTERCEPT + noise.sample(&mut rng))
            .collect(),
        Task::Classification => {
            let mut y = Vec::with_capacity(spec.rows);
            for &t in &totals {
                let p = Task::Classification.link(t - 0.5);
                let draw = Bernoulli::new(p).map_err(|e| AppError::new(4, format!("Label distribution error: {e}")))?;
                y.push(if draw.sample(&mut rng) { 1.0 } else { 0.0 });
            }
            y
        }
    };

    let mut extra = Map::new();
    extra.insert("source".to_string(), Value::from("synthetic"));
    extra.insert("seed".to_string(), Value::from(spec.seed));
    extra.insert("points".to_string(), Value::from(spec.knots));

    Ok(ModelResult {
        intercept: None,
        partials,
        y,
        task: spec.task,
        extra,
    })
}
