//! Command-line parsing for the shape editor.
//!
//! Argument parsing and command dispatch stay separate from the editing and
//! prediction code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{EditorConfig, Task};
use crate::error::AppError;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "shapes", version, about = "Shape-function editor for additive models")]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print baseline/edited predictions, metrics and the largest residuals.
    Predict(PredictArgs),
    /// Apply a JSON edit script to a model.
    Edit(EditArgs),
    /// Plot one shape function in the terminal.
    Show(ShowArgs),
    /// Write a synthetic model file.
    Sample(SampleArgs),
    /// List models held by the artifact service.
    List(ListArgs),
    /// Download a model from the artifact service.
    Pull(PullArgs),
    /// Upload an edited model to the artifact service.
    Push(PushArgs),
    /// Launch the interactive editor.
    Tui(TuiArgs),
}

/// Editor tunables shared by every command.
#[derive(Debug, Args, Clone, Default)]
pub struct ConfigArgs {
    /// Editor config file (JSON); the flags below override it.
    #[arg(long, global = true, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Maximum number of history entries kept.
    #[arg(long, global = true)]
    pub history_limit: Option<usize>,

    /// Prediction debounce window (milliseconds).
    #[arg(long, global = true)]
    pub debounce_ms: Option<u64>,

    /// Maximum drag falloff radius (knots).
    #[arg(long, global = true)]
    pub drag_max_radius: Option<f64>,

    /// Smoothing rate (per second at full strength).
    #[arg(long, global = true)]
    pub smooth_rate: Option<f64>,
}

impl ConfigArgs {
    /// Defaults, then the config file, then explicit flags.
    pub fn resolve(&self) -> Result<EditorConfig, AppError> {
        let mut config = match &self.config {
            Some(path) => EditorConfig::from_json_file(path)?,
            None => EditorConfig::default(),
        };
        if let Some(v) = self.history_limit {
            config.history_limit = v;
        }
        if let Some(v) = self.debounce_ms {
            config.debounce_ms = v;
        }
        if let Some(v) = self.drag_max_radius {
            config.drag_max_radius = v;
        }
        if let Some(v) = self.smooth_rate {
            config.smooth_rate = v;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Args)]
pub struct PredictArgs {
    /// Model result JSON.
    #[arg(long, value_name = "JSON")]
    pub model: PathBuf,

    /// Show the top-N residuals on each side.
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Model result JSON.
    #[arg(long, value_name = "JSON")]
    pub model: PathBuf,

    /// Edit script (JSON array of commands).
    #[arg(long, value_name = "JSON")]
    pub script: PathBuf,

    /// Write the edited model here.
    #[arg(long, value_name = "JSON")]
    pub output: Option<PathBuf>,

    /// Resume from and save to a history cache in this directory.
    #[arg(long, value_name = "DIR")]
    pub history_dir: Option<PathBuf>,

    /// Show the top-N residuals on each side.
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Model result JSON.
    #[arg(long, value_name = "JSON")]
    pub model: PathBuf,

    /// Feature key (defaults to the first feature).
    #[arg(long)]
    pub feature: Option<String>,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args)]
pub struct SampleArgs {
    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of samples.
    #[arg(short = 'n', long, default_value_t = 500)]
    pub rows: usize,

    /// Learning task.
    #[arg(long, value_enum, default_value_t = Task::Regression)]
    pub task: Task,

    /// Editable knots per continuous feature.
    #[arg(long, default_value_t = 12)]
    pub knots: usize,

    /// Output model JSON.
    #[arg(long, value_name = "JSON")]
    pub output: PathBuf,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// List user-saved models instead of trained ones.
    #[arg(long)]
    pub saved: bool,
}

#[derive(Debug, Args)]
pub struct PullArgs {
    /// Artifact name.
    pub name: String,

    /// Fetch from the user-saved collection.
    #[arg(long)]
    pub saved: bool,

    /// Output model JSON.
    #[arg(long, value_name = "JSON")]
    pub output: PathBuf,
}

#[derive(Debug, Args)]
pub struct PushArgs {
    /// Name to save under.
    pub name: String,

    /// Model result JSON to upload.
    #[arg(long, value_name = "JSON")]
    pub model: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    /// Model result JSON (a synthetic model is used when omitted).
    #[arg(long, value_name = "JSON")]
    pub model: Option<PathBuf>,

    /// Seed for the synthetic model.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Resume from and save to a history cache in this directory.
    #[arg(long, value_name = "DIR")]
    pub history_dir: Option<PathBuf>,

    /// Where `w` writes the edited model.
    #[arg(long, value_name = "JSON", default_value = "edited-model.json")]
    pub output: PathBuf,
}
