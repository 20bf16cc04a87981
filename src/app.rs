//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments and resolves the editor config
//! - loads models from disk, the artifact service or the synthetic generator
//! - runs edit scripts and predictions
//! - prints reports/plots and writes edited models

use clap::Parser;
use log::info;

use crate::cli::{Command, EditArgs, ListArgs, PredictArgs, PullArgs, PushArgs, SampleArgs, ShowArgs, TuiArgs};
use crate::data::{SampleSpec, generate_model};
use crate::domain::EditorConfig;
use crate::error::AppError;
use crate::io::{ArtifactClient, ArtifactKind, read_model_json, read_script, write_model_json};

pub mod pipeline;

/// Entry point for the `shapes` binary.
pub fn run() -> Result<(), AppError> {
    // `shapes` and `shapes --model m.json` behave like `shapes tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    init_logging(matches!(cli.command, Command::Tui(_)));

    let config = cli.config.resolve()?;
    match cli.command {
        Command::Predict(args) => handle_predict(args, &config),
        Command::Edit(args) => handle_edit(args, &config),
        Command::Show(args) => handle_show(args, &config),
        Command::Sample(args) => handle_sample(args, &config),
        Command::List(args) => handle_list(args),
        Command::Pull(args) => handle_pull(args),
        Command::Push(args) => handle_push(args),
        Command::Tui(args) => handle_tui(args, config),
    }
}

/// Logs go to stderr; the terminal UI owns the screen, so it stays silent
/// unless `RUST_LOG` asks otherwise.
fn init_logging(tui: bool) {
    let default = if tui { "off" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).try_init();
}

fn handle_predict(args: PredictArgs, config: &EditorConfig) -> Result<(), AppError> {
    let loaded = pipeline::load_model(Some(args.model.as_path()), 0)?;
    let mut session = pipeline::open_session(&loaded, config, None, false)?;
    let out = pipeline::run_predict(&mut session, args.top);

    println!("{}", crate::report::format::format_model_summary(&loaded.model, &loaded.source));
    println!("{}", crate::report::format::format_features(&session));
    println!(
        "{}",
        crate::report::format::format_metrics(loaded.model.task, &loaded.model.y, &out.report)
    );
    println!("{}", crate::report::format::format_rankings(&out.rankings));
    Ok(())
}

fn handle_edit(args: EditArgs, config: &EditorConfig) -> Result<(), AppError> {
    let loaded = pipeline::load_model(Some(args.model.as_path()), 0)?;
    let commands = read_script(&args.script)?;
    let out = pipeline::run_edit(&loaded, config, &commands, args.history_dir.as_deref(), args.top)?;

    println!("{}", crate::report::format::format_model_summary(&loaded.model, &loaded.source));
    println!(
        "Script: {} commands, {} changed a curve\n",
        out.outcome.commands, out.outcome.changed
    );
    println!("{}", crate::report::format::format_history(out.session.history()));
    println!("{}", crate::report::format::format_features(&out.session));
    println!(
        "{}",
        crate::report::format::format_metrics(loaded.model.task, &loaded.model.y, &out.predict.report)
    );
    println!("{}", crate::report::format::format_rankings(&out.predict.rankings));

    if let Some(path) = &args.output {
        write_model_json(path, &out.session.close())?;
        println!("Edited model written to {}", path.display());
    }
    Ok(())
}

fn handle_show(args: ShowArgs, config: &EditorConfig) -> Result<(), AppError> {
    let loaded = pipeline::load_model(Some(args.model.as_path()), 0)?;
    let mut session = pipeline::open_session(&loaded, config, None, false)?;
    if let Some(key) = &args.feature {
        session.select_feature(key)?;
    }
    let feature = session
        .active_feature()
        .cloned()
        .ok_or_else(|| AppError::new(3, "Model has no features to show."))?;
    let state = session
        .state(&feature.key)
        .ok_or_else(|| AppError::new(3, format!("Unknown feature '{}'.", feature.key)))?;

    let plot = crate::plot::render_shape_plot(
        &feature,
        state.baseline(),
        state.committed(),
        &[],
        args.width,
        args.height,
    );
    println!("{plot}");
    Ok(())
}

fn handle_sample(args: SampleArgs, config: &EditorConfig) -> Result<(), AppError> {
    let spec = SampleSpec {
        seed: args.seed,
        rows: args.rows,
        task: args.task,
        knots: args.knots,
        grid_points: config.grid_points,
    };
    let model = generate_model(&spec)?;
    write_model_json(&args.output, &model)?;
    println!(
        "Synthetic {} model ({} samples, {} features) written to {}",
        model.task.display_name(),
        model.y.len(),
        model.partials.len(),
        args.output.display()
    );
    Ok(())
}

fn artifact_kind(saved: bool) -> ArtifactKind {
    if saved { ArtifactKind::Saved } else { ArtifactKind::Trained }
}

fn handle_list(args: ListArgs) -> Result<(), AppError> {
    let client = ArtifactClient::from_env()?;
    let names = client.list(artifact_kind(args.saved))?;
    if names.is_empty() {
        println!("(no models)");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

fn handle_pull(args: PullArgs) -> Result<(), AppError> {
    let client = ArtifactClient::from_env()?;
    let model = client.fetch(artifact_kind(args.saved), &args.name)?;
    write_model_json(&args.output, &model)?;
    info!("pulled '{}' from {}", args.name, client.base_url());
    println!("Model '{}' written to {}", args.name, args.output.display());
    Ok(())
}

fn handle_push(args: PushArgs) -> Result<(), AppError> {
    let client = ArtifactClient::from_env()?;
    let model = read_model_json(&args.model)?;
    let saved = client.save(&args.name, &model)?;
    println!("Saved as {saved}");
    Ok(())
}

fn handle_tui(args: TuiArgs, config: EditorConfig) -> Result<(), AppError> {
    let loaded = pipeline::load_model(args.model.as_deref(), args.seed)?;
    crate::tui::run(loaded, config, args.history_dir, args.output)
}

/// Rewrite argv so `shapes` defaults to `shapes tui`.
///
/// Rules:
/// - `shapes`                       -> `shapes tui`
/// - `shapes --model m.json ...`    -> `shapes tui --model m.json ...`
/// - `shapes --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(
        arg1.as_str(),
        "predict" | "edit" | "show" | "sample" | "list" | "pull" | "push" | "tui"
    );
    if is_subcommand {
        return argv;
    }

    // A leading flag is treated as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}
