//! Argument parsing and command dispatch for the `nebulax` binary.
//!
//! Every command prints one JSON document on stdout; logs go to stderr.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Value, json};

use crate::catalog::{CatalogStore, ListQuery, Mission, Status};
use crate::config::Settings;
use crate::lightcurve::{LightCurvePoint, analyze_lightcurve};
use crate::ml::metrics::round3;
use crate::ml::{PredictError, PredictInput};
use crate::setup;

pub const APP_NAME: &str = "NebulaX";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List(ListQuery),
    Refresh,
    Train,
    Predict(PredictInput),
    /// Restore a persisted model (configured artifact path when `None`).
    Restore(Option<PathBuf>),
    Status,
    LightCurve(PathBuf),
    /// Print the effective settings.
    Config,
    Version,
}

impl Command {
    /// Whether the command operates on an initialized catalog.
    pub fn needs_catalog(&self) -> bool {
        !matches!(self, Self::LightCurve(_) | Self::Config | Self::Version)
    }

    /// Whether models trained while running the command overwrite the saved artifact.
    ///
    /// Only explicit retraining does; read-only commands and `restore` keep it intact.
    pub fn persists_model(&self) -> bool {
        matches!(self, Self::Refresh | Self::Train)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliOptions {
    /// Overrides the config root (same as `NEBULAX_CONFIG_HOME`).
    pub home: Option<PathBuf>,
    /// Explicit settings file instead of `<root>/nebulax.toml`.
    pub config: Option<PathBuf>,
    pub verbose: bool,
    pub command: Command,
}

pub fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut home = None;
    let mut config = None;
    let mut verbose = false;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "-v" | "--verbose" => verbose = true,
            "--home" => {
                idx += 1;
                home = Some(PathBuf::from(value_for(&args, idx, "--home")?));
            }
            "--config" => {
                idx += 1;
                config = Some(PathBuf::from(value_for(&args, idx, "--config")?));
            }
            _ => break,
        }
        idx += 1;
    }
    let Some(name) = args.get(idx) else {
        return Err(help_text());
    };
    let rest = &args[idx + 1..];
    let command = match name.as_str() {
        "list" => Command::List(parse_list(rest)?),
        "refresh" => no_args(rest, Command::Refresh)?,
        "train" => no_args(rest, Command::Train)?,
        "predict" => Command::Predict(parse_predict(rest)?),
        "restore" => match rest {
            [] => Command::Restore(None),
            [path] => Command::Restore(Some(PathBuf::from(path))),
            _ => return Err("restore takes at most one model path".to_string()),
        },
        "status" => no_args(rest, Command::Status)?,
        "lightcurve" => match rest {
            [path] => Command::LightCurve(PathBuf::from(path)),
            _ => return Err("lightcurve requires exactly one <points.json> path".to_string()),
        },
        "config" => no_args(rest, Command::Config)?,
        "version" => no_args(rest, Command::Version)?,
        unknown => return Err(format!("Unknown command: {unknown}\n\n{}", help_text())),
    };
    Ok(CliOptions {
        home,
        config,
        verbose,
        command,
    })
}

fn no_args(rest: &[String], command: Command) -> Result<Command, String> {
    match rest.first() {
        None => Ok(command),
        Some(extra) => Err(format!("Unexpected argument: {extra}")),
    }
}

fn value_for<'a>(args: &'a [String], idx: usize, flag: &str) -> Result<&'a str, String> {
    args.get(idx)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_value<T: FromStr>(args: &[String], idx: usize, flag: &str) -> Result<T, String> {
    let value = value_for(args, idx, flag)?;
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid {flag} value: {value}"))
}

fn parse_list(args: &[String]) -> Result<ListQuery, String> {
    let mut query = ListQuery::default();
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        idx += 1;
        match flag {
            "--mission" => query.mission = Some(parse_value::<Mission>(args, idx, flag)?),
            "--status" => query.status = Some(parse_value::<Status>(args, idx, flag)?),
            "--limit" => query.limit = parse_value(args, idx, flag)?,
            "--offset" => query.offset = parse_value(args, idx, flag)?,
            unknown => return Err(format!("Unknown list option: {unknown}")),
        }
        idx += 1;
    }
    Ok(query)
}

fn parse_predict(args: &[String]) -> Result<PredictInput, String> {
    let mut input = PredictInput::default();
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        idx += 1;
        match flag {
            "--habitable" => {
                input.habitable_zone = Some(true);
                continue;
            }
            "--period" => input.period = Some(parse_value(args, idx, flag)?),
            "--radius" => input.radius = Some(parse_value(args, idx, flag)?),
            "--temperature" => input.temperature = Some(parse_value(args, idx, flag)?),
            "--year" => input.discovery_year = Some(parse_value(args, idx, flag)?),
            "--confidence" => input.confidence = Some(parse_value(args, idx, flag)?),
            unknown => return Err(format!("Unknown predict option: {unknown}")),
        }
        idx += 1;
    }
    Ok(input)
}

pub fn help_text() -> String {
    [
        "nebulax",
        "",
        "Exoplanet catalog with a random-forest disposition classifier.",
        "",
        "Usage:",
        "  nebulax [--home <dir>] [--config <file>] [-v] <command> [options]",
        "",
        "Commands:",
        "  list [--mission M] [--status S] [--limit N] [--offset N]",
        "                         Page through the catalog (limit capped at 500).",
        "  refresh                Replace the catalog with a fresh batch and retrain.",
        "  train                  Retrain on the current catalog.",
        "  predict --period D --radius R [--temperature K] [--year Y] [--habitable] [--confidence C]",
        "                         Classify one object.",
        "  restore [model.json]   Load a persisted model and re-annotate the catalog.",
        "  status                 Catalog state and model summary.",
        "  lightcurve <file>      Score a JSON array of {time, flux} points.",
        "  config                 Print the effective settings.",
        "  version                Print the application version.",
    ]
    .join("\n")
}

/// Run `command`, building and initializing a catalog only when it needs one.
pub fn execute(command: &Command, settings: &Settings) -> Result<Value, String> {
    match command {
        Command::Version => Ok(version_info()),
        Command::Config => to_json(settings),
        Command::LightCurve(path) => lightcurve_from_file(path),
        _ => {
            let store = setup::build_store(settings, command.persists_model())
                .map_err(|err| err.to_string())?;
            if let Some(result) = store.initialize()
                && !result.is_success()
            {
                tracing::warn!(
                    "Initial training failed: {}",
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            execute_catalog(command, &store, settings)
        }
    }
}

/// Run a catalog command against an initialized store.
pub fn execute_catalog(
    command: &Command,
    store: &CatalogStore,
    settings: &Settings,
) -> Result<Value, String> {
    match command {
        Command::List(query) => to_json(&store.list(query)),
        Command::Refresh => to_json(&store.refresh().map_err(|err| err.to_string())?),
        Command::Train => to_json(&store.train_now()),
        Command::Predict(input) => match store.predict(input) {
            Ok(prediction) => to_json(&prediction.rounded()),
            Err(PredictError::ModelNotTrained) => Ok(json!({
                "error": "model_not_trained",
                "message": PredictError::ModelNotTrained.to_string(),
            })),
            Err(err) => Err(err.to_string()),
        },
        Command::Restore(path) => {
            let path = match path {
                Some(path) => path.clone(),
                None => settings
                    .model
                    .resolved_artifact_path()
                    .map_err(|err| err.to_string())?,
            };
            let summary = store.restore_model(&path).map_err(|err| err.to_string())?;
            Ok(json!({
                "model": path,
                "accuracy": round3(store.model_accuracy()),
                "annotated": summary.annotated,
                "unchanged": summary.unchanged,
            }))
        }
        Command::Status => {
            let snapshot = store.snapshot();
            let model = store.current_model();
            Ok(json!({
                "state": snapshot.state(),
                "records": snapshot.len(),
                "generation": snapshot.generation(),
                "model_trained": model.is_some(),
                "accuracy": model.as_ref().map_or(0.0, |m| round3(m.accuracy)),
                "sample_count": model.as_ref().map_or(0, |m| m.sample_count),
            }))
        }
        Command::LightCurve(_) | Command::Config | Command::Version => execute(command, settings),
    }
}

pub fn version_info() -> Value {
    json!({ "name": APP_NAME, "version": env!("CARGO_PKG_VERSION") })
}

fn lightcurve_from_file(path: &Path) -> Result<Value, String> {
    let bytes = std::fs::read(path).map_err(|err| format!("Failed to read {}: {err}", path.display()))?;
    let points: Vec<LightCurvePoint> = serde_json::from_slice(&bytes)
        .map_err(|err| format!("Invalid light curve in {}: {err}", path.display()))?;
    to_json(&analyze_lightcurve(&points))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|err| err.to_string())
}
