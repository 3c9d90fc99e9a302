//! Developer utility to train a classifier from a saved archive response.

use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;

use nebulax::ingest::{SourceKind, normalize_batch, parse_rows};
use nebulax::ml::artifact;
use nebulax::ml::{Trainer, TrainerOptions};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let bytes = std::fs::read(&options.input)
        .map_err(|err| format!("Failed to read {}: {err}", options.input.display()))?;
    let Value::Array(values) = serde_json::from_slice::<Value>(&bytes).map_err(|err| err.to_string())?
    else {
        return Err("Archive dump must be a JSON array of rows".to_string());
    };

    let rows = parse_rows(options.source, values);
    let mut rng = StdRng::seed_from_u64(options.trainer.split_seed);
    let (records, summary) = normalize_batch(&rows, &mut rng);
    println!(
        "rows: {}  kept: {}  dropped: {} (no period {}, no radius {})",
        rows.len(),
        summary.kept,
        summary.dropped(),
        summary.missing_period,
        summary.missing_radius
    );

    let report = Trainer::new(options.trainer.clone(), None)
        .fit(&records)
        .map_err(|err| err.to_string())?;
    artifact::save(&options.model_out, &report.model).map_err(|err| err.to_string())?;

    println!(
        "samples: {}  skipped: {}",
        report.model.sample_count,
        report.summary.skipped_count()
    );
    println!("test accuracy: {:.4}", report.model.accuracy);
    for stats in &report.per_class {
        println!(
            "{:<16}  precision={:.3}  recall={:.3}  support={}",
            stats.class_id, stats.precision, stats.recall, stats.support
        );
    }
    println!("confusion matrix (rows=true, cols=pred):");
    for row in report.confusion.rows() {
        let line: String = row.iter().map(|count| format!("{count:6}")).collect();
        println!("{line}");
    }
    println!("model written to {}", options.model_out.display());
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    input: PathBuf,
    source: SourceKind,
    model_out: PathBuf,
    trainer: TrainerOptions,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut input: Option<PathBuf> = None;
    let mut source = SourceKind::Kepler;
    let mut model_out = PathBuf::from("classifier_model.json");
    let mut trainer = TrainerOptions::default();

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--input" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--input requires a value".to_string())?;
                input = Some(PathBuf::from(value));
            }
            "--source" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--source requires a value".to_string())?;
                source = value.parse::<SourceKind>()?;
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                model_out = PathBuf::from(value);
            }
            "--trees" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--trees requires a value".to_string())?;
                trainer.forest.n_trees = value
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| format!("Invalid --trees value: {value}"))?;
            }
            "--max-depth" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--max-depth requires a value".to_string())?;
                trainer.forest.max_depth = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --max-depth value: {value}"))?;
            }
            "--test-fraction" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--test-fraction requires a value".to_string())?;
                trainer.test_fraction = value
                    .parse::<f64>()
                    .ok()
                    .filter(|f| *f > 0.0 && *f < 1.0)
                    .ok_or_else(|| format!("Invalid --test-fraction value: {value}"))?;
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                let seed = value
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid --seed value: {value}"))?;
                trainer.forest.seed = seed;
                trainer.split_seed = seed;
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let input = input.ok_or_else(help_text)?;
    Ok(CliOptions {
        input,
        source,
        model_out,
        trainer,
    })
}

fn help_text() -> String {
    [
        "nebulax-train-baseline",
        "",
        "Trains the disposition forest from a saved archive JSON response.",
        "",
        "Usage:",
        "  nebulax-train-baseline --input <rows.json> [--source kepler] [--out model.json] [options]",
        "",
        "Options:",
        "  --input <file>          JSON array of archive rows (required).",
        "  --source <name>         confirmed | kepler | k2 | tess (default: kepler).",
        "  --out <file>            Output model path (default: classifier_model.json).",
        "  --trees <n>             Number of trees (default: 100).",
        "  --max-depth <n>         Maximum tree depth (default: 10).",
        "  --test-fraction <f64>   Held-out share (default: 0.2).",
        "  --seed <n>              Split and forest seed (default: 42).",
    ]
    .join("\n")
}
