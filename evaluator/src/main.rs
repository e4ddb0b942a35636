mod input;
mod report;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use judol_core::{PipelineConfig, Preprocessor, Scenario, ScoringEngine, Threshold, SCENARIOS};
use report::{RowResult, Summary};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "judol-eval")]
#[command(about = "Batch preprocessing and evaluation of gambling-promotion comment classifiers", long_about = None)]
struct Cli {
    /// Pipeline config (JSON); defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the trained scenarios and whether their artifacts are present
    Scenarios {
        #[arg(long)]
        model_dir: Option<PathBuf>,
    },
    /// Preprocess an input file or directory into a `text,processed_text` CSV
    Preprocess {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Score an input file or directory and write per-row JSONL plus a summary
    Evaluate {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Scenario name, e.g. "model 6" (defaults to the top-ranked one)
        #[arg(long)]
        scenario: Option<String>,
        #[arg(long)]
        model_dir: Option<PathBuf>,
        #[arg(long)]
        threshold: Option<f32>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Scenarios { model_dir } => {
            if let Some(dir) = model_dir {
                config.model_dir = dir;
            }
            list_scenarios(&config.model_dir);
            Ok(())
        }
        Commands::Preprocess { input, output } => preprocess(&config, &input, &output),
        Commands::Evaluate { input, output, scenario, model_dir, threshold } => {
            if let Some(dir) = model_dir {
                config.model_dir = dir;
            }
            if let Some(t) = threshold {
                config.threshold = t;
            }
            evaluate(&config, &input, &output, scenario.as_deref())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(p) => {
            let base = p.parent().map(PathBuf::from).unwrap_or_default();
            Ok(PipelineConfig::from_json_file(p)?.resolve_relative_to(base))
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn list_scenarios(model_dir: &Path) {
    for s in SCENARIOS.iter() {
        let status = match s.artifact_path(model_dir) {
            Some(p) => p.display().to_string(),
            None => "missing".to_string(),
        };
        println!("{:<60} {}", s.label(), status);
    }
}

fn preprocess(config: &PipelineConfig, input: &Path, output: &Path) -> Result<()> {
    let pre = Preprocessor::from_config(config)?;
    let mut wtr = csv::Writer::from_path(output).with_context(|| format!("create {}", output.display()))?;
    wtr.write_record(["text", "processed_text"])?;

    let mut total = 0usize;
    for file in input::collect_files(input)? {
        let rows = input::read_rows(&file)?;
        let texts: Vec<Option<&str>> = rows.iter().map(|r| r.text.as_deref()).collect();
        let processed = pre.preprocess_batch(&texts);
        for (text, processed) in texts.iter().zip(&processed) {
            wtr.write_record([text.unwrap_or(""), processed.as_str()])?;
        }
        tracing::info!(file = %file.display(), rows = rows.len(), "preprocessed");
        total += rows.len();
    }
    wtr.flush()?;
    tracing::info!(rows = total, output = %output.display(), "preprocessing complete");
    Ok(())
}

fn evaluate(config: &PipelineConfig, input: &Path, output: &Path, scenario: Option<&str>) -> Result<()> {
    let scenario: &Scenario = match scenario {
        Some(name) => Scenario::find(name).with_context(|| format!("unknown scenario {name:?}"))?,
        None => SCENARIOS.iter().find(|s| s.rank == Some(1)).context("no top-ranked scenario")?,
    };
    let engine = ScoringEngine::from_config(config)?;
    if !engine.load_scenario(scenario, &config.model_dir) {
        bail!("could not load {} from {}", scenario.name, config.model_dir.display());
    }
    let threshold = Threshold(config.threshold);

    let files = input::collect_files(input)?;
    let mut results: Vec<RowResult> = Vec::new();
    for file in &files {
        let rows = input::read_rows(file)?;
        let texts: Vec<Option<&str>> = rows.iter().map(|r| r.text.as_deref()).collect();
        let processed = engine.preprocessor().preprocess_batch(&texts);
        let scores = engine.classify_batch(&processed)?;
        let source = file.display().to_string();
        for (i, ((row, processed), score)) in rows.into_iter().zip(processed).zip(scores).enumerate() {
            results.push(RowResult::new(source.clone(), i, row.text, processed, threshold.classify(score), row.label));
        }
        tracing::info!(file = %source, "scored");
    }

    report::write_jsonl(output, &results)?;
    let summary = Summary::from_results(scenario.name, threshold, files.len(), &results);
    let summary_path = report::summary_path(output);
    report::write_summary(&summary_path, &summary)?;
    match &summary.metrics {
        Some(m) => tracing::info!(rows = summary.rows, accuracy = m.accuracy, f1 = m.f1, "evaluation complete"),
        None => tracing::info!(rows = summary.rows, "scoring complete (no labels)"),
    }
    tracing::info!(output = %output.display(), summary = %summary_path.display(), "results written");
    Ok(())
}
