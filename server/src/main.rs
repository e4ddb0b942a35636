use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use judol_core::{PipelineConfig, Scenario, ScoringEngine, Threshold, SCENARIOS};
use judol_server::{build_app, AppSettings};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Pipeline config (JSON); relative paths inside resolve against its directory
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding the scenario model artifacts
    #[arg(long)]
    model_dir: Option<PathBuf>,
    /// Scenario to load at startup (defaults to the top-ranked one)
    #[arg(long)]
    scenario: Option<String>,
    /// Decision threshold
    #[arg(long)]
    threshold: Option<f32>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let base = path.parent().map(PathBuf::from).unwrap_or_default();
            PipelineConfig::from_json_file(path)?.resolve_relative_to(base)
        }
        None => PipelineConfig::default(),
    };
    if let Some(dir) = args.model_dir {
        config.model_dir = dir;
    }
    if let Some(t) = args.threshold {
        config.threshold = t;
    }

    let engine = Arc::new(ScoringEngine::from_config(&config).context("pipeline startup failed")?);
    let scenario = match &args.scenario {
        Some(name) => Scenario::find(name).with_context(|| format!("unknown scenario {name:?}"))?,
        None => SCENARIOS.iter().find(|s| s.rank == Some(1)).context("no top-ranked scenario")?,
    };
    if !engine.load_scenario(scenario, &config.model_dir) {
        tracing::warn!(scenario = scenario.name, "starting without a model; classify returns 409 until POST /model succeeds");
    }

    let settings = AppSettings::from_env(config.model_dir.clone(), Threshold(config.threshold));
    let app: Router = build_app(engine, settings);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
