use axum::{extract::State, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use judol_core::{Classification, Error, Label, ModelScores, Scenario, ScoringEngine, Threshold, SCENARIOS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

type ApiError = (StatusCode, String);

/// Everything the router needs besides the engine.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub model_dir: PathBuf,
    pub threshold: Threshold,
    pub admin_token: Option<String>,
    /// Comma-separated origins; any origin when unset or unparsable.
    pub cors_allow_origin: Option<String>,
}

impl AppSettings {
    /// Admin token and CORS origins come from `ADMIN_TOKEN` / `CORS_ALLOW_ORIGIN`.
    pub fn from_env(model_dir: PathBuf, threshold: Threshold) -> Self {
        Self {
            model_dir,
            threshold,
            admin_token: std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty()),
            cors_allow_origin: std::env::var("CORS_ALLOW_ORIGIN").ok(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ScoringEngine>,
    pub model_dir: Arc<PathBuf>,
    pub threshold: Threshold,
    pub admin_token: Option<String>,
}

#[derive(Deserialize)]
pub struct ClassifyRequest {
    pub text: String,
    #[serde(default)]
    pub threshold: Option<f32>,
}

#[derive(Serialize)]
pub struct ClassifyResponse {
    pub model: String,
    pub score: f32,
    pub label: Label,
    pub processed_text: String,
}

#[derive(Deserialize)]
pub struct BatchRequest {
    /// Raw texts; `null` entries are scored as empty comments.
    pub texts: Vec<Option<String>>,
    #[serde(default)]
    pub threshold: Option<f32>,
}

#[derive(Serialize)]
pub struct BatchResponse {
    pub model: String,
    pub took_s: f64,
    pub results: Vec<Classification>,
}

#[derive(Serialize)]
pub struct ScenarioView {
    #[serde(flatten)]
    pub scenario: Scenario,
    pub label: String,
    pub available: bool,
}

#[derive(Deserialize)]
pub struct SelectModelRequest {
    pub scenario: String,
}

#[derive(Serialize)]
pub struct ModelResponse {
    pub model: Option<String>,
    pub threshold: Threshold,
}

pub fn build_app(engine: Arc<ScoringEngine>, settings: AppSettings) -> Router {
    let cors = match settings.cors_allow_origin.as_deref() {
        Some(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        None => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let state = AppState {
        engine,
        model_dir: Arc::new(settings.model_dir),
        threshold: settings.threshold,
        admin_token: settings.admin_token,
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/scenarios", get(scenarios_handler))
        .route("/model", get(model_handler).post(select_model))
        .route("/classify", post(classify_handler))
        .route("/classify/batch", post(classify_batch_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn scenarios_handler(State(state): State<AppState>) -> Json<Vec<ScenarioView>> {
    let views = SCENARIOS
        .iter()
        .map(|s| ScenarioView {
            scenario: *s,
            label: s.label(),
            available: s.artifact_path(state.model_dir.as_path()).is_some(),
        })
        .collect();
    Json(views)
}

pub async fn model_handler(State(state): State<AppState>) -> Json<ModelResponse> {
    Json(ModelResponse { model: state.engine.active_model(), threshold: state.threshold })
}

async fn select_model(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SelectModelRequest>,
) -> Result<Json<ModelResponse>, ApiError> {
    authorize(&state, &headers)?;
    let scenario = Scenario::find(&req.scenario)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("unknown scenario {:?}", req.scenario)))?;

    let engine = state.engine.clone();
    let model_dir = state.model_dir.clone();
    let loaded = tokio::task::spawn_blocking(move || engine.load_scenario(scenario, model_dir.as_path()))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    if !loaded {
        warn!(scenario = scenario.name, "model switch rejected, keeping previous model");
        return Err((StatusCode::UNPROCESSABLE_ENTITY, format!("failed to load {}", scenario.name)));
    }
    info!(scenario = scenario.name, "model switched");
    Ok(Json(ModelResponse { model: state.engine.active_model(), threshold: state.threshold }))
}

pub async fn classify_handler(
    State(state): State<AppState>,
    Json(req): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let threshold = threshold_for(&state, req.threshold)?;
    let engine = state.engine.clone();
    let (processed_text, scored) = tokio::task::spawn_blocking(move || {
        let processed_text = engine.preprocessor().preprocess_text(&req.text).join(" ");
        let scored = engine.classify_batch_named(&[processed_text.as_str()]);
        (processed_text, scored)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let ModelScores { model, scores } = scored.map_err(engine_error)?;
    let Classification { score, label } = threshold.classify(scores[0]);
    Ok(Json(ClassifyResponse { model, score, label, processed_text }))
}

pub async fn classify_batch_handler(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    let threshold = threshold_for(&state, req.threshold)?;
    let start = std::time::Instant::now();

    let engine = state.engine.clone();
    let ModelScores { model, scores } = tokio::task::spawn_blocking(move || {
        let processed = engine.preprocessor().preprocess_batch(&req.texts);
        engine.classify_batch_named(&processed)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(engine_error)?;

    let results = scores.into_iter().map(|s| threshold.classify(s)).collect();
    Ok(Json(BatchResponse { model, took_s: start.elapsed().as_secs_f64(), results }))
}

fn threshold_for(state: &AppState, requested: Option<f32>) -> Result<Threshold, ApiError> {
    match requested {
        None => Ok(state.threshold),
        Some(t) if (0.0..=1.0).contains(&t) => Ok(Threshold(t)),
        Some(t) => Err((StatusCode::BAD_REQUEST, format!("threshold {t} outside [0, 1]"))),
    }
}

fn engine_error(err: Error) -> ApiError {
    let status = if err.is_usage() { StatusCode::CONFLICT } else { StatusCode::INTERNAL_SERVER_ERROR };
    (status, err.to_string())
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
