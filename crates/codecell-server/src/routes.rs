use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use codecell::{ExecutionRequest, LanguageId, Orchestrator, WireResponse};

use crate::error::AppResult;

pub fn router(service: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/execute_code", post(execute_code))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Request body for `POST /execute_code`.
#[derive(Debug, Deserialize)]
struct ExecuteBody {
    language: String,
    code: String,
    #[serde(default)]
    stdin: Option<String>,
}

/// POST /execute_code
///
/// Run one program and wait for its result. Program failures (compile
/// errors, crashes, timeouts) come back as 200 with the failure encoded
/// in the body; only service-level problems produce error statuses.
async fn execute_code(
    State(service): State<Arc<Orchestrator>>,
    Json(body): Json<ExecuteBody>,
) -> AppResult<Json<WireResponse>> {
    let language: LanguageId = body.language.trim().parse()?;

    let mut request = ExecutionRequest::new(language, body.code);
    if let Some(stdin) = body.stdin {
        request = request.with_stdin(stdin);
    }

    let result = service.submit(request).await?;
    Ok(Json(WireResponse::from(&result)))
}

/// GET /health
async fn health(State(service): State<Arc<Orchestrator>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "available_slots": service.available_slots(),
    }))
}
