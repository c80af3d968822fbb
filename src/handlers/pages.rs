//! HTML form and fallback handlers

use axum::{extract::State, http::StatusCode, response::Html, Json};
use serde_json::{json, Value};

use crate::{AppError, AppResult, AppState};

/// Serve the prediction form
pub async fn index(State(state): State<AppState>) -> AppResult<Html<String>> {
    let path = state.config.template_dir.join("index.html");

    match tokio::fs::read_to_string(&path).await {
        Ok(page) => Ok(Html(page)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Template not found: {}", path.display());
            Err(AppError::NotFound("Page not found".to_string()))
        }
        Err(e) => Err(AppError::InternalError(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Unknown routes
pub async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found" })),
    )
}
