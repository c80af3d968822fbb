//! Prediction handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde_json::Value;

use crate::inference;
use crate::models::{PredictResponse, PredictionRequest};
use crate::{AppError, AppResult, AppState};

/// Validate the body, run both models, return the combined result
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<PredictResponse>> {
    let store = state.store.as_ref().ok_or(AppError::ModelsNotLoaded)?;

    let Json(body) = body?;
    let request = PredictionRequest::from_json(&body)
        .inspect_err(|e| tracing::debug!("Rejected prediction request: {}", e))?;

    let result = inference::predict(store, &request)?;

    tracing::info!(
        "Predicted climate risk {:.3} ({:?}), flood risk {:?}",
        result.climate_risk_score,
        result.risk_level,
        result.flood_risk_category
    );

    Ok(Json(result.into()))
}
