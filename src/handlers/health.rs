//! Health check handler

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::inference::Task;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    models_loaded: bool,
    available_models: Vec<&'static str>,
    encoders_loaded: bool,
    available_encoders: Vec<&'static str>,
    scalers_loaded: bool,
    available_scalers: Vec<&'static str>,
    feature_names_loaded: bool,
    available_feature_sets: Vec<&'static str>,
    platform: String,
    version: &'static str,
    timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    models_loaded_at: Option<i64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    artifact_digests: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    load_error: Option<String>,
}

/// Always 200; `status` says whether predictions can be served
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let loaded = state.store.is_some();

    let tasks: Vec<&'static str> = if loaded {
        Task::ALL.iter().map(Task::as_str).collect()
    } else {
        Vec::new()
    };
    let feature_sets: Vec<&'static str> = if loaded {
        Task::ALL.iter().map(Task::features_key).collect()
    } else {
        Vec::new()
    };

    Json(HealthResponse {
        status: if loaded { "healthy" } else { "unhealthy" },
        models_loaded: loaded,
        available_models: tasks.clone(),
        encoders_loaded: loaded,
        available_encoders: tasks.clone(),
        scalers_loaded: loaded,
        available_scalers: tasks,
        feature_names_loaded: loaded,
        available_feature_sets: feature_sets,
        platform: state.config.platform.clone(),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        models_loaded_at: state.store.as_ref().map(|s| s.info().loaded_at.timestamp()),
        artifact_digests: state
            .store
            .as_ref()
            .map(|s| s.info().digests.clone())
            .unwrap_or_default(),
        load_error: state.load_error.clone(),
    })
}
