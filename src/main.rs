//! Eco-Tourism Climate Risk Prediction API
//!
//! Serves a climate risk score (linear regression) and a flood risk
//! category (logistic regression) for a candidate eco-tourism site.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  CLIMATE RISK API                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌──────────────────┐   ┌─────────────────┐  │
//! │  │  HTTP     │──▶│  Validate /      │──▶│  Dispatcher     │  │
//! │  │  (Axum)   │   │  Normalize       │   │  (both models)  │  │
//! │  └───────────┘   └────────┬─────────┘   └────────┬────────┘  │
//! │                           └──────────┬───────────┘           │
//! │                                      ▼                       │
//! │                             ┌─────────────────┐              │
//! │                             │  Model Store    │              │
//! │                             │  (read-only)    │              │
//! │                             └─────────────────┘              │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod inference;
mod models;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    handler::HandlerWithoutStateExt,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
    services::ServeDir,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};
use inference::ModelStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "climate_risk_api=debug,tower_http=debug".into());
    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Climate Risk API starting ({})...", config.environment);

    // Load model artifacts
    let state = build_state(&config)?;

    // Build router
    let app = create_router(state);

    // Start server
    let host: std::net::IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid HOST '{}'", config.host))?;
    let addr = SocketAddr::from((host, config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// `None` when the artifacts failed to load at startup
    pub store: Option<Arc<ModelStore>>,
    pub load_error: Option<String>,
    pub config: config::Config,
}

/// Load the model store, or fall back to a degraded state without models
/// unless `REQUIRE_MODELS` is set
fn build_state(config: &config::Config) -> anyhow::Result<AppState> {
    let state = match ModelStore::load(&config.model_dir, &config.feature_names_path) {
        Ok(store) => AppState {
            store: Some(Arc::new(store)),
            load_error: None,
            config: config.clone(),
        },
        Err(e) if config.require_models => {
            return Err(anyhow::Error::new(e).context("Failed to load model artifacts"));
        }
        Err(e) => {
            tracing::error!("Failed to load model artifacts: {}", e);
            if config.is_production() {
                tracing::warn!("Serving without models; set REQUIRE_MODELS=true to abort instead");
            }
            AppState {
                store: None,
                load_error: Some(e.to_string()),
                config: config.clone(),
            }
        }
    };

    Ok(state)
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir)
        .not_found_service(handlers::pages::not_found.into_service());

    Router::new()
        .route("/", get(handlers::pages::index))
        .route("/api/health", get(handlers::health::check))
        .route("/api/predict", post(handlers::predict::predict))
        .nest_service("/static", static_files)
        .fallback(handlers::pages::not_found)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
