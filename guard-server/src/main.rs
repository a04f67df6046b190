//! Guard Predictor Server
//!
//! HTTP front for the guard prediction core.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    GUARD PREDICTOR                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌──────────────────────────────────────┐   │
//! │  │  API      │  │  guard-core (blocking pool)          │   │
//! │  │  (Axum)   │─▶│  features → models → ranking         │   │
//! │  │           │  │  explain / counterfactual            │   │
//! │  └───────────┘  └──────────────────┬───────────────────┘   │
//! │                                    ▼                       │
//! │                    ┌───────────────────────────┐           │
//! │                    │ Artifacts (loaded at boot)│           │
//! │                    └───────────────────────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod artifacts;
mod config;
mod error;
mod handlers;
mod models;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use guard_core::GuardPredictor;
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging; JSON lines in production
    let production = config.is_production();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "guard_server=debug,guard_core=info,tower_http=debug".into()))
        .with(production.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!production).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!("Guard Predictor Server starting...");
    tracing::info!("Artifacts: {}", config.artifacts_dir.display());

    // Load artifacts
    let context = artifacts::load_context(&config.artifacts_dir, config.num_classes)
        .with_context(|| format!("Failed to load artifacts from {}", config.artifacts_dir.display()))?;

    // Build application state
    let state = AppState {
        predictor: Arc::new(GuardPredictor::new(context)),
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
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
    pub predictor: Arc<GuardPredictor>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))

        // Models
        .route("/api/v1/models", get(handlers::catalog::list))

        // Prediction
        .route("/api/v1/predict", post(handlers::predict::predict))

        // Explainability
        .route("/api/v1/explain", post(handlers::explain::explain))
        .route("/api/v1/feature-importance/:model_id", get(handlers::explain::feature_importance))

        // Counterfactual
        .route("/api/v1/counterfactual", post(handlers::counterfactual::analyze))
        .route("/api/v1/counterfactual/threshold", post(handlers::counterfactual::threshold))

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

#[cfg(test)]
mod tests;
