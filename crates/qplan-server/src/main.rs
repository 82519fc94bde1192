//! # qplan-server: HTTP Service for Plan Estimation and Optimisation
//!
//! Exposes the estimator and the optimiser of `qplan-core` over HTTP/JSON. Each
//! request carries its own catalogue (relation and attribute statistics) and a plan
//! tree; nothing is stored between requests.
//!
//! ## Endpoints
//!
//! - `GET  /health`    - Health check
//! - `POST /estimate`  - Estimate a plan and return its cost and annotated tree
//! - `POST /optimise`  - Optimise a plan and return the rewritten tree
//! - `GET  /sample`    - Run the built-in people/departments/projects workload
//!
//! ## Configuration
//!
//! The server listens on `0.0.0.0:3000` unless `QPLAN_ADDR` says otherwise.
//! `QPLAN_MAX_JOIN_PREDICATES` and `QPLAN_PARALLEL` tune the optimiser. Logging is
//! controlled by `RUST_LOG` (defaults to `qplan=debug`).

mod request;
mod routes;
mod state;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::state::{AppState, ServerConfig};

/// Build the router over shared state. Split out of `main` so tests can drive it.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/estimate", post(routes::estimate))
        .route("/optimise", post(routes::optimise))
        .route("/sample", get(routes::sample))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("qplan=debug,tower_http=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let state = Arc::new(AppState::new(ServerConfig::from_env()));
    let optimiser = &state.config.optimiser;
    tracing::info!(
        max_join_predicates = optimiser.max_join_predicates,
        parallel = optimiser.parallel,
        "optimiser configured"
    );

    let listener = tokio::net::TcpListener::bind(&state.config.addr).await?;
    tracing::info!("qplan-server listening on http://{}", state.config.addr);
    axum::serve(listener, app(state)).await
}
