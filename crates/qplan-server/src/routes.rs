//! # HTTP Route Handlers
//!
//! ## Pipeline
//!
//! 1. **Catalogue**: register the request's relations in a per-request catalogue.
//! 2. **Plan**: build the plan tree, resolving scans against that catalogue.
//! 3. **Run**: estimate, or optimise on the blocking pool (the join-order search is
//!    CPU-bound and can run for a while near the predicate limit).
//! 4. **Render**: return costs plus the one-line and indented renderings.
//!
//! ## Error Handling
//!
//! - 400 Bad Request: malformed input (unknown relation or attribute, bad predicate,
//!   too many join predicates)
//! - 500 Internal Server Error: an internal invariant failed, or the worker panicked

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

use qplan_core::inspect::display;
use qplan_core::{estimate as estimate_plan, sample as workload, Optimiser, Plan, PlanError};

use crate::request::{
    build_catalog, build_plan, EstimateResponse, OptimiseResponse, PlanRequest, RequestError,
    SampleResponse,
};
use crate::state::AppState;

type ApiError = (StatusCode, String);

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// POST /estimate
pub async fn estimate(Json(req): Json<PlanRequest>) -> Result<Json<EstimateResponse>, ApiError> {
    let plan = parse(&req)?;
    run_estimate(plan).map(Json).map_err(reject)
}

/// POST /optimise
pub async fn optimise(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlanRequest>,
) -> Result<Json<OptimiseResponse>, ApiError> {
    let plan = parse(&req)?;
    let response = tokio::task::spawn_blocking(move || run_optimise(&state.optimiser, &plan))
        .await
        .map_err(|e| {
            error!(error = %e, "optimiser task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Optimiser task failed: {}", e))
        })?;
    response.map(Json).map_err(reject)
}

/// GET /sample: the people/departments/projects workload, before and after.
pub async fn sample(State(state): State<Arc<AppState>>) -> Result<Json<SampleResponse>, ApiError> {
    let catalog = workload::catalog().map_err(reject)?;
    let plan = workload::query(&catalog).map_err(reject)?;
    let optimised = run_optimise(&state.optimiser, &plan).map_err(reject)?;
    let original = run_estimate(plan).map_err(reject)?;
    Ok(Json(SampleResponse {
        original,
        optimised,
    }))
}

fn parse(req: &PlanRequest) -> Result<Plan, ApiError> {
    let catalog = build_catalog(&req.catalogue).map_err(reject)?;
    build_plan(&req.plan, &catalog).map_err(|e| match e {
        RequestError::Plan(err) => reject(err),
        RequestError::Predicate(msg) => (StatusCode::BAD_REQUEST, msg),
    })
}

fn run_estimate(mut plan: Plan) -> Result<EstimateResponse, PlanError> {
    let cost = estimate_plan(&mut plan)?;
    Ok(EstimateResponse {
        cost,
        summary: plan.to_string(),
        plan: display(&plan),
    })
}

fn run_optimise(optimiser: &Optimiser, plan: &Plan) -> Result<OptimiseResponse, PlanError> {
    let (best, stats) = optimiser.optimise_with_stats(plan)?;
    debug!(
        original = stats.baseline_cost,
        cost = stats.best_cost,
        candidates = stats.candidates,
        kept_input = stats.kept_input,
        "optimised request"
    );
    Ok(OptimiseResponse {
        original_cost: stats.baseline_cost,
        cost: stats.best_cost,
        candidates: stats.candidates,
        kept_input: stats.kept_input,
        summary: best.to_string(),
        plan: display(&best),
    })
}

fn reject(err: PlanError) -> ApiError {
    if err.is_invariant_violation() {
        error!(error = %err, "invariant violation");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Internal error: {}", err))
    } else {
        (StatusCode::BAD_REQUEST, err.to_string())
    }
}
