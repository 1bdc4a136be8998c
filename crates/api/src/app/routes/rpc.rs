//! Inbound plan callback from the planning engine.
//!
//! Unary JSON call. The planning engine presents the shared `RPC_SECRET` as a
//! bearer token; user JWTs are not accepted here.

use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, routing::post, Json, Router};

use stockshift_distribution::DistributionPlan;

use crate::app::{errors, services::AppServices};

pub const PROCESS_PLAN_PATH: &str = "/rpc/distribution.DistributionResultReceiver/ProcessPlan";

pub fn router() -> Router {
    Router::new().route(PROCESS_PLAN_PATH, post(process_plan))
}

/// ProcessPlan(plan) -> {}
///
/// Re-delivery of an already applied plan succeeds without side effects.
pub async fn process_plan(
    Extension(services): Extension<Arc<AppServices>>,
    Json(plan): Json<DistributionPlan>,
) -> axum::response::Response {
    match services.engine.apply(&plan).await {
        Ok(_) => Json(serde_json::json!({})).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
