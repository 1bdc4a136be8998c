//! Outbound trigger and read side of the distribution saga.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockshift_auth::Permission;
use stockshift_core::{DomainError, RequestId};

use crate::app::{dto, errors, services::AppServices};
use crate::authz::authorize_request;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/calculate", post(calculate))
        .route("/shipments", get(list_shipments))
        .route("/requests/:request_id", get(get_request))
}

/// POST /distribution/calculate - Ask the planning engine for a plan
pub async fn calculate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CalculateRequest>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &Permission::DISTRIBUTION_CALCULATE) {
        return errors::authz_error_to_response(e);
    }

    let supply_id = match dto::supply_id(body.supply_id) {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .dispatcher
        .dispatch(supply_id, &principal.initiator())
        .await
    {
        Ok(request_id) => (
            StatusCode::ACCEPTED,
            Json(dto::CalculationTriggeredResponse::new(request_id)),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// GET /distribution/shipments - All shipments with their items
pub async fn list_shipments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &Permission::SHIPMENTS_READ) {
        return errors::authz_error_to_response(e);
    }

    match services.store.list_shipments().await {
        Ok(shipments) => Json(shipments).into_response(),
        Err(e) => errors::domain_error_to_response(e.into()),
    }
}

/// GET /distribution/requests/:request_id - Recorded outcome of an applied plan
pub async fn get_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(request_id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &Permission::SHIPMENTS_READ) {
        return errors::authz_error_to_response(e);
    }

    let request_id = match request_id.parse::<RequestId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let application = match services.store.find_plan_application(request_id).await {
        Ok(Some(application)) => application,
        Ok(None) => {
            return errors::domain_error_to_response(DomainError::not_found(format!(
                "no plan applied for request {request_id}"
            )));
        }
        Err(e) => return errors::domain_error_to_response(e.into()),
    };

    match services.store.list_unallocated(request_id).await {
        Ok(unallocated) => Json(dto::RequestOutcomeResponse::new(application, unallocated)).into_response(),
        Err(e) => errors::domain_error_to_response(e.into()),
    }
}
