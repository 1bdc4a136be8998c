use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use tracing::info;

use stockshift_auth::Permission;

use crate::app::{dto, errors, services::AppServices};
use crate::authz::authorize_request;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/inbound", post(register_inbound))
}

/// POST /inventory/inbound - Register a received supply at its warehouse
pub async fn register_inbound(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::RegisterSupplyRequest>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &Permission::SUPPLIES_REGISTER) {
        return errors::authz_error_to_response(e);
    }

    let supply = match body.into_new_supply(principal.username()) {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store.register_supply(supply).await {
        Ok(supply) => {
            info!(
                supply_id = %supply.id,
                warehouse_id = %supply.warehouse_id,
                lines = supply.items.len(),
                "supply received"
            );
            (StatusCode::CREATED, Json(supply)).into_response()
        }
        Err(e) => errors::domain_error_to_response(e.into()),
    }
}
