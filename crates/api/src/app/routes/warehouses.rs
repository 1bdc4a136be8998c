use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use stockshift_auth::Permission;
use stockshift_core::WarehouseId;

use crate::app::{errors, services::AppServices};
use crate::authz::authorize_request;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/warehouse-stats", get(all_stats))
        .route("/warehouses/:id/stats", get(stats))
}

/// GET /warehouse-stats - Capacity snapshot of every warehouse
pub async fn all_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &Permission::WAREHOUSE_STATS_READ) {
        return errors::authz_error_to_response(e);
    }

    match services.capacity.snapshot_all().await {
        Ok(snapshots) => Json(snapshots).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// GET /warehouses/:id/stats
pub async fn stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &Permission::WAREHOUSE_STATS_READ) {
        return errors::authz_error_to_response(e);
    }

    let warehouse_id = match id.parse::<WarehouseId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.capacity.snapshot(warehouse_id).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
