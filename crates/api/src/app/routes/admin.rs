//! Admin routes for reference data (warehouses, products).

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
    Router::new()
        .route("/warehouses", post(create_warehouse).get(list_warehouses))
        .route("/products", post(create_product))
}

/// POST /admin/warehouses
pub async fn create_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateWarehouseRequest>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &Permission::WAREHOUSES_ADMIN) {
        return errors::authz_error_to_response(e);
    }

    let capacity = match dto::capacity(body.total_capacity_m3) {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store.create_warehouse(capacity).await {
        Ok(warehouse) => {
            info!(warehouse_id = %warehouse.id, total_capacity_m3 = capacity, actor = principal.username(), "warehouse created");
            (StatusCode::CREATED, Json(warehouse)).into_response()
        }
        Err(e) => errors::domain_error_to_response(e.into()),
    }
}

/// GET /admin/warehouses
pub async fn list_warehouses(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &Permission::WAREHOUSES_ADMIN) {
        return errors::authz_error_to_response(e);
    }

    match services.store.list_warehouses().await {
        Ok(warehouses) => Json(warehouses).into_response(),
        Err(e) => errors::domain_error_to_response(e.into()),
    }
}

/// POST /admin/products
pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &Permission::PRODUCTS_ADMIN) {
        return errors::authz_error_to_response(e);
    }

    let volume = match dto::unit_volume(body.volume_m3) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store.create_product(volume).await {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(e) => errors::domain_error_to_response(e.into()),
    }
}
