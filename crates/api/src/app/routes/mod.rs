use axum::{routing::get, Router};

pub mod admin;
pub mod distribution;
pub mod inventory;
pub mod rpc;
pub mod system;
pub mod warehouses;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .merge(warehouses::router())
        .nest("/distribution", distribution::router())
        .nest("/inventory", inventory::router())
        .nest("/admin", admin::router())
}
