//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: infrastructure wiring (store, channel, saga services)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and input validation
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use stockshift_infra::Settings;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, BuildError};

/// Build the full HTTP router from settings (public entrypoint used by `main.rs`).
pub async fn build_app(settings: &Settings) -> Result<Router, BuildError> {
    let services = Arc::new(services::build_services(settings).await?);
    Ok(router(services, &settings.jwt_secret, &settings.rpc_secret))
}

/// Router over already-wired services.
///
/// ```text
/// /health                     public
/// /rpc/...                    bearer shared secret (planning engine callback)
/// everything else             bearer JWT
/// ```
pub fn router(services: Arc<AppServices>, jwt_secret: &str, rpc_secret: &str) -> Router {
    let jwt = Arc::new(stockshift_auth::Hs256JwtValidator::new(jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { jwt };

    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    let rpc_state = middleware::RpcAuthState {
        secret: Arc::from(rpc_secret),
    };
    let rpc = routes::rpc::router().layer(axum::middleware::from_fn_with_state(
        rpc_state,
        middleware::rpc_auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(rpc)
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
