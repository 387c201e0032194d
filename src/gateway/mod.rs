//! HTTP Gateway
//!
//! Route dispatch for the broker API. Transaction and user routes sit
//! behind the JWT middleware; login, health and the OpenAPI document are
//! public. Panics in handlers are caught at this boundary and rendered as
//! 500 with the standard error body.

pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use utoipa::OpenApi;

use crate::auth::jwt_auth_middleware;
use state::AppState;

/// Build the full application router
pub fn router(state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        .route("/users/me", get(handlers::me))
        .route("/transactions", get(handlers::list_transactions))
        .route("/transactions/withdraw", post(handlers::withdraw))
        .route("/transactions/deposit", post(handlers::deposit))
        .route(
            "/transactions/cancel/{provider_tx_id}",
            post(handlers::cancel),
        )
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    let public_routes = Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/health", get(handlers::health_check));

    Router::new()
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(openapi::ApiDoc::openapi()) }),
        )
        .nest("/api/v1", public_routes.merge(protected_routes))
        .layer(axum::middleware::from_fn(middleware::request_logger))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// Translate a handler panic into the standard 500 error body
fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> axum::response::Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };

    error!(panic = %detail, "Handler panicked");

    let body = serde_json::json!({
        "error": {
            "code": "INTERNAL_ERROR",
            "message": "Internal server error",
            "timestamp": chrono::Utc::now(),
        },
        "success": false,
    });

    (
        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        Json(body),
    )
        .into_response()
}

/// Bind and serve until the shutdown future resolves
pub async fn run_server(
    state: Arc<AppState>,
    addr: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = router(state);
    let listener = TcpListener::bind(addr).await?;

    info!("Gateway listening on http://{}", addr);
    info!("OpenAPI document: http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
