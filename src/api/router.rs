//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack on protected routes (outermost → innermost):
//! 1. no-store header → 2. Audit logger → 3. Auth validator

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);

    // Layers are applied from bottom (innermost) to top (outermost).
    // Extension must be outermost so all middleware can access ApiContext.
    //
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/session", get(endpoints::auth::current))
        .route("/auth/logout", post(endpoints::auth::logout))
        .route(
            "/appointments",
            get(endpoints::appointments::list).post(endpoints::appointments::create),
        )
        .route("/appointments/summary", get(endpoints::appointments::summary))
        .route("/appointments/:id", get(endpoints::appointments::detail))
        .route(
            "/appointments/:id/conflicts",
            get(endpoints::appointments::conflicts),
        )
        .route(
            "/appointments/:id/status",
            patch(endpoints::appointments::update_status),
        )
        .route(
            "/appointments/:id/schedule",
            patch(endpoints::appointments::reschedule),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes (audited as anonymous)
    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/login", post(endpoints::auth::login))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::Extension(ctx));

    Router::new()
        .nest("/api", protected.merge(public))
        .layer(CorsLayer::permissive())
}
