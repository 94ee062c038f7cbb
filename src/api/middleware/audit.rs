//! Audit logging middleware.
//!
//! Logs every API request with the actor, method, path and response
//! status. Wraps the auth layer so rejected requests are recorded too;
//! the actor is read from the response, where auth leaves it.

use axum::extract::OriginalUri;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::ApiContext;
use crate::core_state::AccessSource;

/// Log API access for audit trail.
pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    // Nested routers see a stripped URI; log the full path.
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let ctx = req.extensions().get::<ApiContext>().cloned();

    let response = next.run(req).await;

    if let Some(ctx) = ctx {
        let source = response
            .extensions()
            .get::<AccessSource>()
            .cloned()
            .unwrap_or(AccessSource::Anonymous);
        let status = response.status().as_u16();
        ctx.core
            .log_access(source, &format!("{method} {path}"), &format!("status:{status}"));
    }

    response
}
