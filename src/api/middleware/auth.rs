//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, resolves it to a signed-in
//! session and injects `SessionContext` into request extensions for
//! downstream handlers. The resolved actor is also stamped on the response
//! so the outer audit layer can attribute the request.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{hash_token, ApiContext, SessionContext};
use crate::core_state::{lock_session, AccessSource};

/// Require a valid bearer token for a live session.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token_hash = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| hash_token(t.trim()))
        .ok_or(ApiError::Unauthorized)?;

    let session = ctx.core.session(&token_hash)?;
    // Guard dropped before any .await
    let user = {
        let guard = lock_session(&session)?;
        guard.user().clone()
    };

    let source = AccessSource::Actor {
        user_id: user.id,
        role: user.role,
    };
    req.extensions_mut().insert(SessionContext {
        token_hash,
        user,
        session,
    });

    let mut response = next.run(req).await;
    response.extensions_mut().insert(source);
    Ok(response)
}
