//! Mock sign-in endpoints.
//!
//! `POST /api/auth/login` — Unprotected: email + role (+ name to register)
//! `POST /api/auth/logout` — Protected: drops the caller's session
//! `GET /api/session` — Protected: who am I

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{generate_token, hash_token, ApiContext, SessionContext};
use crate::core_state::lock_session;
use crate::models::{Role, User};
use crate::session::{Session, SessionInfo};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub role: Role,
    /// Present on the registration form only.
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// `POST /api/auth/login` — sign in (or register) and receive a bearer token.
pub async fn login(
    State(ctx): State<ApiContext>,
    request: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LoginResponse>), ApiError> {
    let Json(request) = request?;
    let session = match request.name.as_deref() {
        Some(name) => Session::register(name, &request.email, request.role)?,
        None => Session::sign_in(&request.email, request.role)?,
    };
    let user = session.user().clone();

    let token = generate_token();
    ctx.core.insert_session(hash_token(&token), session)?;

    Ok((StatusCode::CREATED, Json(LoginResponse { token, user })))
}

/// `POST /api/auth/logout` — end the caller's session.
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<SessionContext>,
) -> Result<StatusCode, ApiError> {
    ctx.core.remove_session(&caller.token_hash)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/session` — the signed-in actor.
pub async fn current(
    Extension(caller): Extension<SessionContext>,
) -> Result<Json<SessionInfo>, ApiError> {
    let session = lock_session(&caller.session)?;
    Ok(Json(session.info()))
}
