//! Shared types for the HTTP API layer.

use std::sync::Arc;

use base64::Engine;
use sha2::{Digest, Sha256};

use crate::core_state::{CoreState, SharedSession, TokenHash};
use crate::models::User;

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

// ═══════════════════════════════════════════════════════════
// Session context — injected by auth middleware
// ═══════════════════════════════════════════════════════════

/// Authenticated caller, injected into request extensions by the auth
/// middleware after the bearer token resolved to a live session.
#[derive(Clone)]
pub struct SessionContext {
    pub token_hash: TokenHash,
    pub user: User,
    pub session: SharedSession,
}

// ═══════════════════════════════════════════════════════════
// Bearer tokens
// ═══════════════════════════════════════════════════════════

/// Hash a bearer token string using SHA-256. Only hashes are kept in memory.
pub fn hash_token(token: &str) -> TokenHash {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
