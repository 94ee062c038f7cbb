//! API endpoint handlers.
//!
//! Handlers are thin: they resolve the caller's session and delegate to
//! the registry.

pub mod appointments;
pub mod auth;
pub mod health;
