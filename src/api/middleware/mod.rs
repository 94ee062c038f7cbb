//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Auth validator — bearer token → session
//! 2. Audit logger — logs after auth, knows the actor

pub mod audit;
pub mod auth;
