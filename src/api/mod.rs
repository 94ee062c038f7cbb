//! HTTP/JSON API over the signed-in actor's appointment registry.
//!
//! Routes are nested under `/api/`. Protected routes run behind
//! Auth → Audit → Handler; `/api/health` and `/api/auth/login` are open.
//!
//! The router is composable — `api_router()` returns a `Router`
//! that can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{ApiServer, ServerSession};
pub use types::ApiContext;
