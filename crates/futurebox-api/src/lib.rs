//! HTTP API for FutureBox: accounts, the capsule lifecycle and the
//! listing feeds.

pub mod accounts;
pub mod auth;
pub mod capsules;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod middleware;
pub mod routes;
pub mod session;

pub use auth::{AppState, AppStateInner};
pub use error::AppError;
pub use routes::router;
