//! HTTP surface for the vote accounting core.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::Config;
pub use routes::{apply_middleware, router, MiddlewareConfig};
pub use state::AppState;
