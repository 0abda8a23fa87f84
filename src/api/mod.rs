pub mod auth_routes;
pub mod chat;
pub mod docs;
pub mod dto;
pub mod error;
pub mod files;
pub mod rate_limiter;
pub mod routes;
pub mod upload;
pub mod webhook;

pub use error::ApiError;
pub use routes::{create_router, AppState};
