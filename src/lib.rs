//! Knowledge Chat - routed, tool-augmented chat over documents and team knowledge

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod startup;
pub mod storage;
pub mod tools;

// Re-export main types for convenience
pub use crate::api::routes::{create_router, AppState};
pub use crate::config::Config;
pub use crate::orchestrator::{ChatOrchestrator, ConversationState, SelectedNode};
pub use crate::startup::{build_state, Backends, StartupError};
pub use crate::tools::{ToolKind, ToolRegistry};
