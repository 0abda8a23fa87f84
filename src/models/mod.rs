pub mod chat;
pub mod document;
pub mod user;

pub use chat::{Message, Role, ToolCall, ToolSchema};
pub use document::{DocumentMetadata, IngestionReport, VectorMatch, VectorRecord};
pub use user::{AuthUser, ANONYMOUS_USER};
