pub mod document_ingestion;
pub mod embedding_provider;
pub mod embedding_service;
pub mod identity_provider;
pub mod knowledge_ingestion;
pub mod llm_client;
pub mod search_client;
pub mod text_extraction;
pub mod text_splitter;
pub mod token_service;
pub mod weather_client;

// Re-export for convenience
pub use document_ingestion::DocumentIngestor;
pub use embedding_service::EmbeddingService;
pub use identity_provider::{Auth0Client, IdentityProvider};
pub use knowledge_ingestion::KnowledgeIngestor;
pub use llm_client::{ChatModel, OpenAiChatClient};
pub use token_service::TokenService;
