pub mod chroma_client;
pub mod file_repository;
pub mod vector_store;

pub use chroma_client::{ChromaClient, ChromaError};
pub use file_repository::FileRepository;
pub use vector_store::{
    ChromaVectorStore, InMemoryVectorStore, MetadataFilter, VectorStore, VectorStoreError,
};
