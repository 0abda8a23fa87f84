//! Wiring of clients, tools and services into [`AppState`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api::rate_limiter::RateLimiter;
use crate::api::routes::AppState;
use crate::config::{Config, EmbeddingBackend, VectorBackend};
use crate::orchestrator::{AgentLoop, ChatOrchestrator};
use crate::services::embedding_provider::{
    EmbeddingProvider, OllamaProvider, OpenAiEmbeddingProvider, ProviderError,
};
use crate::services::identity_provider::{Auth0Settings, DomainPolicy, IdentityProvider};
use crate::services::llm_client::{ChatModel, GenerationSettings, OpenAiChatClient};
use crate::services::search_client::SearchClient;
use crate::services::text_splitter::TextSplitter;
use crate::services::weather_client::WeatherClient;
use crate::services::{
    Auth0Client, DocumentIngestor, EmbeddingService, KnowledgeIngestor, TokenService,
};
use crate::storage::{ChromaClient, ChromaVectorStore, FileRepository, InMemoryVectorStore, VectorStore};
use crate::tools::document_qa::DocumentQaTool;
use crate::tools::knowledge_search::{GithubSearchTool, JiraSearchTool, KnowledgeSearcher, SlackSearchTool};
use crate::tools::weather::WeatherTool;
use crate::tools::web_search::WebSearchTool;
use crate::tools::{RegistryError, ToolRegistry};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Invalid embedding provider settings: {0}")]
    Embeddings(#[from] ProviderError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// External dependencies of the service. Production builds them from
/// [`Config`]; tests substitute in-process fakes.
#[derive(Clone)]
pub struct Backends {
    pub http: reqwest::Client,
    pub chat_model: Arc<dyn ChatModel>,
    pub embedding_provider: Arc<dyn EmbeddingProvider>,
    pub vector_store: Arc<dyn VectorStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl Backends {
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()?;

        let chat_model: Arc<dyn ChatModel> = Arc::new(OpenAiChatClient::new(
            http.clone(),
            config.openai_base_url.clone(),
            config.openai_api_key.clone(),
            config.openai_project_id.clone(),
            GenerationSettings {
                model: config.openai_model.clone(),
                temperature: config.llm_temperature,
                max_tokens: config.llm_max_tokens,
            },
        ));

        let embedding_provider: Arc<dyn EmbeddingProvider> = match config.embedding_backend {
            EmbeddingBackend::Openai => Arc::new(OpenAiEmbeddingProvider::new(
                http.clone(),
                config.openai_base_url.clone(),
                config.openai_api_key.clone(),
                config.embedding_model.clone(),
            )),
            EmbeddingBackend::Ollama => Arc::new(OllamaProvider::new(
                &config.ollama_url,
                config.embedding_model.clone(),
            )?),
        };

        let vector_store: Arc<dyn VectorStore> = match config.vector_backend {
            VectorBackend::Chroma => Arc::new(ChromaVectorStore::new(
                ChromaClient::with_client(config.chroma_url.clone(), http.clone()),
                config.vector_collection.clone(),
            )),
            VectorBackend::Memory => {
                tracing::warn!("Using the in-memory vector store; data is lost on restart");
                Arc::new(InMemoryVectorStore::new())
            }
        };

        let identity: Arc<dyn IdentityProvider> = Arc::new(Auth0Client::new(
            http.clone(),
            Auth0Settings {
                domain: config.auth0_domain.clone(),
                client_id: config.auth0_client_id.clone(),
                client_secret: config.auth0_client_secret.clone(),
                scope: config.auth0_scope.clone(),
                connection: config.auth0_connection.clone(),
            },
        ));

        Ok(Self {
            http,
            chat_model,
            embedding_provider,
            vector_store,
            identity,
        })
    }
}

/// Every tool the agent can be offered. Fails on duplicate registration.
pub fn build_tool_registry(
    config: &Config,
    http: &reqwest::Client,
    embeddings: Arc<EmbeddingService>,
    store: Arc<dyn VectorStore>,
) -> Result<ToolRegistry, RegistryError> {
    let searcher = KnowledgeSearcher::new(embeddings.clone(), store.clone());

    ToolRegistry::builder()
        .register(DocumentQaTool::new(embeddings, store))
        .register(WeatherTool::new(WeatherClient::new(
            http.clone(),
            config.weather_base_url.clone(),
            config.weather_api_key.clone(),
            config.weather_units.clone(),
        )))
        .register(WebSearchTool::new(SearchClient::new(
            http.clone(),
            config.tavily_base_url.clone(),
            config.tavily_api_key.clone(),
        )))
        .register(SlackSearchTool::new(searcher.clone()))
        .register(JiraSearchTool::new(searcher.clone()))
        .register(GithubSearchTool::new(searcher))
        .build()
}

pub fn build_state(config: Config, backends: Backends) -> Result<AppState, StartupError> {
    let embeddings = Arc::new(EmbeddingService::new(backends.embedding_provider));
    let store = backends.vector_store;

    let registry = build_tool_registry(&config, &backends.http, embeddings.clone(), store.clone())?;
    tracing::info!(tools = ?registry.kinds(), "Tool registry built");

    let agent = AgentLoop::new(backends.chat_model, registry, config.agent_recursion_limit);
    let orchestrator = ChatOrchestrator::new(agent, config.routing_mode);

    let ingestor = DocumentIngestor::new(
        embeddings.clone(),
        store.clone(),
        TextSplitter::new(config.chunk_size, config.chunk_overlap),
        config.upsert_batch_size,
    );

    let tokens = TokenService::new(
        &config.jwt_secret,
        &config.session_secret,
        config.jwt_expiry_hours,
        config.state_expiry_minutes,
    );

    let domain_policy = DomainPolicy {
        enabled: config.domain_restrictions_enabled,
        allowed_domains: config.allowed_email_domains.clone(),
        allow_all_gmail: config.allow_all_gmail,
    };

    let rate_limiter = RateLimiter::new(
        config.rate_limit_max_requests,
        Duration::from_millis(config.rate_limit_window_ms),
    );

    Ok(AppState {
        orchestrator: Arc::new(orchestrator),
        ingestor: Arc::new(ingestor),
        files: Arc::new(FileRepository::new(store.clone())),
        knowledge: Arc::new(KnowledgeIngestor::new(embeddings, store)),
        tokens: Arc::new(tokens),
        identity: backends.identity,
        domain_policy,
        rate_limiter,
        started_at: Instant::now(),
        config: Arc::new(config),
    })
}
