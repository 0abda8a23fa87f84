use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::{Validate, ValidationError};

/// Main configuration for the knowledge chat service
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_chunking"))]
pub struct Config {
    // ==================== SERVER ====================
    pub server_host: String,

    /// HTTP server port
    #[validate(range(min = 1, max = 65535))]
    pub server_port: u16,

    /// `development` exposes error details in responses
    pub environment: String,

    /// Log level (e.g., info, debug, trace)
    pub log_level: String,

    /// Externally reachable base URL of this service, used for the OAuth callback
    pub public_url: String,

    pub frontend_url: String,

    /// CORS origins; falls back to `frontend_url` when empty
    pub allowed_origins: Vec<String>,

    // ==================== LLM ====================
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_project_id: Option<String>,

    #[validate(range(min = 0.0, max = 2.0))]
    pub llm_temperature: f32,

    #[validate(range(min = 1))]
    pub llm_max_tokens: u32,

    #[validate(range(min = 1, max = 600))]
    pub llm_timeout_secs: u64,

    // ==================== EMBEDDINGS / VECTORS ====================
    pub embedding_backend: EmbeddingBackend,
    pub embedding_model: String,

    /// Ollama base URL
    pub ollama_url: String,

    pub vector_backend: VectorBackend,

    /// Chroma base URL
    pub chroma_url: String,

    #[validate(length(min = 1))]
    pub vector_collection: String,

    // ==================== TOOLS ====================
    pub tavily_api_key: Option<String>,
    pub tavily_base_url: String,
    pub weather_api_key: Option<String>,
    pub weather_base_url: String,
    pub weather_units: String,

    // ==================== AUTH ====================
    pub auth0_domain: String,
    pub auth0_client_id: String,
    pub auth0_client_secret: String,
    pub auth0_scope: String,
    pub auth0_connection: Option<String>,

    #[validate(length(min = 16))]
    pub jwt_secret: String,

    #[validate(range(min = 1, max = 720))]
    pub jwt_expiry_hours: i64,

    /// Signs the short-lived OAuth state parameter
    #[validate(length(min = 16))]
    pub session_secret: String,

    #[validate(range(min = 1, max = 60))]
    pub state_expiry_minutes: i64,

    pub auth_cookie_name: String,
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,

    /// Also hand the app token to the frontend in the callback redirect URL
    pub redirect_token_fallback: bool,

    /// When false, chat and file endpoints fall back to the `anonymous` user
    pub require_auth: bool,

    pub domain_restrictions_enabled: bool,
    pub allowed_email_domains: Vec<String>,
    pub allow_all_gmail: bool,
    pub domain_block_message: String,

    /// Static key expected in `X-API-Key` on the webhook endpoint
    pub webhook_api_key: Option<String>,

    // ==================== LIMITS ====================
    #[validate(range(min = 1000))]
    pub rate_limit_window_ms: u64,

    #[validate(range(min = 1))]
    pub rate_limit_max_requests: u32,

    #[validate(range(min = 1024))]
    pub max_upload_bytes: usize,

    #[validate(length(min = 1))]
    pub allowed_upload_types: Vec<String>,

    #[validate(range(min = 100, max = 8000))]
    pub chunk_size: usize,

    pub chunk_overlap: usize,

    #[validate(range(min = 1, max = 1000))]
    pub upsert_batch_size: usize,

    #[validate(range(min = 1, max = 25))]
    pub agent_recursion_limit: usize,

    pub routing_mode: RoutingMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Openai,
    Ollama,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    Chroma,
    Memory,
}

/// What happens to queries the router cannot place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// Answer with the fixed "not supported" message
    Strict,
    /// Run the agent with every registered tool
    Universal,
}

fn validate_chunking(cfg: &Config) -> Result<(), ValidationError> {
    if cfg.chunk_overlap >= cfg.chunk_size {
        let mut err = ValidationError::new("chunk_overlap");
        err.message = Some("chunk_overlap must be smaller than chunk_size".into());
        return Err(err);
    }
    Ok(())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 3001,
            environment: "development".to_string(),
            log_level: "info".to_string(),
            public_url: "http://localhost:3001".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            allowed_origins: Vec::new(),
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4.1-mini".to_string(),
            openai_project_id: None,
            llm_temperature: 0.1,
            llm_max_tokens: 1000,
            llm_timeout_secs: 60,
            embedding_backend: EmbeddingBackend::Openai,
            embedding_model: "text-embedding-ada-002".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            vector_backend: VectorBackend::Chroma,
            chroma_url: "http://localhost:8000".to_string(),
            vector_collection: "knowledge-base".to_string(),
            tavily_api_key: None,
            tavily_base_url: "https://api.tavily.com".to_string(),
            weather_api_key: None,
            weather_base_url: "https://api.openweathermap.org/data/2.5".to_string(),
            weather_units: "metric".to_string(),
            auth0_domain: String::new(),
            auth0_client_id: String::new(),
            auth0_client_secret: String::new(),
            auth0_scope: "openid profile email".to_string(),
            auth0_connection: Some("google-oauth2".to_string()),
            jwt_secret: "dev-only-jwt-secret-change-me".to_string(),
            jwt_expiry_hours: 24,
            session_secret: "dev-only-session-secret-change-me".to_string(),
            state_expiry_minutes: 10,
            auth_cookie_name: "auth_token".to_string(),
            cookie_domain: None,
            cookie_secure: false,
            redirect_token_fallback: true,
            require_auth: true,
            domain_restrictions_enabled: false,
            allowed_email_domains: Vec::new(),
            allow_all_gmail: true,
            domain_block_message: "Access restricted to authorized company domains only."
                .to_string(),
            webhook_api_key: None,
            rate_limit_window_ms: 15 * 60 * 1000,
            rate_limit_max_requests: 100,
            max_upload_bytes: 5 * 1024 * 1024,
            allowed_upload_types: vec!["application/pdf".to_string()],
            chunk_size: 1000,
            chunk_overlap: 200,
            upsert_batch_size: 100,
            agent_recursion_limit: 5,
            routing_mode: RoutingMode::Strict,
        }
    }
}

impl Config {
    /// Load configuration from defaults, `~/.knowledge-chat/config`, the
    /// optional explicit file and `KNOWLEDGE_CHAT__*` environment variables.
    pub fn load(explicit_file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            // Load from ~/.knowledge-chat/config.toml (if present)
            .add_source(
                config::File::with_name(&format!(
                    "{}/.knowledge-chat/config",
                    dirs::home_dir()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| ".".to_string())
                ))
                .required(false),
            );

        if let Some(path) = explicit_file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            // Environment overrides: KNOWLEDGE_CHAT__SERVER_PORT, KNOWLEDGE_CHAT__JWT_SECRET, etc.
            .add_source(
                config::Environment::with_prefix("KNOWLEDGE_CHAT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_origins")
                    .with_list_parse_key("allowed_email_domains")
                    .with_list_parse_key("allowed_upload_types"),
            )
            .build()?;

        let cfg: Config = settings.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Origins accepted for CORS and post-login redirects.
    pub fn effective_allowed_origins(&self) -> Vec<String> {
        if self.allowed_origins.is_empty() {
            vec![self.frontend_url.clone()]
        } else {
            self.allowed_origins.clone()
        }
    }

    /// OAuth redirect URI registered with the identity provider.
    pub fn auth_callback_url(&self) -> String {
        format!("{}/api/auth/callback", self.public_url.trim_end_matches('/'))
    }
}
