use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_COHERE_BASE_URL: &str = "https://api.cohere.com";
const DEFAULT_CHAT_MODEL: &str = "claude-3-haiku-20240307";
const DEFAULT_CHAT_MAX_TOKENS: u32 = 1024;
const DEFAULT_EMBEDDING_MODEL: &str = "embed-english-v3.0";
const DEFAULT_VECTOR_STORE_DIR: &str = "vector_stores";
const DEFAULT_SERVER_PORT: u16 = 8000;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 120;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the AskPDF server.
///
/// Loaded once at process start and handed to each component explicitly; nothing reads the
/// environment after startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the Anthropic chat-completion API.
    pub anthropic_api_key: String,
    /// API key for the Cohere embedding API.
    pub cohere_api_key: String,
    /// Base URL of the Anthropic API.
    pub anthropic_base_url: String,
    /// Base URL of the Cohere API.
    pub cohere_base_url: String,
    /// Chat model used for summaries and answers.
    pub chat_model: String,
    /// Upper bound on generated tokens per completion.
    pub chat_max_tokens: u32,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Root directory holding one subdirectory per upload session.
    pub vector_store_dir: PathBuf,
    /// Port the HTTP server binds to.
    pub server_port: u16,
    /// Largest accepted request body for `/upload`.
    pub max_upload_bytes: usize,
    /// Age after which session directories are evicted; `None` keeps them forever.
    pub session_ttl: Option<Duration>,
    /// Request timeout applied to provider HTTP calls.
    pub provider_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            anthropic_api_key: load_env("ANTHROPIC_API_KEY")?,
            cohere_api_key: load_env("COHERE_API_KEY")?,
            anthropic_base_url: load_env_optional("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.to_string()),
            cohere_base_url: load_env_optional("COHERE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_COHERE_BASE_URL.to_string()),
            chat_model: load_env_optional("CHAT_MODEL")
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            chat_max_tokens: parse_env_optional("CHAT_MAX_TOKENS")?
                .unwrap_or(DEFAULT_CHAT_MAX_TOKENS),
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            vector_store_dir: load_env_optional("VECTOR_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_VECTOR_STORE_DIR)),
            server_port: parse_env_optional("SERVER_PORT")?.unwrap_or(DEFAULT_SERVER_PORT),
            max_upload_bytes: parse_env_optional("MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            session_ttl: ttl_from_secs(
                parse_env_optional("SESSION_TTL_SECS")?.unwrap_or(DEFAULT_SESSION_TTL_SECS),
            ),
            provider_timeout: Duration::from_secs(
                parse_env_optional("PROVIDER_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS),
            ),
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn ttl_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Load `.env` (when present) and build the process configuration.
///
/// Fails when a required API key is absent so the server refuses to start. Runs before
/// tracing is installed so `.env` can set `RUST_LOG` and `ASKPDF_LOG_FILE`.
pub fn load_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    Config::from_env()
}

impl Config {
    /// Emit the non-secret settings at `debug`.
    pub fn log_summary(&self) {
        tracing::debug!(
            chat_model = %self.chat_model,
            embedding_model = %self.embedding_model,
            vector_store_dir = %self.vector_store_dir.display(),
            server_port = self.server_port,
            max_upload_bytes = self.max_upload_bytes,
            session_ttl = ?self.session_ttl,
            "Loaded configuration"
        );
    }
}

#[cfg(test)]
impl Config {
    /// Configuration with fake credentials for unit tests.
    pub(crate) fn for_tests(vector_store_dir: PathBuf) -> Self {
        Self {
            anthropic_api_key: "test-anthropic-key".into(),
            cohere_api_key: "test-cohere-key".into(),
            anthropic_base_url: DEFAULT_ANTHROPIC_BASE_URL.into(),
            cohere_base_url: DEFAULT_COHERE_BASE_URL.into(),
            chat_model: DEFAULT_CHAT_MODEL.into(),
            chat_max_tokens: DEFAULT_CHAT_MAX_TOKENS,
            embedding_model: DEFAULT_EMBEDDING_MODEL.into(),
            vector_store_dir,
            server_port: DEFAULT_SERVER_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session_ttl: None,
            provider_timeout: Duration::from_secs(5),
        }
    }
}
