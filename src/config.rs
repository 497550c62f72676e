//! Configuration for the UltraLearning API

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Auth/JWT configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Relational database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Vector collection configuration
    #[serde(default)]
    pub vector: VectorConfig,
    /// LLM (Ollama) configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Runtime environment: "development" or "production"
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_environment() -> String {
    "production".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            database: DatabaseConfig::default(),
            vector: VectorConfig::default(),
            llm: LlmConfig::default(),
            environment: default_environment(),
        }
    }
}

impl AppConfig {
    /// Load from the optional config file, then apply env overrides
    pub fn load() -> Self {
        let mut config = Self::from_file().unwrap_or_default();
        config.apply_env();
        config
    }

    /// Load defaults, then apply environment variable overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// `$ULTRALEARN_CONFIG`, or `<config dir>/ultralearn/config.toml`
    fn config_file_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("ULTRALEARN_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|d| d.join("ultralearn").join("config.toml"))
    }

    fn from_file() -> Option<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return None;
        }
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                return None;
            }
        };
        match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!("Loaded configuration from {}", path.display());
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Apply environment variable overrides: `HOST`, `PORT`,
    /// `JWT_SECRET_KEY`, `BOT_PASSWORD`, `DATABASE_URL`,
    /// `VECTOR_COLLECTION`, `VECTOR_DIMENSION`, `EMBED_MODEL_NAME`,
    /// `CHAT_MODEL_NAME`, `OLLAMA_BASE_URL`, `APP_ENV`.
    fn apply_env(&mut self) {
        let config = self;

        if let Ok(host) = std::env::var("HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                config.server.port = port;
            }
        }
        if let Ok(secret) = std::env::var("JWT_SECRET_KEY") {
            config.auth.jwt_secret = secret;
        }
        if let Ok(password) = std::env::var("BOT_PASSWORD") {
            config.auth.bot_password = password;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.path = PathBuf::from(url.trim_start_matches("sqlite://"));
        }
        if let Ok(collection) = std::env::var("VECTOR_COLLECTION") {
            config.vector.collection = collection;
        }
        if let Ok(dim) = std::env::var("VECTOR_DIMENSION") {
            if let Ok(dim) = dim.parse() {
                config.vector.dimensions = dim;
            }
        }
        if let Ok(model) = std::env::var("EMBED_MODEL_NAME") {
            config.llm.embed_model = model;
        }
        if let Ok(model) = std::env::var("CHAT_MODEL_NAME") {
            config.llm.chat_model = model;
        }
        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(env) = std::env::var("APP_ENV") {
            config.environment = env;
        }
    }

    /// Whether dev-only endpoints are enabled
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            enable_cors: true,
        }
    }
}

/// Auth and token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: String,
    /// Access token lifetime in seconds (default: 1 hour)
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in seconds (default: 7 days)
    pub refresh_token_ttl_secs: i64,
    /// Password for the built-in `learning_assistant` user
    pub bot_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "jwt-secret".to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 7 * 24 * 3600,
            bot_password: "secure_bot_password".to_string(),
        }
    }
}

/// Relational database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("db.sqlite3"),
        }
    }
}

/// Vector collection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Collection (table) name used in logs and stats
    pub collection: String,
    /// Embedding dimensions (768 for nomic-embed-text)
    pub dimensions: usize,
    /// Default number of documents retrieved per query
    pub top_k: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            collection: "ultra_learning_collection".to_string(),
            dimensions: 768,
            top_k: 5,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Chat model name
    pub chat_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Nucleus sampling parameter
    pub top_p: f32,
    /// Default maximum tokens per reply
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            chat_model: "llama3.2:3b".to_string(),
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 512,
            timeout_secs: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.access_token_ttl_secs, 3600);
        assert_eq!(config.auth.refresh_token_ttl_secs, 7 * 24 * 3600);
        assert_eq!(config.vector.top_k, 5);
        assert!(!config.is_development());
    }

    #[test]
    fn test_partial_config_file() {
        let config: AppConfig = toml::from_str(
            r#"
            environment = "development"

            [server]
            port = 8080

            [llm]
            chat_model = "llama3.1:8b"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.llm.chat_model, "llama3.1:8b");
        assert_eq!(config.llm.embed_model, "nomic-embed-text");
        assert!(config.is_development());
    }
}
