use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::info;
use url::Url;

use crate::error::{Error, Result};

/// Environment variables override file settings, e.g.
/// `CHATGATE__UPSTREAM__MODEL=deepseek-reasoner`.
pub const ENV_PREFIX: &str = "CHATGATE";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Gateway endpoint used by the `chat` and `health` commands.
    pub endpoint: String,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Also write a daily-rolling log file under the data directory.
    pub file: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.deepseek.com/v1".to_string(),
            model: "deepseek-chat".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            system_prompt: "You are a helpful AI assistant. Respond in a friendly and informative manner."
                .to_string(),
            timeout_secs: Some(60),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8787/graphql".to_string(),
            timeout_secs: Some(90),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: false,
        }
    }
}

impl GatewayConfig {
    /// Layers built-in defaults, the TOML file at `path` (if it exists) and
    /// `CHATGATE__*` environment variables, in that order.
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading configuration from: {:?}", path);

        let config: GatewayConfig = Config::builder()
            .add_source(Config::try_from(&GatewayConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        info!("Saving configuration to: {:?}", path);

        let config_content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(config::ConfigError::Message(e.to_string())))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, config_content).await?;

        info!("Configuration saved successfully");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.upstream.api_base)
            .map_err(|e| Error::validation(format!("Invalid upstream api_base: {}", e)))?;
        Url::parse(&self.client.endpoint)
            .map_err(|e| Error::validation(format!("Invalid client endpoint: {}", e)))?;

        if self.upstream.model.trim().is_empty() {
            return Err(Error::validation("Upstream model must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.upstream.temperature) {
            return Err(Error::validation("Temperature must be between 0 and 2"));
        }
        if self.upstream.max_tokens == 0 {
            return Err(Error::validation("max_tokens must be positive"));
        }
        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(Error::validation(format!("Invalid bind address: {}", self.server.bind)));
        }

        Ok(())
    }
}
