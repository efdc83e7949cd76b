use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::app::config::GatewayConfig;
use crate::client::GatewayClient;
use crate::error::Result;
use crate::gateway::{Dispatcher, Resolver, ResolverContext};
use crate::models::{ChatCompletionsClient, Credentials};
use crate::platform::SecureStorageManager;

/// Environment variable holding the upstream API key.
pub const API_KEY_ENV: &str = "DEEPSEEK_API_KEY";

/// Overrides `upstream.api_base` when set, alongside `CHATGATE__UPSTREAM__API_BASE`.
pub const API_BASE_ENV: &str = "DEEPSEEK_API_BASE";

/// Keychain entry name for the upstream API key.
pub const UPSTREAM_KEY_NAME: &str = "upstream";

pub struct AppState {
    config: GatewayConfig,
    secure_storage: SecureStorageManager,
}

impl AppState {
    pub fn new(config: GatewayConfig, secure_storage: SecureStorageManager) -> Self {
        Self {
            config,
            secure_storage,
        }
    }

    /// API key from the environment, falling back to the keychain.
    pub async fn resolve_credentials(&self) -> Result<Option<Credentials>> {
        let api_key = match non_blank(std::env::var(API_KEY_ENV).ok()) {
            Some(key) => Some(key),
            None => self.secure_storage.retrieve_api_key(UPSTREAM_KEY_NAME).await?,
        };

        Ok(api_key.map(|key| Credentials::new(key, self.api_base(std::env::var(API_BASE_ENV).ok()))))
    }

    fn api_base(&self, from_env: Option<String>) -> String {
        non_blank(from_env).unwrap_or_else(|| self.config.upstream.api_base.clone())
    }

    pub async fn build_dispatcher(&self) -> Result<Arc<Dispatcher>> {
        let credentials = self.resolve_credentials().await?;
        if credentials.is_none() {
            warn!("No upstream API key found in {} or the keychain; chat requests will fail", API_KEY_ENV);
        }

        let upstream = Arc::new(ChatCompletionsClient::new(self.config.upstream.clone())?);
        let context = ResolverContext { credentials };

        info!("Dispatcher ready: model={}, api_base={}",
              self.config.upstream.model, self.config.upstream.api_base);
        Ok(Arc::new(Dispatcher::new(Resolver::new(upstream), context)))
    }

    pub fn gateway_client(&self) -> Result<GatewayClient> {
        GatewayClient::new(
            &self.config.client.endpoint,
            self.config.client.timeout_secs.map(Duration::from_secs),
        )
    }

    pub async fn set_api_key(&self, api_key: &str) -> Result<()> {
        self.secure_storage.store_api_key(UPSTREAM_KEY_NAME, api_key).await?;
        info!("Upstream API key stored in keychain");
        Ok(())
    }

    pub async fn remove_api_key(&self) -> Result<()> {
        self.secure_storage.delete_api_key(UPSTREAM_KEY_NAME).await?;
        info!("Upstream API key removed from keychain");
        Ok(())
    }

    pub async fn has_stored_api_key(&self) -> Result<bool> {
        Ok(self.secure_storage.retrieve_api_key(UPSTREAM_KEY_NAME).await?.is_some())
    }
}

/// Blank environment values count as unset.
fn non_blank(from_env: Option<String>) -> Option<String> {
    from_env
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_env_key_is_ignored() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(Some(" sk-abc\n".to_string())), Some("sk-abc".to_string()));
    }

    #[test]
    fn test_api_base_env_overrides_config() {
        let state = AppState::new(GatewayConfig::default(), SecureStorageManager::new());

        assert_eq!(state.api_base(None), "https://api.deepseek.com/v1");
        assert_eq!(state.api_base(Some(" ".to_string())), "https://api.deepseek.com/v1");
        assert_eq!(
            state.api_base(Some("http://10.0.0.7:8000/v1".to_string())),
            "http://10.0.0.7:8000/v1"
        );
    }

    #[test]
    fn test_gateway_client_uses_configured_endpoint() {
        let mut config = GatewayConfig::default();
        config.client.endpoint = "http://10.0.0.5:9000/graphql".to_string();
        let state = AppState::new(config, SecureStorageManager::new());

        let client = state.gateway_client().unwrap();
        assert_eq!(client.endpoint().as_str(), "http://10.0.0.5:9000/graphql");
    }
}
