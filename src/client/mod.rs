//! Caller-side counterpart of the gateway.
//!
//! Turns `(message, history)` into a gateway request and always hands back a
//! [`ResponseEnvelope`], whatever goes wrong on the way.

use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::gateway::envelope::{GatewayBody, ResponseData, ResponseEnvelope};
use crate::models::Turn;

const CHAT_MUTATION: &str =
    "mutation Chat($input: ChatInput!) { chat(input: $input) { message success error } }";
const HEALTH_QUERY: &str = "query { health }";

pub struct GatewayClient {
    client: Client,
    endpoint: Url,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatInput<'a> {
    message: &'a str,
    conversation_history: &'a [Turn],
}

impl GatewayClient {
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::validation(format!("Invalid gateway endpoint {}: {}", endpoint, e)))?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::platform(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends one chat turn. Roles go out upper-cased (`USER`, `ASSISTANT`).
    pub async fn send(&self, message: &str, history: &[Turn]) -> ResponseEnvelope {
        let input = ChatInput {
            message,
            conversation_history: history,
        };
        let request = json!({
            "query": CHAT_MUTATION,
            "variables": { "input": input }
        });

        match self.post(&request).await {
            Ok(GatewayBody { data: Some(ResponseData::Chat { chat }), .. }) => chat,
            Ok(body) => {
                let error = body.first_error().unwrap_or("Malformed gateway response").to_string();
                debug!("Gateway rejected chat: {}", error);
                ResponseEnvelope::failure(error)
            }
            Err(e) => {
                warn!("Gateway request failed: {}", e);
                ResponseEnvelope::failure(e.to_string())
            }
        }
    }

    /// The gateway's health payload, `"Unknown"` when absent, `"Error"` on failure.
    pub async fn health(&self) -> String {
        match self.post(&json!({ "query": HEALTH_QUERY })).await {
            Ok(GatewayBody { data: Some(ResponseData::Health { health }), .. }) => health,
            Ok(_) => "Unknown".to_string(),
            Err(e) => {
                warn!("Health check failed: {}", e);
                "Error".to_string()
            }
        }
    }

    async fn post(&self, request: &serde_json::Value) -> Result<GatewayBody> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| Error::gateway(format!("Could not reach gateway: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            // 4xx bodies still carry a readable error list.
            if status.is_client_error() {
                if let Ok(body) = response.json::<GatewayBody>().await {
                    if let Some(error) = body.first_error() {
                        return Err(Error::gateway(error));
                    }
                }
            }
            return Err(Error::gateway(format!("Gateway returned HTTP {}", status)));
        }

        response
            .json::<GatewayBody>()
            .await
            .map_err(|e| Error::gateway(format!("Malformed gateway response: {}", e)))
    }
}
