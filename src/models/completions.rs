use async_trait::async_trait;
use reqwest::{Client, header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE}};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::app::config::UpstreamConfig;
use crate::error::{Error, Result};
use crate::models::{Credentials, OperationResult, Turn, UpstreamClient};

/// Client for OpenAI-compatible `/chat/completions` endpoints.
///
/// One request per turn, never retried.
pub struct ChatCompletionsClient {
    client: Client,
    config: UpstreamConfig,
}

impl ChatCompletionsClient {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| Error::platform(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn create_headers(&self, credentials: &Credentials) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", credentials.api_key))
            .map_err(|e| Error::credentials(format!("API key is not a valid header value ({})", e)))?;
        headers.insert(AUTHORIZATION, auth_value);

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(headers)
    }

    /// System instruction, then history in order, then the new user message.
    fn build_messages(&self, message: &str, history: &[Turn]) -> Vec<CompletionMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(CompletionMessage {
            role: "system",
            content: self.config.system_prompt.clone(),
        });
        messages.extend(history.iter().map(|turn| CompletionMessage {
            role: turn.role.as_upstream(),
            content: turn.content.clone(),
        }));
        messages.push(CompletionMessage {
            role: "user",
            content: message.to_string(),
        });
        messages
    }

    async fn make_request(
        &self,
        headers: HeaderMap,
        credentials: &Credentials,
        request: &CompletionRequest,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", credentials.api_base.trim_end_matches('/'));

        debug!("Sending request upstream: model={}, messages={}",
               request.model, request.messages.len());

        let start_time = Instant::now();

        let response = self.client
            .post(&url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!("Upstream request failed: {}", e);
                Error::Connectivity(e)
            })?;

        debug!("Upstream request completed in {:?}", start_time.elapsed());

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Upstream API error: {} - {}", status, error_text);
            return Err(Error::Transport { status });
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                warn!("Upstream response timed out: {}", e);
                Error::Connectivity(e)
            } else {
                error!("Failed to parse upstream response: {}", e);
                Error::MalformedResponse(e)
            }
        })?;

        let choice = completion.choices.into_iter().next().ok_or(Error::EmptyResponse)?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

#[async_trait]
impl UpstreamClient for ChatCompletionsClient {
    async fn converse(
        &self,
        message: &str,
        history: &[Turn],
        credentials: &Credentials,
    ) -> Result<OperationResult> {
        let headers = self.create_headers(credentials)?;

        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages: self.build_messages(message, history),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        match self.make_request(headers, credentials, &request).await {
            Ok(content) => Ok(OperationResult::Success(content)),
            Err(e) if e.is_upstream_outcome() => Ok(OperationResult::failure(e.to_string())),
            Err(e) => Err(e),
        }
    }

    fn get_provider_name(&self) -> &str {
        "chat-completions"
    }
}

// Wire structures for the upstream API
#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<CompletionMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct CompletionMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionResponseMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    /// Serves `reply` for every completion request and records request bodies.
    async fn fake_upstream(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Vec<Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |Json(body): Json<Value>| {
                let recorder = recorder.clone();
                let reply = reply.clone();
                async move {
                    recorder.lock().unwrap().push(body);
                    (status, Json(reply))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/v1", addr), seen)
    }

    fn client() -> ChatCompletionsClient {
        ChatCompletionsClient::new(UpstreamConfig::default()).unwrap()
    }

    #[test]
    fn test_prompt_order() {
        let history = vec![Turn::user("hi"), Turn::assistant("hello")];
        let messages = client().build_messages("how are you", &history);

        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(messages[0].content, UpstreamConfig::default().system_prompt);
        assert_eq!(messages[1].content, "hi");
        assert_eq!(messages[2].content, "hello");
        assert_eq!(messages[3].content, "how are you");
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let (base, seen) = fake_upstream(
            StatusCode::OK,
            json!({"choices": [{"message": {"role": "assistant", "content": "Hi there"}}]}),
        ).await;

        let result = client()
            .converse("hello", &[Turn::user("earlier")], &Credentials::new("sk-test", base))
            .await
            .unwrap();
        assert_eq!(result, OperationResult::Success("Hi there".to_string()));

        let bodies = seen.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        let body = &bodies[0];
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["messages"].as_array().unwrap().len(), 3);
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][2]["content"], "hello");
    }

    #[tokio::test]
    async fn test_error_status_hides_body() {
        let (base, _) = fake_upstream(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"error": "secret-internal-trace"}),
        ).await;

        let result = client()
            .converse("hello", &[], &Credentials::new("sk-test", base))
            .await
            .unwrap();
        match result {
            OperationResult::Failure(detail) => {
                assert!(detail.contains("500"));
                assert!(!detail.contains("secret-internal-trace"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_choices_differs_from_empty_text() {
        let (base, _) = fake_upstream(StatusCode::OK, json!({"choices": []})).await;
        let empty = client()
            .converse("hello", &[], &Credentials::new("sk-test", base))
            .await
            .unwrap();
        assert_eq!(empty, OperationResult::failure("No response from upstream API"));

        let (base, _) = fake_upstream(
            StatusCode::OK,
            json!({"choices": [{"message": {"role": "assistant", "content": ""}}]}),
        ).await;
        let blank = client()
            .converse("hello", &[], &Credentials::new("sk-test", base))
            .await
            .unwrap();
        assert_eq!(blank, OperationResult::Success(String::new()));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_connectivity_failure() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = client()
            .converse("hello", &[], &Credentials::new("sk-test", format!("http://{}/v1", addr)))
            .await
            .unwrap();
        assert_eq!(result, OperationResult::failure("Failed to communicate with upstream API"));
    }

    #[tokio::test]
    async fn test_invalid_key_is_a_fault() {
        let result = client()
            .converse("hello", &[], &Credentials::new("bad\nkey", "http://127.0.0.1:9/v1"))
            .await;
        assert!(matches!(result, Err(Error::Credentials(_))));
    }

    #[tokio::test]
    async fn test_body_timeout_is_connectivity_failure() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Sends headers and the first byte of the body, then stalls.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 64\r\n\r\n{")
                .await
                .unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let config = UpstreamConfig {
            timeout_secs: Some(1),
            ..UpstreamConfig::default()
        };
        let result = ChatCompletionsClient::new(config)
            .unwrap()
            .converse("hello", &[], &Credentials::new("sk-test", format!("http://{}/v1", addr)))
            .await
            .unwrap();
        assert_eq!(result, OperationResult::failure("Failed to communicate with upstream API"));
    }
}
