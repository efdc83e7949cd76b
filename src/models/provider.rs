use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A client able to run one chat turn against a model provider.
///
/// Expected upstream outcomes (bad status, empty answer, unreachable host) are
/// reported as [`OperationResult::Failure`]. `Err` is reserved for faults the
/// client did not anticipate; callers convert those themselves.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn converse(
        &self,
        message: &str,
        history: &[Turn],
        credentials: &Credentials,
    ) -> Result<OperationResult>;

    fn get_provider_name(&self) -> &str;
}

/// Role of a turn's author.
///
/// On the gateway wire roles are upper-case (`USER`); lower-case spellings
/// are accepted when reading so either side can be lenient.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageRole {
    #[serde(alias = "user")]
    User,
    #[serde(alias = "assistant")]
    Assistant,
    #[serde(alias = "system")]
    System,
}

impl MessageRole {
    /// Role name in the upstream provider's vocabulary.
    pub fn as_upstream(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

/// One role-tagged message of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: MessageRole,
    pub content: String,
}

impl Turn {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Prior turns supplied by the caller, oldest first.
pub type ConversationHistory = Vec<Turn>;

/// Outcome of one gateway operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    Success(String),
    Failure(String),
}

impl OperationResult {
    pub fn failure(detail: impl Into<String>) -> Self {
        OperationResult::Failure(detail.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OperationResult::Success(_))
    }
}

/// Where and as whom to reach the upstream provider.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_base: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: api_base.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}
