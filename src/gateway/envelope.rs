//! Response shapes shared by the dispatcher and the client.

use serde::{Deserialize, Serialize};

use crate::models::OperationResult;

/// Uniform chat result: `success` is true exactly when `error` is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvelope")]
pub struct ResponseEnvelope {
    message: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ResponseEnvelope {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            message: String::new(),
            success: false,
            error: Some(error.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl From<OperationResult> for ResponseEnvelope {
    fn from(result: OperationResult) -> Self {
        match result {
            OperationResult::Success(message) => Self::success(message),
            OperationResult::Failure(detail) => Self::failure(detail),
        }
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    message: String,
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

impl TryFrom<RawEnvelope> for ResponseEnvelope {
    type Error = String;

    fn try_from(raw: RawEnvelope) -> Result<Self, Self::Error> {
        match (raw.success, raw.error) {
            (true, None) => Ok(Self::success(raw.message)),
            (true, Some(error)) => Err(format!("successful envelope carries an error: {}", error)),
            (false, error) => Ok(Self::failure(error.unwrap_or_else(|| "Unknown error".to_string()))),
        }
    }
}

/// Top-level response body: `{ data, errors? }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayBody {
    pub data: Option<ResponseData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GatewayError>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    Chat { chat: ResponseEnvelope },
    Health { health: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    pub message: String,
}

impl GatewayBody {
    pub fn data(data: ResponseData) -> Self {
        Self {
            data: Some(data),
            errors: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            data: None,
            errors: Some(vec![GatewayError {
                message: message.into(),
            }]),
        }
    }

    /// First reported error message, if any.
    pub fn first_error(&self) -> Option<&str> {
        self.errors
            .as_ref()
            .and_then(|errors| errors.first())
            .map(|error| error.message.as_str())
    }
}
