//! Boundary entry point: raw method and body in, status and body out.

use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::gateway::envelope::{GatewayBody, ResponseData, ResponseEnvelope};
use crate::gateway::operation::OperationRequest;
use crate::gateway::resolver::{Resolver, ResolverContext};
use crate::models::OperationResult;

#[derive(Debug, Deserialize)]
struct GatewayRequest {
    #[serde(default, alias = "operation")]
    query: Option<String>,
    #[serde(default)]
    variables: Option<Value>,
}

/// Status code plus optional JSON body.
#[derive(Debug)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub body: Option<GatewayBody>,
}

impl GatewayResponse {
    fn ok(body: GatewayBody) -> Self {
        Self {
            status: StatusCode::OK,
            body: Some(body),
        }
    }

    fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: Some(GatewayBody::error(message)),
        }
    }

    fn empty(status: StatusCode) -> Self {
        Self { status, body: None }
    }

    pub fn internal_fault() -> Self {
        Self::error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for GatewayResponse {
    fn into_response(self) -> Response {
        let Some(body) = self.body else {
            return self.status.into_response();
        };

        match serde_json::to_string(&body) {
            Ok(json) => (self.status, [(header::CONTENT_TYPE, "application/json")], json).into_response(),
            Err(e) => {
                warn!("Failed to serialize gateway response: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(header::CONTENT_TYPE, "application/json")],
                    r#"{"data":null,"errors":[{"message":"Internal server error"}]}"#,
                )
                    .into_response()
            }
        }
    }
}

/// Stateless across calls; share behind an `Arc`.
pub struct Dispatcher {
    resolver: Resolver,
    context: ResolverContext,
}

impl Dispatcher {
    pub fn new(resolver: Resolver, context: ResolverContext) -> Self {
        Self { resolver, context }
    }

    pub async fn dispatch(&self, method: &Method, body: &[u8]) -> GatewayResponse {
        if *method == Method::OPTIONS {
            return GatewayResponse::empty(StatusCode::NO_CONTENT);
        }
        if *method != Method::POST {
            debug!("Rejecting {} request", method);
            return GatewayResponse::error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
        }

        let request: GatewayRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(e) => {
                debug!("Malformed request body: {}", e);
                return GatewayResponse::error(StatusCode::BAD_REQUEST, "Request body must be a JSON object");
            }
        };

        let Some(query) = request.query.filter(|query| !query.trim().is_empty()) else {
            return GatewayResponse::error(StatusCode::BAD_REQUEST, "Query is required");
        };

        let operation = match OperationRequest::parse(&query, request.variables.as_ref()) {
            Ok(operation) => operation,
            Err(e) => {
                debug!("Rejected operation: {}", e);
                return GatewayResponse::ok(GatewayBody::error(e.to_string()));
            }
        };

        info!("Dispatching {} operation", operation.field_name());
        let result = self.resolver.resolve(&operation, &self.context).await;

        let data = match operation {
            OperationRequest::Health => match result {
                OperationResult::Success(health) => ResponseData::Health { health },
                OperationResult::Failure(detail) => return GatewayResponse::ok(GatewayBody::error(detail)),
            },
            OperationRequest::Chat(_) => {
                if let OperationResult::Failure(detail) = &result {
                    info!("Chat failed: {}", detail);
                }
                ResponseData::Chat { chat: ResponseEnvelope::from(result) }
            }
        };

        GatewayResponse::ok(GatewayBody::data(data))
    }
}
