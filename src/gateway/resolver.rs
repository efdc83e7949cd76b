use std::sync::Arc;
use tracing::{debug, error};

use crate::gateway::operation::{ChatArgs, OperationRequest};
use crate::models::{Credentials, OperationResult, UpstreamClient};

pub const HEALTH_OK: &str = "OK";

/// Per-request inputs the resolver needs beyond the operation itself.
#[derive(Debug, Clone, Default)]
pub struct ResolverContext {
    pub credentials: Option<Credentials>,
}

impl ResolverContext {
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
        }
    }
}

/// Runs exactly one operation and always answers with an [`OperationResult`].
pub struct Resolver {
    upstream: Arc<dyn UpstreamClient>,
}

impl Resolver {
    pub fn new(upstream: Arc<dyn UpstreamClient>) -> Self {
        Self { upstream }
    }

    pub async fn resolve(&self, request: &OperationRequest, context: &ResolverContext) -> OperationResult {
        match request {
            OperationRequest::Health => OperationResult::Success(HEALTH_OK.to_string()),
            OperationRequest::Chat(args) => self.chat(args, context).await,
        }
    }

    async fn chat(&self, args: &ChatArgs, context: &ResolverContext) -> OperationResult {
        let Some(credentials) = context.credentials.as_ref() else {
            error!("Chat requested but no upstream credentials are configured");
            return OperationResult::failure("Server error: upstream credentials are not configured");
        };

        debug!("Resolving chat via {}: history={}",
               self.upstream.get_provider_name(), args.history().len());

        match self.upstream.converse(args.message(), args.history(), credentials).await {
            Ok(result) => result,
            Err(e) => {
                error!("Upstream client fault: {}", e);
                OperationResult::failure(format!("Server error: {}", e))
            }
        }
    }
}
