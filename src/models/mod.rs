pub mod provider;
pub mod completions;

#[cfg(test)]
pub(crate) mod testing;

pub use provider::{
    UpstreamClient, MessageRole, Turn, ConversationHistory, OperationResult, Credentials
};
pub use completions::ChatCompletionsClient;
