use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Secure storage error: {0}")]
    SecureStorage(#[from] keyring::Error),

    // The variants below are user-visible: their Display text ends up in
    // response envelopes, so they never carry upstream bodies.
    #[error("{0}")]
    Validation(String),

    #[error("Upstream API error: {status}")]
    Transport { status: StatusCode },

    #[error("No response from upstream API")]
    EmptyResponse,

    #[error("Failed to communicate with upstream API")]
    Connectivity(#[source] reqwest::Error),

    #[error("Upstream API returned an unreadable response")]
    MalformedResponse(#[source] reqwest::Error),

    #[error("Invalid upstream credentials: {0}")]
    Credentials(String),

    #[error("{0}")]
    Gateway(String),
}

impl Error {
    pub fn platform(msg: impl Into<String>) -> Self {
        Error::Platform(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn credentials(msg: impl Into<String>) -> Self {
        Error::Credentials(msg.into())
    }

    pub fn gateway(msg: impl Into<String>) -> Self {
        Error::Gateway(msg.into())
    }

    /// Whether this error is an expected outcome of talking to the upstream
    /// provider, as opposed to a fault in the gateway itself.
    pub fn is_upstream_outcome(&self) -> bool {
        matches!(
            self,
            Error::Transport { .. }
                | Error::EmptyResponse
                | Error::Connectivity(_)
                | Error::MalformedResponse(_)
        )
    }
}
