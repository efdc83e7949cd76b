pub mod config;
pub mod state;

pub use config::{GatewayConfig, ServerConfig, UpstreamConfig, ClientConfig, LoggingConfig};
pub use state::AppState;
