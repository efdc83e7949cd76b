use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chatgate")]
#[command(about = "Chat gateway that forwards conversations to an OpenAI-compatible model provider")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the gateway HTTP server
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Send one message through a running gateway and print the reply
    Chat {
        /// Message text
        message: String,

        /// Gateway endpoint (overrides client.endpoint)
        #[arg(short, long)]
        endpoint: Option<String>,
    },

    /// Query a running gateway's health
    Health {
        /// Gateway endpoint (overrides client.endpoint)
        #[arg(short, long)]
        endpoint: Option<String>,
    },

    /// Manage the upstream API key stored in the OS keychain
    ApiKey {
        /// Store this API key
        #[arg(short, long, conflicts_with_all = ["remove", "status"])]
        set: Option<String>,

        /// Remove the stored API key
        #[arg(short, long)]
        remove: bool,

        /// Show whether an API key is available
        #[arg(long)]
        status: bool,
    },

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
