mod cli;

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chatgate::app::{AppState, GatewayConfig};
use chatgate::gateway;
use chatgate::platform::{AppPaths, SecureStorageManager};

use cli::{Cli, Commands};

fn init_logging(config: &GatewayConfig, paths: &AppPaths, debug: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let level = if debug { "debug" } else { config.logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("chatgate={},tower_http={}", level, level)))
        .context("invalid log filter")?;

    let (file_layer, guard) = if config.logging.file {
        let appender = tracing_appender::rolling::daily(paths.logs_dir(), "chatgate.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = AppPaths::new()?;

    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| paths.config_file());
    let mut config = GatewayConfig::load(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path.display()))?;

    paths.prepare_logs_dir(config.logging.file)?;
    let _guard = init_logging(&config, &paths, cli.debug)?;
    info!("Starting ChatGate {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
                config.validate()?;
            }
            let bind = config.server.bind.clone();
            let state = AppState::new(config, SecureStorageManager::new());
            let dispatcher = state.build_dispatcher().await?;

            let listener = TcpListener::bind(&bind)
                .await
                .with_context(|| format!("failed to bind {}", bind))?;
            gateway::serve(listener, dispatcher).await?;
        }
        Commands::Chat { message, endpoint } => {
            if let Some(endpoint) = endpoint {
                config.client.endpoint = endpoint;
            }
            let state = AppState::new(config, SecureStorageManager::new());
            let envelope = state.gateway_client()?.send(&message, &[]).await;

            if envelope.is_success() {
                println!("{}", envelope.message());
            } else {
                bail!("{}", envelope.error().unwrap_or("Unknown error"));
            }
        }
        Commands::Health { endpoint } => {
            if let Some(endpoint) = endpoint {
                config.client.endpoint = endpoint;
            }
            let state = AppState::new(config, SecureStorageManager::new());
            println!("{}", state.gateway_client()?.health().await);
        }
        Commands::ApiKey { set, remove, status: _ } => {
            let state = AppState::new(config, SecureStorageManager::new());
            if let Some(key) = set {
                state.set_api_key(&key).await?;
                println!("API key stored");
            } else if remove {
                state.remove_api_key().await?;
                println!("API key removed");
            } else {
                let available = state.resolve_credentials().await?.is_some();
                let stored = state.has_stored_api_key().await?;
                println!("API key available: {}", if available { "yes" } else { "no" });
                println!("Stored in keychain: {}", if stored { "yes" } else { "no" });
            }
        }
        Commands::InitConfig { force } => {
            if config_path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", config_path.display());
            }
            GatewayConfig::default().save(&config_path).await?;
            println!("Wrote {}", config_path.display());
        }
    }

    Ok(())
}
