use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use asyncio_common::ServerConfig;

#[derive(Parser)]
#[command(name = "asyncio-server")]
#[command(about = "Embedded server exercising blocking and async response writers")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "asyncio.toml")]
    config: PathBuf,

    /// Listen host (overrides config and ASYNCIO_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides config and ASYNCIO_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    info!("AsyncIO server v{}", asyncio_common::VERSION);

    let mut config = ServerConfig::load(&cli.config)?.with_env_overrides()?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    asyncio_web::serve(config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for shutdown signal: {}", e);
        }
        info!("Received shutdown signal");
    })
    .await
}
