use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use infrastructure::config::AgentConfig;
use printer_agent::{api, assemble};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config directory
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Override HTTP bind host
    #[arg(long)]
    host: Option<String>,

    /// Override HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,printer_agent=debug,application=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🖨️ ePOS Printer Agent Starting...");
    info!("🆔 Process ID: {}", std::process::id());

    let args = Args::parse();

    // Running from the workspace root during development
    let dev_config = "crates/printer-agent/config";
    let config_dir = if !std::path::Path::new(&args.config_dir).exists()
        && std::path::Path::new(dev_config).exists()
    {
        dev_config.to_string()
    } else {
        args.config_dir
    };
    info!("📂 Config directory: {}", config_dir);

    let mut config = AgentConfig::load(&config_dir)?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    info!(
        default_model = %config.printer.default_model,
        job_timeout_secs = config.printer.job_timeout_secs,
        "✅ Configuration loaded"
    );

    let agent = assemble(&config);
    let shutdown = CancellationToken::new();
    let dispatcher = tokio::spawn(agent.dispatcher.run(shutdown.clone()));

    let app = api::create_router(agent.state.clone());
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🌐 HTTP API listening on {}", addr);

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("🛑 Shutdown signal received");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    dispatcher.await?;

    // Leave the printer and the scanner released
    if agent.discovery.is_active().await {
        if let Err(e) = agent.discovery.stop().await {
            warn!(error = %e, "Failed to stop discovery on shutdown");
        }
    }
    if let Err(e) = agent.connection.disconnect().await {
        warn!(code = e.code(), error = %e, "Failed to disconnect printer on shutdown");
    }

    info!("👋 Printer agent stopped");
    Ok(())
}
