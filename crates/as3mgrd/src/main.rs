//! as3mgrd daemon entry point.
//!
//! Loads configuration, verifies the BIG-IP's AS3 version, then keeps
//! posting the contents of the declaration file whenever it changes.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use as3mgrd::{AgentParams, As3Agent, As3MgrConfig, BigIpClient, DeclarationSource};

/// AS3 declaration dispatch daemon.
#[derive(Debug, Parser)]
#[command(name = "as3mgrd", version, about)]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = as3mgrd::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (overridden by RUST_LOG).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Declaration file (overrides source.declaration_path).
    #[arg(short, long)]
    declaration: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check_config: bool,
}

/// Initialize tracing/logging.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{}'", level))?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")
}

/// Main daemon loop.
async fn run_daemon(cli: Cli) -> Result<()> {
    let mut config = As3MgrConfig::from_file(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    if let Some(path) = cli.declaration {
        config.source.declaration_path = path;
    }
    config.validate().context("invalid configuration")?;

    if cli.check_config {
        info!(config = %cli.config.display(), "Configuration is valid");
        return Ok(());
    }

    let client = Arc::new(
        BigIpClient::new(config.bigip_params()).context("failed to build BIG-IP client")?,
    );
    let (notify_tx, mut notify_rx) = mpsc::channel(config.dispatch.notification_capacity);
    let params = AgentParams {
        settings: config.dispatcher_settings(),
        validator: config.schema_validator().context("failed to load AS3 schema")?,
        notifications: Some(notify_tx),
    };

    let agent = As3Agent::initialize(params, Arc::clone(&client))
        .await
        .context("AS3 agent initialization failed")?;
    client.set_release(&agent.control_plane_info().release);

    let responses = tokio::spawn(async move {
        while let Some(notification) = notify_rx.recv().await {
            info!(
                tenants = ?notification.tenants,
                schema_version = %notification.schema_version,
                posted_at = %notification.posted_at,
                "Declaration applied"
            );
        }
    });

    let shutdown = setup_signal_handlers();
    let mut source = DeclarationSource::new(
        config.source.declaration_path.clone(),
        config.source.tenants.clone(),
    );
    info!(path = %source.path().display(), "Watching declaration file");

    while !shutdown.load(Ordering::Relaxed) {
        match source.poll() {
            Ok(Some(declaration)) => {
                if let Err(e) = agent.submit(declaration) {
                    error!(error = %e, "Failed to submit declaration");
                    break;
                }
            }
            Ok(None) => {}
            Err(e) if e.is_retryable() => {
                warn!(path = %source.path().display(), error = %e, "Failed to read declaration")
            }
            Err(e) => {
                error!(path = %source.path().display(), error = %e, "Declaration source failed");
                break;
            }
        }

        tokio::time::sleep(config.poll_interval()).await;
    }

    info!("Performing graceful shutdown");
    agent.shutdown().await?;
    responses.await.context("notification logger failed")?;
    Ok(())
}

/// Setup signal handlers and return atomic flag for shutdown signaling
fn setup_signal_handlers() -> Arc<AtomicBool> {
    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_clone = Arc::clone(&shutdown_flag);

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT/SIGTERM");
            shutdown_flag_clone.store(true, Ordering::Relaxed);
        }
    });

    shutdown_flag
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_level) {
        eprintln!("as3mgrd: {:#}", e);
        return ExitCode::FAILURE;
    }

    info!("--- Starting as3mgrd ---");

    match run_daemon(cli).await {
        Ok(()) => {
            info!("as3mgrd exiting normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("as3mgrd error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
