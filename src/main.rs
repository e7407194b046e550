use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use kaiwa::cli::{Cli, Commands};
use kaiwa::core::{config, init_logger, log_startup_configuration};
use kaiwa::genai::GenClient;
use kaiwa::messenger::{run_webhook_server, GraphGateway};
use kaiwa::persist;
use kaiwa::state::AppState;

/// Main entry point for the bot
///
/// Parses CLI arguments and dispatches to the appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, server bind).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env before any config static is read
    let _ = dotenv();

    // Catch panics escaping spawned handlers so the service keeps running
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!(
                "Panic at {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            );
        }
    }));

    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run { port }) => run_bot(port.unwrap_or(*config::WEB_PORT)).await,
        Some(Commands::Check) => run_check(),
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot(*config::WEB_PORT).await
        }
    }
}

/// Print the effective configuration and exit
fn run_check() -> Result<()> {
    let genai = GenClient::from_env();
    log_startup_configuration(genai.backends());
    Ok(())
}

/// Run the webhook server until ctrl-c
async fn run_bot(port: u16) -> Result<()> {
    let genai = GenClient::from_env();
    log_startup_configuration(genai.backends());

    let gateway = Arc::new(GraphGateway::from_env());
    let state = AppState::new(gateway, genai);

    // Best effort: restore whatever the last run managed to flush
    persist::load(&state, &config::SNAPSHOT_PATH).await;

    let shutdown = CancellationToken::new();
    let flush_task = persist::spawn_flush_task(Arc::clone(&state), shutdown.clone());

    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(run_webhook_server(Arc::clone(&state), port, server_shutdown));

    signal::ctrl_c().await?;
    log::info!("Shutdown signal received, stopping");
    shutdown.cancel();

    // Final flush happens inside the task; wait for both to wind down.
    if let Err(e) = flush_task.await {
        log::warn!("Persistence task ended abnormally: {e}");
    }
    match server.await {
        Ok(result) => result?,
        Err(e) => log::warn!("Webhook server task ended abnormally: {e}"),
    }

    log::info!("Bye");
    Ok(())
}
