//! Logging initialization and startup configuration checking
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - Startup diagnostics for tokens, admins and generation backends

use anyhow::Result;
use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger};
use std::fs::File;

use crate::core::config;
use crate::genai::BackendConfig;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to initialize logger
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path)
        .map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at application startup
///
/// Validates and logs:
/// - send API token presence
/// - admin allow-list size
/// - configured generation backends and their model lists
pub fn log_startup_configuration(backends: &[BackendConfig]) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Kaiwa configuration check");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if config::PAGE_ACCESS_TOKEN.is_empty() {
        log::warn!("PAGE_ACCESS_TOKEN: not set, outbound sends are DISABLED");
    } else {
        log::info!("PAGE_ACCESS_TOKEN: set ({} chars)", config::PAGE_ACCESS_TOKEN.len());
    }

    if config::ADMIN_IDS.is_empty() {
        log::warn!("ADMIN_IDS: empty, admin commands will refuse everyone");
    } else {
        log::info!("ADMIN_IDS: {} admin(s) configured", config::ADMIN_IDS.len());
    }

    if backends.is_empty() {
        log::warn!("No generation backends configured, replies fall back to canned text");
        log::warn!("Set MISTRAL_API_KEY and/or OPENROUTER_API_KEY to enable generation");
    } else {
        for backend in backends {
            log::info!(
                "Backend '{}': {} model(s) [{}]",
                backend.name,
                backend.models.len(),
                backend.models.join(", ")
            );
        }
    }

    log::info!("Webhook port: {}", *config::WEB_PORT);
    log::info!("Snapshot path: {}", *config::SNAPSHOT_PATH);
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
