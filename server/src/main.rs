//! BusTrack Server - Main entry point.
//!
//! This binary starts the BusTrack demo server with:
//! - Structured JSON logging for production
//! - Graceful shutdown handling (SIGTERM/SIGINT)
//! - The background location simulator task
//!
//! # Configuration
//!
//! See [`bustrack_server::config`] for environment variable configuration.
//!
//! # Example
//!
//! ```bash
//! # Development mode (ephemeral token key)
//! cargo run --bin bustrack-server
//!
//! # Pinned token key, custom port and broadcast period
//! BUSTRACK_TOKEN_KEY="base64-32-byte-seed" \
//! BUSTRACK_UPDATE_INTERVAL_SECS=15 \
//! PORT=3000 \
//! cargo run --release --bin bustrack-server
//! ```

use std::process::ExitCode;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use bustrack_server::config::Config;
use bustrack_server::routes::{create_router, AppState};
use bustrack_server::simulator;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize structured logging
    init_logging();

    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Failed to load configuration");
            eprintln!("Error: {err}");
            eprintln!();
            eprintln!("Recognized environment variables:");
            eprintln!("  PORT                           - HTTP server port (default: 3000)");
            eprintln!("  BUSTRACK_UPDATE_INTERVAL_SECS  - Seconds between broadcasts (default: 15)");
            eprintln!("  BUSTRACK_TOKEN_KEY             - Base64 32-byte token signing seed");
            eprintln!("  RUST_LOG                       - Log level filter (default: info)");
            return ExitCode::from(1);
        }
    };

    let token_key_mode = if config.token_seed.is_some() {
        "configured"
    } else {
        "ephemeral"
    };
    info!(
        port = config.port,
        update_interval_secs = config.update_interval.as_secs(),
        token_key = token_key_mode,
        "BusTrack server starting"
    );

    // Create application state
    let state = AppState::new(config.clone());
    info!(stops = state.catalog.len(), "Stop catalog loaded");

    // Spawn the location simulator task
    let simulator_handle = simulator::spawn(
        state.rooms.clone(),
        state.catalog.clone(),
        config.update_interval,
    );

    // Create router
    let app = create_router(state);

    // Bind to address
    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => {
            info!(
                port = config.port,
                address = %bind_addr,
                "Server listening"
            );
            listener
        }
        Err(err) => {
            error!(
                error = %err,
                address = %bind_addr,
                "Failed to bind to address"
            );
            return ExitCode::from(1);
        }
    };

    // Start server with graceful shutdown
    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    info!("Server ready to accept connections");

    // Run the server
    if let Err(err) = server.await {
        error!(error = %err, "Server error");
        return ExitCode::from(1);
    }

    // Shutdown cleanup
    info!("Server shutting down gracefully");

    // The simulator is owned by the process lifecycle; stop it here.
    simulator_handle.abort();
    info!("Location simulator stopped");

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}

/// Initialize structured logging with tracing.
///
/// Configures JSON-formatted output for production use with:
/// - Environment-based log level filtering via RUST_LOG
/// - Default log level of `info`
/// - Target and level information
fn init_logging() {
    // Build env filter from RUST_LOG or use default
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Default: info level for our crates, warn for dependencies
        EnvFilter::new("info,tower_http=debug,axum::rejection=trace")
    });

    // JSON format layer for production logging
    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    // Initialize the subscriber
    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .init();
}

/// Creates a future that resolves when a shutdown signal is received.
///
/// Listens for:
/// - SIGTERM (container orchestrator shutdown)
/// - SIGINT (Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
