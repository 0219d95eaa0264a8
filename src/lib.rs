//! Prospect Agent - company data and AI criteria-matching service.
//!
//! Library entry point; the binary in `main.rs` parses flags and calls
//! [`init_and_run_with_config`].

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod middleware;
pub mod services;
pub mod state;

use std::sync::Arc;

use tracing::{error, info};

use crate::state::{get_shutdown_token, trigger_shutdown, AppState};

/// Runtime overrides collected from the command line.
#[derive(Debug, Default)]
pub struct RuntimeConfig {
    /// Overrides the `PORT` environment variable when set.
    pub port_override: Option<u16>,
}

/// Initialize logging and state, then serve until shutdown.
pub async fn init_and_run_with_config(runtime: RuntimeConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prospect_agent=info,tower_http=info".into()),
        )
        .init();

    let state = match AppState::new() {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!(error = %e, "Failed to initialize application state");
            std::process::exit(1);
        }
    };

    let port = runtime.port_override.unwrap_or(state.config.port);
    let addr = format!("0.0.0.0:{}", port);

    let app = api::router(state.clone());

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %addr, error = %e, "Failed to bind listener");
            std::process::exit(1);
        }
    };

    info!(
        addr = %addr,
        version = config::env::constants::VERSION,
        "Prospect agent listening"
    );

    let shutdown = get_shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
            trigger_shutdown();
        }
    });

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
    {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
