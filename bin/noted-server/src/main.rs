//! noted-server – entry point.
//!
//! Startup order for `serve`:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Open the SQLite database and run pending migrations.
//! 4. Build shared state (store, completion provider, reconcile sessions).
//! 5. Build the Axum router and start the HTTP server with graceful shutdown.
//!
//! `create-user` registers a profile and prints its API token.

mod config;
mod error;
mod middleware;
mod routes;
mod schemas;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use noted_core::services::profiles::{self, NewProfile};
use noted_core::{GenaiProvider, SqliteStore};
use tracing::{info, warn};

use crate::config::Config;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "noted-server", version, about = "Duley Noted API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Register a user and print their API token.
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    init_tracing(&cfg);

    // ── 3. Database ────────────────────────────────────────────────────────────
    let store = SqliteStore::connect(&cfg.database_url).await?;
    info!(database_url = %cfg.database_url, "database ready");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cfg, store).await,
        Command::CreateUser {
            email,
            first_name,
            last_name,
        } => {
            let profile = profiles::create_profile(
                &store,
                NewProfile {
                    email,
                    first_name,
                    last_name,
                },
            )
            .await?;
            println!("user:  {}", profile.id);
            println!("token: {}", profile.api_token);
            Ok(())
        }
    }
}

async fn serve(cfg: Config, store: SqliteStore) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        model = %cfg.chat_model,
        persist_policy = %cfg.persist_policy,
        "noted-server starting"
    );

    // ── 4. Shared application state ────────────────────────────────────────────
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let provider = match &cfg.system_prompt {
        Some(prompt) => GenaiProvider::new().with_system_prompt(prompt.clone()),
        None => GenaiProvider::new(),
    };
    let state = Arc::new(AppState::new(cfg, store, Arc::new(provider)));

    // ── 5. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("noted-server stopped");
    Ok(())
}

fn init_tracing(cfg: &Config) {
    // RUST_LOG wins over NOTED_LOG; a bad filter falls back to `info`.
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: NOTED_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
