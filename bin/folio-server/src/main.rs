//! folio-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Open the SQLite database and run pending migrations.
//! 4. Wire up the mailer, email templates and inference client.
//! 5. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod entities;
mod error;
mod handlers;
mod inference;
mod mail;
mod middleware;
mod routes;
mod schemas;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

use crate::config::Config;
use crate::entities::{SqliteStore, User, UserStore};
use crate::handlers::credentials::hash_password_blocking;
use crate::inference::HttpInferenceClient;
use crate::mail::{Mailer, Templates, build_mailer};
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "folio-server", version, about = "Portfolio site backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Create a staff account, or promote an existing one and reset its password.
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let _log_guard = init_tracing(&cfg);
    info!(version = env!("CARGO_PKG_VERSION"), "folio-server starting");

    // ── 3. Database ────────────────────────────────────────────────────────────
    let store = SqliteStore::connect(&cfg.database_url).await?;
    info!(database_url = %cfg.database_url, "database ready");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cfg, store).await,
        Command::CreateAdmin { email, username, password } => {
            create_admin(&cfg, &store, &email, &username, password).await
        }
    }
}

/// Build the global subscriber. The returned guard flushes the log file on drop.
fn init_tracing(cfg: &Config) -> Option<WorkerGuard> {
    // Build the log-level filter, warning loudly if the configured value is
    // not a valid tracing filter expression.
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: FOLIO_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let (writer, guard) = match cfg.log_dir.as_deref() {
        Some(dir) => {
            let file = tracing_appender::rolling::daily(dir, "folio-server.log");
            let (file, guard) = tracing_appender::non_blocking(file);
            (BoxMakeWriter::new(std::io::stdout.and(file)), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    guard
}

async fn serve(cfg: Config, store: SqliteStore) -> anyhow::Result<()> {
    // ── 4. Collaborators ───────────────────────────────────────────────────────
    let mailer: Arc<dyn Mailer> = Arc::from(build_mailer(&cfg.smtp));
    let templates = Templates::new(&cfg.site_name, &cfg.site_url)?;
    let inference = HttpInferenceClient::new(cfg.inference.clone())?;
    if cfg.inference.api_key.is_none() {
        warn!("FOLIO_INFERENCE_API_KEY not set; the chatbot will use canned replies");
    }
    tokio::fs::create_dir_all(&cfg.upload_dir).await?;

    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        store: Arc::new(store),
        mailer,
        templates: Arc::new(templates),
        inference: Arc::new(inference),
    });

    // ── 5. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, swagger = cfg.enable_swagger, "HTTP server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("folio-server stopped");
    Ok(())
}

async fn create_admin(
    cfg: &Config,
    store: &SqliteStore,
    email: &str,
    username: &str,
    password: String,
) -> anyhow::Result<()> {
    let email = email.trim().to_lowercase();
    let hash = hash_password_blocking(password, cfg.auth.password_iterations).await?;

    if let Some(existing) = store.find_user_by_email(&email).await? {
        store.set_password_hash(&existing.id, &hash).await?;
        store.set_account_flags(&existing.id, Some(true), Some(true)).await?;
        info!(user = %existing.id, email = %email, "existing user promoted to staff");
        return Ok(());
    }

    let now = Utc::now();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email: email.clone(),
        username: username.to_owned(),
        first_name: String::new(),
        last_name: String::new(),
        password_hash: hash,
        is_staff: true,
        is_active: true,
        is_email_verified: true,
        email_verification_token: None,
        email_notifications_enabled: true,
        created_at: now,
        updated_at: now,
    };
    store.create_user(user.clone()).await?;
    info!(user = %user.id, email = %email, "staff account created");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
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
