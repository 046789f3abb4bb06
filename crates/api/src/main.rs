use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use onboard_core::storage::{DiskObjectStore, UrlSigner};
use onboard_db::Repositories;
use onboard_events::{EmailConfig, EmailSender, LogMailer, Notifier, Sender, SmtpMailer};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use onboard_api::auth::jwt::JwtTokenIssuer;
use onboard_api::background;
use onboard_api::config::{LogFormat, ServerConfig};
use onboard_api::router::build_app_router;
use onboard_api::services::team::bootstrap_admin;
use onboard_api::state::AppState;

/// Public prefix of the signed download route.
const STORAGE_ROUTE: &str = "/api/storage";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "onboard_api=debug,onboard_events=debug,tower_http=debug".into());
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
    tracing::info!(host = %config.host, port = %config.port, env = ?config.app_env, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = onboard_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    onboard_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    onboard_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let repos = Repositories::postgres(pool.clone());

    // --- Email ---
    let mailer: Arc<dyn EmailSender> = match EmailConfig::from_env() {
        Some(email_config) => {
            let smtp = SmtpMailer::new(email_config).expect("Invalid SMTP configuration");
            tracing::info!("SMTP mailer configured");
            Arc::new(smtp)
        }
        None => {
            tracing::warn!("SMTP_HOST not set, emails will only be logged");
            Arc::new(LogMailer::new(Sender::from_env()))
        }
    };
    let notifier = Notifier::new(
        mailer,
        repos.clone(),
        config.app_name.clone(),
        config.app_base_url.clone(),
    );

    // --- Object storage ---
    let signer = UrlSigner::new(config.storage_signing_secret.clone(), STORAGE_ROUTE);
    let store = DiskObjectStore::new(&config.storage_dir, signer.clone());
    tracing::info!(dir = %config.storage_dir, "Document storage ready");

    // --- Sessions ---
    let tokens = JwtTokenIssuer::new(
        config.jwt.clone(),
        repos.sessions.clone(),
        repos.users.clone(),
    );

    // --- Bootstrap admin ---
    if let Some(admin) = &config.bootstrap_admin {
        match bootstrap_admin(&repos, &admin.email, &admin.password).await {
            Ok(true) => tracing::info!(email = %admin.email, "Bootstrap admin created"),
            Ok(false) => tracing::debug!(email = %admin.email, "Bootstrap admin already exists"),
            Err(e) => tracing::error!(error = %e, "Failed to create bootstrap admin"),
        }
    }

    // --- Background jobs ---
    let cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn(background::invite_expiry::run(
        repos.clone(),
        Duration::from_secs(config.invite_sweep_interval_secs),
        cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        repos,
        pool: Some(pool),
        config: Arc::new(config.clone()),
        notifier,
        store: Arc::new(store),
        signer,
        tokens: Arc::new(tokens),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), sweep_handle).await;
    tracing::info!("Invite expiry job stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
