use gatehouse_identity::OidcClient;
use gatehouse_server::{
    auth::{AppState, CookieSettings},
    cleanup::spawn_session_cleanup,
    config::ServerConfig,
    error::StartupError,
    router::router,
    upstream::Upstream,
};
use gatehouse_session::PgSessionStore;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Gateway failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> gatehouse_core::Result<(), StartupError> {
    // Load configuration from environment
    let config = ServerConfig::from_env().map_err(|e| StartupError::Configuration {
        details: e.to_string(),
    })?;
    tracing::info!(dev_mode = config.dev_mode, "Loaded configuration");

    let cookies = CookieSettings::new(
        &config.cookie_secret,
        !config.dev_mode,
        time::Duration::days(config.session.max_age_days),
    )
    .map_err(|e| StartupError::Configuration {
        details: e.to_string(),
    })?;

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| StartupError::Database {
            details: format!("failed to connect to database: {e}"),
        })?;

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| StartupError::Database {
            details: format!("failed to run migrations: {e}"),
        })?;

    let store = Arc::new(PgSessionStore::new(db_pool));
    spawn_session_cleanup(
        store.clone(),
        Duration::from_secs(config.session.cleanup_interval_seconds),
    );

    // Initialize OIDC client
    tracing::info!("Discovering OIDC provider...");
    let provider_timeout = config.oidc.request_timeout();
    let provider = OidcClient::discover(config.oidc.clone(), config.callback_url())
        .await
        .map_err(|e| StartupError::IdentityProvider {
            details: e.to_string(),
        })?;

    let app_state = Arc::new(AppState::new(
        store,
        Arc::new(provider),
        cookies,
        config.session_ttl(),
        provider_timeout,
    ));

    let upstream = Upstream::new(&config.upstream_url)?;
    let app = router(app_state, upstream.into_router());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| StartupError::Server {
            details: format!("failed to bind to {addr}: {e}"),
        })?;

    tracing::info!("listening on http://{}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StartupError::Server {
            details: e.to_string(),
        })?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutting down");
}
