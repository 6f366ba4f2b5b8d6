//! # TaskTrack API Server
//!
//! Multi-user task tracking over HTTP: accounts with bearer-token sessions,
//! avatars, and owner-scoped tasks.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/tasktrack JWT_SECRET=... cargo run -p tasktrack-api
//! DATABASE_URL=memory:// JWT_SECRET=... cargo run -p tasktrack-api
//! ```

use std::sync::Arc;
use tasktrack_api::{
    app::{build_router, AppState},
    config::Config,
};
use tasktrack_shared::{
    db::{
        migrations::{ensure_database_exists, run_migrations},
        pool::{create_pool, DatabaseConfig},
    },
    notify::{LogMailer, Mailer, Notifier, SendGridMailer},
    store::{memory::MemoryStore, postgres::PgStore, Store},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tasktrack_api=debug,tasktrack_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "TaskTrack API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = if config.database.is_memory() {
        tracing::warn!("Using the in-memory store; data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        if !config.api.production {
            ensure_database_exists(&config.database.url).await?;
        }
        let pool = create_pool(DatabaseConfig {
            url: config.database.url.clone(),
            max_connections: config.database.max_connections,
            ..Default::default()
        })
        .await?;
        run_migrations(&pool).await?;
        Arc::new(PgStore::new(pool))
    };

    let mailer: Arc<dyn Mailer> = match &config.mail.sendgrid_api_key {
        Some(key) => Arc::new(SendGridMailer::new(key.clone())?),
        None => {
            tracing::info!("SENDGRID_API_KEY not set, emails will only be logged");
            Arc::new(LogMailer)
        }
    };
    let notifier = Notifier::new(mailer, config.mail.from.clone());

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(Arc::clone(&store), notifier, config));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
