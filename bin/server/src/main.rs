use dashwire_relay::{RelayOptions, ReqwestClient, WidgetRelay};
use dashwire_server::api::{self, AppState};
use dashwire_server::config::ServerConfig;
use dashwire_server::db::{self, WidgetRepository};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Create database connection pool and run migrations
    tracing::info!("Running database migrations...");
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("failed to initialize database");

    let repository = WidgetRepository::new(pool);
    let relay = WidgetRelay::new(
        repository,
        ReqwestClient::new(),
        RelayOptions {
            timeout: Duration::from_secs(config.webhook.timeout_seconds),
        },
    );

    let state = Arc::new(AppState {
        relay,
        max_upload_bytes: config.webhook.max_upload_bytes,
    });
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app).await.expect("server error");
}
