use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use marketplace::config::AppConfig;
use marketplace::db::{self, BookingRepository, SqliteBookingRepository};
use marketplace::handlers;
use marketplace::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    let repo: Arc<dyn BookingRepository> = Arc::new(SqliteBookingRepository::new(conn));

    if config.allow_self_booking {
        tracing::warn!("self-booking enabled: requester and provider may be the same user");
    }

    let state = Arc::new(AppState::new(&config, repo));
    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
