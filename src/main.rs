use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mirrorband_api::{config::Config, create_app, database::Database, handlers::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mirrorband_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database = Database::new(&config).await?;
    tracing::info!("Connected to store at {}", config.database_url);

    let address = config.bind_address();
    let state = AppState::new(database, config)?;
    let app = create_app(state)?;

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Mirror bandwidth API listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
