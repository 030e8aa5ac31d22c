use std::{net::SocketAddr, sync::Arc};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinepath::{
    config::Config,
    db::{create_pool, create_redis_client, Cache, PgCatalogRepository, PgUserRepository},
    routes::{create_router, AppState},
    services::metadata::MetadataLookup,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinepath=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(ai_provider = ?config.ai_provider, "Configuration loaded");

    let pool = create_pool(&config.database_url).await?;
    tracing::info!("Database connection pool created");

    let redis_client = match Config::credential(&config.redis_url) {
        Some(url) => Some(create_redis_client(&url)?),
        None => {
            tracing::info!("REDIS_URL not set, caching disabled and rate limits kept in memory");
            None
        }
    };

    let (cache, cache_writer) = match &redis_client {
        Some(client) => {
            let (cache, handle) = Cache::new(client.clone()).await;
            (cache, Some(handle))
        }
        None => (Cache::disabled(), None),
    };

    let metadata = MetadataLookup::from_config(&config, cache)?;
    let state = AppState::from_config(
        &config,
        Arc::new(PgCatalogRepository::new(pool.clone())),
        Arc::new(PgUserRepository::new(pool)),
        metadata,
        redis_client,
    );

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
