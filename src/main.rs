use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use anisense_api::{
    config::Config,
    db::{create_redis_client, Cache, CacheWriterHandle, JsonFileCache, TrailerCache},
    routes::{create_router, AppState},
    services::{
        providers::{AniListProvider, TrailerProvider},
        Catalog, ManualAliases, RecommendationService, Recommender, ResultFormatter,
        SimilarityMatrix, TrailerService,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("anisense_api=info,tower_http=info")),
        )
        .with(fmt::layer())
        .init();

    let config = Config::from_env()?;

    let catalog = Arc::new(Catalog::from_json_file(&config.catalog_path)?);
    let matrix = Arc::new(SimilarityMatrix::load(&config.similarity_path)?);
    let aliases = match &config.aliases_path {
        Some(path) => ManualAliases::from_json_file(path)?,
        None => ManualAliases::default(),
    };
    tracing::info!(
        records = catalog.len(),
        matrix_dim = matrix.dim(),
        manual_aliases = aliases.len(),
        "Catalog loaded"
    );

    let recommender = Recommender::new(catalog, matrix, aliases, config.policy.clone())?;
    let formatter = ResultFormatter::new().context("Failed to compile text cleanup patterns")?;

    let timeout = Duration::from_secs(config.trailer_timeout_secs);
    let provider: Arc<dyn TrailerProvider> =
        Arc::new(AniListProvider::new(config.anilist_api_url.clone(), timeout)?);

    let ttl = chrono::Duration::days(config.trailer_cache_ttl_days);
    let (cache, cache_writer): (Arc<dyn TrailerCache>, Option<CacheWriterHandle>) =
        match &config.redis_url {
            Some(url) => {
                let client = create_redis_client(url)?;
                let ttl_secs = u64::try_from(ttl.num_seconds()).unwrap_or(1).max(1);
                let (cache, handle) = Cache::new(client, ttl_secs);
                let cache: Arc<dyn TrailerCache> = Arc::new(cache);
                (cache, Some(handle))
            }
            None => {
                let cache: Arc<dyn TrailerCache> =
                    Arc::new(JsonFileCache::open(&config.trailer_cache_path, ttl).await);
                (cache, None)
            }
        };
    tracing::info!(
        provider = provider.name(),
        cache = cache.name(),
        ttl_days = config.trailer_cache_ttl_days,
        "Trailer lookups configured"
    );

    let trailers = TrailerService::new(provider, cache, timeout);
    let service = RecommendationService::new(recommender, formatter, trailers);
    let app = create_router(AppState::new(service));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
