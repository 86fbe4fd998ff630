pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod store;

use std::sync::Arc;
use tokio::task;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Хранилище приложения: Postgres за кешем Redis.
pub type Store = cache::CachedStore<store::PgStore>;

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub store: Store,
    pub config: config::Config,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::from_config(&config.database).await?;
        info!("Database connected");

        db.run_migrations().await?;

        let redis = redis_client::RedisClient::new(&config.redis.url).await?;
        let cache = cache::CacheService::new(redis, &config.cache);
        let store = cache::CachedStore::new(store::PgStore::new(db.pool.clone()), cache);

        let state = Arc::new(Self { db, store, config });

        let state_for_bg = state.clone();
        task::spawn(async move {
            // Warmup cache в фоне
            state_for_bg.store.warmup().await;
        });

        Ok(state)
    }
}

/// Логи в stdout: текстом или JSON (`LOG_FORMAT=json`), фильтр из `RUST_LOG`.
pub fn init_tracing(app: &config::AppConfig) {
    let filter = EnvFilter::new(&app.rust_log);
    let registry = tracing_subscriber::registry().with(filter);

    if app.json_logs() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
