use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};

use crate::{config::CacheConfig, redis_client::RedisClient};

pub mod store;

pub use store::CachedStore;

/// Ключи кеша. Множество занятых мест сюда намеренно не попадает:
/// оно всегда читается из хранилища.
pub fn seats_key(bus_id: i64) -> String {
    format!("seats:{}", bus_id)
}

pub const ROUTES_KEY: &str = "routes:all";

#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    pub seats_ttl: u64,
    pub routes_ttl: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, config: &CacheConfig) -> Self {
        Self {
            redis,
            seats_ttl: config.seats_ttl_seconds,
            routes_ttl: config.routes_ttl_seconds,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(key).await?;
        match data {
            Some(data) => serde_json::from_str(&data).map(Some).map_err(|_| {
                redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
            }),
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(value).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(key, data, ttl_seconds).await
    }

    // Инвалидировать ключ; ошибка Redis не критична, запись истечёт по TTL
    pub async fn invalidate(&self, key: &str) {
        let mut conn = self.redis.conn.clone();
        match conn.del::<_, ()>(key).await {
            Ok(()) => info!("Invalidated cache key {}", key),
            Err(e) => warn!("Failed to invalidate cache key {}: {:?}", key, e),
        }
    }
}
