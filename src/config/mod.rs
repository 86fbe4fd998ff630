use serde::Deserialize;
use std::env;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub cache: CacheConfig,
    pub features: FeatureFlags,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    /// `json` для структурированных логов, иначе обычный текст
    pub log_format: String,
}

impl AppConfig {
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Настройки Redis
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

// TTL кеша в секундах
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub seats_ttl_seconds: u64,
    pub routes_ttl_seconds: u64,
}

// Feature flags для включения/выключения функциональности
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    pub enable_admin: bool,
}

// ключ конфигурации -> переменная окружения
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("app.host", "HOST"),
    ("app.port", "PORT"),
    ("app.environment", "ENVIRONMENT"),
    ("app.rust_log", "RUST_LOG"),
    ("app.log_format", "LOG_FORMAT"),
    ("database.url", "DATABASE_URL"),
    ("database.pool_size", "DB_POOL_SIZE"),
    ("redis.url", "REDIS_URL"),
    ("cache.seats_ttl_seconds", "CACHE_SEATS_TTL_SECONDS"),
    ("cache.routes_ttl_seconds", "CACHE_ROUTES_TTL_SECONDS"),
    ("features.enable_admin", "ENABLE_ADMIN"),
];

impl Config {
    /// Собирает конфигурацию из значений по умолчанию и переменных окружения.
    /// `DATABASE_URL` обязателен.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8000)?
            .set_default("app.environment", "development")?
            .set_default("app.rust_log", "bus_booking=debug,tower_http=debug")?
            .set_default("app.log_format", "text")?
            .set_default("database.pool_size", 20)?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("cache.seats_ttl_seconds", 300)?
            .set_default("cache.routes_ttl_seconds", 600)?
            .set_default("features.enable_admin", false)?;

        for (key, var) in ENV_OVERRIDES {
            builder = builder.set_override_option(*key, lookup(var))?;
        }

        builder.build()?.try_deserialize()
    }
}
