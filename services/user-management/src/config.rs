use serde::{Deserialize, Serialize};

use foundermentor_common::{DatabaseConfig, JwtConfig, RedisConfig, ServerConfig, UploadConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub upload: UploadConfig,
    /// TTL for cached profiles, in seconds.
    pub profile_cache_seconds: u64,
    /// Attempts allowed per identity on the auth endpoints within one window.
    pub auth_rate_limit: u32,
    pub auth_rate_limit_window_seconds: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(8000),
            database: DatabaseConfig::from_env(),
            redis: RedisConfig::from_env(),
            jwt: JwtConfig::from_env(),
            upload: UploadConfig::from_env("uploads/avatars", 5, &["jpeg", "jpg", "png"]),
            profile_cache_seconds: std::env::var("PROFILE_CACHE_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            auth_rate_limit: std::env::var("AUTH_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            auth_rate_limit_window_seconds: std::env::var("AUTH_RATE_LIMIT_WINDOW_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        }
    }
}
