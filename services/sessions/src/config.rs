use serde::{Deserialize, Serialize};

use foundermentor_common::{DatabaseConfig, JwtConfig, RedisConfig, ServerConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    /// Upper bound on a single session, in minutes.
    pub max_session_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(8002),
            database: DatabaseConfig::from_env(),
            redis: RedisConfig::from_env(),
            jwt: JwtConfig::from_env(),
            max_session_minutes: std::env::var("MAX_SESSION_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(480),
        }
    }
}
