use serde::{Deserialize, Serialize};

use foundermentor_common::{DatabaseConfig, JwtConfig, RedisConfig, ServerConfig, UploadConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub upload: UploadConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(8003),
            database: DatabaseConfig::from_env(),
            redis: RedisConfig::from_env(),
            jwt: JwtConfig::from_env(),
            upload: UploadConfig::from_env(
                "uploads/resources",
                20,
                &["pdf", "png", "jpg", "jpeg", "mp4"],
            ),
        }
    }
}
