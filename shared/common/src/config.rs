use serde::{Deserialize, Serialize};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or("DATABASE_HOST", "localhost"),
            port: env_or("DATABASE_PORT", "5432").parse().unwrap_or(5432),
            username: env_or("DATABASE_USERNAME", "foundermentor_user"),
            password: env_or("DATABASE_PASSWORD", "foundermentor_password"),
            database: env_or("DATABASE_NAME", "foundermentor"),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", "10").parse().unwrap_or(10),
        }
    }

    pub fn connection_string(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub database: u8,
}

impl RedisConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or("REDIS_HOST", "localhost"),
            port: env_or("REDIS_PORT", "6379").parse().unwrap_or(6379),
            password: std::env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
            database: env_or("REDIS_DATABASE", "0").parse().unwrap_or(0),
        }
    }

    pub fn connection_string(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.database
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: u64,
    pub issuer: String,
}

impl JwtConfig {
    pub fn from_env() -> Self {
        Self {
            secret: env_or("JWT_SECRET", "dev-secret-key-change-in-production"),
            expiration_hours: env_or("JWT_EXPIRATION_HOURS", "24").parse().unwrap_or(24),
            issuer: env_or("JWT_ISSUER", "foundermentor"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn from_env(default_port: u16) -> Self {
        Self {
            host: env_or("SERVER_HOST", "0.0.0.0"),
            port: env_or("SERVER_PORT", &default_port.to_string())
                .parse()
                .unwrap_or(default_port),
            cors_origins: env_or("CORS_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
        }
    }
}

/// Local-disk upload settings shared by the avatar and resource endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub upload_dir: String,
    pub max_file_size_mb: u64,
    pub allowed_extensions: Vec<String>,
}

impl UploadConfig {
    pub fn from_env(default_dir: &str, default_max_mb: u64, default_extensions: &[&str]) -> Self {
        Self {
            upload_dir: env_or("UPLOAD_DIR", default_dir),
            max_file_size_mb: env_or("UPLOAD_MAX_FILE_SIZE_MB", &default_max_mb.to_string())
                .parse()
                .unwrap_or(default_max_mb),
            allowed_extensions: std::env::var("UPLOAD_ALLOWED_EXTENSIONS")
                .map(|v| v.split(',').map(|s| s.trim().to_lowercase()).collect())
                .unwrap_or_else(|_| default_extensions.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}
