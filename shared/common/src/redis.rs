use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};

use crate::{AppError, RedisConfig};

/// Thin wrapper over a shared Redis connection manager. Used for auth
/// sessions, response caching, rate limiting and unread-message counters.
#[derive(Clone)]
pub struct RedisService {
    manager: ConnectionManager,
}

impl RedisService {
    pub async fn new(config: &RedisConfig) -> Result<Self, AppError> {
        let client = Client::open(config.connection_string()).map_err(AppError::Redis)?;
        let manager = ConnectionManager::new(client).await.map_err(AppError::Redis)?;

        // Test connection
        let mut conn = manager.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(AppError::Redis)?;

        tracing::info!("Redis connection established");

        Ok(Self { manager })
    }

    // Session management
    pub async fn set_session(
        &self,
        user_id: &str,
        token: &str,
        expiry_seconds: u64,
    ) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        conn.set_ex(RedisKeys::session(user_id), token, expiry_seconds)
            .await
            .map_err(AppError::Redis)
    }

    pub async fn get_session(&self, user_id: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.manager.clone();
        conn.get(RedisKeys::session(user_id))
            .await
            .map_err(AppError::Redis)
    }

    pub async fn delete_session(&self, user_id: &str) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        conn.del(RedisKeys::session(user_id))
            .await
            .map_err(AppError::Redis)
    }

    // Rate limiting
    pub async fn check_rate_limit(
        &self,
        key: &str,
        limit: u32,
        window_seconds: u64,
    ) -> Result<bool, AppError> {
        let mut conn = self.manager.clone();
        let current: u32 = conn.incr(key, 1).await.map_err(AppError::Redis)?;

        if current == 1 {
            conn.expire::<_, ()>(key, window_seconds as i64)
                .await
                .map_err(AppError::Redis)?;
        }

        Ok(current <= limit)
    }

    // Caching
    pub async fn cache_set<T>(
        &self,
        key: &str,
        value: &T,
        expiry_seconds: u64,
    ) -> Result<(), AppError>
    where
        T: Serialize,
    {
        let mut conn = self.manager.clone();
        let serialized = serde_json::to_string(value)
            .map_err(|e| AppError::Internal(format!("Serialization error: {}", e)))?;

        conn.set_ex(key, serialized, expiry_seconds)
            .await
            .map_err(AppError::Redis)
    }

    pub async fn cache_get<T>(&self, key: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned,
    {
        let mut conn = self.manager.clone();
        let result: Option<String> = conn.get(key).await.map_err(AppError::Redis)?;

        match result {
            Some(data) => {
                let deserialized = serde_json::from_str(&data)
                    .map_err(|e| AppError::Internal(format!("Deserialization error: {}", e)))?;
                Ok(Some(deserialized))
            }
            None => Ok(None),
        }
    }

    pub async fn cache_delete(&self, key: &str) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        conn.del(key).await.map_err(AppError::Redis)
    }

    // Unread-message counters, keyed per (user, conversation)
    pub async fn incr_unread(&self, user_id: &str, conversation_id: &str) -> Result<i64, AppError> {
        let mut conn = self.manager.clone();
        conn.incr(RedisKeys::unread(user_id, conversation_id), 1)
            .await
            .map_err(AppError::Redis)
    }

    pub async fn get_unread(&self, user_id: &str, conversation_id: &str) -> Result<i64, AppError> {
        let mut conn = self.manager.clone();
        let count: Option<i64> = conn
            .get(RedisKeys::unread(user_id, conversation_id))
            .await
            .map_err(AppError::Redis)?;
        Ok(count.unwrap_or(0))
    }

    pub async fn reset_unread(&self, user_id: &str, conversation_id: &str) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        conn.del(RedisKeys::unread(user_id, conversation_id))
            .await
            .map_err(AppError::Redis)
    }

    // Health check
    pub async fn health_check(&self) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(AppError::Redis)?;
        Ok(())
    }
}

// Redis key builders
pub struct RedisKeys;

impl RedisKeys {
    pub fn session(user_id: &str) -> String {
        format!("session:{}", user_id)
    }

    pub fn rate_limit(user_id: &str, endpoint: &str) -> String {
        format!("rate_limit:{}:{}", user_id, endpoint)
    }

    pub fn profile_cache(user_id: &str) -> String {
        format!("profile_cache:{}", user_id)
    }

    pub fn mentor_rating_cache(mentor_id: &str) -> String {
        format!("mentor_rating_cache:{}", mentor_id)
    }

    pub fn unread(user_id: &str, conversation_id: &str) -> String {
        format!("unread:{}:{}", user_id, conversation_id)
    }
}
