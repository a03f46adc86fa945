use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use foundermentor_auth::{Claims, JwtService, PasswordService};
use foundermentor_common::{uploads, AppError, RedisKeys, RedisService, UserRole};
use foundermentor_database::{Profile, User};

use crate::config::AppConfig;
use crate::handlers::UserQuery;
use crate::models::*;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub redis_service: RedisService,
    pub jwt_service: JwtService,
    pub config: AppConfig,
}

pub struct UserService {
    db_pool: PgPool,
    redis_service: RedisService,
    jwt_service: JwtService,
    config: AppConfig,
}

impl UserService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
            redis_service: state.redis_service.clone(),
            jwt_service: state.jwt_service.clone(),
            config: state.config.clone(),
        }
    }

    // Auth

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AppError> {
        self.enforce_auth_rate_limit(&request.email.to_lowercase(), "register")
            .await?;

        let roles = parse_signup_roles(&request.roles)?;
        PasswordService::validate_password_strength(&request.password)?;
        let hashed_password = PasswordService::hash_password(&request.password)?;

        let role_strings: Vec<String> =
            roles.iter().map(|r| r.as_str().to_string()).collect();

        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, roles, hashed_password)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&request.username)
        .bind(request.email.to_lowercase())
        .bind(&role_strings)
        .bind(&hashed_password)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)
        .map_err(|err| {
            if err.is_unique_violation() {
                AppError::Conflict("Username or email is already taken".to_string())
            } else {
                err
            }
        })?;

        let profile = sqlx::query_as::<_, Profile>(
            "INSERT INTO profiles (user_id) VALUES ($1) RETURNING *",
        )
        .bind(user.user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Registered user {} ({})", user.username, user.user_id);

        self.issue_token(user, profile).await
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        self.enforce_auth_rate_limit(&request.email.to_lowercase(), "login")
            .await?;

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(request.email.to_lowercase())
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::Authentication("Invalid credentials".to_string()))?;

        if !PasswordService::verify_password(&request.password, &user.hashed_password)? {
            return Err(AppError::Authentication("Invalid credentials".to_string()));
        }

        let profile = self.fetch_profile(user.user_id).await?;
        self.issue_token(user, profile).await
    }

    pub async fn logout(&self, user_id: Uuid) -> Result<(), AppError> {
        self.redis_service
            .delete_session(&user_id.to_string())
            .await
    }

    // Counted per identity so one noisy client cannot lock everyone out.
    async fn enforce_auth_rate_limit(
        &self,
        identity: &str,
        endpoint: &str,
    ) -> Result<(), AppError> {
        let allowed = self
            .redis_service
            .check_rate_limit(
                &RedisKeys::rate_limit(identity, endpoint),
                self.config.auth_rate_limit,
                self.config.auth_rate_limit_window_seconds,
            )
            .await?;

        if !allowed {
            tracing::warn!("Rate limit hit on {} for {}", endpoint, identity);
            return Err(AppError::RateLimited(
                "Too many attempts, try again later".to_string(),
            ));
        }

        Ok(())
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<(UserResponse, ProfileResponse), AppError> {
        let user = self.fetch_user(user_id).await?;
        let profile = self.fetch_profile(user_id).await?;
        Ok((user.into(), profile.into()))
    }

    async fn issue_token(&self, user: User, profile: Profile) -> Result<AuthResponse, AppError> {
        let roles = user
            .roles
            .iter()
            .filter_map(|r| UserRole::parse(r))
            .collect();

        let claims = Claims::new(
            user.user_id,
            user.username.clone(),
            user.email.clone(),
            roles,
            &self.config.jwt,
        );
        let token = self.jwt_service.generate_token(&claims)?;

        self.redis_service
            .set_session(
                &user.user_id.to_string(),
                &token,
                self.config.jwt.expiration_hours * 3600,
            )
            .await?;

        Ok(AuthResponse {
            token,
            user: user.into(),
            profile: profile.into(),
        })
    }

    // Profiles

    pub async fn get_profile(&self, user_id: Uuid) -> Result<ProfileResponse, AppError> {
        let cache_key = RedisKeys::profile_cache(&user_id.to_string());
        if let Some(cached) = self.redis_service.cache_get::<Profile>(&cache_key).await? {
            return Ok(cached.into());
        }

        let profile = self.fetch_profile(user_id).await?;
        self.redis_service
            .cache_set(&cache_key, &profile, self.config.profile_cache_seconds)
            .await?;

        Ok(profile.into())
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<ProfileResponse, AppError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles
            SET bio = COALESCE($2, bio),
                skills = COALESCE($3, skills),
                interests = COALESCE($4, interests),
                industries = COALESCE($5, industries),
                location = COALESCE($6, location),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&request.bio)
        .bind(&request.skills)
        .bind(&request.interests)
        .bind(&request.industries)
        .bind(&request.location)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

        self.invalidate_profile_cache(user_id).await;

        Ok(profile.into())
    }

    pub async fn upload_avatar(
        &self,
        user_id: Uuid,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<ProfileResponse, AppError> {
        let extension = uploads::validate_upload(
            filename,
            content_type,
            bytes.len() as u64,
            &self.config.upload,
        )?;

        let stored = uploads::stored_filename(
            "user",
            user_id,
            Utc::now().timestamp_millis(),
            &extension,
        );
        let path = format!("{}/{}", self.config.upload.upload_dir, stored);

        tokio::fs::create_dir_all(&self.config.upload.upload_dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to prepare upload dir: {}", e)))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store upload: {}", e)))?;

        let previous = self.fetch_profile(user_id).await?.avatar_url;

        let profile = sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles
            SET avatar_url = $2, updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&path)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        // Replaced avatars are cleaned up best-effort.
        if let Some(old) = previous {
            if old.starts_with(&self.config.upload.upload_dir) {
                if let Err(e) = tokio::fs::remove_file(&old).await {
                    tracing::warn!("Failed to remove old avatar {}: {}", old, e);
                }
            }
        }

        self.invalidate_profile_cache(user_id).await;

        Ok(profile.into())
    }

    // Admin

    pub async fn list_users(&self, query: &UserQuery) -> Result<Vec<UserResponse>, AppError> {
        let limit = query.limit.unwrap_or(50).clamp(1, 200);
        let offset = (query.page.unwrap_or(1).max(1) - 1) * limit;
        let search = query.search.as_ref().map(|s| format!("%{}%", s));

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::text IS NULL OR username ILIKE $1 OR email ILIKE $1)
              AND ($2::text IS NULL OR $2 = ANY(roles))
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&search)
        .bind(&query.role)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(users.into_iter().map(Into::into).collect())
    }

    pub async fn verify_mentor(&self, user_id: Uuid) -> Result<UserResponse, AppError> {
        let user = self.fetch_user(user_id).await?;
        if !user.roles.contains(&UserRole::Mentor.as_str().to_string()) {
            return Err(AppError::Validation(
                "Only mentors can be verified".to_string(),
            ));
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_verified = TRUE, updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(user.into())
    }

    pub async fn add_role(&self, user_id: Uuid, role: &str) -> Result<UserResponse, AppError> {
        let role = UserRole::parse(role)
            .ok_or_else(|| AppError::Validation(format!("Unknown role: {}", role)))?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET roles = ARRAY(SELECT DISTINCT UNNEST(ARRAY_APPEND(roles, $2))),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(role.as_str())
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(user.into())
    }

    pub async fn remove_role(&self, user_id: Uuid, role: &str) -> Result<UserResponse, AppError> {
        let role = UserRole::parse(role)
            .ok_or_else(|| AppError::Validation(format!("Unknown role: {}", role)))?;

        let existing = self.fetch_user(user_id).await?;
        if existing.roles.len() == 1
            && existing.roles.contains(&role.as_str().to_string())
        {
            return Err(AppError::Validation(
                "Cannot remove a user's last role".to_string(),
            ));
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET roles = ARRAY_REMOVE(roles, $2), updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(role.as_str())
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(user.into())
    }

    // Helpers

    async fn fetch_user(&self, user_id: Uuid) -> Result<User, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn fetch_profile(&self, user_id: Uuid) -> Result<Profile, AppError> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
    }

    async fn invalidate_profile_cache(&self, user_id: Uuid) {
        let key = RedisKeys::profile_cache(&user_id.to_string());
        if let Err(e) = self.redis_service.cache_delete(&key).await {
            tracing::warn!("Failed to invalidate profile cache for {}: {}", user_id, e);
        }
    }
}

/// Self-service signup may pick mentee and/or mentor; admin is only ever
/// granted by another admin.
pub fn parse_signup_roles(raw: &[String]) -> Result<Vec<UserRole>, AppError> {
    if raw.is_empty() {
        return Err(AppError::Validation(
            "At least one role is required".to_string(),
        ));
    }

    let mut roles = Vec::new();
    for value in raw {
        let role = UserRole::parse(value)
            .ok_or_else(|| AppError::Validation(format!("Unknown role: {}", value)))?;
        if role == UserRole::Admin {
            return Err(AppError::Validation(
                "Cannot self-assign the admin role".to_string(),
            ));
        }
        if !roles.contains(&role) {
            roles.push(role);
        }
    }

    Ok(roles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_roles_accept_mentee_and_mentor() {
        let roles =
            parse_signup_roles(&["mentee".to_string(), "mentor".to_string()]).unwrap();
        assert_eq!(roles, vec![UserRole::Mentee, UserRole::Mentor]);
    }

    #[test]
    fn signup_roles_deduplicate() {
        let roles = parse_signup_roles(&["mentee".to_string(), "mentee".to_string()]).unwrap();
        assert_eq!(roles, vec![UserRole::Mentee]);
    }

    #[test]
    fn signup_rejects_admin_and_unknown_roles() {
        assert!(matches!(
            parse_signup_roles(&["admin".to_string()]),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            parse_signup_roles(&["wizard".to_string()]),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(parse_signup_roles(&[]), Err(AppError::Validation(_))));
    }
}
