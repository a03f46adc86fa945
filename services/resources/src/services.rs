use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use foundermentor_auth::JwtService;
use foundermentor_common::{uploads, AppError, RedisService, ResourceType, UserRole};
use foundermentor_database::Resource;

use crate::config::AppConfig;
use crate::handlers::ResourceQuery;
use crate::models::*;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub redis_service: RedisService,
    pub jwt_service: JwtService,
    pub config: AppConfig,
}

pub struct ResourceService {
    db_pool: PgPool,
    config: AppConfig,
}

impl ResourceService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
            config: state.config.clone(),
        }
    }

    pub async fn create_resource(
        &self,
        owner_id: Uuid,
        request: CreateResourceRequest,
    ) -> Result<ResourceResponse, AppError> {
        let resource_type = ResourceType::parse(&request.resource_type).ok_or_else(|| {
            AppError::Validation(format!("Unknown resource type: {}", request.resource_type))
        })?;

        if matches!(resource_type, ResourceType::File) {
            return Err(AppError::Validation(
                "File resources must be created through the upload endpoint".to_string(),
            ));
        }

        if matches!(resource_type, ResourceType::Link | ResourceType::Video)
            && request.file_url.is_none()
        {
            return Err(AppError::Validation(
                "Link and video resources require a URL".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, Resource>(
            r#"
            INSERT INTO resources (
                created_by, title, resource_type, content, file_url,
                category, tags, is_draft
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(&request.title)
        .bind(resource_type.as_str())
        .bind(&request.content)
        .bind(&request.file_url)
        .bind(&request.category)
        .bind(&request.tags)
        .bind(request.is_draft)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.resource_response(row)
    }

    pub async fn create_file_resource(
        &self,
        owner_id: Uuid,
        metadata: UploadMetadata,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<ResourceResponse, AppError> {
        let extension =
            uploads::validate_upload(filename, content_type, bytes.len() as u64, &self.config.upload)?;

        let title = metadata
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| filename.to_string());

        let stored = uploads::stored_filename(
            "resource",
            owner_id,
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

        let row = sqlx::query_as::<_, Resource>(
            r#"
            INSERT INTO resources (
                created_by, title, resource_type, file_url, category, tags, is_draft
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(&title)
        .bind(ResourceType::File.as_str())
        .bind(&path)
        .bind(&metadata.category)
        .bind(&metadata.tags)
        .bind(metadata.is_draft)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.resource_response(row)
    }

    pub async fn get_resource(
        &self,
        resource_id: Uuid,
        caller_id: Uuid,
    ) -> Result<ResourceResponse, AppError> {
        let row = self.fetch_resource(resource_id).await?;

        if row.created_by != caller_id {
            let shared: Option<(Uuid,)> = sqlx::query_as(
                "SELECT resource_id FROM resource_shares WHERE resource_id = $1 AND user_id = $2",
            )
            .bind(resource_id)
            .bind(caller_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?;

            if shared.is_none() || row.is_draft {
                return Err(AppError::Authorization(
                    "Resource is not shared with you".to_string(),
                ));
            }
        }

        self.resource_response(row)
    }

    pub async fn list_owned(
        &self,
        owner_id: Uuid,
        query: &ResourceQuery,
    ) -> Result<Vec<ResourceResponse>, AppError> {
        let rows = sqlx::query_as::<_, Resource>(
            r#"
            SELECT * FROM resources
            WHERE created_by = $1
              AND ($2::text IS NULL OR resource_type = $2)
              AND ($3::text IS NULL OR category = $3)
              AND ($4::text IS NULL OR $4 = ANY(tags))
              AND ($5::bool OR is_draft = FALSE)
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .bind(&query.resource_type)
        .bind(&query.category)
        .bind(&query.tag)
        .bind(query.include_drafts.unwrap_or(true))
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        rows.into_iter().map(|r| self.resource_response(r)).collect()
    }

    pub async fn list_shared(
        &self,
        mentee_id: Uuid,
        query: &ResourceQuery,
    ) -> Result<Vec<ResourceResponse>, AppError> {
        let rows = sqlx::query_as::<_, Resource>(
            r#"
            SELECT r.* FROM resources r
            INNER JOIN resource_shares s ON s.resource_id = r.resource_id
            WHERE s.user_id = $1
              AND r.is_draft = FALSE
              AND ($2::text IS NULL OR r.resource_type = $2)
              AND ($3::text IS NULL OR r.category = $3)
              AND ($4::text IS NULL OR $4 = ANY(r.tags))
            ORDER BY s.shared_at DESC
            "#,
        )
        .bind(mentee_id)
        .bind(&query.resource_type)
        .bind(&query.category)
        .bind(&query.tag)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        rows.into_iter().map(|r| self.resource_response(r)).collect()
    }

    pub async fn update_resource(
        &self,
        resource_id: Uuid,
        owner_id: Uuid,
        request: UpdateResourceRequest,
    ) -> Result<ResourceResponse, AppError> {
        let existing = self.fetch_resource(resource_id).await?;
        if existing.created_by != owner_id {
            return Err(AppError::Authorization(
                "Only the owner may update a resource".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, Resource>(
            r#"
            UPDATE resources
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                category = COALESCE($4, category),
                tags = COALESCE($5, tags),
                is_draft = COALESCE($6, is_draft),
                is_featured = COALESCE($7, is_featured),
                updated_at = NOW()
            WHERE resource_id = $1
            RETURNING *
            "#,
        )
        .bind(resource_id)
        .bind(&request.title)
        .bind(&request.content)
        .bind(&request.category)
        .bind(&request.tags)
        .bind(request.is_draft)
        .bind(request.is_featured)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.resource_response(row)
    }

    pub async fn delete_resource(&self, resource_id: Uuid, owner_id: Uuid) -> Result<(), AppError> {
        let existing = self.fetch_resource(resource_id).await?;
        if existing.created_by != owner_id {
            return Err(AppError::Authorization(
                "Only the owner may delete a resource".to_string(),
            ));
        }

        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        sqlx::query("DELETE FROM session_resources WHERE resource_id = $1")
            .bind(resource_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;
        sqlx::query("DELETE FROM resource_shares WHERE resource_id = $1")
            .bind(resource_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;
        sqlx::query("DELETE FROM resources WHERE resource_id = $1")
            .bind(resource_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;

        // Stored files are cleaned up best-effort after the commit.
        if existing.resource_type == ResourceType::File.as_str() {
            if let Some(path) = &existing.file_url {
                if path.starts_with(&self.config.upload.upload_dir) {
                    if let Err(e) = tokio::fs::remove_file(path).await {
                        tracing::warn!("Failed to remove stored file {}: {}", path, e);
                    }
                }
            }
        }

        Ok(())
    }

    pub async fn share_resource(
        &self,
        resource_id: Uuid,
        owner_id: Uuid,
        mentee_ids: Vec<Uuid>,
    ) -> Result<ShareResourceResponse, AppError> {
        if mentee_ids.is_empty() {
            return Err(AppError::Validation(
                "At least one mentee is required".to_string(),
            ));
        }

        let existing = self.fetch_resource(resource_id).await?;
        if existing.created_by != owner_id {
            return Err(AppError::Authorization(
                "Only the owner may share a resource".to_string(),
            ));
        }

        let (mentee_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE user_id = ANY($1) AND $2 = ANY(roles)",
        )
        .bind(&mentee_ids)
        .bind(UserRole::Mentee.as_str())
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if mentee_count != mentee_ids.len() as i64 {
            return Err(AppError::Validation(
                "All recipients must be registered mentees".to_string(),
            ));
        }

        // Re-sharing with an already shared mentee is a no-op.
        sqlx::query(
            r#"
            INSERT INTO resource_shares (resource_id, user_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(resource_id)
        .bind(&mentee_ids)
        .execute(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let shared_with: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM resource_shares WHERE resource_id = $1 ORDER BY shared_at",
        )
        .bind(resource_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(ShareResourceResponse {
            resource_id,
            shared_with: shared_with.into_iter().map(|(id,)| id).collect(),
        })
    }

    async fn fetch_resource(&self, resource_id: Uuid) -> Result<Resource, AppError> {
        sqlx::query_as::<_, Resource>("SELECT * FROM resources WHERE resource_id = $1")
            .bind(resource_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))
    }

    fn resource_response(&self, row: Resource) -> Result<ResourceResponse, AppError> {
        let resource_type = ResourceType::parse(&row.resource_type).ok_or_else(|| {
            AppError::Internal(format!("Invalid resource type in storage: {}", row.resource_type))
        })?;
        Ok(ResourceResponse::from_row(row, resource_type))
    }
}
