use axum::{
    extract::{Multipart, Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use foundermentor_auth::{require_role, Claims};
use foundermentor_common::{ApiResponse, AppError, UserRole};

use crate::models::*;
use crate::services::{AppState, ResourceService};

// Health check
pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success("Resources service is healthy".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct ResourceQuery {
    pub resource_type: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub include_drafts: Option<bool>,
}

pub async fn create_resource(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<CreateResourceRequest>,
) -> Result<Json<ApiResponse<ResourceResponse>>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Validation error: {}", e)))?;
    require_role(&claims, UserRole::Mentor)?;

    let service = ResourceService::new(&state);
    let response = service.create_resource(claims.user_id()?, request).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn upload_resource(
    State(state): State<AppState>,
    claims: Claims,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ResourceResponse>>, AppError> {
    require_role(&claims, UserRole::Mentor)?;

    let mut metadata = UploadMetadata::default();
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart payload: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .ok_or_else(|| AppError::Validation("File field has no filename".to_string()))?
                    .to_string();
                let content_type = field
                    .content_type()
                    .ok_or_else(|| {
                        AppError::Validation("File field has no content type".to_string())
                    })?
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?;
                file = Some((filename, content_type, bytes.to_vec()));
            }
            Some("title") => {
                metadata.title = Some(read_text_field(field).await?);
            }
            Some("category") => {
                metadata.category = Some(read_text_field(field).await?);
            }
            Some("tags") => {
                metadata.tags = read_text_field(field)
                    .await?
                    .split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
            }
            Some("is_draft") => {
                metadata.is_draft = read_text_field(field).await?.trim() == "true";
            }
            _ => {}
        }
    }

    let (filename, content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;

    let service = ResourceService::new(&state);
    let response = service
        .create_file_resource(claims.user_id()?, metadata, &filename, &content_type, &bytes)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart field: {}", e)))
}

pub async fn get_resource(
    State(state): State<AppState>,
    claims: Claims,
    Path(resource_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ResourceResponse>>, AppError> {
    let service = ResourceService::new(&state);
    let response = service.get_resource(resource_id, claims.user_id()?).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn list_resources(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<ResourceQuery>,
) -> Result<Json<ApiResponse<Vec<ResourceResponse>>>, AppError> {
    require_role(&claims, UserRole::Mentor)?;

    let service = ResourceService::new(&state);
    let response = service.list_owned(claims.user_id()?, &query).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn list_shared_resources(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<ResourceQuery>,
) -> Result<Json<ApiResponse<Vec<ResourceResponse>>>, AppError> {
    require_role(&claims, UserRole::Mentee)?;

    let service = ResourceService::new(&state);
    let response = service.list_shared(claims.user_id()?, &query).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn update_resource(
    State(state): State<AppState>,
    claims: Claims,
    Path(resource_id): Path<Uuid>,
    Json(request): Json<UpdateResourceRequest>,
) -> Result<Json<ApiResponse<ResourceResponse>>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Validation error: {}", e)))?;

    let service = ResourceService::new(&state);
    let response = service
        .update_resource(resource_id, claims.user_id()?, request)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn delete_resource(
    State(state): State<AppState>,
    claims: Claims,
    Path(resource_id): Path<Uuid>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let service = ResourceService::new(&state);
    service.delete_resource(resource_id, claims.user_id()?).await?;
    Ok(Json(ApiResponse::success("Resource deleted".to_string())))
}

pub async fn share_resource(
    State(state): State<AppState>,
    claims: Claims,
    Path(resource_id): Path<Uuid>,
    Json(request): Json<ShareResourceRequest>,
) -> Result<Json<ApiResponse<ShareResourceResponse>>, AppError> {
    let service = ResourceService::new(&state);
    let response = service
        .share_resource(resource_id, claims.user_id()?, request.mentee_ids)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}
