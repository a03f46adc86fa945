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
use crate::services::{AppState, UserService};

// Health check
pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success(
        "User management service is healthy".to_string(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub search: Option<String>,
    pub role: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// Auth

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Validation error: {}", e)))?;

    let service = UserService::new(&state);
    let response = service.register(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Validation error: {}", e)))?;

    let service = UserService::new(&state);
    let response = service.login(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn logout(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let service = UserService::new(&state);
    service.logout(claims.user_id()?).await?;
    Ok(Json(ApiResponse::success("Logged out".to_string())))
}

pub async fn me(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let service = UserService::new(&state);
    let (user, profile) = service.current_user(claims.user_id()?).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "user": user,
        "profile": profile,
    }))))
}

// Profiles

pub async fn get_profile(
    State(state): State<AppState>,
    _claims: Claims,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProfileResponse>>, AppError> {
    let service = UserService::new(&state);
    let response = service.get_profile(user_id).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<ProfileResponse>>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Validation error: {}", e)))?;

    let service = UserService::new(&state);
    let response = service.update_profile(claims.user_id()?, request).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn upload_avatar(
    State(state): State<AppState>,
    claims: Claims,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ProfileResponse>>, AppError> {
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart payload: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .ok_or_else(|| AppError::Validation("File field has no filename".to_string()))?
                .to_string();
            let content_type = field
                .content_type()
                .ok_or_else(|| AppError::Validation("File field has no content type".to_string()))?
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?;
            file = Some((filename, content_type, bytes.to_vec()));
        }
    }

    let (filename, content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;

    let service = UserService::new(&state);
    let response = service
        .upload_avatar(claims.user_id()?, &filename, &content_type, &bytes)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

// Admin

pub async fn list_users(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, AppError> {
    require_role(&claims, UserRole::Admin)?;

    let service = UserService::new(&state);
    let response = service.list_users(&query).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn verify_mentor(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    require_role(&claims, UserRole::Admin)?;

    let service = UserService::new(&state);
    let response = service.verify_mentor(user_id).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn add_role(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<Uuid>,
    Json(request): Json<RoleChangeRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    require_role(&claims, UserRole::Admin)?;

    let service = UserService::new(&state);
    let response = service.add_role(user_id, &request.role).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn remove_role(
    State(state): State<AppState>,
    claims: Claims,
    Path((user_id, role)): Path<(Uuid, String)>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    require_role(&claims, UserRole::Admin)?;

    let service = UserService::new(&state);
    let response = service.remove_role(user_id, &role).await?;
    Ok(Json(ApiResponse::success(response)))
}
