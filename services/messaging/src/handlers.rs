use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use foundermentor_auth::Claims;
use foundermentor_common::{ApiResponse, AppError};

use crate::models::*;
use crate::services::{AppState, MessagingService};

// Health check
pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success("Messaging service is healthy".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn send_message(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Validation error: {}", e)))?;

    let service = MessagingService::new(&state);
    let response = service.send_message(claims.user_id()?, request).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<ApiResponse<Vec<ConversationResponse>>>, AppError> {
    let service = MessagingService::new(&state);
    let response = service.list_conversations(claims.user_id()?).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn list_messages(
    State(state): State<AppState>,
    claims: Claims,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<MessageResponse>>>, AppError> {
    let service = MessagingService::new(&state);
    let response = service
        .list_messages(
            conversation_id,
            claims.user_id()?,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(50),
        )
        .await?;
    Ok(Json(ApiResponse::success(response)))
}
