use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use foundermentor_auth::{require_role, Claims};
use foundermentor_common::{ApiResponse, AppError, SessionStatus, UserRole};

use crate::models::*;
use crate::services::{AppState, SessionService};

// Health check
pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success("Sessions service is healthy".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl SessionQuery {
    fn page_bounds(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(50).clamp(1, 200);
        let offset = (self.page.unwrap_or(1).max(1) - 1) * limit;
        (limit, offset)
    }
}

fn parse_status_filter(query: &SessionQuery) -> Result<Option<SessionStatus>, AppError> {
    match query.status.as_deref() {
        Some(raw) => SessionStatus::parse(raw)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Unknown session status: {}", raw))),
        None => Ok(None),
    }
}

pub async fn schedule_session(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<ScheduleSessionRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Validation error: {}", e)))?;

    require_role(&claims, UserRole::Mentor)?;

    let service = SessionService::new(&state);
    let response = service.schedule_session(claims.user_id()?, request).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn get_session(
    State(state): State<AppState>,
    claims: Claims,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<SessionResponse>>, AppError> {
    let service = SessionService::new(&state);
    let response = service.get_session(session_id, claims.user_id()?).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn reschedule_session(
    State(state): State<AppState>,
    claims: Claims,
    Path(session_id): Path<Uuid>,
    Json(request): Json<RescheduleSessionRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Validation error: {}", e)))?;

    let service = SessionService::new(&state);
    let response = service
        .reschedule_session(session_id, claims.user_id()?, request)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn session_action(
    State(state): State<AppState>,
    claims: Claims,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SessionActionRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, AppError> {
    let service = SessionService::new(&state);
    let response = service
        .apply_action(session_id, claims.user_id()?, request.action)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn cancel_session(
    State(state): State<AppState>,
    claims: Claims,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<SessionResponse>>, AppError> {
    let service = SessionService::new(&state);
    let response = service.cancel_session(session_id, claims.user_id()?).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn attach_resources(
    State(state): State<AppState>,
    claims: Claims,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AttachResourcesRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, AppError> {
    let service = SessionService::new(&state);
    let response = service
        .attach_resources(session_id, claims.user_id()?, request.resource_ids)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn mentor_sessions(
    State(state): State<AppState>,
    claims: Claims,
    Path(mentor_id): Path<Uuid>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<ApiResponse<Vec<SessionResponse>>>, AppError> {
    if claims.user_id()? != mentor_id && !claims.has_role(UserRole::Admin) {
        return Err(AppError::Authorization(
            "Cannot view another mentor's sessions".to_string(),
        ));
    }

    let status = parse_status_filter(&query)?;
    let (limit, offset) = query.page_bounds();
    let service = SessionService::new(&state);
    let response = service.list_for_mentor(mentor_id, status, limit, offset).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn mentee_sessions(
    State(state): State<AppState>,
    claims: Claims,
    Path(mentee_id): Path<Uuid>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<ApiResponse<Vec<SessionResponse>>>, AppError> {
    if claims.user_id()? != mentee_id && !claims.has_role(UserRole::Admin) {
        return Err(AppError::Authorization(
            "Cannot view another mentee's sessions".to_string(),
        ));
    }

    let status = parse_status_filter(&query)?;
    let (limit, offset) = query.page_bounds();
    let service = SessionService::new(&state);
    let response = service.list_for_mentee(mentee_id, status, limit, offset).await?;
    Ok(Json(ApiResponse::success(response)))
}
