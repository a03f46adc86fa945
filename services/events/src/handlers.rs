use axum::{
    extract::{Path, State},
    response::Json,
};
use uuid::Uuid;
use validator::Validate;

use foundermentor_auth::Claims;
use foundermentor_common::{ApiResponse, AppError, UserRole};

use crate::models::*;
use crate::services::{AppState, EventService};

// Health check
pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success("Events service is healthy".to_string()))
}

pub async fn create_event(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<CreateEventRequest>,
) -> Result<Json<ApiResponse<EventResponse>>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Validation error: {}", e)))?;

    if !claims.has_role(UserRole::Mentor) && !claims.has_role(UserRole::Admin) {
        return Err(AppError::Authorization(
            "Only mentors and admins may create events".to_string(),
        ));
    }

    let service = EventService::new(&state);
    let response = service.create_event(claims.user_id()?, request).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn update_event(
    State(state): State<AppState>,
    claims: Claims,
    Path(event_id): Path<Uuid>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<ApiResponse<EventResponse>>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Validation error: {}", e)))?;

    let service = EventService::new(&state);
    let response = service
        .update_event(
            event_id,
            claims.user_id()?,
            claims.has_role(UserRole::Admin),
            request,
        )
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn get_event(
    State(state): State<AppState>,
    _claims: Claims,
    Path(event_id): Path<Uuid>,
) -> Result<Json<ApiResponse<EventResponse>>, AppError> {
    let service = EventService::new(&state);
    let response = service.get_event(event_id).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn list_events(
    State(state): State<AppState>,
    _claims: Claims,
) -> Result<Json<ApiResponse<Vec<EventResponse>>>, AppError> {
    let service = EventService::new(&state);
    let response = service.list_upcoming().await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn register(
    State(state): State<AppState>,
    claims: Claims,
    Path(event_id): Path<Uuid>,
) -> Result<Json<ApiResponse<RegistrationResponse>>, AppError> {
    let service = EventService::new(&state);
    let response = service.register(event_id, claims.user_id()?).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn unregister(
    State(state): State<AppState>,
    claims: Claims,
    Path(event_id): Path<Uuid>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let service = EventService::new(&state);
    service.unregister(event_id, claims.user_id()?).await?;
    Ok(Json(ApiResponse::success("Registration removed".to_string())))
}

pub async fn list_registrations(
    State(state): State<AppState>,
    claims: Claims,
    Path(event_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<RegistrationResponse>>>, AppError> {
    let service = EventService::new(&state);
    let response = service
        .list_registrations(event_id, claims.user_id()?, claims.has_role(UserRole::Admin))
        .await?;
    Ok(Json(ApiResponse::success(response)))
}
