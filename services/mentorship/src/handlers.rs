use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use foundermentor_auth::{require_role, Claims};
use foundermentor_common::{ApiResponse, AppError, RequestStatus, UserRole};

use crate::models::*;
use crate::services::{AppState, MentorshipService};

// Health check
pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success("Mentorship service is healthy".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct RequestQuery {
    pub status: Option<String>,
}

pub async fn create_request(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<CreateRequestRequest>,
) -> Result<Json<ApiResponse<RequestResponse>>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Validation error: {}", e)))?;

    require_role(&claims, UserRole::Mentee)?;

    let service = MentorshipService::new(&state);
    let response = service.create_request(claims.user_id()?, request).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn get_request(
    State(state): State<AppState>,
    claims: Claims,
    Path(request_id): Path<Uuid>,
) -> Result<Json<ApiResponse<RequestResponse>>, AppError> {
    let service = MentorshipService::new(&state);
    let response = service
        .get_request(request_id, claims.user_id()?, claims.has_role(UserRole::Admin))
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn list_requests(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<RequestQuery>,
) -> Result<Json<ApiResponse<Vec<RequestResponse>>>, AppError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(RequestStatus::parse(raw).ok_or_else(|| {
            AppError::Validation(format!("Unknown request status: {}", raw))
        })?),
        None => None,
    };

    let service = MentorshipService::new(&state);
    let response = service.list_requests(claims.user_id()?, status).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn accept_request(
    State(state): State<AppState>,
    claims: Claims,
    Path(request_id): Path<Uuid>,
) -> Result<Json<ApiResponse<RequestResponse>>, AppError> {
    let service = MentorshipService::new(&state);
    let response = service.accept_request(request_id, claims.user_id()?).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn reject_request(
    State(state): State<AppState>,
    claims: Claims,
    Path(request_id): Path<Uuid>,
    body: Option<Json<RejectRequestBody>>,
) -> Result<Json<ApiResponse<RequestResponse>>, AppError> {
    let reason = body.and_then(|Json(b)| b.reason);

    let service = MentorshipService::new(&state);
    let response = service
        .reject_request(request_id, claims.user_id()?, reason)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn update_schedule(
    State(state): State<AppState>,
    claims: Claims,
    Path(request_id): Path<Uuid>,
    Json(request): Json<UpdateScheduleRequest>,
) -> Result<Json<ApiResponse<RequestResponse>>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Validation error: {}", e)))?;

    let service = MentorshipService::new(&state);
    let response = service
        .update_schedule(request_id, claims.user_id()?, request)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn complete_request(
    State(state): State<AppState>,
    claims: Claims,
    Path(request_id): Path<Uuid>,
) -> Result<Json<ApiResponse<RequestResponse>>, AppError> {
    let service = MentorshipService::new(&state);
    let response = service.complete_request(request_id, claims.user_id()?).await?;
    Ok(Json(ApiResponse::success(response)))
}

// Mentorships

pub async fn get_mentorship(
    State(state): State<AppState>,
    claims: Claims,
    Path(mentorship_id): Path<Uuid>,
) -> Result<Json<ApiResponse<MentorshipResponse>>, AppError> {
    let service = MentorshipService::new(&state);
    let response = service
        .get_mentorship(mentorship_id, claims.user_id()?, claims.has_role(UserRole::Admin))
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn list_mentorships(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<ApiResponse<Vec<MentorshipResponse>>>, AppError> {
    let service = MentorshipService::new(&state);
    let response = service.list_mentorships(claims.user_id()?).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn list_mentees(
    State(state): State<AppState>,
    claims: Claims,
    Path(mentor_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<MenteeSummary>>>, AppError> {
    // Mentors see their own roster; admins may inspect any.
    if claims.user_id()? != mentor_id && !claims.has_role(UserRole::Admin) {
        return Err(AppError::Authorization(
            "Cannot view another mentor's mentees".to_string(),
        ));
    }

    let service = MentorshipService::new(&state);
    let response = service.list_mentees(mentor_id).await?;
    Ok(Json(ApiResponse::success(response)))
}

// Reviews

pub async fn create_review(
    State(state): State<AppState>,
    claims: Claims,
    Path(mentorship_id): Path<Uuid>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<Json<ApiResponse<ReviewResponse>>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Validation error: {}", e)))?;

    let service = MentorshipService::new(&state);
    let response = service
        .create_review(mentorship_id, claims.user_id()?, request)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn mentor_reviews(
    State(state): State<AppState>,
    Path(mentor_id): Path<Uuid>,
) -> Result<Json<ApiResponse<MentorReviewsResponse>>, AppError> {
    let service = MentorshipService::new(&state);
    let response = service.mentor_reviews(mentor_id).await?;
    Ok(Json(ApiResponse::success(response)))
}
