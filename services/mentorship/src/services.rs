use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use foundermentor_auth::JwtService;
use foundermentor_common::{
    AppError, MentorshipStatus, RedisKeys, RedisService, RequestStatus, UserRole,
};
use foundermentor_database::{Mentorship, MentorshipRequest, Review, User};

use crate::config::AppConfig;
use crate::models::*;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub redis_service: RedisService,
    pub jwt_service: JwtService,
    pub config: AppConfig,
}

pub struct MentorshipService {
    db_pool: PgPool,
    redis_service: RedisService,
    config: AppConfig,
}

impl MentorshipService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
            redis_service: state.redis_service.clone(),
            config: state.config.clone(),
        }
    }

    // Request lifecycle

    pub async fn create_request(
        &self,
        mentee_id: Uuid,
        request: CreateRequestRequest,
    ) -> Result<RequestResponse, AppError> {
        if request.mentor_id == mentee_id {
            return Err(AppError::Validation(
                "Cannot request mentorship from yourself".to_string(),
            ));
        }

        let mentor = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(request.mentor_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Mentor not found".to_string()))?;

        if !mentor.roles.contains(&UserRole::Mentor.as_str().to_string()) {
            return Err(AppError::Validation(
                "Requested user is not a mentor".to_string(),
            ));
        }

        // The partial unique index on (mentor_id, mentee_id) WHERE
        // status = 'pending' is the authority on duplicates; a racing
        // second insert still comes back as a unique violation.
        let row = sqlx::query_as::<_, MentorshipRequest>(
            r#"
            INSERT INTO mentorship_requests (
                mentor_id, mentee_id, package_type, status, goals,
                background, expectations, availability, timezone
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(request.mentor_id)
        .bind(mentee_id)
        .bind(&request.package_type)
        .bind(RequestStatus::Pending.as_str())
        .bind(&request.goals)
        .bind(&request.background)
        .bind(&request.expectations)
        .bind(&request.availability)
        .bind(&request.timezone)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)
        .map_err(|err| {
            if err.is_unique_violation() {
                AppError::Conflict(
                    "A pending request to this mentor already exists".to_string(),
                )
            } else {
                err
            }
        })?;

        tracing::info!(
            "Mentorship request {} created: mentee {} -> mentor {}",
            row.request_id,
            mentee_id,
            request.mentor_id
        );

        Ok(RequestResponse::from_row(row, RequestStatus::Pending))
    }

    pub async fn get_request(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
        is_admin: bool,
    ) -> Result<RequestResponse, AppError> {
        let row = self.fetch_request(request_id).await?;

        if !is_admin && row.mentor_id != actor_id && row.mentee_id != actor_id {
            return Err(AppError::Authorization(
                "Only participants may view this request".to_string(),
            ));
        }

        let status = parse_status(&row.status)?;
        Ok(RequestResponse::from_row(row, status))
    }

    pub async fn list_requests(
        &self,
        actor_id: Uuid,
        status: Option<RequestStatus>,
    ) -> Result<Vec<RequestResponse>, AppError> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, MentorshipRequest>(
                    r#"
                    SELECT * FROM mentorship_requests
                    WHERE (mentor_id = $1 OR mentee_id = $1) AND status = $2
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(actor_id)
                .bind(status.as_str())
                .fetch_all(&self.db_pool)
                .await
            }
            None => {
                sqlx::query_as::<_, MentorshipRequest>(
                    r#"
                    SELECT * FROM mentorship_requests
                    WHERE mentor_id = $1 OR mentee_id = $1
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(actor_id)
                .fetch_all(&self.db_pool)
                .await
            }
        }
        .map_err(AppError::Database)?;

        rows.into_iter()
            .map(|row| {
                let status = parse_status(&row.status)?;
                Ok(RequestResponse::from_row(row, status))
            })
            .collect()
    }

    pub async fn accept_request(
        &self,
        request_id: Uuid,
        acting_mentor_id: Uuid,
    ) -> Result<RequestResponse, AppError> {
        let row = self.fetch_request(request_id).await?;

        if row.mentor_id != acting_mentor_id {
            return Err(AppError::Authorization(
                "Only the targeted mentor may accept this request".to_string(),
            ));
        }

        let current = parse_status(&row.status)?;
        if !current.can_transition_to(RequestStatus::Accepted) {
            return Err(AppError::Conflict(format!(
                "Cannot accept a request in '{}' state",
                current.as_str()
            )));
        }

        // Status change and relationship creation commit together.
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let updated = sqlx::query_as::<_, MentorshipRequest>(
            r#"
            UPDATE mentorship_requests
            SET status = $2, updated_at = NOW()
            WHERE request_id = $1 AND status = $3
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(RequestStatus::Accepted.as_str())
        .bind(RequestStatus::Pending.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| {
            AppError::Conflict("Request was modified concurrently".to_string())
        })?;

        sqlx::query(
            r#"
            INSERT INTO mentorships (request_id, mentor_id, mentee_id, status)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(request_id)
        .bind(updated.mentor_id)
        .bind(updated.mentee_id)
        .bind(MentorshipStatus::Active.as_str())
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Mentorship request {} accepted", request_id);

        Ok(RequestResponse::from_row(updated, RequestStatus::Accepted))
    }

    pub async fn reject_request(
        &self,
        request_id: Uuid,
        acting_mentor_id: Uuid,
        reason: Option<String>,
    ) -> Result<RequestResponse, AppError> {
        let row = self.fetch_request(request_id).await?;

        if row.mentor_id != acting_mentor_id {
            return Err(AppError::Authorization(
                "Only the targeted mentor may reject this request".to_string(),
            ));
        }

        let current = parse_status(&row.status)?;
        if !current.can_transition_to(RequestStatus::Rejected) {
            return Err(AppError::Conflict(format!(
                "Cannot reject a request in '{}' state",
                current.as_str()
            )));
        }

        let updated = sqlx::query_as::<_, MentorshipRequest>(
            r#"
            UPDATE mentorship_requests
            SET status = $2, rejection_reason = $3, updated_at = NOW()
            WHERE request_id = $1 AND status = $4
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(RequestStatus::Rejected.as_str())
        .bind(&reason)
        .bind(RequestStatus::Pending.as_str())
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| {
            AppError::Conflict("Request was modified concurrently".to_string())
        })?;

        tracing::info!("Mentorship request {} rejected", request_id);

        Ok(RequestResponse::from_row(updated, RequestStatus::Rejected))
    }

    pub async fn complete_request(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
    ) -> Result<RequestResponse, AppError> {
        let row = self.fetch_request(request_id).await?;

        if row.mentor_id != actor_id && row.mentee_id != actor_id {
            return Err(AppError::Authorization(
                "Only participants may complete this request".to_string(),
            ));
        }

        let current = parse_status(&row.status)?;
        if !current.can_transition_to(RequestStatus::Completed) {
            return Err(AppError::Conflict(format!(
                "Cannot complete a request in '{}' state",
                current.as_str()
            )));
        }

        let now = Utc::now();
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let updated = sqlx::query_as::<_, MentorshipRequest>(
            r#"
            UPDATE mentorship_requests
            SET status = $2, completed_at = $3, updated_at = NOW()
            WHERE request_id = $1 AND status = $4
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(RequestStatus::Completed.as_str())
        .bind(now)
        .bind(RequestStatus::Accepted.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| {
            AppError::Conflict("Request was modified concurrently".to_string())
        })?;

        sqlx::query(
            r#"
            UPDATE mentorships
            SET status = $2, ended_at = $3
            WHERE request_id = $1
            "#,
        )
        .bind(request_id)
        .bind(MentorshipStatus::Completed.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Mentorship request {} completed by {}", request_id, actor_id);

        Ok(RequestResponse::from_row(updated, RequestStatus::Completed))
    }

    // Mentorships

    pub async fn get_mentorship(
        &self,
        mentorship_id: Uuid,
        actor_id: Uuid,
        is_admin: bool,
    ) -> Result<MentorshipResponse, AppError> {
        let row = sqlx::query_as::<_, Mentorship>(
            "SELECT * FROM mentorships WHERE mentorship_id = $1",
        )
        .bind(mentorship_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Mentorship not found".to_string()))?;

        if !is_admin && row.mentor_id != actor_id && row.mentee_id != actor_id {
            return Err(AppError::Authorization(
                "Only participants may view this mentorship".to_string(),
            ));
        }

        mentorship_response(row)
    }

    pub async fn list_mentorships(&self, actor_id: Uuid) -> Result<Vec<MentorshipResponse>, AppError> {
        let rows = sqlx::query_as::<_, Mentorship>(
            r#"
            SELECT * FROM mentorships
            WHERE mentor_id = $1 OR mentee_id = $1
            ORDER BY started_at DESC
            "#,
        )
        .bind(actor_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        rows.into_iter().map(mentorship_response).collect()
    }

    pub async fn list_mentees(&self, mentor_id: Uuid) -> Result<Vec<MenteeSummary>, AppError> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, Uuid, chrono::DateTime<Utc>)>(
            r#"
            SELECT u.user_id, u.username, u.email, m.mentorship_id, m.started_at
            FROM mentorships m
            JOIN users u ON u.user_id = m.mentee_id
            WHERE m.mentor_id = $1 AND m.status = $2
            ORDER BY m.started_at DESC
            "#,
        )
        .bind(mentor_id)
        .bind(MentorshipStatus::Active.as_str())
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows
            .into_iter()
            .map(|(user_id, username, email, mentorship_id, since)| MenteeSummary {
                user_id,
                username,
                email,
                mentorship_id,
                since,
            })
            .collect())
    }

    // Reviews

    pub async fn create_review(
        &self,
        mentorship_id: Uuid,
        mentee_id: Uuid,
        request: CreateReviewRequest,
    ) -> Result<ReviewResponse, AppError> {
        let mentorship = sqlx::query_as::<_, Mentorship>(
            "SELECT * FROM mentorships WHERE mentorship_id = $1",
        )
        .bind(mentorship_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Mentorship not found".to_string()))?;

        if mentorship.mentee_id != mentee_id {
            return Err(AppError::Authorization(
                "Only the mentee of this mentorship may leave a review".to_string(),
            ));
        }

        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (mentorship_id, mentor_id, mentee_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(mentorship_id)
        .bind(mentorship.mentor_id)
        .bind(mentee_id)
        .bind(request.rating)
        .bind(&request.comment)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)
        .map_err(|err| {
            if err.is_unique_violation() {
                AppError::Conflict("You have already reviewed this mentorship".to_string())
            } else {
                err
            }
        })?;

        // Aggregate changed, drop the cached rating.
        self.redis_service
            .cache_delete(&RedisKeys::mentor_rating_cache(
                &mentorship.mentor_id.to_string(),
            ))
            .await?;

        tracing::info!(
            "Review {} created for mentorship {}",
            review.review_id,
            mentorship_id
        );

        Ok(review_response(review))
    }

    pub async fn mentor_reviews(&self, mentor_id: Uuid) -> Result<MentorReviewsResponse, AppError> {
        let cache_key = RedisKeys::mentor_rating_cache(&mentor_id.to_string());
        let cached_average: Option<Option<Decimal>> =
            self.redis_service.cache_get(&cache_key).await?;

        let average_rating = match cached_average {
            Some(avg) => avg,
            None => {
                let avg = sqlx::query_scalar::<_, Option<Decimal>>(
                    "SELECT AVG(rating)::numeric(3,2) FROM reviews WHERE mentor_id = $1",
                )
                .bind(mentor_id)
                .fetch_one(&self.db_pool)
                .await
                .map_err(AppError::Database)?;

                self.redis_service
                    .cache_set(&cache_key, &avg, self.config.rating_cache_seconds)
                    .await?;
                avg
            }
        };

        let rows = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE mentor_id = $1 ORDER BY created_at DESC",
        )
        .bind(mentor_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(MentorReviewsResponse {
            mentor_id,
            average_rating,
            total_reviews: rows.len() as i64,
            reviews: rows.into_iter().map(review_response).collect(),
        })
    }

    /// Mentor-maintained meeting cadence for an accepted request.
    pub async fn update_schedule(
        &self,
        request_id: Uuid,
        acting_mentor_id: Uuid,
        update: UpdateScheduleRequest,
    ) -> Result<RequestResponse, AppError> {
        let row = self.fetch_request(request_id).await?;

        if row.mentor_id != acting_mentor_id {
            return Err(AppError::Authorization(
                "Only the request's mentor may update its schedule".to_string(),
            ));
        }

        if parse_status(&row.status)? != RequestStatus::Accepted {
            return Err(AppError::Conflict(
                "Schedule can only be set on an accepted request".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, MentorshipRequest>(
            r#"
            UPDATE mentorship_requests
            SET start_date = COALESCE($2, start_date),
                end_date = COALESCE($3, end_date),
                meeting_frequency = COALESCE($4, meeting_frequency),
                next_meeting_date = COALESCE($5, next_meeting_date),
                updated_at = NOW()
            WHERE request_id = $1
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(update.start_date)
        .bind(update.end_date)
        .bind(&update.meeting_frequency)
        .bind(update.next_meeting_date)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(RequestResponse::from_row(row, RequestStatus::Accepted))
    }

    async fn fetch_request(&self, request_id: Uuid) -> Result<MentorshipRequest, AppError> {
        sqlx::query_as::<_, MentorshipRequest>(
            "SELECT * FROM mentorship_requests WHERE request_id = $1",
        )
        .bind(request_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Mentorship request not found".to_string()))
    }
}

fn parse_status(value: &str) -> Result<RequestStatus, AppError> {
    RequestStatus::parse(value)
        .ok_or_else(|| AppError::Internal(format!("Invalid request status in database: {}", value)))
}

fn mentorship_response(row: Mentorship) -> Result<MentorshipResponse, AppError> {
    let status = MentorshipStatus::parse(&row.status).ok_or_else(|| {
        AppError::Internal(format!("Invalid mentorship status in database: {}", row.status))
    })?;

    Ok(MentorshipResponse {
        mentorship_id: row.mentorship_id,
        request_id: row.request_id,
        mentor_id: row.mentor_id,
        mentee_id: row.mentee_id,
        status,
        started_at: row.started_at,
        ended_at: row.ended_at,
    })
}

fn review_response(row: Review) -> ReviewResponse {
    ReviewResponse {
        review_id: row.review_id,
        mentorship_id: row.mentorship_id,
        mentor_id: row.mentor_id,
        mentee_id: row.mentee_id,
        rating: row.rating,
        comment: row.comment,
        created_at: row.created_at,
    }
}
