use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use foundermentor_auth::JwtService;
use foundermentor_common::{AppError, MentorshipStatus, RedisService, SessionStatus};
use foundermentor_database::Session;

use crate::config::AppConfig;
use crate::models::*;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub redis_service: RedisService,
    pub jwt_service: JwtService,
    pub config: AppConfig,
}

/// Validates a requested slot and computes its end time.
/// Start must lie in the future and the duration must be positive
/// (and below the configured ceiling).
pub fn validate_schedule(
    start_time: DateTime<Utc>,
    duration_minutes: i64,
    max_minutes: i64,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, AppError> {
    if duration_minutes <= 0 {
        return Err(AppError::Validation(
            "Session duration must be positive".to_string(),
        ));
    }

    if duration_minutes > max_minutes {
        return Err(AppError::Validation(format!(
            "Session duration exceeds the maximum of {} minutes",
            max_minutes
        )));
    }

    if start_time <= now {
        return Err(AppError::Validation(
            "Session start time must be in the future".to_string(),
        ));
    }

    Ok(start_time + Duration::minutes(duration_minutes))
}

pub struct SessionService {
    db_pool: PgPool,
    config: AppConfig,
}

impl SessionService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
            config: state.config.clone(),
        }
    }

    pub async fn schedule_session(
        &self,
        mentor_id: Uuid,
        request: ScheduleSessionRequest,
    ) -> Result<SessionResponse, AppError> {
        let end_time = validate_schedule(
            request.start_time,
            request.duration_minutes,
            self.config.max_session_minutes,
            Utc::now(),
        )?;

        // Sessions are only scheduled within an active mentorship.
        let has_mentorship = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM mentorships
                WHERE mentor_id = $1 AND mentee_id = $2 AND status = $3
            )
            "#,
        )
        .bind(mentor_id)
        .bind(request.mentee_id)
        .bind(MentorshipStatus::Active.as_str())
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if !has_mentorship {
            return Err(AppError::Validation(
                "No active mentorship with this mentee".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (mentor_id, mentee_id, topic, start_time, end_time, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(mentor_id)
        .bind(request.mentee_id)
        .bind(&request.topic)
        .bind(request.start_time)
        .bind(end_time)
        .bind(SessionStatus::Upcoming.as_str())
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        tracing::info!(
            "Session {} scheduled: mentor {} with mentee {} at {}",
            row.session_id,
            mentor_id,
            request.mentee_id,
            request.start_time
        );

        Ok(SessionResponse::from_row(row, SessionStatus::Upcoming, Vec::new()))
    }

    pub async fn get_session(
        &self,
        session_id: Uuid,
        actor_id: Uuid,
    ) -> Result<SessionResponse, AppError> {
        let row = self.fetch_session(session_id).await?;

        if row.mentor_id != actor_id && row.mentee_id != actor_id {
            return Err(AppError::Authorization(
                "Only participants may view this session".to_string(),
            ));
        }

        let status = parse_status(&row.status)?;
        let resource_ids = self.attached_resource_ids(session_id).await?;
        Ok(SessionResponse::from_row(row, status, resource_ids))
    }

    pub async fn reschedule_session(
        &self,
        session_id: Uuid,
        acting_mentor_id: Uuid,
        request: RescheduleSessionRequest,
    ) -> Result<SessionResponse, AppError> {
        let row = self.fetch_session(session_id).await?;

        if row.mentor_id != acting_mentor_id {
            return Err(AppError::Authorization(
                "Only the session's mentor may reschedule it".to_string(),
            ));
        }

        let current = parse_status(&row.status)?;
        if current != SessionStatus::Upcoming {
            return Err(AppError::Conflict(format!(
                "Cannot reschedule a session in '{}' state",
                current.as_str()
            )));
        }

        let (start_time, end_time) = match (request.start_time, request.duration_minutes) {
            (None, None) => (row.start_time, row.end_time),
            (start, duration) => {
                let start_time = start.unwrap_or(row.start_time);
                let duration_minutes = duration
                    .unwrap_or_else(|| (row.end_time - row.start_time).num_minutes());
                let end_time = validate_schedule(
                    start_time,
                    duration_minutes,
                    self.config.max_session_minutes,
                    Utc::now(),
                )?;
                (start_time, end_time)
            }
        };

        let updated = sqlx::query_as::<_, Session>(
            r#"
            UPDATE sessions
            SET topic = COALESCE($2, topic),
                notes = COALESCE($3, notes),
                start_time = $4,
                end_time = $5,
                updated_at = NOW()
            WHERE session_id = $1
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(&request.topic)
        .bind(&request.notes)
        .bind(start_time)
        .bind(end_time)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        tracing::info!("Session {} rescheduled", session_id);

        let resource_ids = self.attached_resource_ids(session_id).await?;
        Ok(SessionResponse::from_row(updated, SessionStatus::Upcoming, resource_ids))
    }

    pub async fn apply_action(
        &self,
        session_id: Uuid,
        actor_id: Uuid,
        action: SessionAction,
    ) -> Result<SessionResponse, AppError> {
        let row = self.fetch_session(session_id).await?;

        if row.mentor_id != actor_id && row.mentee_id != actor_id {
            return Err(AppError::Authorization(
                "Only participants may update this session".to_string(),
            ));
        }

        let current = parse_status(&row.status)?;
        let next = match action {
            SessionAction::Start => SessionStatus::InProgress,
            SessionAction::Complete => SessionStatus::Completed,
        };

        if !current.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Cannot move a session from '{}' to '{}'",
                current.as_str(),
                next.as_str()
            )));
        }

        let updated = self.set_status(session_id, current, next).await?;
        let resource_ids = self.attached_resource_ids(session_id).await?;
        Ok(SessionResponse::from_row(updated, next, resource_ids))
    }

    pub async fn cancel_session(
        &self,
        session_id: Uuid,
        acting_mentor_id: Uuid,
    ) -> Result<SessionResponse, AppError> {
        let row = self.fetch_session(session_id).await?;

        if row.mentor_id != acting_mentor_id {
            return Err(AppError::Authorization(
                "Only the session's mentor may cancel it".to_string(),
            ));
        }

        let current = parse_status(&row.status)?;
        if !current.can_transition_to(SessionStatus::Cancelled) {
            // Repeated cancels and cancels of finished sessions report a
            // conflict rather than failing deeper down.
            return Err(AppError::Conflict(format!(
                "Cannot cancel a session in '{}' state",
                current.as_str()
            )));
        }

        let updated = self
            .set_status(session_id, current, SessionStatus::Cancelled)
            .await?;

        tracing::info!("Session {} cancelled", session_id);

        let resource_ids = self.attached_resource_ids(session_id).await?;
        Ok(SessionResponse::from_row(updated, SessionStatus::Cancelled, resource_ids))
    }

    /// Replaces the session's attached-resource set. Every resource must
    /// belong to the session's mentor.
    pub async fn attach_resources(
        &self,
        session_id: Uuid,
        acting_mentor_id: Uuid,
        resource_ids: Vec<Uuid>,
    ) -> Result<SessionResponse, AppError> {
        let row = self.fetch_session(session_id).await?;

        if row.mentor_id != acting_mentor_id {
            return Err(AppError::Authorization(
                "Only the session's mentor may attach resources".to_string(),
            ));
        }

        if !resource_ids.is_empty() {
            let owned = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM resources WHERE resource_id = ANY($1) AND created_by = $2",
            )
            .bind(&resource_ids)
            .bind(acting_mentor_id)
            .fetch_one(&self.db_pool)
            .await
            .map_err(AppError::Database)?;

            if owned != resource_ids.len() as i64 {
                return Err(AppError::Authorization(
                    "All attached resources must belong to the session's mentor".to_string(),
                ));
            }
        }

        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        sqlx::query("DELETE FROM session_resources WHERE session_id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        sqlx::query(
            r#"
            INSERT INTO session_resources (session_id, resource_id)
            SELECT $1, resource_id FROM UNNEST($2::uuid[]) AS t(resource_id)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(session_id)
        .bind(&resource_ids)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            "Session {}: attached {} resources",
            session_id,
            resource_ids.len()
        );

        let status = parse_status(&row.status)?;
        let resource_ids = self.attached_resource_ids(session_id).await?;
        Ok(SessionResponse::from_row(row, status, resource_ids))
    }

    pub async fn list_for_mentor(
        &self,
        mentor_id: Uuid,
        status: Option<SessionStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SessionResponse>, AppError> {
        self.list_sessions("mentor_id", mentor_id, status, limit, offset)
            .await
    }

    pub async fn list_for_mentee(
        &self,
        mentee_id: Uuid,
        status: Option<SessionStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SessionResponse>, AppError> {
        self.list_sessions("mentee_id", mentee_id, status, limit, offset)
            .await
    }

    async fn list_sessions(
        &self,
        column: &str,
        user_id: Uuid,
        status: Option<SessionStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SessionResponse>, AppError> {
        // `column` is a fixed identifier chosen by the caller, never input.
        let rows = sqlx::query_as::<_, Session>(&format!(
            r#"
            SELECT * FROM sessions
            WHERE {} = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY start_time
            LIMIT $3 OFFSET $4
            "#,
            column
        ))
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let mut responses = Vec::with_capacity(rows.len());
        for row in rows {
            let status = parse_status(&row.status)?;
            let resource_ids = self.attached_resource_ids(row.session_id).await?;
            responses.push(SessionResponse::from_row(row, status, resource_ids));
        }

        Ok(responses)
    }

    async fn set_status(
        &self,
        session_id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
    ) -> Result<Session, AppError> {
        sqlx::query_as::<_, Session>(
            r#"
            UPDATE sessions
            SET status = $2, updated_at = NOW()
            WHERE session_id = $1 AND status = $3
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(to.as_str())
        .bind(from.as_str())
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::Conflict("Session was modified concurrently".to_string()))
    }

    async fn attached_resource_ids(&self, session_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT resource_id FROM session_resources WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    async fn fetch_session(&self, session_id: Uuid) -> Result<Session, AppError> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
    }
}

fn parse_status(value: &str) -> Result<SessionStatus, AppError> {
    SessionStatus::parse(value)
        .ok_or_else(|| AppError::Internal(format!("Invalid session status in database: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn schedule_computes_end_time_from_duration() {
        let now = base_now();
        let start = now + Duration::hours(24);
        let end = validate_schedule(start, 60, 480, now).unwrap();
        assert_eq!(end, start + Duration::minutes(60));
    }

    #[test]
    fn schedule_rejects_past_start() {
        let now = base_now();
        let yesterday = now - Duration::hours(24);
        let err = validate_schedule(yesterday, 60, 480, now).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn schedule_rejects_start_equal_to_now() {
        let now = base_now();
        assert!(validate_schedule(now, 60, 480, now).is_err());
    }

    #[test]
    fn schedule_rejects_non_positive_duration() {
        let now = base_now();
        let start = now + Duration::hours(1);
        assert!(matches!(
            validate_schedule(start, 0, 480, now),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_schedule(start, -30, 480, now),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn schedule_rejects_duration_over_ceiling() {
        let now = base_now();
        let start = now + Duration::hours(1);
        assert!(validate_schedule(start, 481, 480, now).is_err());
        assert!(validate_schedule(start, 480, 480, now).is_ok());
    }
}
