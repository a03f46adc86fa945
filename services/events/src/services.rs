use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use foundermentor_auth::JwtService;
use foundermentor_common::{AppError, RedisService};
use foundermentor_database::{Event, EventRegistration};

use crate::config::AppConfig;
use crate::models::*;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub redis_service: RedisService,
    pub jwt_service: JwtService,
    pub config: AppConfig,
}

pub struct EventService {
    db_pool: PgPool,
}

impl EventService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
        }
    }

    pub async fn create_event(
        &self,
        creator_id: Uuid,
        request: CreateEventRequest,
    ) -> Result<EventResponse, AppError> {
        if request.ends_at <= request.starts_at {
            return Err(AppError::Validation(
                "Event end must be after its start".to_string(),
            ));
        }
        if request.starts_at <= Utc::now() {
            return Err(AppError::Validation(
                "Event start must be in the future".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (
                created_by, title, description, location, starts_at, ends_at, capacity
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(creator_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.location)
        .bind(request.starts_at)
        .bind(request.ends_at)
        .bind(request.capacity)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(EventResponse::from_row(row, 0))
    }

    pub async fn update_event(
        &self,
        event_id: Uuid,
        caller_id: Uuid,
        is_admin: bool,
        request: UpdateEventRequest,
    ) -> Result<EventResponse, AppError> {
        let existing = self.fetch_event(event_id).await?;
        if existing.created_by != caller_id && !is_admin {
            return Err(AppError::Authorization(
                "Only the event creator may update it".to_string(),
            ));
        }

        let starts_at = request.starts_at.unwrap_or(existing.starts_at);
        let ends_at = request.ends_at.unwrap_or(existing.ends_at);
        if ends_at <= starts_at {
            return Err(AppError::Validation(
                "Event end must be after its start".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                location = COALESCE($4, location),
                starts_at = $5,
                ends_at = $6,
                capacity = COALESCE($7, capacity),
                updated_at = NOW()
            WHERE event_id = $1
            RETURNING *
            "#,
        )
        .bind(event_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.location)
        .bind(starts_at)
        .bind(ends_at)
        .bind(request.capacity)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let count = self.registration_count(event_id).await?;
        Ok(EventResponse::from_row(row, count))
    }

    pub async fn get_event(&self, event_id: Uuid) -> Result<EventResponse, AppError> {
        let row = self.fetch_event(event_id).await?;
        let count = self.registration_count(event_id).await?;
        Ok(EventResponse::from_row(row, count))
    }

    pub async fn list_upcoming(&self) -> Result<Vec<EventResponse>, AppError> {
        let rows: Vec<(Event, i64)> = sqlx::query_as::<_, Event>(
            r#"
            SELECT * FROM events
            WHERE starts_at > NOW()
            ORDER BY starts_at ASC
            "#,
        )
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .into_iter()
        .map(|e| (e, 0))
        .collect();

        let event_ids: Vec<Uuid> = rows.iter().map(|(e, _)| e.event_id).collect();
        let counts: Vec<(Uuid, i64)> = sqlx::query_as(
            r#"
            SELECT event_id, COUNT(*) FROM event_registrations
            WHERE event_id = ANY($1)
            GROUP BY event_id
            "#,
        )
        .bind(&event_ids)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows
            .into_iter()
            .map(|(event, _)| {
                let count = counts
                    .iter()
                    .find(|(id, _)| *id == event.event_id)
                    .map(|(_, c)| *c)
                    .unwrap_or(0);
                EventResponse::from_row(event, count)
            })
            .collect())
    }

    pub async fn register(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<RegistrationResponse, AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        // Row lock serializes concurrent registrations against the
        // capacity check.
        let event = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE event_id = $1 FOR UPDATE",
        )
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        if event.starts_at <= Utc::now() {
            return Err(AppError::Validation(
                "Cannot register for a past event".to_string(),
            ));
        }

        if let Some(capacity) = event.capacity {
            let (count,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM event_registrations WHERE event_id = $1")
                    .bind(event_id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(AppError::Database)?;
            if count >= capacity as i64 {
                return Err(AppError::Conflict("Event is full".to_string()));
            }
        }

        let registration = sqlx::query_as::<_, EventRegistration>(
            r#"
            INSERT INTO event_registrations (event_id, user_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)
        .map_err(|err| {
            if err.is_unique_violation() {
                AppError::Conflict("Already registered for this event".to_string())
            } else {
                err
            }
        })?;

        tx.commit().await.map_err(AppError::Database)?;

        Ok(registration.into())
    }

    pub async fn unregister(&self, event_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM event_registrations WHERE event_id = $1 AND user_id = $2",
        )
        .bind(event_id)
        .bind(user_id)
        .execute(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(
                "Registration not found".to_string(),
            ));
        }

        Ok(())
    }

    pub async fn list_registrations(
        &self,
        event_id: Uuid,
        caller_id: Uuid,
        is_admin: bool,
    ) -> Result<Vec<RegistrationResponse>, AppError> {
        let event = self.fetch_event(event_id).await?;
        if event.created_by != caller_id && !is_admin {
            return Err(AppError::Authorization(
                "Only the event creator may list registrations".to_string(),
            ));
        }

        let rows = sqlx::query_as::<_, EventRegistration>(
            r#"
            SELECT * FROM event_registrations
            WHERE event_id = $1
            ORDER BY registered_at ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn fetch_event(&self, event_id: Uuid) -> Result<Event, AppError> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE event_id = $1")
            .bind(event_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    async fn registration_count(&self, event_id: Uuid) -> Result<i64, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM event_registrations WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&self.db_pool)
                .await
                .map_err(AppError::Database)?;
        Ok(count)
    }
}
