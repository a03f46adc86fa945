use sqlx::PgPool;
use uuid::Uuid;

use foundermentor_auth::JwtService;
use foundermentor_common::{AppError, RedisService};
use foundermentor_database::{Conversation, Message};

use crate::config::AppConfig;
use crate::models::*;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub redis_service: RedisService,
    pub jwt_service: JwtService,
    pub config: AppConfig,
}

pub struct MessagingService {
    db_pool: PgPool,
    redis_service: RedisService,
    config: AppConfig,
}

impl MessagingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
            redis_service: state.redis_service.clone(),
            config: state.config.clone(),
        }
    }

    pub async fn send_message(
        &self,
        sender_id: Uuid,
        request: SendMessageRequest,
    ) -> Result<MessageResponse, AppError> {
        if request.recipient_id == sender_id {
            return Err(AppError::Validation(
                "Cannot message yourself".to_string(),
            ));
        }

        let recipient_exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM users WHERE user_id = $1")
                .bind(request.recipient_id)
                .fetch_optional(&self.db_pool)
                .await
                .map_err(AppError::Database)?;
        if recipient_exists.is_none() {
            return Err(AppError::NotFound("Recipient not found".to_string()));
        }

        let (participant_a, participant_b) = ordered_pair(sender_id, request.recipient_id);

        // One row per pair; a concurrent first message from either side
        // resolves to the same conversation.
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (participant_a, participant_b)
            VALUES ($1, $2)
            ON CONFLICT (participant_a, participant_b)
            DO UPDATE SET updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(participant_a)
        .bind(participant_b)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (conversation_id, sender_id, recipient_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(conversation.conversation_id)
        .bind(sender_id)
        .bind(request.recipient_id)
        .bind(&request.content)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.redis_service
            .incr_unread(
                &request.recipient_id.to_string(),
                &conversation.conversation_id.to_string(),
            )
            .await?;

        Ok(message.into())
    }

    pub async fn list_conversations(
        &self,
        caller_id: Uuid,
    ) -> Result<Vec<ConversationResponse>, AppError> {
        let conversations = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT * FROM conversations
            WHERE participant_a = $1 OR participant_b = $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(caller_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let mut responses = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let last_message = sqlx::query_as::<_, Message>(
                r#"
                SELECT * FROM messages
                WHERE conversation_id = $1
                ORDER BY created_at DESC
                LIMIT 1
                "#,
            )
            .bind(conversation.conversation_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?;

            let unread_count = self
                .redis_service
                .get_unread(
                    &caller_id.to_string(),
                    &conversation.conversation_id.to_string(),
                )
                .await?;

            let other_participant = if conversation.participant_a == caller_id {
                conversation.participant_b
            } else {
                conversation.participant_a
            };

            responses.push(ConversationResponse {
                conversation_id: conversation.conversation_id,
                other_participant,
                last_message: last_message.map(Into::into),
                unread_count,
                updated_at: conversation.updated_at,
            });
        }

        Ok(responses)
    }

    pub async fn list_messages(
        &self,
        conversation_id: Uuid,
        caller_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<Vec<MessageResponse>, AppError> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations WHERE conversation_id = $1",
        )
        .bind(conversation_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;

        if conversation.participant_a != caller_id && conversation.participant_b != caller_id {
            return Err(AppError::Authorization(
                "Not a participant in this conversation".to_string(),
            ));
        }

        let limit = limit.clamp(1, self.config.max_page_size);
        let offset = (page.max(1) - 1) * limit;

        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        // Reading the history marks the caller's side read.
        sqlx::query(
            r#"
            UPDATE messages
            SET read_at = NOW()
            WHERE conversation_id = $1 AND recipient_id = $2 AND read_at IS NULL
            "#,
        )
        .bind(conversation_id)
        .bind(caller_id)
        .execute(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.redis_service
            .reset_unread(&caller_id.to_string(), &conversation_id.to_string())
            .await?;

        Ok(messages.into_iter().map(Into::into).collect())
    }
}
