use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use foundermentor_common::SessionStatus;
use foundermentor_database::Session;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ScheduleSessionRequest {
    pub mentee_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i64,

    #[validate(length(min = 1, max = 200))]
    pub topic: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RescheduleSessionRequest {
    pub start_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,

    #[validate(length(min = 1, max = 200))]
    pub topic: Option<String>,

    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

/// Manual state-machine actions; there is no time-driven progression.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionAction {
    Start,
    Complete,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionActionRequest {
    pub action: SessionAction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttachResourcesRequest {
    pub resource_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub mentor_id: Uuid,
    pub mentee_id: Uuid,
    pub topic: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SessionStatus,
    pub notes: Option<String>,
    pub resource_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionResponse {
    pub fn from_row(row: Session, status: SessionStatus, resource_ids: Vec<Uuid>) -> Self {
        Self {
            session_id: row.session_id,
            mentor_id: row.mentor_id,
            mentee_id: row.mentee_id,
            topic: row.topic,
            start_time: row.start_time,
            end_time: row.end_time,
            status,
            notes: row.notes,
            resource_ids,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
