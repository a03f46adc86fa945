use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use foundermentor_common::{MentorshipStatus, RequestStatus};
use foundermentor_database::MentorshipRequest;

// Request/Response DTOs

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateRequestRequest {
    pub mentor_id: Uuid,

    #[validate(length(min = 1, max = 50))]
    pub package_type: String,

    #[validate(length(max = 2000))]
    pub goals: Option<String>,

    #[validate(length(max = 2000))]
    pub background: Option<String>,

    #[validate(length(max = 2000))]
    pub expectations: Option<String>,

    pub availability: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RejectRequestBody {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateScheduleRequest {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub meeting_frequency: Option<String>,
    pub next_meeting_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestResponse {
    pub request_id: Uuid,
    pub mentor_id: Uuid,
    pub mentee_id: Uuid,
    pub package_type: String,
    pub status: RequestStatus,
    pub goals: Option<String>,
    pub background: Option<String>,
    pub expectations: Option<String>,
    pub availability: Option<String>,
    pub timezone: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub meeting_frequency: Option<String>,
    pub next_meeting_date: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RequestResponse {
    pub fn from_row(row: MentorshipRequest, status: RequestStatus) -> Self {
        Self {
            request_id: row.request_id,
            mentor_id: row.mentor_id,
            mentee_id: row.mentee_id,
            package_type: row.package_type,
            status,
            goals: row.goals,
            background: row.background,
            expectations: row.expectations,
            availability: row.availability,
            timezone: row.timezone,
            start_date: row.start_date,
            end_date: row.end_date,
            meeting_frequency: row.meeting_frequency,
            next_meeting_date: row.next_meeting_date,
            rejection_reason: row.rejection_reason,
            completed_at: row.completed_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MentorshipResponse {
    pub mentorship_id: Uuid,
    pub request_id: Uuid,
    pub mentor_id: Uuid,
    pub mentee_id: Uuid,
    pub status: MentorshipStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MenteeSummary {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub mentorship_id: Uuid,
    pub since: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,

    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub review_id: Uuid,
    pub mentorship_id: Uuid,
    pub mentor_id: Uuid,
    pub mentee_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MentorReviewsResponse {
    pub mentor_id: Uuid,
    pub average_rating: Option<Decimal>,
    pub total_reviews: i64,
    pub reviews: Vec<ReviewResponse>,
}
