use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use foundermentor_common::ResourceType;
use foundermentor_database::Resource;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateResourceRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    pub resource_type: String,

    #[validate(length(max = 50000))]
    pub content: Option<String>,

    #[validate(url)]
    pub file_url: Option<String>,

    #[validate(length(max = 100))]
    pub category: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub is_draft: bool,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateResourceRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 50000))]
    pub content: Option<String>,

    #[validate(length(max = 100))]
    pub category: Option<String>,

    pub tags: Option<Vec<String>>,
    pub is_draft: Option<bool>,
    pub is_featured: Option<bool>,
}

/// Metadata fields accompanying a multipart file upload.
#[derive(Debug, Default)]
pub struct UploadMetadata {
    pub title: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub is_draft: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShareResourceRequest {
    pub mentee_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShareResourceResponse {
    pub resource_id: Uuid,
    pub shared_with: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceResponse {
    pub resource_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub resource_type: ResourceType,
    pub content: Option<String>,
    pub file_url: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub is_draft: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceResponse {
    pub fn from_row(row: Resource, resource_type: ResourceType) -> Self {
        Self {
            resource_id: row.resource_id,
            created_by: row.created_by,
            title: row.title,
            resource_type,
            content: row.content,
            file_url: row.file_url,
            category: row.category,
            tags: row.tags,
            is_draft: row.is_draft,
            is_featured: row.is_featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
