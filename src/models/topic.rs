// src/models/topic.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'topics' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: i64,
    pub title: String,
    /// Sanitized HTML.
    pub description: String,
    /// Display order, ascending.
    pub position: i64,
    /// Stored file name of the uploaded presentation, if any.
    #[serde(skip)]
    pub presentation_file: Option<String>,
    /// Filled in by handlers from `presentation_file`.
    #[sqlx(skip)]
    #[serde(default)]
    pub presentation_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Topic as listed to students, with what it offers.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopicSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub position: i64,
    pub has_lab: bool,
    pub question_count: i64,
    #[serde(skip)]
    pub presentation_file: Option<String>,
    #[sqlx(skip)]
    pub presentation_url: Option<String>,
}

/// DTO for creating a topic.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTopicRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub description: String,
    #[serde(default)]
    pub position: i64,
}

/// DTO for updating a topic. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTopicRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 20000))]
    pub description: Option<String>,
    pub position: Option<i64>,
}
