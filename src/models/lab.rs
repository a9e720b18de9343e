// src/models/lab.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

/// A single static check run against submitted lab code.
/// Stored as part of the lab's `validation_criteria` JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    /// Display name of the check.
    #[validate(length(min = 1, max = 200))]
    pub header: String,

    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,

    /// Text the submission must contain. `None` or empty means the check
    /// always passes.
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub expected_pattern: Option<String>,

    /// Informational only; every criterion weighs the same in the score.
    #[serde(default)]
    pub required: bool,
}

/// Per-file code, keyed by file name.
pub type CodeFiles = BTreeMap<String, String>;

/// Represents the 'lab_exercises' table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabExercise {
    pub id: i64,
    pub topic_id: i64,
    pub title: String,
    /// Sanitized HTML.
    pub instructions: String,
    pub vulnerable_code: Json<CodeFiles>,
    pub correct_code: Json<CodeFiles>,
    pub validation_criteria: Json<Vec<Criterion>>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Criterion as shown to students: no pattern.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicCriterion {
    pub header: String,
    pub description: String,
    pub required: bool,
}

/// Lab as shown to students: no reference solution, no patterns.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicLab {
    pub id: i64,
    pub topic_id: i64,
    pub title: String,
    pub instructions: String,
    pub vulnerable_code: CodeFiles,
    pub criteria: Vec<PublicCriterion>,
    pub progress: Option<LabProgress>,
}

impl PublicLab {
    pub fn from_lab(lab: LabExercise, progress: Option<LabProgress>) -> Self {
        let criteria = lab
            .validation_criteria
            .0
            .into_iter()
            .map(|c| PublicCriterion {
                header: c.header,
                description: c.description,
                required: c.required,
            })
            .collect();

        Self {
            id: lab.id,
            topic_id: lab.topic_id,
            title: lab.title,
            instructions: lab.instructions,
            vulnerable_code: lab.vulnerable_code.0,
            criteria,
            progress,
        }
    }
}

/// DTO for creating or replacing a topic's lab.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertLabRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub instructions: String,
    #[serde(default)]
    #[validate(custom(function = validate_code_files))]
    pub vulnerable_code: CodeFiles,
    #[serde(default)]
    #[validate(custom(function = validate_code_files))]
    pub correct_code: CodeFiles,
    #[validate(
        length(min = 1, message = "A lab needs at least one validation criterion"),
        nested
    )]
    pub validation_criteria: Vec<Criterion>,
}

/// Keeps stored code files within sane bounds.
fn validate_code_files(files: &CodeFiles) -> Result<(), validator::ValidationError> {
    if files.len() > 20 {
        return Err(validator::ValidationError::new("too_many_files"));
    }
    for (name, body) in files {
        if name.is_empty() || name.len() > 200 {
            return Err(validator::ValidationError::new("invalid_file_name"));
        }
        if body.len() > 100_000 {
            return Err(validator::ValidationError::new("file_too_large"));
        }
    }
    Ok(())
}

/// Body of `POST /api/topics/{id}/lab/validate`.
#[derive(Debug, Deserialize)]
pub struct ValidateLabRequest {
    pub code: Option<String>,
}

/// Represents the append-only 'lab_attempts' table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabAttempt {
    pub id: i64,
    pub user_id: i64,
    pub lab_id: i64,
    pub attempt_number: i64,
    pub passed: bool,
    pub score: i64,
    pub submitted_code: String,
    pub attempted_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'lab_progress' table: latest standing per (user, lab).
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabProgress {
    pub id: i64,
    pub user_id: i64,
    pub lab_id: i64,
    pub completed: bool,
    pub score: i64,
    pub submitted_code: String,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Lab progress joined with its topic, for progress pages.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicLabProgress {
    pub topic_id: i64,
    pub topic_title: String,
    pub lab_id: i64,
    pub completed: bool,
    pub score: i64,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
