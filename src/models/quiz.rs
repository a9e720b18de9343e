// src/models/quiz.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

/// Represents the 'quiz_questions' table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: i64,
    pub topic_id: i64,
    pub question_text: String,
    pub options: Json<Vec<String>>,
    /// Every listed option must be selected, and nothing else.
    pub correct_answers: Json<Vec<String>>,
    pub explanation: Option<String>,
    pub position: i64,
}

/// DTO for sending a question to students (no answers, no explanation).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub question_text: String,
    pub options: Vec<String>,
    /// Lets the client render checkboxes instead of radio buttons.
    pub multiple: bool,
}

impl From<QuizQuestion> for PublicQuestion {
    fn from(q: QuizQuestion) -> Self {
        Self {
            id: q.id,
            question_text: q.question_text,
            multiple: q.correct_answers.0.len() > 1,
            options: q.options.0,
        }
    }
}

/// DTO for creating a quiz question.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_answers_in_options))]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,
    #[validate(length(min = 2, max = 10), custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1))]
    pub correct_answers: Vec<String>,
    #[validate(length(max = 4000))]
    pub explanation: Option<String>,
    #[serde(default)]
    pub position: i64,
}

/// DTO for updating a quiz question. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question_text: Option<String>,
    #[validate(length(min = 2, max = 10), custom(function = validate_options))]
    pub options: Option<Vec<String>>,
    #[validate(length(min = 1))]
    pub correct_answers: Option<Vec<String>>,
    #[validate(length(max = 4000))]
    pub explanation: Option<String>,
    pub position: Option<i64>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    for opt in options {
        if opt.trim().is_empty() || opt.len() > 500 {
            return Err(validator::ValidationError::new("invalid_option"));
        }
    }
    Ok(())
}

fn validate_answers_in_options(
    req: &CreateQuestionRequest,
) -> Result<(), validator::ValidationError> {
    if answers_within_options(&req.correct_answers, &req.options) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("answer_not_in_options"))
    }
}

/// True when every correct answer is one of the options.
pub fn answers_within_options(answers: &[String], options: &[String]) -> bool {
    answers.iter().all(|a| options.contains(a))
}

/// Body of `POST /api/topics/{id}/quiz/submit`.
/// Keys are question ids; values are the selected options.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: Option<HashMap<i64, Vec<String>>>,
}

/// Represents the append-only 'quiz_attempts' table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub topic_id: i64,
    pub attempt_number: i64,
    pub answers: Json<HashMap<i64, Vec<String>>>,
    pub score: i64,
    pub correct_count: i64,
    pub total_questions: i64,
    pub attempted_at: chrono::DateTime<chrono::Utc>,
}

/// Correctness of one answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: i64,
    pub correct: bool,
    pub correct_answers: Vec<String>,
    pub explanation: Option<String>,
}

/// Response of a graded quiz submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmission {
    pub score: i64,
    pub correct_count: i64,
    pub total_questions: i64,
    pub attempt_number: i64,
    pub results: Vec<QuestionResult>,
}

/// Per-topic quiz summary for progress pages.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicQuizSummary {
    pub topic_id: i64,
    pub topic_title: String,
    pub attempts: i64,
    pub best_score: i64,
    pub latest_score: i64,
}
