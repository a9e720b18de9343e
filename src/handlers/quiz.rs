// src/handlers/quiz.rs

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    grading::{self, attempts},
    models::quiz::{PublicQuestion, QuizQuestion, SubmitQuizRequest},
    utils::jwt::AuthUser,
};

use super::topics::fetch_topic;

pub(crate) const QUESTION_COLUMNS: &str =
    "id, topic_id, question_text, options, correct_answers, explanation, position";

/// All questions of a topic in display order.
pub(crate) async fn fetch_questions(
    pool: &SqlitePool,
    topic_id: i64,
) -> Result<Vec<QuizQuestion>, AppError> {
    sqlx::query_as::<_, QuizQuestion>(&format!(
        "SELECT {} FROM quiz_questions WHERE topic_id = ? ORDER BY position, id",
        QUESTION_COLUMNS
    ))
    .bind(topic_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch questions for topic {}: {:?}", topic_id, e);
        AppError::from(e)
    })
}

/// Returns the topic's quiz without answers.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Path(topic_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_topic(&pool, topic_id).await?;

    let questions: Vec<PublicQuestion> = fetch_questions(&pool, topic_id)
        .await?
        .into_iter()
        .map(PublicQuestion::from)
        .collect();

    Ok(Json(questions))
}

/// Submits quiz answers, scores them against every question of the topic
/// and records an attempt.
pub async fn submit_quiz(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
    Path(topic_id): Path<i64>,
    payload: Result<Json<SubmitQuizRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let answers = req
        .answers
        .ok_or(AppError::BadRequest("Field 'answers' is required".to_string()))?;

    fetch_topic(&pool, topic_id).await?;

    let questions = fetch_questions(&pool, topic_id).await?;
    if questions.is_empty() {
        return Err(AppError::NotFound(
            "No quiz questions for this topic".to_string(),
        ));
    }

    let submission = grading::submit_quiz(&pool, auth.id, topic_id, &questions, &answers).await?;

    Ok(Json(submission))
}

/// Lists the caller's attempts on this topic's quiz, newest first.
pub async fn list_quiz_attempts(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
    Path(topic_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_topic(&pool, topic_id).await?;
    let attempts = attempts::list_quiz_attempts(&pool, auth.id, Some(topic_id)).await?;

    Ok(Json(attempts))
}
