// src/grading/attempts.rs

//! Append-only attempt logs for labs and quizzes.
//!
//! Attempt numbers are `count + 1`, computed inside the INSERT so the read
//! and the write happen under one write lock. The UNIQUE constraint on
//! `(user, item, attempt_number)` is the backstop: a violation surfaces as
//! [`GradingError::ConcurrentAttemptConflict`] and the caller decides
//! whether to retry.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{SqliteConnection, SqliteExecutor, types::Json};

use crate::models::{lab::LabAttempt, quiz::QuizAttempt};

use super::GradingError;

/// Number of attempts already recorded for `(user_id, lab_id)`.
pub async fn lab_attempt_count<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: i64,
    lab_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM lab_attempts WHERE user_id = ? AND lab_id = ?")
        .bind(user_id)
        .bind(lab_id)
        .fetch_one(executor)
        .await
}

/// Appends a lab attempt and returns its attempt number.
pub async fn record_lab_attempt(
    conn: &mut SqliteConnection,
    user_id: i64,
    lab_id: i64,
    passed: bool,
    score: i64,
    submitted_code: &str,
) -> Result<i64, GradingError> {
    let attempt_number: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO lab_attempts
            (user_id, lab_id, attempt_number, passed, score, submitted_code, attempted_at)
        SELECT ?, ?, COUNT(*) + 1, ?, ?, ?, ?
        FROM lab_attempts
        WHERE user_id = ? AND lab_id = ?
        RETURNING attempt_number
        "#,
    )
    .bind(user_id)
    .bind(lab_id)
    .bind(passed)
    .bind(score)
    .bind(submitted_code)
    .bind(Utc::now())
    .bind(user_id)
    .bind(lab_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(GradingError::from_insert)?;

    Ok(attempt_number)
}

/// Appends a quiz attempt and returns its attempt number.
pub async fn record_quiz_attempt(
    conn: &mut SqliteConnection,
    user_id: i64,
    topic_id: i64,
    answers: &HashMap<i64, Vec<String>>,
    score: i64,
    correct_count: i64,
    total_questions: i64,
) -> Result<i64, GradingError> {
    let attempt_number: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quiz_attempts
            (user_id, topic_id, attempt_number, answers, score, correct_count, total_questions, attempted_at)
        SELECT ?, ?, COUNT(*) + 1, ?, ?, ?, ?, ?
        FROM quiz_attempts
        WHERE user_id = ? AND topic_id = ?
        RETURNING attempt_number
        "#,
    )
    .bind(user_id)
    .bind(topic_id)
    .bind(Json(answers))
    .bind(score)
    .bind(correct_count)
    .bind(total_questions)
    .bind(Utc::now())
    .bind(user_id)
    .bind(topic_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(GradingError::from_insert)?;

    Ok(attempt_number)
}

/// A user's lab attempts, newest first.
pub async fn list_lab_attempts<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: i64,
    lab_id: i64,
) -> Result<Vec<LabAttempt>, sqlx::Error> {
    sqlx::query_as::<_, LabAttempt>(
        r#"
        SELECT id, user_id, lab_id, attempt_number, passed, score, submitted_code, attempted_at
        FROM lab_attempts
        WHERE user_id = ? AND lab_id = ?
        ORDER BY attempt_number DESC
        "#,
    )
    .bind(user_id)
    .bind(lab_id)
    .fetch_all(executor)
    .await
}

/// A user's quiz attempts, newest first. `topic_id = None` lists every topic.
pub async fn list_quiz_attempts<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: i64,
    topic_id: Option<i64>,
) -> Result<Vec<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(
        r#"
        SELECT id, user_id, topic_id, attempt_number, answers, score,
               correct_count, total_questions, attempted_at
        FROM quiz_attempts
        WHERE user_id = ? AND (? IS NULL OR topic_id = ?)
        ORDER BY attempted_at DESC, attempt_number DESC
        "#,
    )
    .bind(user_id)
    .bind(topic_id)
    .bind(topic_id)
    .fetch_all(executor)
    .await
}
