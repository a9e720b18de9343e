// src/grading/mod.rs

//! Lab grading and progress engine.
//!
//! A lab submission is evaluated purely in memory, then recorded in one
//! transaction: an immutable attempt row plus the upserted progress row.

pub mod attempts;
pub mod evaluator;
pub mod leaderboard;
pub mod progress;
pub mod quiz;

use std::collections::HashMap;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    config::GradingSettings,
    error::is_unique_violation,
    models::{
        lab::LabExercise,
        quiz::{QuizQuestion, QuizSubmission},
    },
};

pub use evaluator::{CriterionResult, Evaluation, evaluate};

/// Attempts at a unit of work before an attempt-number conflict is surfaced.
const MAX_RECORD_TRIES: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum GradingError {
    #[error("lab has no validation criteria configured")]
    EmptyCriteria,

    #[error("attempt number was taken by a concurrent submission")]
    ConcurrentAttemptConflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl GradingError {
    /// Maps an attempt INSERT failure, singling out the attempt-number race.
    pub(crate) fn from_insert(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            GradingError::ConcurrentAttemptConflict
        } else {
            GradingError::Database(err)
        }
    }
}

/// `round(100 * part / total)` with halves rounded up, in integer arithmetic.
/// An empty total scores 0.
pub fn percentage(part: usize, total: usize) -> i64 {
    if total == 0 {
        return 0;
    }
    ((200 * part + total) / (2 * total)) as i64
}

/// Response of `POST /api/topics/{id}/lab/validate`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabSubmission {
    pub passed: bool,
    pub score: i64,
    pub results: Vec<CriterionResult>,
    pub attempt_number: i64,
}

/// Grades a lab submission and records it.
///
/// The attempt insert and the progress upsert share one transaction. If the
/// attempt number collides with a concurrent submission the transaction is
/// rolled back and the whole unit is retried once with a fresh count.
pub async fn submit_lab(
    pool: &SqlitePool,
    settings: GradingSettings,
    user_id: i64,
    lab: &LabExercise,
    code: &str,
) -> Result<LabSubmission, GradingError> {
    let evaluation = evaluate(code, &lab.validation_criteria, settings.pattern_matching)?;

    let mut tries = 0;
    loop {
        tries += 1;
        let mut tx = pool.begin().await?;

        let attempt_number = match attempts::record_lab_attempt(
            &mut tx,
            user_id,
            lab.id,
            evaluation.passed,
            evaluation.score,
            code,
        )
        .await
        {
            Ok(n) => n,
            Err(GradingError::ConcurrentAttemptConflict) if tries < MAX_RECORD_TRIES => {
                tracing::warn!(
                    "Attempt number conflict for user {} on lab {}, retrying",
                    user_id,
                    lab.id
                );
                tx.rollback().await?;
                continue;
            }
            Err(e) => return Err(e),
        };

        progress::upsert_progress(
            &mut tx,
            settings.progress_policy,
            user_id,
            lab.id,
            evaluation.passed,
            evaluation.score,
            code,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Lab attempt recorded: user={} lab={} attempt={} score={} passed={}",
            user_id,
            lab.id,
            attempt_number,
            evaluation.score,
            evaluation.passed
        );

        return Ok(LabSubmission {
            passed: evaluation.passed,
            score: evaluation.score,
            results: evaluation.results,
            attempt_number,
        });
    }
}

/// Grades a quiz submission against the topic's questions and records the attempt.
pub async fn submit_quiz(
    pool: &SqlitePool,
    user_id: i64,
    topic_id: i64,
    questions: &[QuizQuestion],
    answers: &HashMap<i64, Vec<String>>,
) -> Result<QuizSubmission, GradingError> {
    let grade = quiz::grade_quiz(questions, answers);

    let mut tries = 0;
    let attempt_number = loop {
        tries += 1;
        let mut conn = pool.acquire().await?;

        match attempts::record_quiz_attempt(
            &mut conn,
            user_id,
            topic_id,
            answers,
            grade.score,
            grade.correct_count,
            grade.total_questions,
        )
        .await
        {
            Ok(n) => break n,
            Err(GradingError::ConcurrentAttemptConflict) if tries < MAX_RECORD_TRIES => {
                tracing::warn!(
                    "Attempt number conflict for user {} on quiz {}, retrying",
                    user_id,
                    topic_id
                );
            }
            Err(e) => return Err(e),
        }
    };

    tracing::info!(
        "Quiz attempt recorded: user={} topic={} attempt={} score={}",
        user_id,
        topic_id,
        attempt_number,
        grade.score
    );

    Ok(QuizSubmission {
        score: grade.score,
        correct_count: grade.correct_count,
        total_questions: grade.total_questions,
        attempt_number,
        results: grade.results,
    })
}
