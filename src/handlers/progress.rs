// src/handlers/progress.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    grading::{leaderboard, progress},
    models::{lab::TopicLabProgress, quiz::TopicQuizSummary},
    utils::jwt::AuthUser,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOverview {
    pub labs: Vec<TopicLabProgress>,
    pub quizzes: Vec<TopicQuizSummary>,
}

/// Per-topic quiz summary: attempt count, best score and latest score.
pub(crate) async fn quiz_summaries(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<TopicQuizSummary>, sqlx::Error> {
    sqlx::query_as::<_, TopicQuizSummary>(
        r#"
        SELECT
            t.id AS topic_id,
            t.title AS topic_title,
            COUNT(*) AS attempts,
            MAX(qa.score) AS best_score,
            (SELECT latest.score FROM quiz_attempts latest
             WHERE latest.user_id = qa.user_id AND latest.topic_id = qa.topic_id
             ORDER BY latest.attempt_number DESC LIMIT 1) AS latest_score
        FROM quiz_attempts qa
        JOIN topics t ON t.id = qa.topic_id
        WHERE qa.user_id = ?
        GROUP BY t.id, t.title, qa.user_id, qa.topic_id
        ORDER BY t.position, t.id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// The caller's lab progress and quiz summaries.
pub async fn my_progress(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let labs = progress::list_progress_for_user(&pool, auth.id).await?;
    let quizzes = quiz_summaries(&pool, auth.id).await?;

    Ok(Json(ProgressOverview { labs, quizzes }))
}

/// Ranks all students. Recomputed on every request.
pub async fn get_leaderboard(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let standings = leaderboard::load_standings(&pool).await.map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(leaderboard::compute_leaderboard(standings)))
}
