// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use validator::Validate;

use crate::{
    error::AppError,
    grading::{attempts, progress},
    models::user::{AdminCreateUserRequest, User},
    utils::jwt::AuthUser,
};

use super::{auth::insert_user, progress::quiz_summaries};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT id, username, password, role, created_at FROM users ORDER BY id DESC",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(users))
}

/// Creates a new user with a specific role.
/// Admin only.
pub async fn create_user(
    State(pool): State<SqlitePool>,
    Json(payload): Json<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = insert_user(&pool, &payload.username, &payload.password, &payload.role).await?;
    tracing::info!("Admin created user {} with role {}", user.username, user.role);

    Ok((StatusCode::CREATED, Json(user)))
}

/// Deletes a user by ID together with their attempts and progress.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == auth.id {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!("User {} deleted by admin {}", id, auth.id);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgressDetail {
    pub user: User,
    pub labs: Vec<crate::models::lab::TopicLabProgress>,
    pub quizzes: Vec<crate::models::quiz::TopicQuizSummary>,
    pub quiz_attempts: Vec<crate::models::quiz::QuizAttempt>,
}

/// Shows one user's lab progress and quiz history.
/// Admin only.
pub async fn user_progress(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, password, role, created_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let labs = progress::list_progress_for_user(&pool, id).await?;
    let quizzes = quiz_summaries(&pool, id).await?;
    let quiz_attempts = attempts::list_quiz_attempts(&pool, id, None).await?;

    Ok(Json(UserProgressDetail {
        user,
        labs,
        quizzes,
        quiz_attempts,
    }))
}

/// Platform-wide counters for the admin dashboard.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub students: i64,
    pub topics: i64,
    pub labs: i64,
    pub lab_attempts: i64,
    pub quiz_attempts: i64,
    pub labs_completed: i64,
    /// Mean score over all progress rows; 0 when there are none.
    pub average_lab_score: f64,
}

/// Admin only.
pub async fn stats(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let stats = sqlx::query_as::<_, PlatformStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users WHERE role = 'student') AS students,
            (SELECT COUNT(*) FROM topics) AS topics,
            (SELECT COUNT(*) FROM lab_exercises) AS labs,
            (SELECT COUNT(*) FROM lab_attempts) AS lab_attempts,
            (SELECT COUNT(*) FROM quiz_attempts) AS quiz_attempts,
            (SELECT COUNT(*) FROM lab_progress WHERE completed = 1) AS labs_completed,
            COALESCE((SELECT AVG(score) FROM lab_progress), 0.0) AS average_lab_score
        "#,
    )
    .fetch_one(&pool)
    .await?;

    Ok(Json(stats))
}
