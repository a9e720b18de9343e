// src/handlers/lab.rs

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::AppError,
    grading::{self, attempts, progress},
    models::lab::{PublicLab, ValidateLabRequest},
    utils::jwt::AuthUser,
};

use super::topics::fetch_lab;

/// Returns the topic's lab as students see it, with the caller's progress.
pub async fn get_lab(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
    Path(topic_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let lab = fetch_lab(&pool, topic_id).await?;
    let progress = progress::get_progress(&pool, auth.id, lab.id).await?;

    Ok(Json(PublicLab::from_lab(lab, progress)))
}

/// Grades submitted code against the lab's criteria.
///
/// * Records an immutable attempt with the next attempt number.
/// * Upserts the caller's progress row for this lab.
pub async fn validate_lab(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    auth: AuthUser,
    Path(topic_id): Path<i64>,
    payload: Result<Json<ValidateLabRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let code = match req.code {
        Some(code) if !code.is_empty() => code,
        _ => return Err(AppError::BadRequest("Field 'code' is required".to_string())),
    };

    let lab = fetch_lab(&pool, topic_id).await?;

    let submission = grading::submit_lab(&pool, config.grading, auth.id, &lab, &code)
        .await
        .map_err(|e| {
            tracing::error!(
                "Lab validation failed for user {} on topic {}: {}",
                auth.id,
                topic_id,
                e
            );
            AppError::from(e)
        })?;

    Ok(Json(submission))
}

/// Lists the caller's attempts on this topic's lab, newest first.
pub async fn list_lab_attempts(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
    Path(topic_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let lab = fetch_lab(&pool, topic_id).await?;
    let attempts = attempts::list_lab_attempts(&pool, auth.id, lab.id).await?;

    Ok(Json(attempts))
}
