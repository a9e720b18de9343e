// src/handlers/topics.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        lab::LabExercise,
        topic::{Topic, TopicSummary},
    },
    storage::FileStorage,
};

pub(crate) const TOPIC_COLUMNS: &str =
    "id, title, description, position, presentation_file, created_at, updated_at";

pub(crate) const LAB_COLUMNS: &str = "id, topic_id, title, instructions, vulnerable_code, \
     correct_code, validation_criteria, updated_at";

/// Loads a topic or fails with 404.
pub(crate) async fn fetch_topic(pool: &SqlitePool, topic_id: i64) -> Result<Topic, AppError> {
    sqlx::query_as::<_, Topic>(&format!("SELECT {} FROM topics WHERE id = ?", TOPIC_COLUMNS))
        .bind(topic_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Topic not found".to_string()))
}

/// Loads the lab of an existing topic, failing with 404 if either is missing.
pub(crate) async fn fetch_lab(pool: &SqlitePool, topic_id: i64) -> Result<LabExercise, AppError> {
    fetch_topic(pool, topic_id).await?;

    sqlx::query_as::<_, LabExercise>(&format!(
        "SELECT {} FROM lab_exercises WHERE topic_id = ?",
        LAB_COLUMNS
    ))
    .bind(topic_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Lab not found for this topic".to_string()))
}

pub(crate) fn with_presentation_url(mut topic: Topic, storage: &dyn FileStorage) -> Topic {
    topic.presentation_url = topic
        .presentation_file
        .as_deref()
        .map(|f| storage.public_url(f));
    topic
}

/// Lists all topics in display order.
pub async fn list_topics(
    State(pool): State<SqlitePool>,
    State(storage): State<Arc<dyn FileStorage>>,
) -> Result<impl IntoResponse, AppError> {
    let mut topics = sqlx::query_as::<_, TopicSummary>(
        r#"
        SELECT
            t.id, t.title, t.description, t.position, t.presentation_file,
            EXISTS (SELECT 1 FROM lab_exercises l WHERE l.topic_id = t.id) AS has_lab,
            (SELECT COUNT(*) FROM quiz_questions q WHERE q.topic_id = t.id) AS question_count
        FROM topics t
        ORDER BY t.position, t.id
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list topics: {:?}", e);
        AppError::from(e)
    })?;

    for topic in &mut topics {
        topic.presentation_url = topic
            .presentation_file
            .as_deref()
            .map(|f| storage.public_url(f));
    }

    Ok(Json(topics))
}

/// Retrieves a single topic by ID.
pub async fn get_topic(
    State(pool): State<SqlitePool>,
    State(storage): State<Arc<dyn FileStorage>>,
    Path(topic_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let topic = fetch_topic(&pool, topic_id).await?;
    Ok(Json(with_presentation_url(topic, storage.as_ref())))
}
