// src/handlers/content.rs

//! Admin authoring of topics, presentations, quiz questions and labs.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        lab::{LabExercise, UpsertLabRequest},
        quiz::{CreateQuestionRequest, QuizQuestion, UpdateQuestionRequest, answers_within_options},
        topic::{CreateTopicRequest, Topic, UpdateTopicRequest},
    },
    storage::FileStorage,
    utils::html::clean_html,
};

use super::{
    quiz::QUESTION_COLUMNS,
    topics::{LAB_COLUMNS, TOPIC_COLUMNS, fetch_lab, fetch_topic, with_presentation_url},
};

/// Creates a new topic.
/// Admin only.
pub async fn create_topic(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateTopicRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let now = Utc::now();
    let topic = sqlx::query_as::<_, Topic>(&format!(
        r#"
        INSERT INTO topics (title, description, position, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        TOPIC_COLUMNS
    ))
    .bind(&payload.title)
    .bind(clean_html(&payload.description))
    .bind(payload.position)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create topic: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(topic)))
}

/// Updates a topic by ID.
/// Admin only.
pub async fn update_topic(
    State(pool): State<SqlitePool>,
    State(storage): State<Arc<dyn FileStorage>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTopicRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE topics SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(clean_html(&description));
    }

    if let Some(position) = payload.position {
        separated.push("position = ");
        separated.push_bind_unseparated(position);
    }

    separated.push("updated_at = ");
    separated.push_bind_unseparated(Utc::now());

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update topic: {:?}", e);
        AppError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Topic not found".to_string()));
    }

    let topic = fetch_topic(&pool, id).await?;
    Ok(Json(with_presentation_url(topic, storage.as_ref())))
}

/// Deletes a topic with its lab, questions and attempts.
/// Admin only.
pub async fn delete_topic(
    State(pool): State<SqlitePool>,
    State(storage): State<Arc<dyn FileStorage>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let topic = fetch_topic(&pool, id).await?;

    sqlx::query("DELETE FROM topics WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete topic: {:?}", e);
            AppError::from(e)
        })?;

    if let Some(file) = topic.presentation_file {
        if let Err(e) = storage.delete(&file).await {
            tracing::warn!("Topic {} deleted but its presentation was not: {}", id, e);
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Uploads (or replaces) the presentation of a topic.
/// Expects a multipart form with a `file` field.
/// Admin only.
pub async fn upload_presentation(
    State(pool): State<SqlitePool>,
    State(storage): State<Arc<dyn FileStorage>>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let topic = fetch_topic(&pool, id).await?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or(AppError::BadRequest("File name is missing".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
        upload = Some((file_name, data));
        break;
    }

    let (file_name, data) =
        upload.ok_or(AppError::BadRequest("Field 'file' is required".to_string()))?;

    let stored = storage.save(&file_name, &data).await?;

    let updated =
        sqlx::query("UPDATE topics SET presentation_file = ?, updated_at = ? WHERE id = ?")
            .bind(&stored)
            .bind(Utc::now())
            .bind(id)
            .execute(&pool)
            .await;

    // The new file is only kept once a topic row points at it.
    let outcome = match updated {
        Ok(result) if result.rows_affected() == 0 => {
            Err(AppError::NotFound("Topic not found".to_string()))
        }
        Ok(_) => Ok(()),
        Err(e) => {
            tracing::error!("Failed to attach presentation to topic {}: {:?}", id, e);
            Err(AppError::from(e))
        }
    };
    if let Err(e) = outcome {
        if let Err(cleanup) = storage.delete(&stored).await {
            tracing::warn!("Orphaned presentation {} left on disk: {}", stored, cleanup);
        }
        return Err(e);
    }

    if let Some(old) = topic.presentation_file {
        if let Err(e) = storage.delete(&old).await {
            tracing::warn!(
                "Topic {} presentation replaced but {} was not removed: {}",
                id,
                old,
                e
            );
        }
    }

    let topic = fetch_topic(&pool, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(with_presentation_url(topic, storage.as_ref())),
    ))
}

/// Removes the presentation of a topic.
/// Admin only.
pub async fn delete_presentation(
    State(pool): State<SqlitePool>,
    State(storage): State<Arc<dyn FileStorage>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let topic = fetch_topic(&pool, id).await?;
    let file = topic
        .presentation_file
        .ok_or(AppError::NotFound("Topic has no presentation".to_string()))?;

    sqlx::query("UPDATE topics SET presentation_file = NULL, updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(&pool)
        .await?;

    storage.delete(&file).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Adds a quiz question to a topic.
/// Admin only.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Path(topic_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    fetch_topic(&pool, topic_id).await?;

    let question = sqlx::query_as::<_, QuizQuestion>(&format!(
        r#"
        INSERT INTO quiz_questions
            (topic_id, question_text, options, correct_answers, explanation, position)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        QUESTION_COLUMNS
    ))
    .bind(topic_id)
    .bind(&payload.question_text)
    .bind(SqlJson(&payload.options))
    .bind(SqlJson(&payload.correct_answers))
    .bind(&payload.explanation)
    .bind(payload.position)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Updates a quiz question by ID.
/// The merged result must still have its correct answers among its options.
/// Admin only.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut question = sqlx::query_as::<_, QuizQuestion>(&format!(
        "SELECT {} FROM quiz_questions WHERE id = ?",
        QUESTION_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if let Some(text) = payload.question_text {
        question.question_text = text;
    }
    if let Some(options) = payload.options {
        question.options = SqlJson(options);
    }
    if let Some(answers) = payload.correct_answers {
        question.correct_answers = SqlJson(answers);
    }
    if let Some(explanation) = payload.explanation {
        question.explanation = Some(explanation);
    }
    if let Some(position) = payload.position {
        question.position = position;
    }

    if !answers_within_options(&question.correct_answers, &question.options) {
        return Err(AppError::BadRequest(
            "Correct answers must be among the options".to_string(),
        ));
    }

    sqlx::query(
        r#"
        UPDATE quiz_questions
        SET question_text = ?, options = ?, correct_answers = ?, explanation = ?, position = ?
        WHERE id = ?
        "#,
    )
    .bind(&question.question_text)
    .bind(&question.options)
    .bind(&question.correct_answers)
    .bind(&question.explanation)
    .bind(question.position)
    .bind(id)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(question))
}

/// Deletes a quiz question by ID.
/// Admin only.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM quiz_questions WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the full lab including patterns and reference code.
/// Admin only.
pub async fn get_lab_admin(
    State(pool): State<SqlitePool>,
    Path(topic_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(fetch_lab(&pool, topic_id).await?))
}

/// Creates or replaces the lab of a topic.
/// A lab must carry at least one validation criterion.
/// Admin only.
pub async fn upsert_lab(
    State(pool): State<SqlitePool>,
    Path(topic_id): Path<i64>,
    Json(payload): Json<UpsertLabRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    fetch_topic(&pool, topic_id).await?;

    let lab = sqlx::query_as::<_, LabExercise>(&format!(
        r#"
        INSERT INTO lab_exercises
            (topic_id, title, instructions, vulnerable_code, correct_code, validation_criteria, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (topic_id) DO UPDATE SET
            title = excluded.title,
            instructions = excluded.instructions,
            vulnerable_code = excluded.vulnerable_code,
            correct_code = excluded.correct_code,
            validation_criteria = excluded.validation_criteria,
            updated_at = excluded.updated_at
        RETURNING {}
        "#,
        LAB_COLUMNS
    ))
    .bind(topic_id)
    .bind(&payload.title)
    .bind(clean_html(&payload.instructions))
    .bind(SqlJson(&payload.vulnerable_code))
    .bind(SqlJson(&payload.correct_code))
    .bind(SqlJson(&payload.validation_criteria))
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to save lab for topic {}: {:?}", topic_id, e);
        AppError::from(e)
    })?;

    tracing::info!(
        "Lab {} for topic {} saved with {} criteria",
        lab.id,
        topic_id,
        lab.validation_criteria.len()
    );

    Ok(Json(lab))
}

/// Deletes the lab of a topic with its attempts and progress.
/// Admin only.
pub async fn delete_lab(
    State(pool): State<SqlitePool>,
    Path(topic_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM lab_exercises WHERE topic_id = ?")
        .bind(topic_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete lab: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Lab not found for this topic".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
