// src/grading/progress.rs

//! The mutable "current standing" row per (user, lab).

use chrono::Utc;
use sqlx::{SqliteConnection, SqliteExecutor};

use crate::{
    config::ProgressPolicy,
    models::lab::{LabProgress, TopicLabProgress},
};

const UPSERT_LATEST: &str = r#"
    INSERT INTO lab_progress
        (user_id, lab_id, completed, score, submitted_code, completed_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (user_id, lab_id) DO UPDATE SET
        completed = excluded.completed,
        score = excluded.score,
        submitted_code = excluded.submitted_code,
        completed_at = excluded.completed_at,
        updated_at = excluded.updated_at
"#;

// Same as above but a lower score leaves the row untouched.
const UPSERT_BEST: &str = r#"
    INSERT INTO lab_progress
        (user_id, lab_id, completed, score, submitted_code, completed_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (user_id, lab_id) DO UPDATE SET
        completed = excluded.completed,
        score = excluded.score,
        submitted_code = excluded.submitted_code,
        completed_at = excluded.completed_at,
        updated_at = excluded.updated_at
    WHERE excluded.score >= lab_progress.score
"#;

/// Inserts or overwrites the progress row for `(user_id, lab_id)` and
/// returns the stored row.
///
/// `completed_at` is stamped with the current time when `completed` is true
/// and cleared otherwise, so it always describes the stored result.
pub async fn upsert_progress(
    conn: &mut SqliteConnection,
    policy: ProgressPolicy,
    user_id: i64,
    lab_id: i64,
    completed: bool,
    score: i64,
    submitted_code: &str,
) -> Result<LabProgress, sqlx::Error> {
    let now = Utc::now();
    let completed_at = completed.then_some(now);

    let sql = match policy {
        ProgressPolicy::Latest => UPSERT_LATEST,
        ProgressPolicy::Best => UPSERT_BEST,
    };

    sqlx::query(sql)
        .bind(user_id)
        .bind(lab_id)
        .bind(completed)
        .bind(score)
        .bind(submitted_code)
        .bind(completed_at)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    get_progress(&mut *conn, user_id, lab_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub async fn get_progress<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: i64,
    lab_id: i64,
) -> Result<Option<LabProgress>, sqlx::Error> {
    sqlx::query_as::<_, LabProgress>(
        r#"
        SELECT id, user_id, lab_id, completed, score, submitted_code, completed_at, updated_at
        FROM lab_progress
        WHERE user_id = ? AND lab_id = ?
        "#,
    )
    .bind(user_id)
    .bind(lab_id)
    .fetch_optional(executor)
    .await
}

/// Every lab progress row of a user, joined with its topic.
pub async fn list_progress_for_user<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: i64,
) -> Result<Vec<TopicLabProgress>, sqlx::Error> {
    sqlx::query_as::<_, TopicLabProgress>(
        r#"
        SELECT t.id AS topic_id, t.title AS topic_title, lp.lab_id,
               lp.completed, lp.score, lp.completed_at, lp.updated_at
        FROM lab_progress lp
        JOIN lab_exercises l ON l.id = lp.lab_id
        JOIN topics t ON t.id = l.topic_id
        WHERE lp.user_id = ?
        ORDER BY t.position, t.id
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}
