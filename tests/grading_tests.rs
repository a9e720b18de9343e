// tests/grading_tests.rs

use std::collections::BTreeMap;

use chrono::Utc;
use seclab::{
    config::{GradingSettings, ProgressPolicy},
    db,
    grading::{self, GradingError, attempts, progress},
    models::lab::{Criterion, LabExercise},
};
use sqlx::{SqlitePool, types::Json};

async fn setup() -> SqlitePool {
    let pool = db::connect("sqlite::memory:").await.unwrap();
    db::migrate(&pool).await.unwrap();
    pool
}

async fn insert_user(pool: &SqlitePool, username: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO users (username, password, role, created_at) VALUES (?, 'x', 'student', ?) RETURNING id",
    )
    .bind(username)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Inserts a topic with a lab checking for each pattern and returns the lab.
async fn insert_lab(pool: &SqlitePool, patterns: &[&str]) -> LabExercise {
    let now = Utc::now();
    let topic_id: i64 = sqlx::query_scalar(
        "INSERT INTO topics (title, description, position, created_at, updated_at) VALUES ('t', '', 0, ?, ?) RETURNING id",
    )
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .unwrap();

    let criteria: Vec<Criterion> = patterns
        .iter()
        .map(|p| Criterion {
            header: format!("Uses {}", p),
            description: String::new(),
            expected_pattern: Some(p.to_string()),
            required: true,
        })
        .collect();

    let lab_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO lab_exercises
            (topic_id, title, instructions, vulnerable_code, correct_code, validation_criteria, updated_at)
        VALUES (?, 'lab', '', '{}', '{}', ?, ?)
        RETURNING id
        "#,
    )
    .bind(topic_id)
    .bind(Json(&criteria))
    .bind(now)
    .fetch_one(pool)
    .await
    .unwrap();

    LabExercise {
        id: lab_id,
        topic_id,
        title: "lab".to_string(),
        instructions: String::new(),
        vulnerable_code: Json(BTreeMap::new()),
        correct_code: Json(BTreeMap::new()),
        validation_criteria: Json(criteria),
        updated_at: now,
    }
}

#[tokio::test]
async fn attempts_are_counted_per_user_and_lab() {
    let pool = setup().await;
    let alice = insert_user(&pool, "alice").await;
    let bob = insert_user(&pool, "bob").await;
    let lab = insert_lab(&pool, &["helmet"]).await;
    let other_lab = insert_lab(&pool, &["csrf"]).await;

    let settings = GradingSettings::default();
    grading::submit_lab(&pool, settings, alice, &lab, "helmet").await.unwrap();
    grading::submit_lab(&pool, settings, alice, &lab, "helmet").await.unwrap();
    let bob_first = grading::submit_lab(&pool, settings, bob, &lab, "x").await.unwrap();
    let other_first = grading::submit_lab(&pool, settings, alice, &other_lab, "csrf")
        .await
        .unwrap();

    assert_eq!(bob_first.attempt_number, 1);
    assert_eq!(other_first.attempt_number, 1);
    assert_eq!(attempts::lab_attempt_count(&pool, alice, lab.id).await.unwrap(), 2);
    assert_eq!(attempts::lab_attempt_count(&pool, bob, lab.id).await.unwrap(), 1);
}

#[tokio::test]
async fn taken_attempt_number_surfaces_a_conflict() {
    let pool = setup().await;
    let user = insert_user(&pool, "carol").await;
    let lab = insert_lab(&pool, &["helmet"]).await;

    // A gap in the history makes count + 1 collide with an existing row.
    for n in [1, 3] {
        sqlx::query(
            "INSERT INTO lab_attempts (user_id, lab_id, attempt_number, passed, score, submitted_code, attempted_at) VALUES (?, ?, ?, 0, 0, '', ?)",
        )
        .bind(user)
        .bind(lab.id)
        .bind(n)
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();
    }

    let mut conn = pool.acquire().await.unwrap();
    let direct = attempts::record_lab_attempt(&mut conn, user, lab.id, true, 100, "helmet").await;
    assert!(matches!(direct, Err(GradingError::ConcurrentAttemptConflict)));
    drop(conn);

    // The retry sees the same count, so the conflict is reported and nothing is written.
    let result = grading::submit_lab(&pool, GradingSettings::default(), user, &lab, "helmet").await;
    assert!(matches!(result, Err(GradingError::ConcurrentAttemptConflict)));

    assert_eq!(attempts::lab_attempt_count(&pool, user, lab.id).await.unwrap(), 2);
    assert!(progress::get_progress(&pool, user, lab.id).await.unwrap().is_none());
}

#[tokio::test]
async fn concurrent_submissions_on_a_file_database_number_contiguously() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("grading.db").display());
    let pool = db::connect(&url).await.unwrap();
    db::migrate(&pool).await.unwrap();

    let user = insert_user(&pool, "grace").await;
    let lab = insert_lab(&pool, &["helmet"]).await;

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..40 {
        let pool = pool.clone();
        let lab = lab.clone();
        tasks.spawn(async move {
            let code = if i % 3 == 0 { "helmet" } else { "plain" };
            grading::submit_lab(&pool, GradingSettings::default(), user, &lab, code).await
        });
    }

    let mut numbers = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let submission = joined.unwrap().expect("every submission is recorded");
        numbers.push(submission.attempt_number);
    }
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=40).collect::<Vec<i64>>());

    let stored: Vec<i64> = sqlx::query_scalar(
        "SELECT attempt_number FROM lab_attempts WHERE user_id = ? AND lab_id = ? ORDER BY attempt_number",
    )
    .bind(user)
    .bind(lab.id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(stored, (1..=40).collect::<Vec<i64>>());

    let progress_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lab_progress WHERE user_id = ?")
        .bind(user)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(progress_rows, 1);

    pool.close().await;
}

#[tokio::test]
async fn empty_criteria_record_nothing() {
    let pool = setup().await;
    let user = insert_user(&pool, "dave").await;
    let lab = insert_lab(&pool, &[]).await;

    let result = grading::submit_lab(&pool, GradingSettings::default(), user, &lab, "code").await;
    assert!(matches!(result, Err(GradingError::EmptyCriteria)));
    assert_eq!(attempts::lab_attempt_count(&pool, user, lab.id).await.unwrap(), 0);
}

#[tokio::test]
async fn latest_upsert_overwrites_and_clears_completion() {
    let pool = setup().await;
    let user = insert_user(&pool, "erin").await;
    let lab = insert_lab(&pool, &["helmet"]).await;
    let mut conn = pool.acquire().await.unwrap();

    let first = progress::upsert_progress(&mut conn, ProgressPolicy::Latest, user, lab.id, true, 100, "a")
        .await
        .unwrap();
    assert!(first.completed);
    assert!(first.completed_at.is_some());

    let second = progress::upsert_progress(&mut conn, ProgressPolicy::Latest, user, lab.id, false, 40, "b")
        .await
        .unwrap();
    assert_eq!(second.id, first.id);
    assert!(!second.completed);
    assert_eq!(second.score, 40);
    assert_eq!(second.submitted_code, "b");
    assert!(second.completed_at.is_none());
}

#[tokio::test]
async fn best_upsert_ignores_lower_scores() {
    let pool = setup().await;
    let user = insert_user(&pool, "frank").await;
    let lab = insert_lab(&pool, &["helmet"]).await;
    let mut conn = pool.acquire().await.unwrap();

    progress::upsert_progress(&mut conn, ProgressPolicy::Best, user, lab.id, false, 60, "a")
        .await
        .unwrap();
    let raised = progress::upsert_progress(&mut conn, ProgressPolicy::Best, user, lab.id, true, 80, "b")
        .await
        .unwrap();
    assert_eq!(raised.score, 80);

    let kept = progress::upsert_progress(&mut conn, ProgressPolicy::Best, user, lab.id, false, 20, "c")
        .await
        .unwrap();
    assert_eq!(kept.score, 80);
    assert!(kept.completed);
    assert_eq!(kept.submitted_code, "b");
}

#[tokio::test]
async fn leaderboard_ranks_students_from_stored_results() {
    let pool = setup().await;
    let alice = insert_user(&pool, "alice").await;
    let bob = insert_user(&pool, "bob").await;
    let lab = insert_lab(&pool, &["helmet"]).await;

    grading::submit_lab(&pool, GradingSettings::default(), bob, &lab, "helmet")
        .await
        .unwrap();

    let standings = grading::leaderboard::load_standings(&pool).await.unwrap();
    let board = grading::leaderboard::compute_leaderboard(standings);

    assert_eq!(board.len(), 2);
    assert_eq!(board[0].user_id, bob);
    assert_eq!(board[0].total_score, 10);
    assert_eq!(board[1].user_id, alice);
    assert_eq!(board[1].total_score, 0);
}
