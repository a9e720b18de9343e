// src/grading/leaderboard.rs

use sqlx::SqliteExecutor;

use crate::{
    config::LAB_COMPLETION_POINTS,
    models::{
        leaderboard::{LeaderboardEntry, StudentStanding},
        user::ROLE_STUDENT,
    },
};

/// Reads the raw aggregates for every student.
pub async fn load_standings<'e>(
    executor: impl SqliteExecutor<'e>,
) -> Result<Vec<StudentStanding>, sqlx::Error> {
    sqlx::query_as::<_, StudentStanding>(
        r#"
        SELECT
            u.id AS user_id,
            u.username,
            COALESCE((SELECT SUM(qa.score) FROM quiz_attempts qa WHERE qa.user_id = u.id), 0)
                AS quiz_score_sum,
            (SELECT COUNT(DISTINCT qa.topic_id) FROM quiz_attempts qa WHERE qa.user_id = u.id)
                AS quizzes_completed,
            (SELECT COUNT(*) FROM lab_progress lp WHERE lp.user_id = u.id AND lp.completed = 1)
                AS labs_completed
        FROM users u
        WHERE u.role = ?
        "#,
    )
    .bind(ROLE_STUDENT)
    .fetch_all(executor)
    .await
}

/// Ranks students by total score.
///
/// `total = sum(quiz scores) + labs_completed * LAB_COMPLETION_POINTS`.
/// Ties are broken by ascending user id so the order is reproducible.
pub fn compute_leaderboard(standings: Vec<StudentStanding>) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = standings
        .into_iter()
        .map(|s| LeaderboardEntry {
            rank: 0,
            user_id: s.user_id,
            username: s.username,
            total_score: s.quiz_score_sum + s.labs_completed * LAB_COMPLETION_POINTS,
            labs_completed: s.labs_completed,
            quizzes_completed: s.quizzes_completed,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.total_score
            .cmp(&a.total_score)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });

    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }

    entries
}
