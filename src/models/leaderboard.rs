// src/models/leaderboard.rs

use serde::Serialize;
use sqlx::FromRow;

/// Raw per-student aggregates read from the database.
#[derive(Debug, Clone, FromRow)]
pub struct StudentStanding {
    pub user_id: i64,
    pub username: String,
    /// Sum of the scores of every quiz attempt.
    pub quiz_score_sum: i64,
    /// Distinct topics with at least one quiz attempt.
    pub quizzes_completed: i64,
    /// Lab progress rows marked completed.
    pub labs_completed: i64,
}

/// One ranked row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: i64,
    pub username: String,
    pub total_score: i64,
    pub labs_completed: i64,
    pub quizzes_completed: i64,
}
