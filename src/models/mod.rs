// src/models/mod.rs

pub mod lab;
pub mod leaderboard;
pub mod quiz;
pub mod topic;
pub mod user;
