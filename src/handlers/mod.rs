// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod content;
pub mod lab;
pub mod progress;
pub mod quiz;
pub mod topics;
