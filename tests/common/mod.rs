// tests/common/mod.rs

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc};

use seclab::{
    config::{Config, GradingSettings},
    db, routes,
    state::AppState,
    storage::LocalStorage,
};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const ADMIN_USERNAME: &str = "root_admin";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
    uploads: TempDir,
}

pub fn test_config(upload_dir: &std::path::Path, grading: GradingSettings) -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        port: 0,
        admin_username: Some(ADMIN_USERNAME.to_string()),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
        upload_dir: upload_dir.to_path_buf(),
        max_upload_bytes: 1024 * 1024,
        rate_limit_requests: 0,
        rate_limit_window_secs: 900,
        cors_origins: vec!["http://localhost:5173".to_string()],
        grading,
    }
}

/// Spawns the app on a random port against a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(GradingSettings::default(), |_| {}).await
}

/// Same as [`spawn_app`] but lets a test adjust the configuration.
pub async fn spawn_app_with(grading: GradingSettings, tweak: impl FnOnce(&mut Config)) -> TestApp {
    let uploads = tempfile::tempdir().expect("Failed to create upload dir");
    let mut config = test_config(uploads.path(), grading);
    tweak(&mut config);

    let pool = db::connect(&config.database_url)
        .await
        .expect("Failed to open in-memory database");
    db::migrate(&pool).await.expect("Failed to migrate database");
    db::seed_admin_user(&pool, &config)
        .await
        .expect("Failed to seed admin");

    let storage = LocalStorage::new(&config.upload_dir, config.max_upload_bytes);
    storage.init().await.expect("Failed to init storage");

    let state = AppState {
        pool: pool.clone(),
        config,
        storage: Arc::new(storage),
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
        uploads,
    }
}

pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Directory the app stores uploaded presentations in.
    pub fn uploads_dir(&self) -> &std::path::Path {
        self.uploads.path()
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let body: Value = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Login failed")
            .json()
            .await
            .expect("Failed to parse login json");

        body["token"].as_str().expect("Token not found").to_string()
    }

    /// Registers a fresh student and returns (user id, token).
    pub async fn student(&self) -> (i64, String) {
        let username = unique_name("s");
        let user: Value = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "username": username, "password": PASSWORD }))
            .send()
            .await
            .expect("Register failed")
            .json()
            .await
            .unwrap();

        let id = user["id"].as_i64().expect("User id missing");
        (id, self.login(&username, PASSWORD).await)
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    pub async fn create_topic(&self, admin: &str, title: &str) -> i64 {
        let topic: Value = self
            .client
            .post(self.url("/api/admin/topics"))
            .bearer_auth(admin)
            .json(&json!({ "title": title, "description": "<p>About it</p>" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        topic["id"].as_i64().expect("Topic id missing")
    }

    pub async fn put_lab(&self, admin: &str, topic_id: i64, criteria: Value) -> reqwest::Response {
        self.client
            .put(self.url(&format!("/api/admin/topics/{}/lab", topic_id)))
            .bearer_auth(admin)
            .json(&json!({
                "title": "Harden the headers",
                "instructions": "Add the missing middleware.",
                "vulnerableCode": { "app.js": "const express = require('express');" },
                "correctCode": { "app.js": "app.use(helmet());" },
                "validationCriteria": criteria,
            }))
            .send()
            .await
            .unwrap()
    }

    /// Creates a topic whose lab checks for `patterns`, one criterion each.
    pub async fn topic_with_lab(&self, admin: &str, patterns: &[&str]) -> i64 {
        let topic_id = self.create_topic(admin, &unique_name("topic")).await;
        let criteria: Vec<Value> = patterns
            .iter()
            .enumerate()
            .map(|(i, p)| {
                json!({
                    "header": format!("Check {}", i + 1),
                    "description": format!("Code must contain {}", p),
                    "expectedPattern": p,
                    "required": true,
                })
            })
            .collect();

        let response = self.put_lab(admin, topic_id, Value::Array(criteria)).await;
        assert_eq!(response.status().as_u16(), 200);
        topic_id
    }

    pub async fn validate(&self, token: &str, topic_id: i64, code: &str) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/api/topics/{}/lab/validate", topic_id)))
            .bearer_auth(token)
            .json(&json!({ "code": code }))
            .send()
            .await
            .unwrap()
    }
}
