// src/routes.rs

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    config::Config,
    handlers::{admin, auth, content, lab, progress, quiz, topics},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, topics, progress, leaderboard, admin).
/// * Serves uploaded presentations under `/uploads`.
/// * Applies global middleware (Trace, CORS, rate limiting).
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();
    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .layer(require_auth.clone()),
        );

    let topic_routes = Router::new()
        .route("/", get(topics::list_topics))
        .route("/{topic_id}", get(topics::get_topic))
        .route("/{topic_id}/quiz", get(quiz::get_quiz))
        .route("/{topic_id}/quiz/submit", post(quiz::submit_quiz))
        .route("/{topic_id}/quiz/attempts", get(quiz::list_quiz_attempts))
        .route("/{topic_id}/lab", get(lab::get_lab))
        .route("/{topic_id}/lab/validate", post(lab::validate_lab))
        .route("/{topic_id}/lab/attempts", get(lab::list_lab_attempts))
        .layer(require_auth.clone());

    let student_routes = Router::new()
        .route("/api/progress", get(progress::my_progress))
        .route("/api/leaderboard", get(progress::get_leaderboard))
        .layer(require_auth.clone());

    // Leave headroom for the multipart framing around the file itself.
    let upload_limit = DefaultBodyLimit::max(config.max_upload_bytes + 64 * 1024);

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/users/{id}/progress", get(admin::user_progress))
        .route("/stats", get(admin::stats))
        .route("/topics", post(content::create_topic))
        .route(
            "/topics/{id}",
            put(content::update_topic).delete(content::delete_topic),
        )
        .route(
            "/topics/{id}/presentation",
            post(content::upload_presentation)
                .delete(content::delete_presentation)
                .layer(upload_limit),
        )
        .route("/topics/{id}/questions", post(content::create_question))
        .route(
            "/questions/{id}",
            put(content::update_question).delete(content::delete_question),
        )
        .route(
            "/topics/{id}/lab",
            get(content::get_lab_admin)
                .put(content::upsert_lab)
                .delete(content::delete_lab),
        )
        // Auth first, then the admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(require_auth);

    let router = Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/topics", topic_routes)
        .merge(student_routes)
        .nest("/api/admin", admin_routes)
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config)),
        )
        .with_state(state);

    with_rate_limit(router, &config)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Fixed budget of `rate_limit_requests` per IP per window, replenished evenly.
/// Requires the server to expose `ConnectInfo<SocketAddr>`.
fn with_rate_limit(router: Router, config: &Config) -> Router {
    let requests = config.rate_limit_requests;
    if requests == 0 {
        return router;
    }

    let period_ms = (config.rate_limit_window_secs * 1000 / u64::from(requests)).max(1);
    let Some(governor_conf) = GovernorConfigBuilder::default()
        .per_millisecond(period_ms)
        .burst_size(requests)
        .finish()
    else {
        tracing::warn!("Invalid rate limit configuration, rate limiting disabled");
        return router;
    };

    tracing::info!(
        "Rate limiting: {} requests per {}s per IP",
        requests,
        config.rate_limit_window_secs
    );

    router.layer(GovernorLayer::new(Arc::new(governor_conf)))
}
