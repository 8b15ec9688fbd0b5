use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;

use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clearday_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Config::from_env();
    let config = Arc::new(config);

    // Database
    let db = db::create_pool(&config.database_url).await;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations applied");

    let state = AppState {
        db,
        config: config.clone(),
    };

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz));

    let protected_routes = Router::new()
        // Profile
        .route("/api/user/profile", post(handlers::users::upsert_profile))
        .route("/api/user/profile", get(handlers::users::get_profile))
        .route("/api/user/profile", delete(handlers::users::delete_profile))
        .route(
            "/api/user/routine-steps",
            put(handlers::users::update_routine_steps),
        )
        // Daily logs
        .route(
            "/api/daily/upload-photo",
            post(handlers::daily::upload_photo)
                .layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        )
        .route(
            "/api/daily/complete-steps",
            post(handlers::daily::complete_steps),
        )
        .route(
            "/api/daily/complete-routine",
            post(handlers::daily::complete_routine),
        )
        .route("/api/daily/status", get(handlers::daily::get_status))
        .route("/api/daily/history", get(handlers::daily::get_history))
        .route("/api/daily/log", put(handlers::daily::update_log))
        // AI storage
        .route(
            "/api/ai/progress-analysis",
            post(handlers::ai::store_progress_analysis),
        )
        .route(
            "/api/ai/product-evaluation",
            post(handlers::ai::store_product_evaluation),
        )
        .route("/api/ai/user-data", get(handlers::ai::get_user_data))
        .route(
            "/api/ai/progress-metrics",
            get(handlers::ai::get_progress_metrics),
        )
        .route(
            "/api/ai/progress-metrics/:metric_id",
            delete(handlers::ai::delete_progress_metric),
        )
        .route(
            "/api/ai/product-evaluations",
            get(handlers::ai::get_product_evaluations),
        )
        // Gamification
        .route(
            "/api/gamification/milestones",
            post(handlers::gamification::update_milestones),
        )
        .route(
            "/api/gamification/status",
            get(handlers::gamification::get_status),
        )
        .route(
            "/api/gamification/complete-gesture",
            post(handlers::gamification::complete_gesture),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let allowed_origins: Vec<axum::http::HeaderValue> = {
        let mut origins = vec![config
            .frontend_url
            .parse::<axum::http::HeaderValue>()
            .unwrap()];
        // In dev, also allow LAN access (e.g. testing from another device)
        if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
            for o in extra.split(',') {
                if let Ok(hv) = o.trim().parse::<axum::http::HeaderValue>() {
                    origins.push(hv);
                }
            }
        }
        origins
    };
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
