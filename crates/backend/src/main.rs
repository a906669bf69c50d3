use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::cors::{AllowOrigin, CorsLayer};

mod auth;
mod db;
pub mod error;
mod handlers;
mod jobs;
mod models;
mod schema;
mod services;
mod streaks;

/// Shared application state: the connection pool plus auth configuration.
#[derive(Clone)]
pub struct AppState {
    pub pool: db::DbPool,
    pub auth: auth::AuthConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;
    let pool = db::establish_connection_pool(&database_url)?;

    let auth_config = auth::AuthConfig::from_env().map_err(|e| anyhow::anyhow!("{}", e))?;

    let state = AppState {
        pool: pool.clone(),
        auth: auth_config,
    };

    // Start the daily rollover background task
    tokio::spawn(async move {
        jobs::start_rollover_task(pool).await;
    });

    let protected = Router::new()
        // User routes
        .route("/api/user/me", get(handlers::user::me))
        .route(
            "/api/user/preferences",
            axum::routing::patch(handlers::user::update_preferences),
        )
        // Task routes
        .route(
            "/api/tasks",
            get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
        )
        .route(
            "/api/tasks/:id",
            get(handlers::tasks::get_task)
                .patch(handlers::tasks::update_task)
                .delete(handlers::tasks::delete_task),
        )
        .route("/api/tasks/:id/complete", post(handlers::tasks::complete_task))
        .route(
            "/api/tasks/:id/reschedule",
            post(handlers::tasks::reschedule_task),
        )
        // Journal routes
        .route(
            "/api/journal",
            get(handlers::journal::list_entries).post(handlers::journal::save_entry),
        )
        .route(
            "/api/journal/:date",
            get(handlers::journal::get_entry)
                .patch(handlers::journal::update_entry)
                .delete(handlers::journal::delete_entry),
        )
        // Analytics routes
        .route("/api/analytics/summary", get(handlers::analytics::summary))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let app = Router::new()
        .route("/healthz", get(health_check))
        // Auth routes (public)
        .route("/api/auth/signup", post(auth::handlers::signup))
        .route("/api/auth/login", post(auth::handlers::login))
        .route("/api/auth/logout", post(auth::handlers::logout))
        .route(
            "/api/auth/forgot-password",
            post(auth::handlers::forgot_password),
        )
        .route(
            "/api/auth/reset-password",
            post(auth::handlers::reset_password),
        )
        .merge(protected)
        .layer(build_cors_layer())
        .with_state(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000u16);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now() }))
}

/// Build CORS layer based on environment configuration.
///
/// If CORS_ALLOWED_ORIGINS is set, only those origins are allowed.
/// If not set, defaults to permissive CORS (for development only).
fn build_cors_layer() -> CorsLayer {
    let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS").ok();

    match allowed_origins {
        Some(origins) => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                tracing::warn!(
                    "CORS_ALLOWED_ORIGINS is set but empty, using permissive CORS (not recommended for production)"
                );
                CorsLayer::permissive()
            } else {
                tracing::info!("CORS configured for origins: {:?}", origins);
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods([
                        Method::GET,
                        Method::POST,
                        Method::PATCH,
                        Method::DELETE,
                        Method::OPTIONS,
                    ])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                    .allow_credentials(true)
            }
        }
        None => {
            tracing::warn!(
                "CORS_ALLOWED_ORIGINS not set, using permissive CORS (not recommended for production)"
            );
            CorsLayer::permissive()
        }
    }
}
