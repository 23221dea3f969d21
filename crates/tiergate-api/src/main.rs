use anyhow::Result;
use axum::{routing::get, Router};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod error;
mod handlers;

pub struct AppState {
    pub pool: PgPool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiergate_api=info,tower_http=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Tiergate API Server");

    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let host = std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("API_PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .expect("Invalid API_PORT");

    let pool = tiergate_common::db::create_pool(&database_url, 20).await?;

    tracing::info!("Running database migrations");
    tiergate_common::db::run_migrations(&pool).await?;

    let state = Arc::new(AppState { pool });

    let app = Router::new()
        // Sync/health state for pollers
        .route("/status", get(handlers::status::get_status))
        // Entities
        .route("/api/entities", get(handlers::entities::list_entities))
        .route("/api/entities/{id}", get(handlers::entities::get_entity))
        // Contract-scoped views
        .route("/api/contracts/{address}", get(handlers::contracts::get_contract))
        .route("/api/contracts/{address}/levels", get(handlers::contracts::get_levels))
        .route("/api/contracts/{address}/holders", get(handlers::contracts::get_holders))
        // Health
        .route("/health", get(|| async { "OK" }))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
