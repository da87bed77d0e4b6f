use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use amora_api::mailer::Mailer;
use amora_api::middleware::require_auth;
use amora_api::state::{AppState, AppStateInner};
use amora_api::{auth, messages, photos, profiles};
use amora_crypto::{Codec, derive_key};

/// Placeholder secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

fn require_secret(var: &str) -> String {
    let value = std::env::var(var).unwrap_or_default();
    if value.is_empty() || PLACEHOLDER_SECRETS.contains(&value.as_str()) {
        eprintln!("FATAL: {} is unset or still a placeholder.", var);
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }
    value
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amora=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = require_secret("AMORA_JWT_SECRET");
    let encryption_secret = require_secret("AMORA_ENCRYPTION_SECRET");
    let db_path = std::env::var("AMORA_DB_PATH").unwrap_or_else(|_| "amora.db".into());
    let host = std::env::var("AMORA_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("AMORA_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let upload_dir: PathBuf = std::env::var("AMORA_UPLOAD_DIR")
        .unwrap_or_else(|_| "./uploads".into())
        .into();

    // Init database and shared state
    let db = amora_db::Database::open(&PathBuf::from(&db_path))?;
    let codec = Codec::new(derive_key(&encryption_secret));
    let mailer = Mailer::from_env();

    let state: AppState = Arc::new(AppStateInner {
        db,
        codec,
        mailer,
        jwt_secret,
        upload_dir,
    });

    // Routes
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/users", get(profiles::list_users))
        .route("/api/signup", post(auth::signup))
        .route("/api/verify", post(auth::verify))
        .route("/api/resend-code", post(auth::resend_code))
        .route("/api/login", post(auth::login))
        .route("/api/upload", post(photos::upload_photo))
        .route("/api/images/{filename}", get(photos::fetch_photo))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/users/{id}", put(profiles::update_profile))
        .route("/api/me", delete(profiles::delete_account))
        .route("/api/notifications/unread-count", get(messages::unread_count))
        .route("/api/conversations", get(messages::list_conversations))
        .route("/api/messages/{other_id}", get(messages::get_thread))
        .route("/api/messages", post(messages::send_message))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(DefaultBodyLimit::max(photos::MAX_PHOTO_SIZE + 1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Amora server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Unknown routes get the same JSON error shape as everything else.
async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
