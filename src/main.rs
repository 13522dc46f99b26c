mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod static_files;
mod storage;


use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::services::{
    AuthService, FileRepository, ListingService, TokenCodec, UploadService, UserRepository,
};
use crate::storage::{BlobStore, LocalBlobStore};

#[derive(Parser)]
#[command(name = "imgstash", version, about = "Tagged image storage service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Provision a login account
    CreateUser { username: String, password: String },
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub codec: Arc<TokenCodec>,
    pub auth: AuthService,
    pub files: FileRepository,
    pub listing: ListingService,
    pub uploads: UploadService,
    pub blobs: Arc<dyn BlobStore>,
}

impl AppState {
    pub fn new(db: Database, config: Arc<Config>) -> Self {
        let codec = Arc::new(TokenCodec::new(&config.jwt));
        let users = UserRepository::new(db.clone());
        let files = FileRepository::new(db);

        let store = LocalBlobStore::new(&config.storage);
        tracing::info!(
            "Blob store: {} at {}",
            store.storage_type(),
            store.root().display()
        );
        let blobs: Arc<dyn BlobStore> = Arc::new(store);

        Self {
            auth: AuthService::new(users.clone(), codec.clone()),
            listing: ListingService::new(files.clone(), users.clone()),
            uploads: UploadService::new(users, files.clone(), blobs.clone()),
            files,
            blobs,
            codec,
            config,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imgstash=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Arc::new(Config::load()?);

    // Initialize database
    let db = Database::new(&config.database.path).await?;
    db.run_migrations().await?;
    tracing::info!("Database initialized");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(db, config).await,
        Command::CreateUser { username, password } => create_user(db, &username, &password).await,
    }
}

async fn serve(db: Database, config: Arc<Config>) -> anyhow::Result<()> {
    config.validate()?;
    tracing::info!("Starting imgstash...");

    let swept = LocalBlobStore::new(&config.storage).sweep_staging().await?;
    if swept > 0 {
        tracing::info!("Removed {} leftover staging files", swept);
    }

    let state = AppState::new(db, config.clone());
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn create_user(db: Database, username: &str, password: &str) -> anyhow::Result<()> {
    if password.is_empty() {
        anyhow::bail!("Password must not be empty");
    }

    let hash = AuthService::hash_password(password)?;
    let user = UserRepository::new(db).create(username, &hash).await?;
    println!("Created user {} (id {})", user.username, user.id);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn create_router(state: AppState) -> Router {
    let upload_limit = state.config.storage.max_upload_bytes;

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/status", get(handlers::auth::status))
        .route(
            "/images",
            get(handlers::file::list_images)
                .post(handlers::file::upload_image)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/images/mine", get(handlers::file::list_my_images))
        .route("/images/:id/download", get(handlers::file::download_image))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    let mut router = Router::new().nest("/api", public_routes.merge(protected_routes));

    if let Some(dir) = state.config.server.web_dir.as_deref() {
        router = router.fallback_service(static_files::web_service(dir));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
