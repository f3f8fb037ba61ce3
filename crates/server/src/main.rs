//! TaskyFlow server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{Router, middleware};
use taskyflow_api::{AppState, auth_middleware, router as api_router};
use taskyflow_common::Config;
use taskyflow_core::{
    CommentService, MessagingService, NotificationService, ReactionService, TodoService,
    UserService,
};
use taskyflow_db::repositories::{
    CommentRepository, ConversationRepository, MessageReadRepository, MessageRepository,
    NotificationRepository, ReactionRepository, TodoRepository, UserRepository,
};
use sea_orm::DatabaseConnection;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upper bound on how long a single request may run.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Wire repositories and services over one connection pool.
fn build_state(db: Arc<DatabaseConnection>, config: &Config) -> AppState {
    let user_repo = UserRepository::new(Arc::clone(&db));
    let todo_repo = TodoRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let reaction_repo = ReactionRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));
    let conversation_repo = ConversationRepository::new(Arc::clone(&db));
    let message_repo = MessageRepository::new(Arc::clone(&db));
    let message_read_repo = MessageReadRepository::new(Arc::clone(&db));

    let notification_service = NotificationService::new(
        notification_repo,
        user_repo.clone(),
        todo_repo.clone(),
        comment_repo.clone(),
        message_repo.clone(),
        conversation_repo.clone(),
    );

    AppState {
        user_service: UserService::new(user_repo.clone()),
        todo_service: TodoService::new(
            todo_repo.clone(),
            comment_repo.clone(),
            reaction_repo.clone(),
        ),
        comment_service: CommentService::new(
            comment_repo.clone(),
            todo_repo.clone(),
            user_repo.clone(),
            reaction_repo.clone(),
            notification_service.clone(),
        ),
        reaction_service: ReactionService::new(
            reaction_repo,
            todo_repo,
            comment_repo,
            message_repo.clone(),
            conversation_repo.clone(),
            notification_service.clone(),
        ),
        messaging_service: MessagingService::new(
            conversation_repo,
            message_repo,
            message_read_repo,
            user_repo,
            notification_service.clone(),
        ),
        notification_service,
        instance: config.instance.clone(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskyflow=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting TaskyFlow server...");

    let config = Config::load().context("failed to load configuration")?;

    let db = taskyflow_db::init(&config)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    info!("Running database migrations...");
    taskyflow_db::migrate(&db)
        .await
        .context("failed to run migrations")?;
    info!("Migrations completed");

    let state = build_state(Arc::new(db), &config);

    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.bind_address()))?;
    info!(%addr, instance = %config.instance.name, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
