mod app_state;
mod config;
mod database;
mod errors;
mod handlers;
mod middleware;
mod models;
mod repositories;
mod routes;
mod services;
mod utils;
mod websocket;

use std::sync::Arc;

use tokio::signal;
use uuid::Uuid;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::{AppConfig, StoreBackend};
use database::init::init_db;
use repositories::{chat_repository::PgChatStore, chat_store::ChatStore, memory_store::MemoryChatStore};
use routes::app_routes::create_router;
use services::{chat_service::ChatService, jwt_service::create_jwt};
use websocket::connection_manager::ConnectionManager;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("support_chat=info,tower_http=info")),
        )
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    // `support_chat issue-token <user-id>` prints a bearer token for local testing.
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("issue-token") {
        match args.get(1).and_then(|id| Uuid::parse_str(id).ok()) {
            Some(user_id) => match create_jwt(user_id, &config.jwt_secret) {
                Ok(token) => println!("{}", token),
                Err(e) => error!("Failed to issue token: {}", e),
            },
            None => error!("Usage: support_chat issue-token <user-id>"),
        }
        return;
    }

    let store: Arc<dyn ChatStore> = match config.store {
        StoreBackend::Postgres => {
            let url = config.database_url.as_deref().unwrap_or_default();
            match init_db(url).await {
                Ok(pool) => Arc::new(PgChatStore::new(pool)),
                Err(e) => {
                    error!("Error initializing the database: {}", e);
                    return;
                }
            }
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory chat store; rooms and messages are lost on restart");
            let store = MemoryChatStore::new();
            for user in &config.seed_users {
                store.upsert_user(user.clone()).await;
            }
            info!("Seeded {} users", config.seed_users.len());
            Arc::new(store)
        }
    };

    let chat = ChatService::new(store, ConnectionManager::new());
    let app = create_router(AppState::new(chat, config.jwt_secret.as_str()));

    info!("Server running on http://{}", config.bind_addr);

    let server = axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal());
    if let Err(e) = server.await {
        error!("Server error: {}", e);
    }
}

// Resolves on Ctrl+C or SIGTERM so in-flight requests can finish.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Signal received, starting graceful shutdown");
}
