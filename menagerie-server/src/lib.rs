//! Menagerie Server - room relay for networked matches
//!
//! This crate provides the web backend:
//! - WebSocket relay at `/ws/game_server/:room/`
//! - REST endpoints for status, rooms, rules and fresh boards
//! - Static file serving for the browser client

mod routes;
mod state;

use axum::{routing::get, Router};
use menagerie_core::{EngineConfig, RuleFlags};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

pub use state::ServerState;

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: String,
    /// Board shape and pawn set handed to clients
    pub engine: EngineConfig,
    /// Rule toggles advertised to clients
    pub rules: RuleFlags,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            static_dir: "public".to_string(),
            engine: EngineConfig::default(),
            rules: RuleFlags::default(),
        }
    }
}

impl ServerConfig {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_static_dir(mut self, dir: impl Into<String>) -> Self {
        self.static_dir = dir.into();
        self
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_rules(mut self, rules: RuleFlags) -> Self {
        self.rules = rules;
        self
    }
}

/// Create the router with all routes
pub fn create_router(config: &ServerConfig, state: Arc<ServerState>) -> Router {
    let static_service = ServeDir::new(&config.static_dir);

    Router::new()
        .route("/api/status", get(routes::status::status_handler))
        .route("/api/rooms", get(routes::rooms::list_rooms))
        .route("/api/rules", get(routes::rulesets::get_rules))
        .route("/api/board", get(routes::board::new_board))
        // Relay
        .route("/ws/game_server/:room/", get(routes::relay::relay_socket))
        .with_state(state)
        .layer(CorsLayer::permissive())
        // Static file serving (must be last)
        .fallback_service(static_service)
}

/// Start the HTTP server
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    config.engine.validate()?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = Arc::new(ServerState::new(config.engine.clone(), config.rules));
    let router = create_router(&config, state);

    tracing::info!("Menagerie relay starting on http://0.0.0.0:{}", config.port);
    tracing::info!("Static files served from: {}", config.static_dir);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
