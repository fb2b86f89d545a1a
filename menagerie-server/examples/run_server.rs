//! Example to run the Menagerie relay standalone
//!
//! Run with: cargo run -p menagerie-server --example run_server

use menagerie_server::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::default();

    println!("Starting Menagerie relay on port {}", config.port);
    println!("Rooms at ws://localhost:{}/ws/game_server/<room>/", config.port);

    run_server(config).await
}
