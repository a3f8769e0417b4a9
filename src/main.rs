//! Broadcast Chat Server - Entry Point
//!
//! Starts the TCP listener and ChatServer actor, accepting connections.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_broadcast::{handle_connection, ChatService, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_broadcast=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chat_broadcast=info")),
        )
        .init();

    let config = Config::parse();

    // Start TCP listener
    let listener = TcpListener::bind(&config.addr).await?;
    info!("Chat server listening on {}", config.endpoint_url());

    // Start the ChatServer actor
    let service = ChatService::spawn(config.command_buffer);
    let service_name: Arc<str> = Arc::from(config.service_name.as_str());

    info!("ChatServer actor started");

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let service = service.clone();
                let service_name = Arc::clone(&service_name);

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, service, service_name).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
