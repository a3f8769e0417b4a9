//! Server configuration
//!
//! Read from the command line with environment variable fallbacks.

use clap::Parser;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:5051";

/// Default name the service is published under
pub const DEFAULT_SERVICE_NAME: &str = "SimpleChatService";

/// Broadcast chat server
#[derive(Parser, Debug, Clone)]
#[command(name = "chat_broadcast", version, about = "Broadcast WebSocket chat server")]
pub struct Config {
    /// Address to listen on
    #[arg(env = "CHAT_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Service name; clients connect to ws://<addr>/<service-name>
    #[arg(long, env = "CHAT_SERVICE_NAME", default_value = DEFAULT_SERVICE_NAME)]
    pub service_name: String,

    /// Channel buffer size for server commands
    #[arg(long, env = "CHAT_COMMAND_BUFFER", default_value_t = 256)]
    pub command_buffer: usize,
}

impl Config {
    /// URL clients should connect to
    pub fn endpoint_url(&self) -> String {
        format!("ws://{}/{}", self.addr, self.service_name)
    }
}
