//! Line-oriented chat client
//!
//! Every stdin line is broadcast. `/list` shows who is logged in and
//! `/quit` logs out and exits.

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use chat_broadcast::{RemoteServer, ServerFrame};

/// Broadcast chat client
#[derive(Parser, Debug)]
#[command(name = "chat_client", version, about = "Broadcast WebSocket chat client")]
struct Args {
    /// Display name
    name: String,

    /// Server endpoint
    #[arg(
        long,
        env = "CHAT_URL",
        default_value = "ws://127.0.0.1:5051/SimpleChatService"
    )]
    url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let (server, mut inbound) = RemoteServer::connect(&args.url).await?;
    server.login(args.name.as_str())?;

    // Print everything the server sends
    let printer = tokio::spawn(async move {
        while let Some(frame) = inbound.recv().await {
            match frame {
                ServerFrame::Message { sender, text } => println!("{}: {}", sender, text),
                ServerFrame::Names { names } => println!("Logged in: {}", names.join(", ")),
                ServerFrame::Error { message, .. } => eprintln!("Error: {}", message),
                ServerFrame::Connected { .. } => {}
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" => break,
            "/list" => server.list()?,
            text => server.send(text)?,
        }
    }

    server.logout()?;
    drop(server);
    let _ = printer.await;

    Ok(())
}
