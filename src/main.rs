use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use celebchat::{chat, constants::DEFAULT_PORT, web_server, Config, HttpChatClient, Store};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Chat with a celebrity in the terminal.
    Chat,
    /// Serve the chat UI in the browser.
    Serve {
        #[arg(long, default_value_t = DEFAULT_PORT, help = "Port for the web server.")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for CELEBCHAT_API_BASE_URL)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG (e.g., RUST_LOG=celebchat=debug). Logs go to
    // stderr so they never mix with the terminal chat.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("celebchat starting with command: {:?}", cli.command);

    let store = Store::new(Arc::new(HttpChatClient::new(&cli.config)));

    match cli.command {
        Commands::Chat => {
            chat::run_terminal_chat(store)
                .await
                .context("Chat session failed")?;
        }
        Commands::Serve { port } => {
            let server = web_server::start_web_server(port, store);
            tokio::select! {
                res = server => res.context("Web server failed")?,
                _ = tokio::signal::ctrl_c() => info!("Ctrl-C received, shutting down..."),
            }
        }
    }

    info!("Shutdown complete.");
    Ok(())
}
