//! shoutback-client: TCP request/response client.
//!
//! One-shot with `--message`, a REPL with `--interactive`, or reads the
//! message from stdin when neither is given. Exit code 0 on success, 1 on
//! any unrecoverable failure.

use std::process::ExitCode;

use clap::Parser;
use shoutback::client::Client;
use shoutback::config::{ClientArgs, ClientConfig};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = ClientArgs::parse();

    // Logs go to stderr so responses on stdout stay clean.
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut client = Client::new(ClientConfig::from(&args));

    if let Some(ref message) = args.message {
        return send_one(&mut client, message).await;
    }

    if args.interactive {
        client.interactive().await;
        return ExitCode::SUCCESS;
    }

    // No mode flag: take the message from stdin (piped input).
    let mut input = String::new();
    if let Err(e) = tokio::io::stdin().read_to_string(&mut input).await {
        eprintln!("Failed to read message from stdin: {e}");
        return ExitCode::FAILURE;
    }

    let message = input.trim();
    if message.is_empty() {
        eprintln!("No message provided");
        return ExitCode::FAILURE;
    }

    send_one(&mut client, message).await
}

async fn send_one(client: &mut Client, message: &str) -> ExitCode {
    match client.send_single_message(message).await {
        Some(response) => {
            println!("Server response: {response}");
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("Failed to communicate with server");
            ExitCode::FAILURE
        }
    }
}
