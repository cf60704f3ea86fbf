// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Solace - a real-time therapeutic conversation engine.
//!
//! This is the binary entry point.

mod serve;
mod token;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Solace - a real-time therapeutic conversation engine.
#[derive(Parser, Debug)]
#[command(name = "solace", version, about, long_about = None)]
struct Cli {
    /// Path to an explicit config file (default: XDG hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the conversation engine and gateway.
    Serve,
    /// Mint a bearer token for a user.
    Token(TokenArgs),
}

/// Arguments for `solace token`.
#[derive(Args, Debug)]
struct TokenArgs {
    /// User id the token is minted for.
    #[arg(long)]
    user_id: String,

    /// Token lifetime in seconds (default: auth.token_ttl_secs).
    #[arg(long)]
    ttl_secs: Option<u64>,

    /// Create the user row in the store if it does not exist yet.
    #[arg(long)]
    create_user: bool,

    /// Email for a newly created user row.
    #[arg(long)]
    email: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => solace_config::load_config_from_path(path),
        None => solace_config::load_config(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("solace: invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Token(args)) => token::run_token(config, args).await,
        None => {
            println!("solace: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("solace: {e}");
        std::process::exit(1);
    }
}
