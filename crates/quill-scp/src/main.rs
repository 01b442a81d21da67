//! Quill scp endpoint
//!
//! Installed as an sshd forced command: `scp ./posts/*.txt host:` publishes
//! each file as a post. A couple of admin subcommands manage accounts.

mod cli;
mod command;
mod commands;
mod config;
mod error;
mod identity;
mod session;
mod transfer;

use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, PostCommands, UserCommands};
use crate::commands::{run_post_list, run_scp, run_user_add};
use crate::config::AppConfig;
use crate::error::CliError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Only load .env in development; production gets its environment from sshd.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(error) => {
            tracing::error!(%error, "quill-scp failed");
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<u8, CliError> {
    let mut config = AppConfig::from_env()?;
    if let Some(db_path) = cli.db_path {
        config.db_path = db_path;
    }
    init_tracing(config.log_file.as_deref())?;

    match cli.command {
        None => run_scp(cli::ScpArgs::default(), &config).await,
        Some(Commands::Scp(args)) => run_scp(args, &config).await,
        Some(Commands::User {
            command: UserCommands::Add { name, public_key },
        }) => {
            run_user_add(&name, &public_key, &config.db_path)?;
            Ok(0)
        }
        Some(Commands::Post {
            command: PostCommands::List { user, json },
        }) => {
            run_post_list(&user, json, &config.db_path)?;
            Ok(0)
        }
    }
}

/// Stdout carries the scp protocol, so logs go to a file or to stderr.
fn init_tracing(log_file: Option<&Path>) -> std::io::Result<()> {
    let builder = tracing_subscriber::fmt();

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_env_filter(
                    EnvFilter::from_default_env()
                        .add_directive("quill_core=info".parse().expect("valid directive"))
                        .add_directive("quill_scp=info".parse().expect("valid directive")),
                )
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            builder
                .with_env_filter(EnvFilter::from_default_env())
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}
