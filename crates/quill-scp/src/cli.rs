use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "quill-scp")]
#[command(about = "Publish plain-text posts uploaded over scp")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to the database file (overrides QUILL_DB_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve one scp upload session (default when run by sshd)
    Scp(ScpArgs),
    /// Manage publishing accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Inspect published posts
    Post {
        #[command(subcommand)]
        command: PostCommands,
    },
}

#[derive(Args, Debug, Default, Clone, PartialEq, Eq)]
pub struct ScpArgs {
    /// Requested command line (defaults to SSH_ORIGINAL_COMMAND)
    #[arg(long, value_name = "COMMAND")]
    pub command: Option<String>,
    /// Session user name (defaults to USER)
    #[arg(long, value_name = "NAME")]
    pub user: Option<String>,
    /// Authenticated public key (defaults to the key in SSH_USER_AUTH)
    #[arg(long, value_name = "KEY")]
    pub public_key: Option<String>,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user and authorize a public key for it
    Add {
        /// Display name
        name: String,
        /// OpenSSH public key line
        public_key: String,
    },
}

#[derive(Subcommand)]
pub enum PostCommands {
    /// List a user's posts
    List {
        /// Display name of the owner
        #[arg(long)]
        user: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
