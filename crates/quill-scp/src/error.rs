use std::io;

use quill_core::deadline::DeadlineExceeded;
use thiserror::Error;

/// Wire-level failures; each one ends the session
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("recursive not supported, try copying individual files instead: `scp ./blog/*.txt {domain}:`")]
    Recursive { domain: String },
    #[error("copying from server to client not supported")]
    CopyToClient,
    #[error("no scp operation requested")]
    MissingOperation,
    #[error("protocol error: expected a control line, got byte {0:#04x}")]
    UnexpectedByte(u8),
    #[error("client reported an error: {0}")]
    Client(String),
    #[error("protocol error: malformed control line {0:?}")]
    MalformedControl(String),
    #[error("protocol error: malformed timestamp line {0:?}")]
    MalformedTimestamp(String),
    #[error("protocol error: invalid file name {0:?}")]
    InvalidName(String),
    #[error("protocol error: control line exceeds {0} bytes")]
    LineTooLong(usize),
    #[error("{name} is {size} bytes, larger than the {max} byte limit")]
    FileTooLarge { name: String, size: u64, max: u64 },
    #[error("protocol error: expected end-of-file marker, got byte {0:#04x}")]
    MissingTerminator(u8),
    #[error("protocol error: unexpected end of stream")]
    UnexpectedEof,
    #[error("protocol error: transfer already failed")]
    Aborted,
    #[error("session deadline exceeded")]
    DeadlineExceeded,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<DeadlineExceeded> for ProtocolError {
    fn from(_: DeadlineExceeded) -> Self {
        Self::DeadlineExceeded
    }
}

/// The caller could not be tied to a publishing account
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("key not found")]
    MissingKey,
    #[error("no account is linked to this key")]
    UnknownKey,
    #[error("must have username set")]
    MissingName,
}

/// Failures that abort a whole session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("failed to resolve account: {0}")]
    Storage(#[from] quill_core::Error),
    #[error("session deadline exceeded")]
    Deadline,
}

impl From<DeadlineExceeded> for SessionError {
    fn from(_: DeadlineExceeded) -> Self {
        Self::Deadline
    }
}

/// Errors from the admin subcommands
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] quill_core::Error),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("User not found: {0}")]
    UserNotFound(String),
}
