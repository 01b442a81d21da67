//! One scp upload session, from command line to committed posts.

use quill_core::db::{PostRepository, UserRepository};
use quill_core::reconcile::{Outcome, ReconcileError, Reconciler, Upload};
use quill_core::{Deadline, User};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};

use crate::command::parse_command;
use crate::config::AppConfig;
use crate::error::{AuthError, ProtocolError, SessionError};
use crate::transfer::TransferReceiver;

/// What the SSH layer knows about the connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRequest {
    pub argv: Vec<String>,
    /// Login name the client connected as
    pub session_user: String,
    /// Key sshd authenticated the client with
    pub public_key: Option<String>,
}

/// Everything a session needs besides its streams
pub struct SessionContext<'a> {
    pub config: &'a AppConfig,
    pub posts: &'a dyn PostRepository,
    pub users: &'a dyn UserRepository,
    pub deadline: Deadline,
}

/// Per-file results of a finished batch
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub outcomes: Vec<Outcome>,
    /// Files rejected or not stored
    pub failures: usize,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SessionStatus {
    /// The command was not an scp invocation
    NotApplicable,
    Completed(SessionReport),
}

/// Run one session to completion.
///
/// File-scoped problems are written to `stderr` as they happen and counted
/// in the report. Anything returned as `Err` ends the session.
pub async fn run_session<R, W, E>(
    ctx: &SessionContext<'_>,
    request: &SessionRequest,
    reader: R,
    writer: W,
    stderr: &mut E,
) -> Result<SessionStatus, SessionError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let Some(info) = parse_command(request.argv.as_slice(), &ctx.config.domain)? else {
        return Ok(SessionStatus::NotApplicable);
    };
    ctx.deadline.check()?;

    let user = authenticate(ctx.users, request)?;
    let Some(username) = user.display_name() else {
        return Err(AuthError::MissingName.into());
    };
    tracing::info!(user = username, path = %info.path, "scp upload session started");

    let mut receiver = TransferReceiver::new(
        reader,
        writer,
        info.path,
        ctx.config.publish.max_file_size,
        ctx.deadline,
    );
    receiver.ready().await?;

    let reconciler = Reconciler::new(ctx.posts, &ctx.config.publish);
    let mut report = SessionReport::default();

    while let Some(entry) = receiver.next_file().await? {
        tracing::debug!(
            file = %entry.filepath,
            mode = %format!("{:o}", entry.mode),
            size = entry.size,
            mtime = entry.mtime,
            atime = entry.atime,
            "file received"
        );
        let upload = Upload {
            name: &entry.name,
            content: &entry.content,
        };
        match reconciler.reconcile(&user.id, &upload, &ctx.deadline) {
            Ok(outcome) => report.outcomes.push(outcome),
            Err(ReconcileError::Deadline(exceeded)) => return Err(exceeded.into()),
            Err(err) => {
                tracing::warn!(file = %entry.filepath, error = %err, "upload rejected");
                report.failures += 1;
                report_line(stderr, &err.to_string())
                    .await
                    .map_err(ProtocolError::Io)?;
            }
        }
    }

    tracing::info!(
        user = username,
        written = report.outcomes.iter().filter(|o| o.is_write()).count(),
        failures = report.failures,
        state = ?receiver.state(),
        "scp upload session finished"
    );
    Ok(SessionStatus::Completed(report))
}

/// Run a session and turn its result into a process exit status.
///
/// Session-fatal errors are reported on `stderr`.
pub async fn serve_session<R, W, E>(
    ctx: &SessionContext<'_>,
    request: &SessionRequest,
    reader: R,
    writer: W,
    mut stderr: E,
) -> u8
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let message = match run_session(ctx, request, reader, writer, &mut stderr).await {
        Ok(SessionStatus::Completed(report)) if report.failures == 0 => return 0,
        Ok(SessionStatus::Completed(_)) => return 1,
        Ok(SessionStatus::NotApplicable) => "only scp uploads are supported".to_string(),
        Err(err) => {
            tracing::error!(error = %err, "scp session failed");
            err.to_string()
        }
    };

    // The client may already be gone; nothing left to report to.
    report_line(&mut stderr, &message).await.ok();
    1
}

async fn report_line<E>(stderr: &mut E, message: &str) -> std::io::Result<()>
where
    E: AsyncWrite + Unpin,
{
    stderr.write_all(format!("{message}\n").as_bytes()).await?;
    stderr.flush().await
}

fn authenticate(
    users: &dyn UserRepository,
    request: &SessionRequest,
) -> Result<User, SessionError> {
    let key = request
        .public_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or(AuthError::MissingKey)?;

    users
        .resolve_user(&request.session_user, key)?
        .ok_or_else(|| AuthError::UnknownKey.into())
}
