use std::path::PathBuf;

use quill_core::db::{Database, SqlitePostRepository, SqliteUserRepository};
use quill_core::Deadline;
use tokio::io::BufReader;

use crate::cli::ScpArgs;
use crate::command::split_command;
use crate::config::AppConfig;
use crate::error::CliError;
use crate::identity::read_auth_info;
use crate::session::{serve_session, SessionContext, SessionRequest};

/// Serve the scp session sshd attached to this process.
pub async fn run_scp(args: ScpArgs, config: &AppConfig) -> Result<u8, CliError> {
    let deadline = Deadline::after(config.session_timeout);
    let request = build_request(args, |name| std::env::var(name).ok()).await;

    let db = Database::open(&config.db_path)?;
    let posts = SqlitePostRepository::new(db.connection());
    let users = SqliteUserRepository::new(db.connection());
    let ctx = SessionContext {
        config,
        posts: &posts,
        users: &users,
        deadline,
    };

    Ok(serve_session(
        &ctx,
        &request,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        tokio::io::stderr(),
    )
    .await)
}

/// Fill in the session request from flags, falling back to what sshd exports.
async fn build_request(
    args: ScpArgs,
    lookup: impl Fn(&str) -> Option<String>,
) -> SessionRequest {
    let command = args
        .command
        .or_else(|| lookup("SSH_ORIGINAL_COMMAND"))
        .unwrap_or_default();
    let session_user = args.user.or_else(|| lookup("USER")).unwrap_or_default();

    let public_key = match args.public_key {
        Some(key) => Some(key),
        None => match lookup("SSH_USER_AUTH") {
            Some(path) => read_auth_info(&PathBuf::from(&path))
                .await
                .inspect_err(|error| {
                    tracing::warn!(path = %path, %error, "could not read SSH_USER_AUTH");
                })
                .ok()
                .flatten(),
            None => None,
        },
    };

    SessionRequest {
        argv: split_command(&command),
        session_user,
        public_key,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[tokio::test]
    async fn falls_back_to_sshd_environment() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "publickey ssh-ed25519 AAAAenv\n").unwrap();
        let auth_path = tmp.path().to_string_lossy().to_string();

        let request = build_request(
            ScpArgs::default(),
            env(&[
                ("SSH_ORIGINAL_COMMAND", "scp -t ."),
                ("USER", "hana"),
                ("SSH_USER_AUTH", &auth_path),
            ]),
        )
        .await;

        assert_eq!(
            request,
            SessionRequest {
                argv: vec!["scp".into(), "-t".into(), ".".into()],
                session_user: "hana".into(),
                public_key: Some("ssh-ed25519 AAAAenv".into()),
            }
        );
    }

    #[tokio::test]
    async fn flags_override_environment() {
        let args = ScpArgs {
            command: Some("scp -t posts".into()),
            user: Some("ivy".into()),
            public_key: Some("ssh-rsa AAAAflag".into()),
        };
        let request = build_request(
            args,
            env(&[("SSH_ORIGINAL_COMMAND", "ls"), ("USER", "root")]),
        )
        .await;

        assert_eq!(request.argv, vec!["scp", "-t", "posts"]);
        assert_eq!(request.session_user, "ivy");
        assert_eq!(request.public_key.as_deref(), Some("ssh-rsa AAAAflag"));
    }

    #[tokio::test]
    async fn unreadable_auth_info_means_no_key() {
        let request = build_request(
            ScpArgs::default(),
            env(&[("SSH_USER_AUTH", "/nonexistent/quill-auth-info")]),
        )
        .await;

        assert_eq!(request.public_key, None);
        assert!(request.argv.is_empty());
    }
}
