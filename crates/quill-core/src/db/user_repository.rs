//! User and public key repository

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::models::{User, UserId};
use crate::util::{normalize_public_key, unix_millis_now};

/// Trait for resolving and registering the accounts that own posts
pub trait UserRepository {
    /// Resolve the account that authenticated with `public_key`
    ///
    /// `session_user` is the login name the client asked for. Accounts are
    /// keyed by public key alone, so it is only recorded for diagnostics.
    fn resolve_user(&self, session_user: &str, public_key: &str) -> Result<Option<User>>;

    /// Find a user by display name
    fn find_user_by_name(&self, name: &str) -> Result<Option<User>>;

    /// Create a user with the given display name
    fn create_user(&self, name: &str) -> Result<User>;

    /// Authorize `public_key` to publish as `user_id`
    fn link_public_key(&self, user_id: &UserId, public_key: &str) -> Result<()>;
}

/// `SQLite` implementation of `UserRepository`
pub struct SqliteUserRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteUserRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
        let id: String = row.get(0)?;
        Ok(User {
            id: id.parse().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            name: row.get(1)?,
            created_at: row.get(2)?,
        })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn resolve_user(&self, session_user: &str, public_key: &str) -> Result<Option<User>> {
        let Some(key) = normalize_public_key(public_key) else {
            return Ok(None);
        };

        let user = self
            .conn
            .query_row(
                "SELECT u.id, u.name, u.created_at
                 FROM users u
                 JOIN public_keys k ON k.user_id = u.id
                 WHERE k.public_key = ?",
                params![key],
                Self::parse_user,
            )
            .optional()?;

        if user.is_none() {
            tracing::debug!(session_user, "no account linked to public key");
        }
        Ok(user)
    }

    fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, name, created_at FROM users WHERE name = ?",
                params![name],
                Self::parse_user,
            )
            .optional()?;
        Ok(user)
    }

    fn create_user(&self, name: &str) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("User name cannot be empty".into()));
        }

        let user = User {
            id: UserId::new(),
            name: Some(name.to_string()),
            created_at: unix_millis_now(),
        };
        self.conn.execute(
            "INSERT INTO users (id, name, created_at) VALUES (?, ?, ?)",
            params![user.id.as_str(), user.name, user.created_at],
        )?;

        Ok(user)
    }

    fn link_public_key(&self, user_id: &UserId, public_key: &str) -> Result<()> {
        let key = normalize_public_key(public_key)
            .ok_or_else(|| Error::InvalidInput("Public key cannot be empty".into()))?;

        self.conn.execute(
            "INSERT INTO public_keys (user_id, public_key, created_at) VALUES (?, ?, ?)",
            params![user_id.as_str(), key, unix_millis_now()],
        )?;

        Ok(())
    }
}
