//! Post repository implementation

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection};

use crate::error::{Error, Result};
use crate::models::{Post, PostId, UserId};
use crate::util::unix_millis_now;

const SELECT_POST: &str = "SELECT p.id, p.user_id, p.filename, p.title, p.text, p.description,
        p.publish_at, u.name, p.created_at, p.updated_at
     FROM posts p
     LEFT OUTER JOIN users u ON u.id = p.user_id";

/// Fields for a post that does not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost<'a> {
    pub user_id: &'a UserId,
    pub filename: &'a str,
    pub title: &'a str,
    pub text: &'a str,
    pub description: &'a str,
    pub publish_at: DateTime<Utc>,
}

/// Replacement fields for an existing post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostChanges<'a> {
    pub title: &'a str,
    pub text: &'a str,
    pub description: &'a str,
    pub publish_at: DateTime<Utc>,
}

/// Trait for post storage operations
///
/// This is the only storage surface the reconciler touches. Each mutating
/// call must be atomic on its own.
pub trait PostRepository {
    /// Find the post a user stored under `filename`
    fn find_post_by_filename(&self, user_id: &UserId, filename: &str) -> Result<Option<Post>>;

    /// Insert a new post
    fn insert_post(&self, post: &NewPost<'_>) -> Result<Post>;

    /// Replace the content of an existing post
    fn update_post(&self, id: &PostId, changes: &PostChanges<'_>) -> Result<Post>;

    /// Delete posts by ID
    fn remove_posts(&self, ids: &[PostId]) -> Result<()>;

    /// List a user's posts, newest publish date first
    fn list_posts_for_user(&self, user_id: &UserId) -> Result<Vec<Post>>;
}

/// `SQLite` implementation of `PostRepository`
pub struct SqlitePostRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqlitePostRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn get(&self, id: &PostId) -> Result<Option<Post>> {
        let result = self.conn.query_row(
            &format!("{SELECT_POST} WHERE p.id = ?"),
            params![id.as_str()],
            Self::parse_post,
        );

        match result {
            Ok(post) => Ok(Some(post)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(row_error(e)),
        }
    }

    /// Parse a post from a database row
    fn parse_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
        let id: String = row.get(0)?;
        let user_id: String = row.get(1)?;
        let publish_at: i64 = row.get(6)?;
        Ok(Post {
            id: id.parse().map_err(|e| invalid_column(0, e))?,
            user_id: user_id.parse().map_err(|e| invalid_column(1, e))?,
            filename: row.get(2)?,
            title: row.get(3)?,
            text: row.get(4)?,
            description: row.get(5)?,
            publish_at: DateTime::from_timestamp_millis(publish_at)
                .ok_or_else(|| invalid_column(6, OutOfRange(publish_at)))?,
            username: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

#[derive(Debug)]
struct OutOfRange(i64);

impl std::fmt::Display for OutOfRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timestamp out of range: {}", self.0)
    }
}

impl std::error::Error for OutOfRange {}

fn invalid_column(
    index: usize,
    error: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(error))
}

/// A row that fails to convert is corrupt data, not a driver failure.
fn row_error(error: rusqlite::Error) -> Error {
    match error {
        rusqlite::Error::FromSqlConversionFailure(column, _, source) => {
            Error::Database(format!("corrupt post row, column {column}: {source}"))
        }
        other => other.into(),
    }
}

impl PostRepository for SqlitePostRepository<'_> {
    fn find_post_by_filename(&self, user_id: &UserId, filename: &str) -> Result<Option<Post>> {
        let result = self.conn.query_row(
            &format!("{SELECT_POST} WHERE p.user_id = ? AND p.filename = ?"),
            params![user_id.as_str(), filename],
            Self::parse_post,
        );

        match result {
            Ok(post) => Ok(Some(post)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(row_error(e)),
        }
    }

    fn insert_post(&self, post: &NewPost<'_>) -> Result<Post> {
        let id = PostId::new();
        let now = unix_millis_now();

        self.conn.execute(
            "INSERT INTO posts (id, user_id, filename, title, text, description, publish_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id.as_str(),
                post.user_id.as_str(),
                post.filename,
                post.title,
                post.text,
                post.description,
                post.publish_at.timestamp_millis(),
                now,
                now
            ],
        )?;

        self.get(&id)?.ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn update_post(&self, id: &PostId, changes: &PostChanges<'_>) -> Result<Post> {
        let now = unix_millis_now();

        let rows = self.conn.execute(
            "UPDATE posts SET title = ?, text = ?, description = ?, publish_at = ?, updated_at = ?
             WHERE id = ?",
            params![
                changes.title,
                changes.text,
                changes.description,
                changes.publish_at.timestamp_millis(),
                now,
                id.as_str()
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        self.get(id)?.ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn remove_posts(&self, ids: &[PostId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        self.conn.execute(
            &format!("DELETE FROM posts WHERE id IN ({placeholders})"),
            params_from_iter(ids.iter().map(PostId::as_str)),
        )?;

        Ok(())
    }

    fn list_posts_for_user(&self, user_id: &UserId) -> Result<Vec<Post>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_POST} WHERE p.user_id = ? ORDER BY p.publish_at DESC, p.filename ASC"
        ))?;

        let posts = stmt
            .query_map(params![user_id.as_str()], Self::parse_post)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(row_error)?;

        Ok(posts)
    }
}
