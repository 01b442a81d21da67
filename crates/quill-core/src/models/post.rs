//! Post model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// Filenames the presentation layer reads for per-blog chrome.
pub const RESERVED_FILENAMES: [&str; 2] = ["_header", "_readme"];

/// A unique identifier for a post, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostId(Uuid);

impl PostId {
    /// Create a new unique post ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for PostId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PostId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A published post, keyed by (owner, filename)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier
    pub id: PostId,
    /// Owning user
    pub user_id: UserId,
    /// Extension-stripped upload name; unique per owner
    pub filename: String,
    pub title: String,
    /// Raw markup exactly as uploaded
    pub text: String,
    pub description: String,
    pub publish_at: DateTime<Utc>,
    /// Owner display name, joined in for rendering
    pub username: Option<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl Post {
    /// Whether this post backs blog chrome rather than a regular entry
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        RESERVED_FILENAMES.contains(&self.filename.as_str())
    }
}
