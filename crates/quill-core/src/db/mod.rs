//! Database layer for Quill

mod connection;
mod migrations;
mod post_repository;
mod user_repository;

pub use connection::Database;
pub use post_repository::{NewPost, PostChanges, PostRepository, SqlitePostRepository};
pub use user_repository::{SqliteUserRepository, UserRepository};
