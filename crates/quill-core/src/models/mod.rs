//! Data models for Quill

mod post;
mod user;

pub use post::{Post, PostId, RESERVED_FILENAMES};
pub use user::{User, UserId};
