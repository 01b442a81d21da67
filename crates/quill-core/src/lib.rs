//! quill-core - Core library for Quill
//!
//! This crate contains the post and user models, the markup tokenizer, the
//! storage layer, and the reconciler that turns uploaded files into posts.
//! Transport front-ends (the scp forced command) live in their own crates.

pub mod config;
pub mod content;
pub mod db;
pub mod deadline;
pub mod error;
pub mod markup;
pub mod models;
pub mod reconcile;
pub mod util;

pub use config::PublishConfig;
pub use deadline::Deadline;
pub use error::{Error, Result};
pub use models::{Post, PostId, User, UserId};
