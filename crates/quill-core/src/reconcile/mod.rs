//! Turn an uploaded file into at most one post mutation.
//!
//! | stored post | upload empty | action                    |
//! |-------------|--------------|---------------------------|
//! | none        | yes          | skip                      |
//! | none        | no           | insert                    |
//! | some        | yes          | delete                    |
//! | some        | no, same     | nothing                   |
//! | some        | no, changed  | update                    |
//!
//! Every path performs exactly one storage mutation or none.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::PublishConfig;
use crate::content::{file_extension, is_text_file, sanitize_filename};
use crate::db::{NewPost, PostChanges, PostRepository};
use crate::deadline::{Deadline, DeadlineExceeded};
use crate::markup::{parse_text, MetaData};
use crate::models::{Post, PostId, UserId};


/// One uploaded file, as the transport handed it over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upload<'a> {
    /// Name the client sent, extension included
    pub name: &'a str,
    pub content: &'a [u8],
}

/// What reconciling an upload did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(Post),
    Updated(Post),
    Deleted { filename: String },
    Unchanged { filename: String },
    /// Empty upload with nothing stored under its name
    Skipped { filename: String },
}

impl Outcome {
    pub fn filename(&self) -> &str {
        match self {
            Self::Created(post) | Self::Updated(post) => &post.filename,
            Self::Deleted { filename }
            | Self::Unchanged { filename }
            | Self::Skipped { filename } => filename,
        }
    }

    /// Whether storage was written
    pub const fn is_write(&self) -> bool {
        matches!(self, Self::Created(_) | Self::Updated(_) | Self::Deleted { .. })
    }
}

/// Errors scoped to a single upload
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The upload is not an acceptable text file; nothing was stored
    #[error("WARNING: ({name}) invalid file, {reason}, skipping")]
    Validation { name: String, reason: String },

    /// The storage backend failed while handling `filename`
    #[error("error for {filename}: {source}")]
    Storage {
        filename: String,
        #[source]
        source: crate::Error,
    },

    #[error(transparent)]
    Deadline(#[from] DeadlineExceeded),
}

impl ReconcileError {
    fn storage(filename: &str) -> impl FnOnce(crate::Error) -> Self + '_ {
        move |source| Self::Storage {
            filename: filename.to_string(),
            source,
        }
    }
}

/// The decision for one upload, before it is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Skip,
    Insert {
        title: String,
        description: String,
        publish_at: DateTime<Utc>,
    },
    Delete(PostId),
    Unchanged(PostId),
    Update {
        id: PostId,
        title: String,
        description: String,
        publish_at: DateTime<Utc>,
    },
}

/// Decide what to do with `text` given the post already stored under `filename`.
///
/// Pure: `now` stands in for the clock so the table can be tested directly.
pub fn decide(
    existing: Option<&Post>,
    filename: &str,
    text: &str,
    meta: &MetaData,
    now: DateTime<Utc>,
) -> Decision {
    let title = if meta.title.is_empty() {
        filename.to_string()
    } else {
        meta.title.clone()
    };
    let description = meta.description.clone();

    match existing {
        None if text.is_empty() => Decision::Skip,
        None => Decision::Insert {
            title,
            description,
            publish_at: meta.publish_at.unwrap_or(now),
        },
        Some(post) if text.is_empty() => Decision::Delete(post.id),
        Some(post) if post.text == text => Decision::Unchanged(post.id),
        Some(post) => Decision::Update {
            id: post.id,
            title,
            description,
            publish_at: meta.publish_at.unwrap_or(post.publish_at),
        },
    }
}

/// Applies the decision table against a post repository
pub struct Reconciler<'a, P: PostRepository + ?Sized> {
    posts: &'a P,
    config: &'a PublishConfig,
}

impl<'a, P: PostRepository + ?Sized> Reconciler<'a, P> {
    pub const fn new(posts: &'a P, config: &'a PublishConfig) -> Self {
        Self { posts, config }
    }

    /// Validate, tokenize and commit one upload for `user_id`.
    pub fn reconcile(
        &self,
        user_id: &UserId,
        upload: &Upload<'_>,
        deadline: &Deadline,
    ) -> Result<Outcome, ReconcileError> {
        let text = self.validate(upload)?;
        let filename = sanitize_filename(upload.name);

        deadline.check()?;
        let existing = self
            .posts
            .find_post_by_filename(user_id, filename)
            .map_err(ReconcileError::storage(filename))?;

        let parsed = parse_text(text);
        let decision = decide(existing.as_ref(), filename, text, &parsed.meta, Utc::now());

        if !matches!(decision, Decision::Skip | Decision::Unchanged(_)) {
            deadline.check()?;
        }
        self.apply(user_id, filename, text, decision)
    }

    fn validate<'u>(&self, upload: &Upload<'u>) -> Result<&'u str, ReconcileError> {
        let invalid = |reason: String| ReconcileError::Validation {
            name: upload.name.to_string(),
            reason,
        };

        if sanitize_filename(upload.name).trim().is_empty() {
            return Err(invalid("filename cannot be empty".to_string()));
        }
        if !is_text_file(upload.name, upload.content, self.config) {
            return Err(invalid(format!(
                "format must be {} and the contents must be plain text",
                self.allowed_extensions(),
            )));
        }
        std::str::from_utf8(upload.content).map_err(|_| {
            invalid(format!(
                "contents of '{}' upload are not valid UTF-8",
                file_extension(upload.name)
            ))
        })
    }

    fn allowed_extensions(&self) -> String {
        self.config
            .allowed_extensions
            .iter()
            .map(|ext| format!("'{ext}'"))
            .collect::<Vec<_>>()
            .join(" or ")
    }

    fn apply(
        &self,
        user_id: &UserId,
        filename: &str,
        text: &str,
        decision: Decision,
    ) -> Result<Outcome, ReconcileError> {
        let filename_owned = || filename.to_string();

        match decision {
            Decision::Skip => {
                tracing::info!(filename, "empty upload with no stored post, skipping");
                Ok(Outcome::Skipped {
                    filename: filename_owned(),
                })
            }
            Decision::Unchanged(id) => {
                tracing::info!(filename, %id, "content unchanged, skipping write");
                Ok(Outcome::Unchanged {
                    filename: filename_owned(),
                })
            }
            Decision::Delete(id) => {
                tracing::info!(filename, %id, "empty upload, removing post");
                self.posts
                    .remove_posts(&[id])
                    .map_err(ReconcileError::storage(filename))?;
                Ok(Outcome::Deleted {
                    filename: filename_owned(),
                })
            }
            Decision::Insert {
                title,
                description,
                publish_at,
            } => {
                tracing::info!(filename, "post not found, adding");
                let post = self
                    .posts
                    .insert_post(&NewPost {
                        user_id,
                        filename,
                        title: &title,
                        text,
                        description: &description,
                        publish_at,
                    })
                    .map_err(ReconcileError::storage(filename))?;
                Ok(Outcome::Created(post))
            }
            Decision::Update {
                id,
                title,
                description,
                publish_at,
            } => {
                tracing::info!(filename, %id, "post found, updating");
                let post = self
                    .posts
                    .update_post(
                        &id,
                        &PostChanges {
                            title: &title,
                            text,
                            description: &description,
                            publish_at,
                        },
                    )
                    .map_err(ReconcileError::storage(filename))?;
                Ok(Outcome::Updated(post))
            }
        }
    }
}
