use std::path::Path;

use quill_core::db::{
    Database, PostRepository, SqlitePostRepository, SqliteUserRepository, UserRepository,
};
use quill_core::Post;
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct PostListItem {
    pub id: String,
    pub filename: String,
    pub title: String,
    pub description: String,
    pub publish_at: String,
    pub updated_at: i64,
    pub text: String,
}

fn post_to_list_item(post: &Post) -> PostListItem {
    PostListItem {
        id: post.id.to_string(),
        filename: post.filename.clone(),
        title: post.title.clone(),
        description: post.description.clone(),
        publish_at: post.publish_at.to_rfc3339(),
        updated_at: post.updated_at,
        text: post.text.clone(),
    }
}

fn format_post_lines(posts: &[Post]) -> Vec<String> {
    if posts.is_empty() {
        return vec!["No posts yet.".to_string()];
    }
    posts
        .iter()
        .map(|post| {
            let marker = if post.is_reserved() { " (reserved)" } else { "" };
            format!(
                "{}  {}  {}{marker}",
                post.publish_at.format("%Y-%m-%d"),
                post.filename,
                post.title
            )
        })
        .collect()
}

pub fn list_user_posts(db: &Database, user: &str) -> Result<Vec<Post>, CliError> {
    let users = SqliteUserRepository::new(db.connection());
    let owner = users
        .find_user_by_name(user)?
        .ok_or_else(|| CliError::UserNotFound(user.to_string()))?;

    let posts = SqlitePostRepository::new(db.connection());
    Ok(posts.list_posts_for_user(&owner.id)?)
}

pub fn run_post_list(user: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = Database::open(db_path)?;
    let posts = list_user_posts(&db, user)?;

    if as_json {
        let json_items = posts.iter().map(post_to_list_item).collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_post_lines(&posts) {
            println!("{line}");
        }
    }

    Ok(())
}
