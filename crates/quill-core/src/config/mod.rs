//! Content policy shared by every upload front-end.
//!
//! Built once at startup and passed by reference into the reconciler.

use serde::{Deserialize, Serialize};

/// Default maximum accepted upload size (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Number of leading bytes inspected by the plain-text check.
pub const TEXT_SNIFF_LEN: usize = 1024;

/// Rules an uploaded file must satisfy before it may become a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Lowercase extensions, with the leading dot
    pub allowed_extensions: Vec<String>,
    /// Uploads declaring more bytes than this are refused
    pub max_file_size: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: vec![".txt".to_string()],
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl PublishConfig {
    /// Build a policy from a comma separated extension list such as `.txt,.md`.
    ///
    /// Entries are trimmed and lowercased; a missing leading dot is added.
    pub fn with_extension_list(mut self, list: &str) -> Self {
        let extensions: Vec<String> = list
            .split(',')
            .map(|ext| ext.trim().to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext != ".")
            .map(|ext| {
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{ext}")
                }
            })
            .collect();
        if !extensions.is_empty() {
            self.allowed_extensions = extensions;
        }
        self
    }

    #[must_use]
    pub const fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Whether `extension` (with leading dot) is on the allow-list.
    pub fn allows_extension(&self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        self.allowed_extensions.iter().any(|allowed| *allowed == extension)
    }
}
