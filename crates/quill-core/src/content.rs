//! Upload name sanitizing and the plain-text heuristic.

use crate::config::{PublishConfig, TEXT_SNIFF_LEN};

/// Extension of an upload name, including the leading dot.
///
/// Returns an empty string when the name has no extension. A leading dot
/// alone (`.profile`) counts as an extension, so such names sanitize to "".
pub fn file_extension(name: &str) -> &str {
    name.rfind('.').map_or("", |index| &name[index..])
}

/// Strip the extension from an upload name, yielding the post filename.
///
/// # Examples
///
/// ```
/// use quill_core::content::sanitize_filename;
///
/// assert_eq!(sanitize_filename("hello-world.txt"), "hello-world");
/// assert_eq!(sanitize_filename("notes.v2.txt"), "notes.v2");
/// assert_eq!(sanitize_filename("README"), "README");
/// ```
pub fn sanitize_filename(name: &str) -> &str {
    let extension = file_extension(name);
    &name[..name.len() - extension.len()]
}

/// Report whether a prefix of `bytes` looks like human-readable text.
///
/// Only the first [`TEXT_SNIFF_LEN`] bytes are inspected. They must be
/// valid UTF-8, except that a code point cut off by the prefix boundary is
/// tolerated, and contain no character below U+0020 other than tab,
/// newline and form feed. Carriage returns count as binary.
pub fn looks_like_text(bytes: &[u8]) -> bool {
    let prefix = &bytes[..bytes.len().min(TEXT_SNIFF_LEN)];
    let text = match std::str::from_utf8(prefix) {
        Ok(text) => text,
        // error_len() is None when the input merely ends mid code point
        Err(error) if error.error_len().is_none() && prefix.len() < bytes.len() => {
            match std::str::from_utf8(&prefix[..error.valid_up_to()]) {
                Ok(text) => text,
                Err(_) => return false,
            }
        }
        Err(_) => return false,
    };

    !text
        .chars()
        .any(|c| c < ' ' && !matches!(c, '\t' | '\n' | '\x0c'))
}

/// Check an upload against the extension allow-list and text heuristic.
pub fn is_text_file(name: &str, bytes: &[u8], config: &PublishConfig) -> bool {
    config.allows_extension(file_extension(name)) && looks_like_text(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_last_extension_only() {
        assert_eq!(sanitize_filename("post.txt"), "post");
        assert_eq!(sanitize_filename("archive.tar.txt"), "archive.tar");
        assert_eq!(sanitize_filename("_header.txt"), "_header");
        assert_eq!(sanitize_filename(".txt"), "");
        assert_eq!(sanitize_filename("plain"), "plain");
    }

    #[test]
    fn extension_includes_dot() {
        assert_eq!(file_extension("post.txt"), ".txt");
        assert_eq!(file_extension("post"), "");
    }

    #[test]
    fn text_heuristic_accepts_common_whitespace() {
        assert!(looks_like_text(b"line one\n\tindented\n\x0cpage"));
        assert!(looks_like_text("caf\u{e9} \u{1f600}".as_bytes()));
        assert!(looks_like_text(b""));
    }

    #[test]
    fn text_heuristic_rejects_control_bytes_and_bad_utf8() {
        assert!(!looks_like_text(b"hello\x00world"));
        assert!(!looks_like_text(b"bell\x07"));
        assert!(!looks_like_text(&[0xff, 0xfe, b'a']));
    }

    #[test]
    fn text_heuristic_rejects_carriage_return() {
        assert!(!looks_like_text(b"a\r\nb"));
        assert!(!looks_like_text(b"trailing\r"));
    }

    #[test]
    fn text_heuristic_accepts_del_and_c1() {
        assert!(looks_like_text(b"a\x7fb"));
        assert!(looks_like_text("a\u{85}b".as_bytes()));
    }

    #[test]
    fn text_heuristic_only_inspects_prefix() {
        let mut bytes = vec![b'a'; TEXT_SNIFF_LEN];
        bytes.push(0);
        assert!(looks_like_text(&bytes));
    }

    #[test]
    fn text_heuristic_tolerates_code_point_split_by_prefix() {
        let mut bytes = vec![b'a'; TEXT_SNIFF_LEN - 1];
        bytes.extend_from_slice("\u{e9}".as_bytes());
        assert!(looks_like_text(&bytes));
    }

    #[test]
    fn text_file_requires_allowed_extension() {
        let config = PublishConfig::default();
        assert!(is_text_file("post.txt", b"hello", &config));
        assert!(!is_text_file("post.md", b"hello", &config));
        assert!(!is_text_file("post.txt", b"\x00\x01", &config));
    }
}
