//! Line-oriented markup tokenizer
//!
//! Post text is read one line at a time. A short prefix decides what each
//! line becomes:
//!
//! ```text
//! =: <key> <value>      metadata (title, description, publish_at, list_type)
//! => <url> [caption]    link
//! =< <url> [caption]    image
//! > <text>              quoted block
//! ## <text>             second-level header
//! # <text>              first-level header
//! <text>                paragraph
//! ```
//!
//! Tokenizing never fails: malformed metadata degrades to "unset".

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

const META_TOKEN: &str = "=:";
const URL_TOKEN: &str = "=>";
const IMAGE_TOKEN: &str = "=<";
const BLOCK_TOKEN: &str = ">";
const HEADER_TWO_TOKEN: &str = "##";
const HEADER_ONE_TOKEN: &str = "#";

/// Default CSS `list-style-type` for rendered posts.
pub const DEFAULT_LIST_TYPE: &str = "disc";

/// What a tokenized line renders as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Text,
    Url,
    Image,
    Block,
    HeaderOne,
    HeaderTwo,
}

/// One visible line of a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub value: String,
    /// Link or image target; only set for `Url` and `Image` items
    pub url: Option<String>,
    pub kind: ItemKind,
}

impl ListItem {
    fn new(kind: ItemKind, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            url: None,
            kind,
        }
    }

    fn linked(kind: ItemKind, rest: &str) -> Self {
        let (key, value) = split_token(rest);
        let value = if value.is_empty() { key } else { value };
        Self {
            value: value.to_string(),
            url: Some(key.to_string()),
            kind,
        }
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.value.is_empty()
    }
}

/// Out-of-band fields collected from `=:` lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaData {
    pub title: String,
    pub description: String,
    pub publish_at: Option<DateTime<Utc>>,
    pub list_type: String,
}

impl Default for MetaData {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            publish_at: None,
            list_type: DEFAULT_LIST_TYPE.to_string(),
        }
    }
}

impl MetaData {
    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "title" => self.title = value.to_string(),
            "description" => self.description = value.to_string(),
            "list_type" => self.list_type = value.to_string(),
            "publish_at" => {
                if let Some(publish_at) = parse_publish_at(value) {
                    self.publish_at = Some(publish_at);
                } else {
                    tracing::debug!(value, "ignoring malformed publish_at");
                }
            }
            _ => tracing::debug!(key, "ignoring unknown metadata key"),
        }
    }
}

/// Tokenizer output: visible items in order plus the metadata record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedText {
    pub items: Vec<ListItem>,
    pub meta: MetaData,
}

/// Tokenize post text into items and metadata.
///
/// # Examples
///
/// ```
/// use quill_core::markup::{parse_text, ItemKind};
///
/// let parsed = parse_text("=: title Hello World\n## Intro\nfirst line");
/// assert_eq!(parsed.meta.title, "Hello World");
/// assert_eq!(parsed.items[0].kind, ItemKind::HeaderTwo);
/// assert_eq!(parsed.items.len(), 2);
/// ```
#[must_use]
pub fn parse_text(text: &str) -> ParsedText {
    let mut meta = MetaData::default();
    let mut items: Vec<ListItem> = Vec::new();

    for line in split_lines(text) {
        let line = line.trim_matches(' ');

        let item = if let Some(rest) = line.strip_prefix(META_TOKEN) {
            let (key, value) = split_token(rest);
            meta.apply(key, value);
            continue;
        } else if let Some(rest) = line.strip_prefix(URL_TOKEN) {
            ListItem::linked(ItemKind::Url, rest)
        } else if let Some(rest) = line.strip_prefix(IMAGE_TOKEN) {
            ListItem::linked(ItemKind::Image, rest)
        } else if let Some(rest) = line.strip_prefix(BLOCK_TOKEN) {
            ListItem::new(ItemKind::Block, rest.trim_matches(' '))
        } else if let Some(rest) = line.strip_prefix(HEADER_TWO_TOKEN) {
            ListItem::new(ItemKind::HeaderTwo, rest.trim_matches(' '))
        } else if let Some(rest) = line.strip_prefix(HEADER_ONE_TOKEN) {
            ListItem::new(ItemKind::HeaderOne, rest.trim_matches(' '))
        } else {
            ListItem::new(ItemKind::Text, line)
        };

        if item.is_blank() && items.last().is_some_and(ListItem::is_blank) {
            continue;
        }
        items.push(item);
    }

    if items.last().is_some_and(ListItem::is_blank) {
        items.pop();
    }

    ParsedText { items, meta }
}

/// Normalize CRLF line endings and split on LF.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

/// Split `key value...` on the first space.
///
/// Without a space the whole (trimmed) input is both key and value.
pub fn split_token(text: &str) -> (&str, &str) {
    let text = text.trim_matches(' ');
    match text.split_once(' ') {
        Some((key, value)) => (key, value.trim_matches(' ')),
        None => (text, text),
    }
}

/// Parse a `YYYY-MM-DD` date as midnight UTC.
pub fn parse_publish_at(value: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use pretty_assertions::assert_eq;

    fn text(value: &str) -> ListItem {
        ListItem::new(ItemKind::Text, value)
    }

    #[test]
    fn plain_lines_become_text_items_with_default_meta() {
        let parsed = parse_text("first\nsecond\nthird");

        assert_eq!(parsed.items, vec![text("first"), text("second"), text("third")]);
        assert_eq!(parsed.meta, MetaData::default());
        assert_eq!(parsed.meta.list_type, "disc");
        assert!(parsed.meta.title.is_empty());
        assert!(parsed.meta.description.is_empty());
        assert!(parsed.meta.publish_at.is_none());
    }

    #[test]
    fn title_metadata_is_collected_and_hidden() {
        let parsed = parse_text("=: title Hello World\nbody text");

        assert_eq!(parsed.meta.title, "Hello World");
        assert_eq!(parsed.items, vec![text("body text")]);
    }

    #[test]
    fn all_metadata_keys_are_recognized() {
        let parsed = parse_text(
            "=: description a short list\n=: list_type square\n=: publish_at 2022-08-03\nitem",
        );

        assert_eq!(parsed.meta.description, "a short list");
        assert_eq!(parsed.meta.list_type, "square");
        let publish_at = parsed.meta.publish_at.unwrap();
        assert_eq!(
            (publish_at.year(), publish_at.month(), publish_at.day()),
            (2022, 8, 3)
        );
        assert_eq!(publish_at.hour(), 0);
        assert_eq!(parsed.items, vec![text("item")]);
    }

    #[test]
    fn malformed_date_and_unknown_key_are_ignored() {
        let parsed = parse_text("=: publish_at next-tuesday\n=: colour blue\n=: publish_at 2022-02-30\nok");

        assert!(parsed.meta.publish_at.is_none());
        assert_eq!(parsed.meta, MetaData::default());
        assert_eq!(parsed.items, vec![text("ok")]);
    }

    #[test]
    fn link_with_caption() {
        let parsed = parse_text("=> https://example.com Example Site");

        assert_eq!(
            parsed.items,
            vec![ListItem {
                value: "Example Site".to_string(),
                url: Some("https://example.com".to_string()),
                kind: ItemKind::Url,
            }]
        );
    }

    #[test]
    fn link_without_caption_uses_url_as_value() {
        let parsed = parse_text("=> https://example.com");

        assert_eq!(parsed.items[0].kind, ItemKind::Url);
        assert_eq!(parsed.items[0].value, "https://example.com");
        assert_eq!(parsed.items[0].url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn image_uses_link_split_rule() {
        let parsed = parse_text("=< https://example.com/cat.png a cat");

        assert_eq!(parsed.items[0].kind, ItemKind::Image);
        assert_eq!(parsed.items[0].value, "a cat");
        assert_eq!(
            parsed.items[0].url.as_deref(),
            Some("https://example.com/cat.png")
        );
    }

    #[test]
    fn headers_and_blocks() {
        let parsed = parse_text("## Title\n# Top\n> quoted words");

        assert_eq!(
            parsed.items,
            vec![
                ListItem::new(ItemKind::HeaderTwo, "Title"),
                ListItem::new(ItemKind::HeaderOne, "Top"),
                ListItem::new(ItemKind::Block, "quoted words"),
            ]
        );
    }

    #[test]
    fn blank_runs_collapse_and_trailing_blank_is_dropped() {
        let parsed = parse_text("one\n\n\n\ntwo\n\n");

        assert_eq!(parsed.items, vec![text("one"), text(""), text("two")]);
    }

    #[test]
    fn crlf_is_normalized() {
        let parsed = parse_text("=: title Windows\r\nline one\r\nline two\r\n");

        assert_eq!(parsed.meta.title, "Windows");
        assert_eq!(parsed.items, vec![text("line one"), text("line two")]);
    }

    #[test]
    fn text_lines_are_trimmed() {
        let parsed = parse_text("   padded   ");
        assert_eq!(parsed.items, vec![text("padded")]);
    }

    #[test]
    fn empty_input_has_no_items() {
        assert!(parse_text("").items.is_empty());
    }

    #[test]
    fn split_token_without_space_repeats_input() {
        assert_eq!(split_token(" https://a.b "), ("https://a.b", "https://a.b"));
        assert_eq!(split_token("key  spaced value "), ("key", "spaced value"));
    }
}
