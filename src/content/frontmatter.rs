//! Front-matter codec
//!
//! A post file looks like:
//!
//! ```text
//! ---
//! title: Hello World
//! date: 2024-01-15
//! ---
//!
//! Body in markdown.
//! ```
//!
//! The text is split on the literal `---`. Whatever precedes the first
//! delimiter is dropped, the next segment is the metadata block and the one
//! after it is the body. A `---` inside the body ends the body there.

use indexmap::IndexMap;
use serde::Serialize;

use super::error::{ContentError, ContentResult};

/// Delimiter around the metadata block
pub const DELIMITER: &str = "---";

/// Separator between a metadata key and its value
const KEY_SEPARATOR: &str = ": ";

/// Metadata key holding the thumbnail of a post
pub const THUMBNAIL_KEY: &str = "thumbnail";

/// Metadata block of a post, in the order it appears in the file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FrontMatter {
    entries: IndexMap<String, String>,
}

impl FrontMatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `raw` into its metadata and body.
    ///
    /// `source` names the file in error messages.
    pub fn decode<'a>(source: &str, raw: &'a str) -> ContentResult<(Self, &'a str)> {
        let mut segments = raw.split(DELIMITER).skip(1);
        let (block, body) = match (segments.next(), segments.next()) {
            (Some(block), Some(body)) => (block, body),
            _ => return Err(ContentError::malformed(source)),
        };

        let mut front_matter = FrontMatter::new();
        for line in block.trim().lines() {
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = split_line(line).ok_or_else(|| ContentError::MalformedMetadataLine {
                file: source.to_string(),
                line: line.to_string(),
            })?;
            front_matter.insert(key, value);
        }

        Ok((front_matter, body.trim()))
    }

    /// Encode metadata and body back into post text
    pub fn encode(&self, body: &str) -> String {
        let mut out = String::with_capacity(body.len() + 64);
        out.push_str(DELIMITER);
        out.push('\n');
        for (key, value) in &self.entries {
            out.push_str(key);
            out.push_str(KEY_SEPARATOR);
            out.push_str(value);
            out.push('\n');
        }
        out.push_str(DELIMITER);
        out.push_str("\n\n");
        out.push_str(body);
        out.push('\n');
        out
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split `key: value` on the first separator. A bare `key:` has an empty value.
fn split_line(line: &str) -> Option<(&str, &str)> {
    if let Some((key, value)) = line.split_once(KEY_SEPARATOR) {
        return Some((key.trim(), value.trim()));
    }
    let trimmed = line.trim();
    trimmed
        .strip_suffix(':')
        .filter(|key| !key.is_empty())
        .map(|key| (key.trim(), ""))
}

/// Add `thumbnail: <name>` right after the opening delimiter of `raw`.
///
/// Only the metadata block is touched: any earlier `thumbnail` lines are
/// dropped so the key appears once, everything else stays byte-for-byte.
pub fn inject_thumbnail(source: &str, raw: &str, thumbnail: &str) -> ContentResult<String> {
    let open = raw
        .find(DELIMITER)
        .ok_or_else(|| ContentError::malformed(source))?
        + DELIMITER.len();
    let (head, rest) = raw.split_at(open);

    let close = rest
        .find(DELIMITER)
        .ok_or_else(|| ContentError::malformed(source))?;
    let (block, tail) = rest.split_at(close);

    let kept: String = block
        .split_inclusive('\n')
        .filter(|line| !is_thumbnail_line(line))
        .collect();

    Ok(format!(
        "{}\n{}{}{}{}{}",
        head, THUMBNAIL_KEY, KEY_SEPARATOR, thumbnail, kept, tail
    ))
}

/// Whether `value` can sit on a metadata line without changing how the
/// block splits: no delimiter, no line breaks or other control characters.
pub fn is_valid_value(value: &str) -> bool {
    !value.contains(DELIMITER) && !value.chars().any(char::is_control)
}

fn is_thumbnail_line(line: &str) -> bool {
    line.split_once(':')
        .map(|(key, _)| key.trim() == THUMBNAIL_KEY)
        .unwrap_or(false)
}
