//! Post model

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::error::ContentResult;
use super::frontmatter::{FrontMatter, THUMBNAIL_KEY};

/// Marker separating the excerpt from the rest of the body
pub const MORE_MARKER: &str = "<!-- more -->";

/// A blog post backed by one markdown file
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    /// Storage file name without the `.md` extension
    pub file_name: String,

    /// Metadata block, in file order
    pub metadata: FrontMatter,

    /// Raw markdown body
    pub body: String,

    /// Thumbnail resolved from the `thumbnail` metadata key
    pub thumbnail: Option<Thumbnail>,
}

/// Where a post thumbnail lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "url", rename_all = "snake_case")]
pub enum Thumbnail {
    /// Absolute URL on another host
    External(String),
    /// Path under the public thumbnail directory, ready to be linked
    Asset(String),
}

impl Thumbnail {
    /// Resolve a metadata value. Relative names are served from `url_prefix`.
    pub fn resolve(value: &str, url_prefix: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        if value.starts_with("http://") || value.starts_with("https://") {
            return Some(Thumbnail::External(value.to_string()));
        }
        Some(Thumbnail::Asset(format!(
            "{}/{}",
            url_prefix.trim_end_matches('/'),
            value.trim_start_matches('/')
        )))
    }

    pub fn url(&self) -> &str {
        match self {
            Thumbnail::External(url) | Thumbnail::Asset(url) => url,
        }
    }
}

impl Post {
    /// Decode a post from its file text
    pub fn parse(file_name: &str, raw: &str, thumbnail_prefix: &str) -> ContentResult<Self> {
        let source = format!("{}.md", file_name);
        let (metadata, body) = FrontMatter::decode(&source, raw)?;
        let thumbnail = metadata
            .get(THUMBNAIL_KEY)
            .and_then(|value| Thumbnail::resolve(value, thumbnail_prefix));

        Ok(Self {
            file_name: file_name.to_string(),
            body: body.to_string(),
            metadata,
            thumbnail,
        })
    }

    /// Title from metadata, falling back to the file name
    pub fn title(&self) -> &str {
        self.metadata
            .get("title")
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.file_name)
    }

    /// Raw `date` metadata value
    pub fn date_str(&self) -> Option<&str> {
        self.metadata.get("date")
    }

    pub fn date(&self) -> Option<NaiveDateTime> {
        self.date_str().and_then(parse_date_string)
    }

    /// Plain excerpt of the body: the part before `<!-- more -->`, or the
    /// whole body, cut to `max_chars` characters.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let text = match self.body.find(MORE_MARKER) {
            Some(pos) => &self.body[..pos],
            None => &self.body,
        };
        let text = text.trim();

        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{}…", truncated.trim_end())
    }
}

/// Parse a date string in the formats posts commonly use
fn parse_date_string(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();

    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for fmt in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc())
}
