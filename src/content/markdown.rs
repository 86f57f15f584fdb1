//! Markdown rendering for the public blog view

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;
use thiserror::Error;

use super::post::MORE_MARKER;

const DEFAULT_THEME: &str = "InspiredGitHub";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to highlight code block: {0}")]
    Highlight(#[from] syntect::Error),

    #[error("Unknown highlighting theme: {0}")]
    UnknownTheme(String),
}

/// Markdown to HTML converter.
///
/// Raw HTML embedded in the markdown is escaped rather than passed
/// through, link and image targets are limited to web and mail URLs, and
/// fenced code blocks are highlighted.
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self::with_theme(DEFAULT_THEME)
    }

    pub fn with_theme(theme: &str) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: theme.to_string(),
        }
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> Result<String, RenderError> {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS;
        let parser = Parser::new_ext(markdown, options);

        let mut events: Vec<Event> = Vec::new();
        // Some(lang) while inside a code block
        let mut code_block: Option<Option<String>> = None;
        let mut code = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => code_language(&info),
                        CodeBlockKind::Indented => None,
                    };
                    code_block = Some(lang);
                    code.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    let lang = code_block.take().flatten();
                    let highlighted = self.highlight_code(&code, lang.as_deref())?;
                    events.push(Event::Html(CowStr::from(highlighted)));
                }
                Event::Text(text) if code_block.is_some() => code.push_str(&text),
                // The excerpt marker only matters to listings
                Event::Html(raw) | Event::InlineHtml(raw) if raw.trim() == MORE_MARKER => {}
                Event::Html(raw) | Event::InlineHtml(raw) => events.push(Event::Text(raw)),
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => events.push(Event::Start(Tag::Link {
                    link_type,
                    dest_url: safe_url(dest_url),
                    title,
                    id,
                })),
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => events.push(Event::Start(Tag::Image {
                    link_type,
                    dest_url: safe_url(dest_url),
                    title,
                    id,
                })),
                other => events.push(other),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        Ok(html_output)
    }

    fn theme(&self) -> Result<&Theme, RenderError> {
        self.theme_set
            .themes
            .get(&self.theme_name)
            .ok_or_else(|| RenderError::UnknownTheme(self.theme_name.clone()))
    }

    fn highlight_code(&self, code: &str, lang: Option<&str>) -> Result<String, RenderError> {
        let lang = lang.unwrap_or("text");
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let highlighted = highlighted_html_for_string(code, &self.syntax_set, syntax, self.theme()?)?;
        Ok(format!(
            r#"<figure class="highlight language-{}">{}</figure>"#,
            lang, highlighted
        ))
    }
}

/// First word of a fence info string, if it looks like a language name
fn code_language(info: &str) -> Option<String> {
    let lang = info.split_whitespace().next()?;
    let allowed = |c: char| c.is_ascii_alphanumeric() || "_+#.-".contains(c);
    lang.chars().all(allowed).then(|| lang.to_string())
}

/// Keep relative URLs and http, https or mailto ones; anything else becomes `#`
fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let compact: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    let scheme_end = compact.find(':');
    let path_start = compact.find(['/', '?', '#']);
    let scheme = match (scheme_end, path_start) {
        (Some(colon), Some(path)) if path < colon => None,
        (Some(colon), _) => Some(&compact[..colon]),
        (None, _) => None,
    };

    match scheme {
        None | Some("http") | Some("https") | Some("mailto") => url,
        Some(other) => {
            tracing::debug!("Dropping link with scheme {:?}", other);
            CowStr::Borrowed("#")
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}
