//! Site templates using the Tera template engine
//!
//! Templates are embedded in the binary. HTML autoescaping stays on; only
//! rendered post bodies are marked `safe`.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::Post;
use crate::convert::{Conversion, ConvertError};

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("index.html", include_str!("site/index.html")),
            ("about.html", include_str!("site/about.html")),
            ("other_tool.html", include_str!("site/other_tool.html")),
            ("blog.html", include_str!("site/blog.html")),
            ("post.html", include_str!("site/post.html")),
            ("admin.html", include_str!("site/admin.html")),
            ("edit.html", include_str!("site/edit.html")),
        ])?;

        tera.register_filter("date_format", date_format_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String, tera::Error> {
        self.tera.render(template_name, context)
    }
}

/// Tera filter: show `YYYY-MM-DD...` dates as "May 30, 2023"
fn date_format_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("date_format", "value", String, value);

    let date_part = s.get(..10).unwrap_or(&s);
    if let Ok(date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        return Ok(tera::Value::String(date.format("%B %d, %Y").to_string()));
    }

    // Anything else is shown as written
    Ok(tera::Value::String(s))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub author: String,
}

impl From<&SiteConfig> for SiteData {
    fn from(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub file_name: String,
    pub title: String,
    pub date: Option<String>,
    pub thumbnail: Option<String>,
    pub excerpt: String,
    pub metadata: HashMap<String, String>,
}

impl PostData {
    pub fn from_post(post: &Post, excerpt_length: usize) -> Self {
        Self {
            file_name: post.file_name.clone(),
            title: post.title().to_string(),
            date: post.date_str().map(String::from),
            thumbnail: post.thumbnail.as_ref().map(|t| t.url().to_string()),
            excerpt: post.excerpt(excerpt_length),
            metadata: post
                .metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Result block of the landing page
#[derive(Debug, Clone, Serialize)]
pub struct ConversionData {
    pub success: bool,
    pub title: Option<String>,
    pub link: Option<String>,
    pub message: Option<String>,
}

impl ConversionData {
    pub fn from_result(result: &Result<Conversion, ConvertError>) -> Self {
        match result {
            Ok(conversion) => Self {
                success: true,
                title: Some(conversion.title.clone()),
                link: Some(conversion.link.clone()),
                message: None,
            },
            Err(e) => Self {
                success: false,
                title: None,
                link: None,
                message: Some(e.user_message()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Context {
        let mut context = Context::new();
        context.insert("site", &SiteData::from(&SiteConfig::default()));
        context
    }

    #[test]
    fn test_all_templates_parse() {
        assert!(TemplateRenderer::new().is_ok());
    }

    #[test]
    fn test_render_conversion_failure() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = context();
        let result: Result<Conversion, ConvertError> =
            Err(ConvertError::InvalidInput("nope".to_string()));
        context.insert("conversion", &Some(ConversionData::from_result(&result)));

        let html = renderer.render("index.html", &context).unwrap();
        assert!(html.contains("Please enter a valid YouTube URL"));
        assert!(!html.contains("Download MP3"));
    }

    #[test]
    fn test_render_blog_list_escapes_metadata() {
        let renderer = TemplateRenderer::new().unwrap();
        let post = Post::parse(
            "hello",
            "---\ntitle: <b>Bold</b> claims\ndate: 2023-05-30\n---\nBody text",
            "/thumbnails",
        )
        .unwrap();

        let mut context = context();
        context.insert("posts", &vec![PostData::from_post(&post, 100)]);
        let html = renderer.render("blog.html", &context).unwrap();
        assert!(html.contains("&lt;b&gt;Bold&lt;"));
        assert!(html.contains("May 30, 2023"));
        assert!(html.contains("Body text"));
    }

    #[test]
    fn test_date_format_filter() {
        let args = HashMap::new();
        let out = date_format_filter(&tera::Value::String("2023-05-30 10:00:00".into()), &args).unwrap();
        assert_eq!(out, tera::Value::String("May 30, 2023".into()));
        let out = date_format_filter(&tera::Value::String("last week".into()), &args).unwrap();
        assert_eq!(out, tera::Value::String("last week".into()));
    }
}
