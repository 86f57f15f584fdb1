//! Site configuration (_config.yml + environment)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::content::ListPolicy;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,

    // Server
    pub ip: String,
    pub port: u16,
    /// Largest accepted request body, in bytes
    pub upload_limit: usize,

    // Directory
    pub posts_dir: String,
    pub public_dir: String,
    /// Thumbnail directory, relative to `public_dir`
    pub thumbnail_dir: String,

    // Blog
    pub excerpt_length: usize,
    pub list_policy: ListPolicy,
    pub highlight_theme: String,

    // Admin
    pub admin_token: Option<String>,

    // Conversion API
    pub converter: ConverterConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Tubepress".to_string(),
            description: "Convert videos to MP3 and read the blog".to_string(),
            author: String::new(),

            ip: "0.0.0.0".to_string(),
            port: 3000,
            upload_limit: 10 * 1024 * 1024,

            posts_dir: "posts".to_string(),
            public_dir: "public".to_string(),
            thumbnail_dir: "thumbnails".to_string(),

            excerpt_length: 200,
            list_policy: ListPolicy::SkipAndLog,
            highlight_theme: "InspiredGitHub".to_string(),

            admin_token: None,

            converter: ConverterConfig::default(),
        }
    }
}

/// Credentials and limits for the conversion API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub api_host: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://youtube-mp36.p.rapidapi.com".to_string(),
            api_key: None,
            api_host: None,
            timeout_secs: 30,
        }
    }
}

impl SiteConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    /// Apply `PORT`, `API_KEY`, `API_HOST` and `ADMIN_TOKEN` overrides
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value: {:?}", port))?;
        }
        if let Some(key) = lookup("API_KEY") {
            self.converter.api_key = Some(key);
        }
        if let Some(host) = lookup("API_HOST") {
            self.converter.api_host = Some(host);
        }
        if let Some(token) = lookup("ADMIN_TOKEN").filter(|t| !t.is_empty()) {
            self.admin_token = Some(token);
        }
        Ok(())
    }

    /// URL path the thumbnail directory is served at
    pub fn thumbnail_url(&self) -> String {
        format!("/{}", self.thumbnail_dir.trim_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.posts_dir, "posts");
        assert_eq!(config.list_policy, ListPolicy::SkipAndLog);
        assert_eq!(config.thumbnail_url(), "/thumbnails");
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Site
port: 8080
list_policy: fail_fast
converter:
  timeout_secs: 5
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Site");
        assert_eq!(config.port, 8080);
        assert_eq!(config.list_policy, ListPolicy::FailFast);
        assert_eq!(config.converter.timeout_secs, 5);
        assert_eq!(config.converter.endpoint, "https://youtube-mp36.p.rapidapi.com");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "4100"),
            ("API_KEY", "secret"),
            ("API_HOST", "youtube-mp36.p.rapidapi.com"),
            ("ADMIN_TOKEN", ""),
        ]
        .into_iter()
        .collect();

        let mut config = SiteConfig::default();
        config
            .apply_env_from(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.port, 4100);
        assert_eq!(config.converter.api_key.as_deref(), Some("secret"));
        assert_eq!(
            config.converter.api_host.as_deref(),
            Some("youtube-mp36.p.rapidapi.com")
        );
        // Empty token leaves the admin panel open
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let mut config = SiteConfig::default();
        let result = config.apply_env_from(|k| (k == "PORT").then(|| "eighty".to_string()));
        assert!(result.is_err());
    }
}
