//! tubepress-site: landing page, markdown blog and video-to-audio relay
//!
//! Posts are markdown files with a `---` delimited metadata block, managed
//! through a small admin panel. The landing page forwards conversion
//! requests to an external API.

pub mod admin;
pub mod commands;
pub mod config;
pub mod content;
pub mod convert;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};

use content::FileStore;

/// The site and where its files live
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Markdown posts
    pub posts_dir: PathBuf,
    /// Static assets served at `/`
    pub public_dir: PathBuf,
    /// Uploaded thumbnails, inside `public_dir`
    pub thumbnail_dir: PathBuf,
}

impl Site {
    /// Load `_config.yml` (if any) and `.env` from `base_dir`, then apply
    /// environment overrides
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();

        if let Err(e) = dotenvy::from_path(base_dir.join(".env")) {
            if !e.not_found() {
                tracing::warn!("Failed to read .env: {}", e);
            }
        }

        let config_path = base_dir.join("_config.yml");
        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env()?;

        Ok(Self::with_config(base_dir, config))
    }

    /// Build a site from an already loaded configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let posts_dir = base_dir.join(&config.posts_dir);
        let public_dir = base_dir.join(&config.public_dir);
        let thumbnail_dir = public_dir.join(config.thumbnail_dir.trim_matches('/'));

        Self {
            config,
            base_dir,
            posts_dir,
            public_dir,
            thumbnail_dir,
        }
    }

    /// File-backed content store for this site
    pub fn store(&self) -> FileStore {
        FileStore::new(
            &self.posts_dir,
            &self.thumbnail_dir,
            self.config.thumbnail_url(),
        )
    }
}
