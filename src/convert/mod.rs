//! Video-to-audio conversion through the upstream API

mod client;

pub use client::{Conversion, Converter};

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// Shown for URLs no video id can be pulled out of
pub const INVALID_URL_MESSAGE: &str = "Please enter a valid YouTube URL";

/// Shown when the upstream call fails without a message of its own
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred. Please try again.";

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Unrecognized video URL: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Upstream(String),

    #[error("The conversion service did not answer in time")]
    UpstreamTimeout,

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl ConvertError {
    /// Text for the landing page
    pub fn user_message(&self) -> String {
        match self {
            ConvertError::InvalidInput(_) => INVALID_URL_MESSAGE.to_string(),
            ConvertError::Client(_) => GENERIC_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

lazy_static! {
    static ref SHORT_LINK: Regex = Regex::new(r"youtu\.be/([^?&]+)").unwrap();
    static ref SHORTS: Regex = Regex::new(r"/shorts/([^?&]+)").unwrap();
    static ref WATCH: Regex = Regex::new(r"[?&]v=([^&]*)").unwrap();
}

/// Pull the video id out of a `youtu.be/<id>`, `/shorts/<id>` or `?v=<id>` URL
pub fn extract_video_id(url: &str) -> Result<String, ConvertError> {
    let pattern: &Regex = if url.contains("youtu.be") {
        &SHORT_LINK
    } else if url.contains("/shorts/") {
        &SHORTS
    } else {
        &WATCH
    };

    pattern
        .captures(url)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim())
        .filter(|id| !id.is_empty())
        .map(String::from)
        .ok_or_else(|| ConvertError::InvalidInput(url.to_string()))
}
