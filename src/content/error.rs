//! Errors raised while loading or persisting posts

use thiserror::Error;

pub type ContentResult<T> = Result<T, ContentError>;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Invalid markdown format in file: {file}")]
    MalformedPost { file: String },

    #[error("Invalid metadata line in file {file}: {line:?}")]
    MalformedMetadataLine { file: String, line: String },

    #[error("Post not found: {0}")]
    NotFound(String),

    #[error("Invalid post name: {0:?}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to replace file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

impl ContentError {
    pub(crate) fn malformed(file: &str) -> Self {
        ContentError::MalformedPost {
            file: file.to_string(),
        }
    }
}
