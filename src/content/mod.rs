//! Content module - posts, their front-matter, storage and rendering

mod error;
mod frontmatter;
mod markdown;
mod post;
pub mod store;

pub use error::{ContentError, ContentResult};
pub use frontmatter::{inject_thumbnail, is_valid_value, FrontMatter, DELIMITER, THUMBNAIL_KEY};
pub use markdown::{MarkdownRenderer, RenderError};
pub use post::{Post, Thumbnail, MORE_MARKER};
pub use store::{ContentStore, FileStore, ListPolicy, ThumbnailUpload};
