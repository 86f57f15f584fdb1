//! Admin workflow - upload, edit and delete posts
//!
//! All three go straight to the content store; there is no draft state, so
//! a successful call is visible to the next blog listing.

use crate::content::{ContentResult, ContentStore, ThumbnailUpload};

/// A post upload, as assembled from the admin form
#[derive(Debug, Clone)]
pub struct Upload {
    /// File name as sent by the client
    pub file_name: String,
    pub content: String,
    pub thumbnail: Option<ThumbnailUpload>,
}

/// Outcome of an admin authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Denied,
}

/// Check a presented token against the configured one.
///
/// With no token configured the panel is open.
pub fn authorize(expected: Option<&str>, presented: Option<&str>) -> Access {
    match expected {
        None => Access::Granted,
        Some(expected) => match presented {
            Some(token) if constant_time_eq(expected.as_bytes(), token.as_bytes()) => {
                Access::Granted
            }
            _ => Access::Denied,
        },
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Create (or overwrite) a post from an upload. Returns the stored name.
pub fn upload(store: &dyn ContentStore, upload: Upload) -> ContentResult<String> {
    let name = store.create(&upload.file_name, &upload.content, upload.thumbnail)?;
    tracing::info!("Uploaded post {}", name);
    Ok(name)
}

/// Replace the full text of a post
pub fn edit(store: &dyn ContentStore, file_name: &str, content: &str) -> ContentResult<()> {
    store.save(file_name, content)
}

/// Delete a post; deleting a missing post is not an error
pub fn remove(store: &dyn ContentStore, file_name: &str) -> ContentResult<()> {
    if !store.delete(file_name)? {
        tracing::info!("Delete of missing post {} ignored", file_name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{FileStore, ListPolicy};
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> FileStore {
        FileStore::new(dir.path().join("posts"), dir.path().join("thumbs"), "/thumbs")
    }

    #[test]
    fn test_authorize() {
        assert_eq!(authorize(None, None), Access::Granted);
        assert_eq!(authorize(None, Some("anything")), Access::Granted);
        assert_eq!(authorize(Some("s3cret"), Some("s3cret")), Access::Granted);
        assert_eq!(authorize(Some("s3cret"), Some("s3cre")), Access::Denied);
        assert_eq!(authorize(Some("s3cret"), None), Access::Denied);
    }

    #[test]
    fn test_lifecycle() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        // nonexistent -> published
        let name = upload(
            &store,
            Upload {
                file_name: "Hello World.md".to_string(),
                content: "---\ntitle: Hello\n---\n\nFirst draft.".to_string(),
                thumbnail: None,
            },
        )
        .unwrap();
        assert_eq!(name, "hello-world");
        assert_eq!(store.list(ListPolicy::FailFast).unwrap().len(), 1);

        // published -> published
        edit(&store, "hello-world.md", "---\ntitle: Hello\n---\n\nSecond draft.").unwrap();
        assert_eq!(store.get(&name).unwrap().body, "Second draft.");

        // published -> nonexistent
        remove(&store, "hello-world.md").unwrap();
        assert!(store.list(ListPolicy::FailFast).unwrap().is_empty());

        // and again, as a no-op
        remove(&store, "hello-world.md").unwrap();
    }
}
