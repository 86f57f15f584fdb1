//! Content store - posts persisted as markdown files

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use super::error::{ContentError, ContentResult};
use super::frontmatter::{inject_thumbnail, is_valid_value, FrontMatter};
use super::post::Post;

const POST_EXTENSION: &str = "md";

/// What a listing does with a post that fails to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListPolicy {
    /// The first bad file aborts the listing
    FailFast,
    /// Bad files are logged and left out
    SkipAndLog,
}

impl Default for ListPolicy {
    fn default() -> Self {
        ListPolicy::SkipAndLog
    }
}

/// An uploaded thumbnail image
#[derive(Debug, Clone)]
pub struct ThumbnailUpload {
    /// File name as sent by the client
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Storage contract for posts
pub trait ContentStore: Send + Sync {
    /// Load every post, ordered newest first
    fn list(&self, policy: ListPolicy) -> ContentResult<Vec<Post>>;

    /// Raw file names of every post, sorted
    fn list_names(&self) -> ContentResult<Vec<String>>;

    fn get(&self, file_name: &str) -> ContentResult<Post>;

    /// Unparsed file text of a post
    fn get_raw(&self, file_name: &str) -> ContentResult<String>;

    /// Replace the whole file text of a post
    fn save(&self, file_name: &str, content: &str) -> ContentResult<()>;

    /// Remove a post. Returns `false` when there was nothing to remove.
    fn delete(&self, file_name: &str) -> ContentResult<bool>;

    /// Store an uploaded post, with an optional thumbnail, and return its
    /// normalized file name
    fn create(
        &self,
        upload_name: &str,
        content: &str,
        thumbnail: Option<ThumbnailUpload>,
    ) -> ContentResult<String>;
}

/// Lowercase, spaces to hyphens, final path component only.
///
/// # Examples
/// ```ignore
/// normalize_file_name("My First Post.md") // -> "my-first-post.md"
/// ```
pub fn normalize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.trim().to_lowercase().split(' ').collect::<Vec<_>>().join("-")
}

/// Strip an optional `.md` extension and reject anything that is not a
/// plain file name.
pub fn post_stem(file_name: &str) -> ContentResult<&str> {
    let stem = file_name
        .strip_suffix(".md")
        .unwrap_or(file_name)
        .trim();
    if stem.is_empty()
        || stem.contains('/')
        || stem.contains('\\')
        || stem.contains("..")
        || stem.starts_with('.')
    {
        return Err(ContentError::InvalidName(file_name.to_string()));
    }
    Ok(stem)
}

/// Posts as `<posts_dir>/<name>.md`, thumbnails under `thumbnail_dir`
#[derive(Debug, Clone)]
pub struct FileStore {
    posts_dir: PathBuf,
    thumbnail_dir: PathBuf,
    thumbnail_url: String,
}

impl FileStore {
    /// `thumbnail_url` is the URL path the thumbnail directory is served at
    pub fn new(
        posts_dir: impl Into<PathBuf>,
        thumbnail_dir: impl Into<PathBuf>,
        thumbnail_url: impl Into<String>,
    ) -> Self {
        Self {
            posts_dir: posts_dir.into(),
            thumbnail_dir: thumbnail_dir.into(),
            thumbnail_url: thumbnail_url.into(),
        }
    }

    pub fn posts_dir(&self) -> &Path {
        &self.posts_dir
    }

    fn post_path(&self, file_name: &str) -> ContentResult<(String, PathBuf)> {
        let stem = post_stem(file_name)?;
        let path = self.posts_dir.join(format!("{}.{}", stem, POST_EXTENSION));
        Ok((stem.to_string(), path))
    }

    fn post_files(&self) -> ContentResult<Vec<PathBuf>> {
        if !self.posts_dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.posts_dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| ContentError::Io(io::Error::from(e)))?;
            let path = entry.path();
            if entry.file_type().is_file() && is_post_file(path) {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        Ok(files)
    }

    fn load(&self, stem: &str, path: &Path) -> ContentResult<Post> {
        let raw = read_existing(stem, path)?;
        Post::parse(stem, &raw, &self.thumbnail_url)
    }
}

impl ContentStore for FileStore {
    fn list(&self, policy: ListPolicy) -> ContentResult<Vec<Post>> {
        let mut posts = Vec::new();

        for path in self.post_files()? {
            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_string(),
                None => continue,
            };
            match self.load(&stem, &path) {
                Ok(post) => posts.push(post),
                Err(e) if policy == ListPolicy::SkipAndLog => {
                    tracing::warn!("Skipping post {:?}: {}", path, e);
                }
                Err(e) => return Err(e),
            }
        }

        // Newest first, undated last
        posts.sort_by(|a, b| {
            b.date()
                .cmp(&a.date())
                .then_with(|| a.file_name.cmp(&b.file_name))
        });

        Ok(posts)
    }

    fn list_names(&self) -> ContentResult<Vec<String>> {
        Ok(self
            .post_files()?
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect())
    }

    fn get(&self, file_name: &str) -> ContentResult<Post> {
        let (stem, path) = self.post_path(file_name)?;
        self.load(&stem, &path)
    }

    fn get_raw(&self, file_name: &str) -> ContentResult<String> {
        let (stem, path) = self.post_path(file_name)?;
        read_existing(&stem, &path)
    }

    fn save(&self, file_name: &str, content: &str) -> ContentResult<()> {
        let (_, path) = self.post_path(file_name)?;
        write_atomic(&self.posts_dir, &path, content.as_bytes())?;
        tracing::info!("Saved post {:?}", path);
        Ok(())
    }

    fn delete(&self, file_name: &str) -> ContentResult<bool> {
        let (_, path) = self.post_path(file_name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Deleted post {:?}", path);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("Nothing to delete at {:?}", path);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn create(
        &self,
        upload_name: &str,
        content: &str,
        thumbnail: Option<ThumbnailUpload>,
    ) -> ContentResult<String> {
        let normalized = normalize_file_name(upload_name);
        let (stem, path) = self.post_path(&normalized)?;
        let source = format!("{}.{}", stem, POST_EXTENSION);

        // Same schema the readers enforce
        FrontMatter::decode(&source, content)?;

        let content = match thumbnail {
            Some(thumb) => {
                let thumb_name = normalize_file_name(&thumb.file_name);
                if post_stem(&thumb_name).is_err() || !is_valid_value(&thumb_name) {
                    return Err(ContentError::InvalidName(thumb.file_name));
                }
                let thumb_path = self.thumbnail_dir.join(&thumb_name);
                write_atomic(&self.thumbnail_dir, &thumb_path, &thumb.data)?;
                tracing::info!("Saved thumbnail {:?}", thumb_path);
                inject_thumbnail(&source, content, &thumb_name)?
            }
            None => content.to_string(),
        };

        write_atomic(&self.posts_dir, &path, content.as_bytes())?;
        tracing::info!("Created post {:?}", path);
        Ok(stem)
    }
}

fn is_post_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == POST_EXTENSION)
        .unwrap_or(false)
}

fn read_existing(stem: &str, path: &Path) -> ContentResult<String> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(raw),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ContentError::NotFound(stem.to_string())),
        Err(e) => Err(e.into()),
    }
}

/// Write through a temp file in `dir` so readers never see half a file
fn write_atomic(dir: &Path, path: &Path, data: &[u8]) -> ContentResult<()> {
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VALID: &str = "---\ntitle: First\ndate: 2024-01-01\n---\n\nHello.\n";

    fn store(dir: &TempDir) -> FileStore {
        FileStore::new(
            dir.path().join("posts"),
            dir.path().join("public/thumbnails"),
            "/thumbnails",
        )
    }

    fn write_post(dir: &TempDir, name: &str, content: &str) {
        let posts = dir.path().join("posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(posts.join(name), content).unwrap();
    }

    #[test]
    fn test_normalize_file_name() {
        assert_eq!(normalize_file_name("My First Post.md"), "my-first-post.md");
        assert_eq!(normalize_file_name("../../etc/Passwd"), "passwd");
        assert_eq!(normalize_file_name("C:\\Users\\Me\\Cover Art.PNG"), "cover-art.png");
    }

    #[test]
    fn test_post_stem_rejects_paths() {
        assert_eq!(post_stem("hello.md").unwrap(), "hello");
        assert_eq!(post_stem("hello").unwrap(), "hello");
        for bad in ["", ".md", "../secret", "a/b", "a\\b", ".hidden"] {
            assert!(post_stem(bad).is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).list(ListPolicy::FailFast).unwrap().is_empty());
    }

    #[test]
    fn test_list_orders_newest_first_and_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        write_post(&dir, "old.md", "---\ntitle: Old\ndate: 2020-01-01\n---\nold");
        write_post(&dir, "new.md", "---\ntitle: New\ndate: 2024-06-01\n---\nnew");
        write_post(&dir, "undated.md", "---\ntitle: Undated\n---\nbody");
        write_post(&dir, "notes.txt", "not a post");

        let posts = store(&dir).list(ListPolicy::FailFast).unwrap();
        let names: Vec<&str> = posts.iter().map(|p| p.file_name.as_str()).collect();
        assert_eq!(names, vec!["new", "old", "undated"]);
    }

    #[test]
    fn test_list_policies_with_malformed_file() {
        let dir = TempDir::new().unwrap();
        write_post(&dir, "a.md", VALID);
        write_post(&dir, "b.md", VALID);
        write_post(&dir, "broken.md", "no frontmatter here");

        let store = store(&dir);
        let err = store.list(ListPolicy::FailFast).unwrap_err();
        assert!(matches!(err, ContentError::MalformedPost { ref file } if file == "broken.md"));

        let posts = store.list(ListPolicy::SkipAndLog).unwrap();
        assert_eq!(posts.len(), 2);
    }

    #[test]
    fn test_get_and_not_found() {
        let dir = TempDir::new().unwrap();
        write_post(&dir, "first.md", VALID);
        let store = store(&dir);

        let post = store.get("first").unwrap();
        assert_eq!(post.title(), "First");
        assert_eq!(store.get("first.md").unwrap().file_name, "first");
        assert!(matches!(store.get("missing"), Err(ContentError::NotFound(_))));
        assert!(matches!(store.get("../x"), Err(ContentError::InvalidName(_))));
    }

    #[test]
    fn test_save_overwrites_whole_file() {
        let dir = TempDir::new().unwrap();
        write_post(&dir, "first.md", VALID);
        let store = store(&dir);

        store.save("first.md", "just a body").unwrap();
        assert_eq!(store.get_raw("first").unwrap(), "just a body");
        assert!(matches!(store.get("first"), Err(ContentError::MalformedPost { .. })));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        write_post(&dir, "first.md", VALID);
        let store = store(&dir);

        assert!(store.delete("first.md").unwrap());
        assert!(!store.delete("first.md").unwrap());
        assert!(!store.delete("never-existed").unwrap());
        assert!(store.list_names().unwrap().is_empty());
    }

    #[test]
    fn test_create_normalizes_name() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let name = store.create("My Trip To Rome.md", VALID, None).unwrap();
        assert_eq!(name, "my-trip-to-rome");
        assert_eq!(store.list_names().unwrap(), vec!["my-trip-to-rome.md"]);
    }

    #[test]
    fn test_create_rejects_malformed_content() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let err = store.create("bad.md", "no delimiters", None).unwrap_err();
        assert!(matches!(err, ContentError::MalformedPost { .. }));
        assert!(store.list_names().unwrap().is_empty());
    }

    #[test]
    fn test_create_with_thumbnail_embeds_single_key() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let content = "---\ntitle: Trip\nthumbnail: stale.png\n---\n\nBody.\n";

        let name = store
            .create(
                "trip.md",
                content,
                Some(ThumbnailUpload {
                    file_name: "Beach Photo.JPG".to_string(),
                    data: vec![1, 2, 3],
                }),
            )
            .unwrap();

        let thumb = dir.path().join("public/thumbnails/beach-photo.jpg");
        assert_eq!(fs::read(thumb).unwrap(), vec![1, 2, 3]);

        let raw = store.get_raw(&name).unwrap();
        let (fm, _) = FrontMatter::decode("trip.md", &raw).unwrap();
        assert_eq!(fm.get("thumbnail"), Some("beach-photo.jpg"));
        assert_eq!(raw.matches("thumbnail:").count(), 1);

        let post = store.get(&name).unwrap();
        assert_eq!(post.thumbnail.unwrap().url(), "/thumbnails/beach-photo.jpg");
    }

    #[test]
    fn test_create_rejects_thumbnail_name_that_splits_metadata() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let content = "---\ntitle: Trip\n---\n\nBody.\n";

        for bad in ["a---b.png", "a\nb.png", "a\rb.png"] {
            let err = store
                .create(
                    "trip.md",
                    content,
                    Some(ThumbnailUpload {
                        file_name: bad.to_string(),
                        data: vec![1],
                    }),
                )
                .unwrap_err();
            assert!(matches!(err, ContentError::InvalidName(_)), "{:?}", bad);
        }

        assert!(store.list_names().unwrap().is_empty());
        assert!(!dir.path().join("public/thumbnails").exists());
    }
}
