//! Create a new post

use anyhow::Result;

use crate::content::{is_valid_value, ContentError, ContentStore, FrontMatter};
use crate::Site;

/// Scaffold a post named after the slugified title. Returns its file name.
pub fn create_post(site: &Site, title: &str) -> Result<String> {
    if !is_valid_value(title) {
        anyhow::bail!("Title {:?} cannot be stored on a metadata line", title);
    }

    let store = site.store();
    let slug = slug::slugify(title);
    if slug.is_empty() {
        anyhow::bail!("Title {:?} does not produce a usable file name", title);
    }

    match store.get_raw(&slug) {
        Ok(_) => anyhow::bail!("Post already exists: {}.md", slug),
        Err(ContentError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    let now = chrono::Local::now();
    let mut front_matter = FrontMatter::new();
    front_matter.insert("title", title);
    front_matter.insert("date", now.format("%Y-%m-%d %H:%M:%S").to_string());
    let content = front_matter.encode("");

    let name = store.create(&format!("{}.md", slug), &content, None)?;
    println!("Created: {:?}", site.posts_dir.join(format!("{}.md", name)));

    Ok(name)
}
