//! List posts

use anyhow::Result;

use crate::content::{ContentStore, ListPolicy};
use crate::Site;

/// Print every post. `strict` stops at the first malformed file.
pub fn run(site: &Site, strict: bool) -> Result<()> {
    let policy = if strict {
        ListPolicy::FailFast
    } else {
        ListPolicy::SkipAndLog
    };
    let posts = site.store().list(policy)?;

    println!("Posts ({}):", posts.len());
    for post in posts {
        println!(
            "  {} - {} [{}.md]",
            post.date_str().unwrap_or("----------"),
            post.title(),
            post.file_name
        );
    }

    Ok(())
}
