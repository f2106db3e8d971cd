//! List loaded posts

use anyhow::{Context, Result};

use crate::Site;

/// Print one line per post, newest first
pub fn run(site: &Site) -> Result<()> {
    let index = site
        .blog
        .snapshot()
        .context("posts have not been loaded")?;

    println!("Posts ({}):", index.len());
    for post in index.posts() {
        match &post.title {
            Some(title) => println!(
                "  {} /{} - {} [{}]",
                post.date.format("%Y-%m-%d"),
                post.url,
                title,
                post.path.display()
            ),
            None => println!(
                "  {} /{} [{}]",
                post.date.format("%Y-%m-%d"),
                post.url,
                post.path.display()
            ),
        }
    }

    Ok(())
}
