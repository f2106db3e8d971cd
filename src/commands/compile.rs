//! Compile posts to static files

use anyhow::{Context, Result};
use std::fs;

use crate::Site;

/// Write each post to `<out_dir>/<url>.html`, returning how many were written
pub fn run(site: &Site) -> Result<usize> {
    let start = std::time::Instant::now();
    let index = site
        .blog
        .snapshot()
        .context("posts have not been loaded")?;
    let out_dir = &site.config.out_dir;

    tracing::info!("Compiling {} posts into {:?}", index.len(), out_dir);
    fs::create_dir_all(out_dir).with_context(|| format!("creating {:?}", out_dir))?;

    let posts = index.posts();
    for post in &posts {
        let html = index
            .render(post)
            .with_context(|| format!("rendering {:?}", post.path))?;

        let target = out_dir.join(format!("{}.html", post.url));
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, html).with_context(|| format!("writing {:?}", target))?;

        tracing::info!("Saved {:?} to {:?}", post.path, target);
    }

    tracing::info!("Compiled in {:.2}s", start.elapsed().as_secs_f64());
    Ok(posts.len())
}
