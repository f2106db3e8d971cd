//! Content loader - builds a post index from the files matching a glob

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{Catalog, MarkdownRenderer, Post, PostIndex};
use crate::config::HighlightConfig;
use crate::error::{Error, Result};
use crate::templates::Templates;

/// Everything needed to build a post index
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Pattern matching the post source files
    pub glob: String,
    /// Post template file
    pub template: PathBuf,
    /// Optional catalog; when set, every post must have an entry
    pub catalog: Option<PathBuf>,
    pub highlight: HighlightConfig,
}

impl LoadOptions {
    pub fn new(glob: impl Into<String>, template: impl Into<PathBuf>) -> Self {
        Self {
            glob: glob.into(),
            template: template.into(),
            catalog: None,
            highlight: HighlightConfig::default(),
        }
    }

    pub fn with_catalog(mut self, catalog: impl Into<PathBuf>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }
}

/// Loads posts for one index build
pub struct ContentLoader {
    catalog: Option<Catalog>,
    renderer: MarkdownRenderer,
}

impl ContentLoader {
    /// Create a loader, reading the catalog if one is configured
    pub fn new(options: &LoadOptions) -> Result<Self> {
        let catalog = options.catalog.as_ref().map(Catalog::load).transpose()?;
        let renderer = MarkdownRenderer::with_options(&options.highlight);

        Ok(Self {
            catalog,
            renderer,
        })
    }

    /// Load every file into a map keyed by canonical URL
    pub fn load_posts(&self, files: &[PathBuf]) -> Result<HashMap<String, Arc<Post>>> {
        let mut posts = HashMap::new();

        for path in files {
            let post = self.load_post(path)?;
            if let Some(previous) = posts.insert(post.url.clone(), Arc::new(post)) {
                tracing::warn!(
                    "{:?} shadows {:?}; both map to /{}",
                    path,
                    previous.path,
                    previous.url
                );
            }
        }

        Ok(posts)
    }

    /// Load a single post from a file
    fn load_post(&self, path: &Path) -> Result<Post> {
        let mut post = Post::new(path)?;

        if let Some(catalog) = &self.catalog {
            let metadata = catalog
                .get(&post.url)
                .ok_or_else(|| Error::MissingCatalogEntry {
                    path: path.to_path_buf(),
                    url: post.url.clone(),
                    catalog: catalog.path().to_path_buf(),
                })?;
            post = post.with_metadata(metadata);
        }

        post.load(&self.renderer)?;
        tracing::debug!("Loaded {:?} as /{}", path, post.url);

        Ok(post)
    }
}

impl PostIndex {
    /// Build a complete index, failing on the first bad file
    pub fn build(options: &LoadOptions) -> Result<Self> {
        let files = matching_files(&options.glob)?;
        let templates = Templates::from_file(&options.template)?;
        let loader = ContentLoader::new(options)?;
        let posts = loader.load_posts(&files)?;

        tracing::info!("Loaded {} posts matching {}", posts.len(), options.glob);

        Ok(PostIndex::new(posts, templates))
    }
}

/// Files matching the glob, in the order the glob yields them
fn matching_files(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in glob::glob(pattern)? {
        let path = entry.map_err(|e| Error::io(e.path().to_path_buf(), e.into_error()))?;
        if path.is_dir() {
            tracing::debug!("Skipping directory {:?}", path);
            continue;
        }
        files.push(path);
    }

    Ok(files)
}
