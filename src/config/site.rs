//! Site configuration (postpress.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::content::LoadOptions;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Posts
    pub post_glob: String,
    pub post_template: PathBuf,
    pub post_catalog: Option<PathBuf>,

    // Server
    pub listen: String,
    pub static_dir: PathBuf,
    pub dev: bool,
    pub autoreload: bool,

    // Compile
    pub out_dir: PathBuf,

    #[serde(default)]
    pub highlight: HighlightConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            post_glob: "[0-9]*.md".to_string(),
            post_template: PathBuf::from("post.tmpl"),
            post_catalog: None,

            listen: "127.0.0.1:8081".to_string(),
            static_dir: PathBuf::from("."),
            dev: false,
            autoreload: false,

            out_dir: PathBuf::from("."),

            highlight: HighlightConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config {:?}", path))?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Settings the post index is built from
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            glob: self.post_glob.clone(),
            template: self.post_template.clone(),
            catalog: self.post_catalog.clone(),
            highlight: self.highlight.clone(),
        }
    }

    /// Directory part of the post glob, e.g. `posts` for `posts/[0-9]*.md`
    pub fn posts_dir(&self) -> Option<&str> {
        self.post_glob
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .filter(|dir| !dir.is_empty())
    }

    /// Whether pages should carry the live reload script
    pub fn live_reload(&self) -> bool {
        self.dev && self.autoreload
    }
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub enable: bool,
    pub theme: String,
    pub line_number: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enable: false,
            theme: "base16-ocean.dark".to_string(),
            line_number: true,
        }
    }
}
