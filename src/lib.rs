//! postpress: serve or compile dated Markdown posts through a single template
//!
//! Post files are named `<unix-timestamp>-<slug>.md`. Each one is rendered to
//! HTML, keyed by its canonical URL (`1530415742-hello.md` is served at
//! `/hello`), and written out through a user-supplied Handlebars template.

pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod server;
pub mod templates;

pub use error::{Error, Result};

use std::sync::Arc;

use content::Blog;

/// A blog instance: its configuration and loaded posts
#[derive(Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Post index, shared with the server
    pub blog: Arc<Blog>,
}

impl Site {
    /// Load the posts described by `config`
    pub fn open(config: config::SiteConfig) -> anyhow::Result<Self> {
        let blog = Blog::open(config.load_options())?;
        Ok(Self {
            config,
            blog: Arc::new(blog),
        })
    }

    /// Write every post to the output directory
    pub fn compile(&self) -> anyhow::Result<usize> {
        commands::compile::run(self)
    }

    /// Print the loaded posts
    pub fn list(&self) -> anyhow::Result<()> {
        commands::list::run(self)
    }
}
