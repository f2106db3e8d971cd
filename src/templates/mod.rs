//! Post templates using the Handlebars template engine
//!
//! The user supplies a single post template. Post fields are exposed under
//! their capitalised names (`{{URL}}`, `{{Title}}`, `{{Content}}`, ...), and
//! output is not HTML-escaped so the rendered Markdown passes through as-is.

use handlebars::Handlebars;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::content::{Post, PostView};
use crate::error::{Error, Result};

const POST_TEMPLATE: &str = "post";
const INDEX_TEMPLATE: &str = "index";

/// Listing served at `/` in development mode
const INDEX_HTML: &str =
    r#"<ul>{{#each Posts}}<li><a href="/{{URL}}">{{URL}}</a></li>{{/each}}</ul>"#;

/// Parsed post template plus the built-in index listing
pub struct Templates {
    registry: Handlebars<'static>,
    source: PathBuf,
}

#[derive(Serialize)]
struct IndexContext<'a> {
    #[serde(rename = "Posts")]
    posts: Vec<PostView<'a>>,
}

impl Templates {
    /// Parse the post template at `path`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut registry = Self::registry(path)?;
        registry
            .register_template_file(POST_TEMPLATE, path)
            .map_err(|e| template_error(path, e))?;

        tracing::debug!("Parsed post template {:?}", path);

        Ok(Self {
            registry,
            source: path.to_path_buf(),
        })
    }

    /// Parse a post template held in memory
    pub fn from_string(template: &str) -> Result<Self> {
        let source = PathBuf::from("<inline>");
        let mut registry = Self::registry(&source)?;
        registry
            .register_template_string(POST_TEMPLATE, template)
            .map_err(|e| template_error(&source, e))?;

        Ok(Self { registry, source })
    }

    fn registry(source: &Path) -> Result<Handlebars<'static>> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(INDEX_TEMPLATE, INDEX_HTML)
            .map_err(|e| template_error(source, e))?;
        Ok(registry)
    }

    /// Render a single post through the post template
    pub fn render_post(&self, post: &Post) -> Result<String> {
        Ok(self.registry.render(POST_TEMPLATE, &post.view())?)
    }

    /// Render the listing of all posts
    pub fn render_index(&self, posts: &[Arc<Post>]) -> Result<String> {
        let context = IndexContext {
            posts: posts.iter().map(|p| p.view()).collect(),
        };
        Ok(self.registry.render(INDEX_TEMPLATE, &context)?)
    }

    /// Where the post template was read from
    pub fn source(&self) -> &Path {
        &self.source
    }
}

fn template_error(path: &Path, source: handlebars::TemplateError) -> Error {
    Error::Template {
        path: path.to_path_buf(),
        source: Box::new(source),
    }
}
