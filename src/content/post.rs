//! Post model

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::catalog::Metadata;
use super::filename::FileName;
use super::markdown::MarkdownRenderer;
use super::url::canonicalize;
use crate::error::{Error, Result};
use crate::templates::Templates;

/// A blog post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Canonical URL, the index key
    pub url: String,

    /// Source file path
    pub path: PathBuf,

    /// File name between the timestamp and the extension
    pub slug: String,

    /// Publication date, from the file name timestamp
    pub date: DateTime<Utc>,

    /// Title from the catalog
    pub title: Option<String>,

    /// Abstract from the catalog
    pub r#abstract: Option<String>,

    /// Rendered HTML content, empty until loaded
    pub content: String,
}

/// The fields a post template sees
#[derive(Debug, Serialize)]
pub struct PostView<'a> {
    #[serde(rename = "URL")]
    pub url: &'a str,
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Slug")]
    pub slug: &'a str,
    #[serde(rename = "Content")]
    pub content: &'a str,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: i64,
    #[serde(rename = "Title")]
    pub title: Option<&'a str>,
    #[serde(rename = "Abstract")]
    pub r#abstract: Option<&'a str>,
}

impl Post {
    /// Create a post for the file at `path`, deriving its URL, date and slug
    /// from the file name
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::invalid_filename(&path.to_string_lossy(), "not valid UTF-8"))?;

        let FileName { date, slug } = FileName::parse(name)?;

        Ok(Self {
            url: canonicalize(name),
            path: path.to_path_buf(),
            slug,
            date,
            title: None,
            r#abstract: None,
            content: String::new(),
        })
    }

    /// Attach catalog metadata
    pub fn with_metadata(mut self, metadata: &Metadata) -> Self {
        self.title = Some(metadata.title.clone());
        self.r#abstract = Some(metadata.r#abstract.clone());
        self
    }

    /// Read the source file and render its Markdown into `content`
    pub fn load(&mut self, renderer: &MarkdownRenderer) -> Result<()> {
        let bytes = fs::read(&self.path).map_err(|e| Error::io(&self.path, e))?;
        self.content = renderer.render(&String::from_utf8_lossy(&bytes));
        Ok(())
    }

    /// Render the post through the post template
    pub fn render(&self, templates: &Templates) -> Result<String> {
        templates.render_post(self)
    }

    /// Template-facing view of this post
    pub fn view(&self) -> PostView<'_> {
        PostView {
            url: &self.url,
            path: self.path.to_string_lossy().into_owned(),
            slug: &self.slug,
            content: &self.content,
            date: self.date.to_rfc3339_opts(SecondsFormat::Secs, true),
            timestamp: self.date.timestamp(),
            title: self.title.as_deref(),
            r#abstract: self.r#abstract.as_deref(),
        }
    }
}
