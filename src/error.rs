//! Error types for the post pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building or rendering the post index
#[derive(Error, Debug)]
pub enum Error {
    /// The file name lacks the `<timestamp>-<slug>.<ext>` shape
    #[error("invalid file name {name:?}: {reason}")]
    InvalidFilename { name: String, reason: String },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("failed to parse template {path:?}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: Box<handlebars::TemplateError>,
    },

    #[error("failed to render template: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("failed to load catalog {path:?}: {message}")]
    Catalog { path: PathBuf, message: String },

    /// A post file has no row in the configured catalog
    #[error("{path:?} ({url}) is not in the catalog ({catalog:?})")]
    MissingCatalogEntry {
        path: PathBuf,
        url: String,
        catalog: PathBuf,
    },
}

impl Error {
    pub(crate) fn invalid_filename(name: &str, reason: &str) -> Self {
        Error::InvalidFilename {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
