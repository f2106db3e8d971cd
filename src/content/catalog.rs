//! Post catalog (catalog.csv)
//!
//! An optional CSV file supplying titles and abstracts for posts. The first
//! row is a header; every following row is `url,title,abstract`, keyed by the
//! post's canonical URL.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Metadata for a single post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub r#abstract: String,
}

/// Post metadata keyed by canonical URL
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    path: PathBuf,
    entries: HashMap<String, Metadata>,
}

impl Catalog {
    /// Load a catalog from a CSV file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let catalog_error = |message: String| Error::Catalog {
            path: path.to_path_buf(),
            message,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| catalog_error(e.to_string()))?;

        let mut entries = HashMap::new();
        for record in reader.records() {
            let record = record.map_err(|e| catalog_error(e.to_string()))?;
            if record.len() < 3 {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                return Err(catalog_error(format!(
                    "line {}: expected url,title,abstract but found {} field(s)",
                    line,
                    record.len()
                )));
            }

            entries.insert(
                record[0].to_string(),
                Metadata {
                    title: record[1].to_string(),
                    r#abstract: record[2].to_string(),
                },
            );
        }

        tracing::debug!("Loaded {} catalog entries from {:?}", entries.len(), path);

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Look up the metadata for a canonical URL
    pub fn get(&self, url: &str) -> Option<&Metadata> {
        self.entries.get(url)
    }

    /// Path the catalog was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
