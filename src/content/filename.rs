//! Post file name parsing
//!
//! Post files are named `<unix-timestamp>-<slug>.<ext>`, e.g.
//! `1530415742-hello-world.md`. The timestamp becomes the post date and the
//! remainder (without its extension) the slug.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};

lazy_static! {
    /// First digit run, when it leads the name and is followed by a hyphen
    static ref DATE_RE: Regex = Regex::new(r"^([0-9]+)-").unwrap();
    static ref SLUG_RE: Regex = Regex::new(r"^[0-9]+-(.+)\.[^./]+$").unwrap();
}

/// Date and slug extracted from a post file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileName {
    pub date: DateTime<Utc>,
    pub slug: String,
}

impl FileName {
    /// Parse both the date and the slug out of a base file name
    pub fn parse(name: &str) -> Result<Self> {
        Ok(Self {
            date: parse_date(name)?,
            slug: parse_slug(name)?,
        })
    }
}

/// Parse the leading Unix timestamp of a file name
pub fn parse_date(name: &str) -> Result<DateTime<Utc>> {
    let digits = DATE_RE
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| Error::invalid_filename(name, "missing leading timestamp"))?;

    let seconds: i64 = digits
        .parse()
        .map_err(|_| Error::invalid_filename(name, "timestamp does not fit in 64 bits"))?;

    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| Error::invalid_filename(name, "timestamp out of range"))
}

/// Parse the slug between the timestamp prefix and the extension
pub fn parse_slug(name: &str) -> Result<String> {
    SLUG_RE
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::invalid_filename(name, "expected <timestamp>-<slug>.<ext>"))
}
