//! Canonical post URLs
//!
//! The same key is derived from a post's file name when the index is built and
//! from the request path when a post is looked up.
//!
//! # Examples
//! ```
//! use postpress::content::canonicalize;
//!
//! assert_eq!(canonicalize("1530415742-one.md"), "one");
//! assert_eq!(canonicalize("/one.html"), "one");
//! ```

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// The whole leading `<digits>-` prefix, e.g. `2020-01-` in `2020-01-one`
    static ref DATE_PREFIX_RE: Regex = Regex::new(r"^(?:[0-9]+-)+").unwrap();
}

/// Map a request path or file base name to its index key
pub fn canonicalize(raw: &str) -> String {
    let name = raw.strip_suffix(".html").unwrap_or(raw);
    let name = name.strip_suffix(".md").unwrap_or(name);
    let name = name.trim_start_matches('/');
    DATE_PREFIX_RE.replace(name, "").into_owned()
}
