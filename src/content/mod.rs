//! Content module - post files, their catalog, and the post index

mod catalog;
pub mod filename;
mod index;
pub mod loader;
mod markdown;
mod post;
mod url;

pub use catalog::{Catalog, Metadata};
pub use filename::FileName;
pub use index::{Blog, PostIndex};
pub use loader::LoadOptions;
pub use markdown::MarkdownRenderer;
pub use post::{Post, PostView};
pub use url::canonicalize;
