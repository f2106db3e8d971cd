//! Post index
//!
//! [`PostIndex`] is an immutable snapshot of every post, keyed by canonical
//! URL. [`Blog`] owns the current snapshot and replaces it wholesale on
//! reload: a new index is built off to the side and only published once it
//! loaded completely, so readers never observe a partial index and a failed
//! reload leaves the previous one in place.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::loader::LoadOptions;
use super::url::canonicalize;
use super::Post;
use crate::error::Result;
use crate::templates::Templates;

/// Posts keyed by canonical URL, plus the template they render through
pub struct PostIndex {
    posts: HashMap<String, Arc<Post>>,
    templates: Templates,
}

impl PostIndex {
    pub(crate) fn new(posts: HashMap<String, Arc<Post>>, templates: Templates) -> Self {
        Self { posts, templates }
    }

    /// Look up a post by request path or file name
    pub fn get(&self, raw: &str) -> Option<Arc<Post>> {
        self.posts.get(&canonicalize(raw)).cloned()
    }

    /// All posts, newest first
    pub fn posts(&self) -> Vec<Arc<Post>> {
        let mut posts: Vec<_> = self.posts.values().cloned().collect();
        posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.url.cmp(&b.url)));
        posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    /// Render a post through this index's template
    pub fn render(&self, post: &Post) -> Result<String> {
        post.render(&self.templates)
    }

    /// Render the listing of every post
    pub fn render_index(&self) -> Result<String> {
        self.templates.render_index(&self.posts())
    }
}

/// The blog's current post index
///
/// Starts unloaded; [`Blog::load`] and [`Blog::reload`] publish a new
/// snapshot only when it was built without error.
pub struct Blog {
    options: LoadOptions,
    current: RwLock<Option<Arc<PostIndex>>>,
    // Held for a whole build and publish, so snapshots go out in the order
    // their builds started
    building: Mutex<()>,
}

impl Blog {
    /// Create an unloaded blog
    pub fn new(options: LoadOptions) -> Self {
        Self {
            options,
            current: RwLock::new(None),
            building: Mutex::new(()),
        }
    }

    /// Create a blog and load it, failing if the first load fails
    pub fn open(options: LoadOptions) -> Result<Self> {
        let blog = Self::new(options);
        blog.load()?;
        Ok(blog)
    }

    /// Build the index and publish it
    pub fn load(&self) -> Result<Arc<PostIndex>> {
        let _building = self.building.lock().unwrap_or_else(PoisonError::into_inner);
        let index = Arc::new(PostIndex::build(&self.options)?);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(index.clone());
        Ok(index)
    }

    /// Rebuild the index, keeping the current one if the rebuild fails
    pub fn reload(&self) -> Result<Arc<PostIndex>> {
        tracing::debug!("Reloading posts matching {}", self.options.glob);
        self.load().map_err(|e| {
            tracing::warn!("Reload failed, keeping previous posts: {}", e);
            e
        })
    }

    /// The published index, if any
    pub fn snapshot(&self) -> Option<Arc<PostIndex>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Look up a post in the published index
    pub fn get(&self, raw: &str) -> Option<Arc<Post>> {
        self.snapshot()?.get(raw)
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot().is_some()
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs;
    use std::path::Path;
    use std::thread;
    use std::time::Duration;

    /// A posts directory with three dated posts and a `-{{Content}}-` template
    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("template.tmpl"), "-{{Content}}-\n").unwrap();
        fs::write(dir.path().join("1530415742-one.md"), "one").unwrap();
        fs::write(dir.path().join("1530415745-one-two.md"), "one two").unwrap();
        fs::write(dir.path().join("1530415749-one-two-three.md"), "one two three").unwrap();
        dir
    }

    fn options(dir: &Path) -> LoadOptions {
        LoadOptions::new(
            format!("{}/[0-9]*.md", dir.display()),
            dir.join("template.tmpl"),
        )
    }

    fn write_catalog(dir: &Path, rows: &[&str]) {
        let mut csv = String::from("url,title,abstract\n");
        for row in rows {
            csv.push_str(row);
            csv.push('\n');
        }
        fs::write(dir.join("catalog.csv"), csv).unwrap();
    }

    #[test]
    fn test_build_finds_all_files() {
        let dir = fixture();
        let index = PostIndex::build(&options(dir.path())).unwrap();
        assert_eq!(index.len(), 3);
        for url in ["one", "one-two", "one-two-three"] {
            assert!(index.get(url).is_some(), "missing {}", url);
        }
    }

    #[test]
    fn test_get_uses_canonical_urls() {
        let dir = fixture();
        let index = PostIndex::build(&options(dir.path())).unwrap();

        let post1 = index.get("one").unwrap();
        let post2 = index.get("/one").unwrap();
        let post3 = index.get("/one.html").unwrap();
        let post4 = index.get("/1530415742-one.md").unwrap();

        assert_eq!(post1, post2);
        assert_eq!(post2, post3);
        assert_eq!(post3, post4);
        assert!(index.get("/four").is_none());
    }

    #[test]
    fn test_post_generation() {
        let dir = fixture();
        let index = PostIndex::build(&options(dir.path())).unwrap();
        let mut post = (*index.get("one").unwrap()).clone();
        post.content = "hi".to_string();
        assert_eq!(index.render(&post).unwrap().trim(), "-hi-");
    }

    #[test]
    fn test_loaded_content_is_rendered_markdown() {
        let dir = fixture();
        let index = PostIndex::build(&options(dir.path())).unwrap();
        let post = index.get("one-two").unwrap();
        assert_eq!(post.content.trim(), "<p>one two</p>");
        assert_eq!(index.render(&post).unwrap().trim(), "-<p>one two</p>\n-");
    }

    #[test]
    fn test_posts_newest_first() {
        let dir = fixture();
        let index = PostIndex::build(&options(dir.path())).unwrap();
        let urls: Vec<_> = index.posts().iter().map(|p| p.url.clone()).collect();
        assert_eq!(urls, vec!["one-two-three", "one-two", "one"]);
    }

    #[test]
    fn test_render_index_lists_posts() {
        let dir = fixture();
        let index = PostIndex::build(&options(dir.path())).unwrap();
        let html = index.render_index().unwrap();
        assert!(html.starts_with(r#"<ul><li><a href="/one-two-three">"#));
        assert!(html.contains(r#"<a href="/one">one</a>"#));
    }

    #[test]
    fn test_empty_glob_builds_empty_index() {
        let dir = fixture();
        let opts = LoadOptions::new(
            format!("{}/[0-9]*.markdown", dir.path().display()),
            dir.path().join("template.tmpl"),
        );
        let index = PostIndex::build(&opts).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_malformed_file_name_fails_whole_build() {
        let dir = fixture();
        fs::write(dir.path().join("draft.md"), "no date").unwrap();
        let opts = LoadOptions::new(
            format!("{}/*.md", dir.path().display()),
            dir.path().join("template.tmpl"),
        );
        assert!(matches!(
            PostIndex::build(&opts),
            Err(Error::InvalidFilename { .. })
        ));
    }

    #[test]
    fn test_non_utf8_post_does_not_fail_build() {
        let dir = fixture();
        fs::write(dir.path().join("1530415743-cafe.md"), b"caf\xe9 au lait").unwrap();
        let index = PostIndex::build(&options(dir.path())).unwrap();
        assert_eq!(index.len(), 4);
        assert!(index.get("cafe").unwrap().content.contains("au lait"));
    }

    #[test]
    fn test_malformed_glob() {
        let dir = fixture();
        let opts = LoadOptions::new("[0-9", dir.path().join("template.tmpl"));
        assert!(matches!(PostIndex::build(&opts), Err(Error::Glob(_))));
    }

    #[test]
    fn test_bad_template() {
        let dir = fixture();
        fs::write(dir.path().join("template.tmpl"), "{{#each Posts}}").unwrap();
        assert!(matches!(
            PostIndex::build(&options(dir.path())),
            Err(Error::Template { .. })
        ));
    }

    #[test]
    fn test_catalog_supplies_metadata() {
        let dir = fixture();
        write_catalog(
            dir.path(),
            &[
                "one,One,First post",
                "one-two,One Two,Second post",
                "one-two-three,One Two Three,Third post",
            ],
        );
        let opts = options(dir.path()).with_catalog(dir.path().join("catalog.csv"));
        let index = PostIndex::build(&opts).unwrap();

        let post = index.get("/one-two.html").unwrap();
        assert_eq!(post.title.as_deref(), Some("One Two"));
        assert_eq!(post.r#abstract.as_deref(), Some("Second post"));
    }

    #[test]
    fn test_catalog_missing_entry() {
        let dir = fixture();
        write_catalog(dir.path(), &["one,One,First post", "one-two,One Two,Second"]);
        let opts = options(dir.path()).with_catalog(dir.path().join("catalog.csv"));

        match PostIndex::build(&opts) {
            Err(Error::MissingCatalogEntry { url, .. }) => assert_eq!(url, "one-two-three"),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("expected a missing catalog entry"),
        }
    }

    #[test]
    fn test_catalog_missing_file() {
        let dir = fixture();
        let opts = options(dir.path()).with_catalog(dir.path().join("catalog.csv"));
        assert!(matches!(
            PostIndex::build(&opts),
            Err(Error::Catalog { .. })
        ));
    }

    #[test]
    fn test_blog_starts_unloaded() {
        let dir = fixture();
        let blog = Blog::new(options(dir.path()));
        assert!(!blog.is_loaded());
        assert!(blog.get("one").is_none());
    }

    #[test]
    fn test_failed_first_load_stays_unloaded() {
        let dir = fixture();
        fs::remove_file(dir.path().join("template.tmpl")).unwrap();

        let blog = Blog::new(options(dir.path()));
        assert!(blog.load().is_err());
        assert!(!blog.is_loaded());
        assert!(Blog::open(options(dir.path())).is_err());
    }

    #[test]
    fn test_reload_picks_up_new_posts() {
        let dir = fixture();
        let blog = Blog::open(options(dir.path())).unwrap();
        assert!(blog.get("four").is_none());

        fs::write(dir.path().join("1530415750-four.md"), "four").unwrap();
        blog.reload().unwrap();

        assert!(blog.get("/four").is_some());
        assert_eq!(blog.snapshot().unwrap().len(), 4);
    }

    #[test]
    fn test_failed_reload_keeps_previous_index() {
        let dir = fixture();
        let blog = Blog::open(options(dir.path())).unwrap();
        let before = blog.snapshot().unwrap();

        fs::remove_file(dir.path().join("template.tmpl")).unwrap();
        assert!(blog.reload().is_err());

        let after = blog.snapshot().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.len(), 3);
        for url in ["one", "one-two", "one-two-three"] {
            assert!(blog.get(url).is_some(), "missing {}", url);
        }
    }

    #[test]
    fn test_reloads_run_one_at_a_time() {
        let dir = fixture();
        let blog = Arc::new(Blog::open(options(dir.path())).unwrap());

        let building = blog.building.lock().unwrap();
        fs::write(dir.path().join("1530415750-four.md"), "four").unwrap();
        let reloader = {
            let blog = blog.clone();
            thread::spawn(move || blog.reload().map(|index| index.len()))
        };

        thread::sleep(Duration::from_millis(100));
        assert!(!reloader.is_finished());
        assert!(blog.get("four").is_none());

        drop(building);
        assert_eq!(reloader.join().unwrap().unwrap(), 4);
        assert!(blog.get("four").is_some());
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let dir = fixture();
        let blog = Blog::open(options(dir.path())).unwrap();
        let held = blog.snapshot().unwrap();

        fs::remove_file(dir.path().join("1530415742-one.md")).unwrap();
        blog.reload().unwrap();

        assert!(held.get("one").is_some());
        assert!(blog.get("one").is_none());
    }
}
