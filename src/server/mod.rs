//! HTTP server with development reload

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{Method, Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::SiteConfig;
use crate::Site;

/// Live reload script appended to rendered posts
const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        console.log('Live reload disconnected. Attempting to reconnect...');
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
</body>
"#;

/// Server state
struct ServerState {
    site: Site,
    reload_tx: broadcast::Sender<()>,
}

impl ServerState {
    fn live_reload(&self) -> bool {
        self.site.config.live_reload()
    }
}

/// Start serving the site's posts
pub async fn start(site: &Site) -> Result<()> {
    let (reload_tx, _) = broadcast::channel::<()>(16);

    let state = Arc::new(ServerState {
        site: site.clone(),
        reload_tx: reload_tx.clone(),
    });

    let app = router(state.clone());
    let addr = parse_listen_addr(&site.config.listen)?;

    if site.config.dev {
        tracing::info!("Development mode: posts are reloaded on every request");
    }

    if state.live_reload() {
        let site = site.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = watch_and_reload(&site, reload_tx) {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<ServerState>) -> Router {
    let mut app: Router<Arc<ServerState>> = Router::new();
    if state.live_reload() {
        app = app.route("/__livereload", get(livereload_handler));
    }

    app.fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Accept `host:port`, `localhost:port` or a bare `:port`
fn parse_listen_addr(listen: &str) -> Result<SocketAddr> {
    let normalized = if listen.starts_with(':') {
        format!("0.0.0.0{}", listen)
    } else if let Some(port) = listen.strip_prefix("localhost:") {
        format!("127.0.0.1:{}", port)
    } else {
        listen.to_string()
    };

    normalized
        .parse()
        .with_context(|| format!("invalid listen address {:?}", listen))
}

/// What the live-reload watcher listens to
///
/// Directories are watched rather than the template and catalog files, since
/// editors that save by rename replace the file and drop a watch on it.
struct WatchTargets {
    posts_dir: PathBuf,
    recursive: bool,
    files: Vec<PathBuf>,
}

impl WatchTargets {
    fn new(config: &SiteConfig) -> Self {
        let mut files = vec![absolute_file(&config.post_template)];
        if let Some(catalog) = &config.post_catalog {
            files.push(absolute_file(catalog));
        }

        Self {
            posts_dir: absolute_dir(&glob_root(config.posts_dir().unwrap_or("."))),
            recursive: config.post_glob.contains("**"),
            files,
        }
    }

    /// Directories to register, each once with its widest mode
    fn dirs(&self) -> Vec<(PathBuf, RecursiveMode)> {
        let mut dirs = BTreeMap::new();
        for file in &self.files {
            if let Some(parent) = file.parent() {
                dirs.insert(parent.to_path_buf(), false);
            }
        }
        dirs.insert(self.posts_dir.clone(), self.recursive);

        dirs.into_iter()
            .map(|(dir, recursive)| {
                let mode = if recursive {
                    RecursiveMode::Recursive
                } else {
                    RecursiveMode::NonRecursive
                };
                (dir, mode)
            })
            .collect()
    }

    /// Whether a change to `path` should trigger a reload
    fn matches(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        if path_str.contains(".git") || path_str.contains(".DS_Store") || path_str.ends_with('~') {
            return false;
        }

        let in_posts_dir = if self.recursive {
            path.starts_with(&self.posts_dir)
        } else {
            path.parent() == Some(self.posts_dir.as_path())
        };
        in_posts_dir || self.files.iter().any(|f| f == path)
    }
}

/// The leading directories of a glob, up to the first wildcard component
fn glob_root(dir: &str) -> PathBuf {
    Path::new(dir)
        .components()
        .take_while(|c| {
            !c.as_os_str()
                .to_string_lossy()
                .contains(['*', '?', '['])
        })
        .collect()
}

fn absolute_dir(dir: &Path) -> PathBuf {
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}

/// Canonical parent joined with the file name, so the file itself need not exist
fn absolute_file(file: &Path) -> PathBuf {
    let parent = absolute_dir(file.parent().unwrap_or(Path::new(".")));
    match file.file_name() {
        Some(name) => parent.join(name),
        None => parent,
    }
}

/// Watch the post, template and catalog directories, reloading the blog on change
fn watch_and_reload(site: &Site, reload_tx: broadcast::Sender<()>) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();

    // Create debouncer to avoid multiple rapid reloads
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    let targets = WatchTargets::new(&site.config);
    for (dir, mode) in targets.dirs() {
        if dir.is_dir() {
            debouncer.watcher().watch(&dir, mode)?;
            tracing::debug!("Watching: {:?}", dir);
        }
    }

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed: Vec<_> = events
                    .iter()
                    .filter(|e| targets.matches(&e.path))
                    .collect();

                if changed.is_empty() {
                    continue;
                }

                for event in &changed {
                    tracing::info!("File changed: {}", event.path.display());
                }

                if site.blog.reload().is_ok() {
                    tracing::info!("Reloaded posts");
                    let _ = reload_tx.send(());
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

/// Handle WebSocket connection for live reload
async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Serves static files first, then posts, then falls back to static 404s
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let path = decode_path(request.uri().path());

    if request.method() != Method::GET {
        tracing::info!("Ignoring {} {} request", request.method(), path);
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    tracing::debug!("Got request to {}", path);
    let config = &state.site.config;

    if is_static_file(&config.static_dir, &path) {
        return serve_static(&state, request).await;
    }

    if config.dev && path == "/" {
        return match state.site.blog.snapshot().map(|index| index.render_index()) {
            Some(Ok(html)) => Html(html).into_response(),
            Some(Err(e)) => render_failure(&path, e),
            None => (StatusCode::SERVICE_UNAVAILABLE, "Posts not loaded").into_response(),
        };
    }

    if config.dev {
        let site = state.site.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || site.blog.reload()).await {
            tracing::error!("Reload task failed: {}", e);
        }
    }

    let Some(index) = state.site.blog.snapshot() else {
        return serve_static(&state, request).await;
    };

    let post = index.get(&path).or_else(|| {
        config
            .posts_dir()
            .and_then(|dir| strip_posts_dir(&path, dir))
            .and_then(|stripped| index.get(&stripped))
    });

    match post {
        Some(post) => match index.render(&post) {
            Ok(html) if state.live_reload() => Html(inject_live_reload(&html)).into_response(),
            Ok(html) => Html(html).into_response(),
            Err(e) => render_failure(&path, e),
        },
        None => serve_static(&state, request).await,
    }
}

async fn serve_static(state: &ServerState, request: Request<Body>) -> Response {
    let mut service =
        ServeDir::new(&state.site.config.static_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

fn render_failure(path: &str, error: crate::Error) -> Response {
    tracing::error!("Failed to render {}: {}", path, error);
    (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render post").into_response()
}

/// Percent-decode a request path
fn decode_path(path: &str) -> String {
    percent_encoding::percent_decode_str(path)
        .decode_utf8_lossy()
        .into_owned()
}

/// Whether the request path names an existing file under the static root
fn is_static_file(static_dir: &Path, path: &str) -> bool {
    let relative = match path.trim_start_matches('/') {
        "" => "index.html",
        p => p,
    };
    let relative = Path::new(relative);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return false;
    }

    static_dir.join(relative).is_file()
}

/// Remove the first occurrence of the posts directory from a request path
fn strip_posts_dir(path: &str, posts_dir: &str) -> Option<String> {
    path.contains(posts_dir)
        .then(|| path.replacen(posts_dir, "", 1))
}

/// Inject live reload script into HTML content
fn inject_live_reload(html: &str) -> String {
    if html.contains("</body>") {
        html.replacen("</body>", LIVE_RELOAD_SCRIPT, 1)
    } else {
        format!("{}{}", html, LIVE_RELOAD_SCRIPT)
    }
}
