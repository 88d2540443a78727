//! Preview server with live reload
//!
//! Serves the build directory over HTTP. Every HTML response gets a small
//! script that polls [`VERSION_PATH`] and reloads the page when the reload
//! generation changes; [`ReloadHandle::trigger`] bumps the generation.

use std::fs;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tiny_http::{Header, Response, Server};

use crate::build::BuildContext;

/// Path polled by the injected script.
pub const VERSION_PATH: &str = "/__bsm/version";

/// Poll interval of the injected script in milliseconds.
const POLL_INTERVAL_MS: u32 = 1000;

/// Error starting the preview server
#[derive(Debug, Error)]
pub enum ServeError {
    /// The address could not be bound
    #[error("cannot listen on {addr}: {message}")]
    Bind {
        /// Requested address
        addr: String,
        /// Reason
        message: String,
    },
    /// The server is not bound to an IP address
    #[error("server has no IP address")]
    NoAddress,
}

/// Shared reload generation
#[derive(Debug, Clone, Default)]
pub struct ReloadHandle(Arc<AtomicU64>);

impl ReloadHandle {
    /// Create a handle at generation 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Ask connected browsers to reload; returns the new generation.
    pub fn trigger(&self) -> u64 {
        let generation = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(generation, "reload triggered");
        generation
    }
}

/// A response independent of the HTTP library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value
    pub content_type: &'static str,
    /// Body
    pub body: Vec<u8>,
}

impl Reply {
    fn text(status: u16, body: impl Into<String>) -> Self {
        Self { status, content_type: "text/plain; charset=utf-8", body: body.into().into_bytes() }
    }
}

/// Content type for a file extension.
pub fn content_type(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}

fn decode_percent(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Map a request URL to a path below `root`, dropping `..` and the query.
pub fn resolve_url(url: &str, root: &Path) -> PathBuf {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let decoded = decode_percent(path);
    let mut resolved = root.to_path_buf();
    for component in Path::new(&decoded).components() {
        if let Component::Normal(part) = component {
            resolved.push(part);
        }
    }
    resolved
}

/// The script injected into HTML pages.
pub fn reload_script(generation: u64) -> String {
    format!(
        "<script>(function(){{var v='{}';setInterval(function(){{fetch('{}').then(function(r){{return r.text()}})\
.then(function(t){{if(t!==v){{location.reload()}}}}).catch(function(){{}})}},{})}})();</script>",
        generation, VERSION_PATH, POLL_INTERVAL_MS
    )
}

/// Insert the reload script before `</body>`, or append it.
pub fn inject_script(html: &str, generation: u64) -> String {
    let script = reload_script(generation);
    match html.rfind("</body>") {
        Some(pos) => format!("{}{}{}", &html[..pos], script, &html[pos..]),
        None => format!("{}{}", html, script),
    }
}

/// Answer a GET for `url` from the files under `root`.
pub fn respond_to(url: &str, root: &Path, start_path: &str, generation: u64, live_reload: bool) -> Reply {
    if url.split('?').next() == Some(VERSION_PATH) {
        return Reply::text(200, generation.to_string());
    }

    let mut path = if url == "/" || url.is_empty() {
        resolve_url(start_path, root)
    } else {
        resolve_url(url, root)
    };
    if path.is_dir() {
        path.push("index.html");
    }

    match fs::read(&path) {
        Ok(body) => {
            let content_type = content_type(&path);
            let body = if live_reload && content_type.starts_with("text/html") {
                inject_script(&String::from_utf8_lossy(&body), generation).into_bytes()
            } else {
                body
            };
            Reply { status: 200, content_type, body }
        }
        Err(_) => Reply::text(404, format!("Not found: {}", url)),
    }
}

/// A running preview server
pub struct PreviewServer {
    server: Arc<Server>,
    addr: SocketAddr,
    start_path: String,
    reload: ReloadHandle,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for PreviewServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewServer").field("addr", &self.addr).finish()
    }
}

impl PreviewServer {
    /// Bind the configured address and serve the build directory on a
    /// background thread.
    pub fn start(ctx: &BuildContext, reload: ReloadHandle) -> Result<Self, ServeError> {
        let serve = &ctx.config().serve;
        let addr = format!("{}:{}", serve.host, serve.port);
        let server = Server::http(addr.as_str())
            .map_err(|e| ServeError::Bind { addr: addr.clone(), message: e.to_string() })?;
        let bound = server.server_addr().to_ip().ok_or(ServeError::NoAddress)?;
        let server = Arc::new(server);

        let root = ctx.build_dir();
        let start_path = serve.start_path.clone();
        let live_reload = serve.live_reload;
        let worker = Arc::clone(&server);
        let generation = reload.clone();
        let thread_start_path = start_path.clone();

        let thread = std::thread::spawn(move || {
            for request in worker.incoming_requests() {
                let reply =
                    respond_to(request.url(), &root, &thread_start_path, generation.generation(), live_reload);
                tracing::debug!(url = request.url(), status = reply.status, "request");

                let mut response = Response::from_data(reply.body).with_status_code(reply.status);
                if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
                    response = response.with_header(header);
                }
                if let Ok(header) = Header::from_bytes(&b"Cache-Control"[..], &b"no-store"[..]) {
                    response = response.with_header(header);
                }
                if let Err(e) = request.respond(response) {
                    tracing::debug!(error = %e, "client went away");
                }
            }
        });

        tracing::info!(addr = %bound, "preview server listening");
        Ok(Self { server, addr: bound, start_path, reload, thread: Some(thread) })
    }

    /// Bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// URL of the start page.
    pub fn url(&self) -> String {
        format!("http://{}/{}", self.addr, self.start_path.trim_start_matches('/'))
    }

    /// Reload handle shared with the server.
    pub fn reload_handle(&self) -> &ReloadHandle {
        &self.reload
    }

    /// Stop accepting requests and wait for the server thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.server.unblock();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for PreviewServer {
    fn drop(&mut self) {
        self.stop();
    }
}
