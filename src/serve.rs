//! HTTP server for compiled pages.
//!
//! Built on `tiny_http`:
//!
//! - Pages rendered live from the registry (`/` serves `index.html`)
//! - Generated and static files served from disk
//! - Configured not-found page with status 404
//! - Graceful shutdown on Ctrl+C
//!
//! # Request resolution
//!
//! ```text
//! GET /About.html
//!   │
//!   ├─ registry has "About.html"  → render it now
//!   ├─ generated/About.html       → serve file
//!   ├─ static/About.html          → serve file
//!   └─ otherwise                  → 404 page (or plain text)
//! ```

use crate::{
    config::BlueprintConfig,
    log,
    logger::error_chain,
    registry::{Registry, TemplateError},
};
use anyhow::{Context as _, Result};
use std::{
    borrow::Cow,
    fs,
    net::{IpAddr, SocketAddr},
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tera::Context;
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

/// Page name served for `/`.
const INDEX: &str = "index.html";

// ============================================================================
// Server Entry Point
// ============================================================================

/// Start the server and block until Ctrl+C.
///
/// Watching (if enabled) is started by the caller; this loop only reads the
/// registry and the directories on disk.
pub fn serve_site(config: &BlueprintConfig, registry: Arc<Registry>) -> Result<()> {
    let interface: IpAddr = config.serve.interface.parse()?;
    let (server, addr) = try_bind_port(interface, config.serve.port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    // Set up Ctrl+C handler for graceful shutdown
    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    log!("serve"; "http://{}", addr);

    let site = Site::new(config, registry);
    for request in server.incoming_requests() {
        if let Err(e) = site.handle_request(request) {
            log!("serve"; "request error: {e}");
        }
    }

    Ok(())
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(
    interface: IpAddr,
    base_port: u16,
    max_retries: u16,
) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        max_retries,
        base_port,
        base_port.saturating_add(max_retries.saturating_sub(1)),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

// ============================================================================
// Request Handling
// ============================================================================

/// What a request path resolves to.
#[derive(Debug)]
enum Resolved {
    /// Freshly rendered registry page.
    Page(Vec<u8>),
    /// File on disk.
    File(PathBuf),
    /// Registry page that failed to render.
    Failed(TemplateError),
    NotFound,
}

/// Everything a request can be answered from.
#[derive(Debug)]
struct Site {
    registry: Arc<Registry>,
    output: PathBuf,
    static_dir: PathBuf,
    not_found: PathBuf,
}

impl Site {
    fn new(config: &BlueprintConfig, registry: Arc<Registry>) -> Self {
        Self {
            registry,
            output: config.templates.output.clone(),
            static_dir: config.serve.static_dir.clone(),
            not_found: config.serve.not_found.clone(),
        }
    }

    /// Handle a single HTTP request and log its outcome.
    fn handle_request(&self, request: Request) -> Result<()> {
        let method = request.method().clone();
        let url = request.url().to_owned();

        let status = match self.resolve(&url) {
            Resolved::Page(body) => respond(request, html(body))?,
            Resolved::File(path) => {
                let content = fs::read(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let response = Response::from_data(content)
                    .with_header(content_type(guess_content_type(&path)));
                respond(request, response)?
            }
            Resolved::Failed(err) => {
                log!("error"; "{}", error_chain(&err));
                let response = Response::from_string("500 Internal Server Error")
                    .with_status_code(StatusCode(500))
                    .with_header(content_type("text/plain"));
                respond(request, response)?
            }
            Resolved::NotFound => self.serve_not_found(request)?,
        };

        log!("serve"; "{} {} {}", method, url, status);
        Ok(())
    }

    /// Resolve a raw request URL against the registry, then disk.
    fn resolve(&self, url: &str) -> Resolved {
        let Some(path) = request_path(url) else {
            return Resolved::NotFound;
        };

        if let Some(name) = page_name(&path)
            && self.registry.exists(&name)
        {
            let mut body = Vec::new();
            return match self.registry.execute(&mut body, &name, &Context::new()) {
                Ok(()) => Resolved::Page(body),
                Err(err) => Resolved::Failed(err),
            };
        }

        [&self.output, &self.static_dir]
            .into_iter()
            .find_map(|root| find_file(&root.join(&path)))
            .map_or(Resolved::NotFound, Resolved::File)
    }

    /// Serve the configured 404 page, or plain text when it is unreadable.
    fn serve_not_found(&self, request: Request) -> Result<u16> {
        match fs::read(&self.not_found) {
            Ok(content) => respond(request, html(content).with_status_code(StatusCode(404))),
            Err(_) => {
                let response = Response::from_string("404 Not Found")
                    .with_status_code(StatusCode(404))
                    .with_header(content_type("text/plain"));
                respond(request, response)
            }
        }
    }
}

/// Decode a request URL into a relative path.
///
/// Query strings are dropped. Returns `None` for paths that would leave the
/// serving roots (`..`, absolute components).
fn request_path(url: &str) -> Option<PathBuf> {
    // Decode URL-encoded characters (e.g., %20 → space)
    let decoded = urlencoding::decode(url).map(Cow::into_owned).unwrap_or_default();
    let without_query = decoded.split('?').next().unwrap_or(&decoded);
    let path = Path::new(without_query.trim_matches('/'));

    path.components()
        .all(|c| matches!(c, Component::Normal(_)))
        .then(|| path.to_path_buf())
}

/// Registry page name for a request path: pages are flat, so only
/// single-segment paths qualify.
fn page_name(path: &Path) -> Option<String> {
    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, _) => Some(INDEX.to_owned()),
        (Some(Component::Normal(name)), None) => name.to_str().map(str::to_owned),
        _ => None,
    }
}

/// A file at `path`, or the `index.html` inside it.
fn find_file(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    let index = path.join(INDEX);
    (path.is_dir() && index.is_file()).then_some(index)
}

// ============================================================================
// Response Helpers
// ============================================================================

fn respond<R: std::io::Read>(request: Request, response: Response<R>) -> Result<u16> {
    let status = response.status_code().0;
    request.respond(response)?;
    Ok(status)
}

fn html(body: Vec<u8>) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_data(body).with_header(content_type("text/html; charset=utf-8"))
}

fn content_type(value: &'static str) -> Header {
    Header::from_bytes("Content-Type", value).expect("static header is valid")
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        // Web content
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",

        // Images
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",

        Some("txt") => "text/plain; charset=utf-8",

        // Default binary
        _ => "application/octet-stream",
    }
}
