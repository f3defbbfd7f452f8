use std::fs;
use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};
use walkdir::WalkDir;

use crate::err;
use crate::error::{Error, ErrorKind, Result};

use super::FilePath;
use super::http::{
    HttpMethod, HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService,
    HttpStatusCode,
};
use super::traits::{DirectoryEntry, FileKind, Pal, ReadSeek};

/// How long the listener waits for a connection before re-checking the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/* 📖 # Why blocking std::fs?

Each browse request is a short, independent resolve → classify → act pipeline.
Blocking std::fs calls on a per-request thread keep that pipeline easy to follow,
and the Pal trait leaves room for an async backend without touching callers.
*/

/// Pal over the local filesystem, serving HTTP with tiny_http.
#[derive(Debug, Default)]
pub struct RealPal;

impl RealPal {
    pub fn new() -> Self {
        Self
    }
}

fn file_error(path: &FilePath, source: io::Error) -> Box<Error> {
    Box::new(Error::new(ErrorKind::FileError {
        path: path.as_path().to_path_buf(),
        source,
    }))
}

fn kind_of(file_type: fs::FileType) -> FileKind {
    if file_type.is_dir() {
        FileKind::Directory
    } else if file_type.is_file() {
        FileKind::File
    } else {
        FileKind::Other
    }
}

impl Pal for RealPal {
    #[instrument(skip(self), fields(path = %path))]
    fn file_exists(&self, path: &FilePath) -> Result<bool> {
        let exists = path.as_path().exists();
        debug!(exists, "checked file existence");
        Ok(exists)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn canonicalize(&self, path: &FilePath) -> Result<FilePath> {
        let canonical = fs::canonicalize(path.as_path()).map_err(|e| {
            debug!(error = %e, "failed to canonicalize path");
            file_error(path, e)
        })?;
        debug!(canonical = %canonical.display(), "canonicalized path");
        Ok(FilePath::from(canonical))
    }

    #[instrument(skip(self), fields(path = %path))]
    fn file_kind(&self, path: &FilePath) -> Result<FileKind> {
        match fs::metadata(path.as_path()) {
            Ok(metadata) => Ok(kind_of(metadata.file_type())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // A dangling link still exists as an entry, it just points nowhere
                match fs::symlink_metadata(path.as_path()) {
                    Ok(_) => {
                        debug!("dangling symbolic link");
                        Ok(FileKind::Other)
                    }
                    Err(_) => Err(file_error(path, e)),
                }
            }
            Err(e) => {
                debug!(error = %e, "failed to read metadata");
                Err(file_error(path, e))
            }
        }
    }

    #[instrument(skip(self), fields(path = %path))]
    fn list_directory(&self, path: &FilePath) -> Result<Vec<DirectoryEntry>> {
        let metadata = fs::metadata(path.as_path()).map_err(|e| file_error(path, e))?;
        if !metadata.is_dir() {
            return Err(file_error(path, io::Error::other("not a directory")));
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(path.as_path())
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                debug!(error = %e, "error walking directory");
                let failed = e
                    .path()
                    .map(FilePath::from)
                    .unwrap_or_else(|| path.clone());
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("directory walk failed"));
                file_error(&failed, source)
            })?;
            let kind = if entry.path_is_symlink() {
                fs::metadata(entry.path())
                    .map(|target| kind_of(target.file_type()))
                    .unwrap_or(FileKind::Other)
            } else {
                kind_of(entry.file_type())
            };
            let Some(name) = entry.file_name().to_str() else {
                warn!(name = ?entry.file_name(), "skipping entry whose name is not UTF-8");
                continue;
            };
            entries.push(DirectoryEntry::new(name, kind));
        }
        debug!(count = entries.len(), "listed directory");
        Ok(entries)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn read_file(&self, path: &FilePath) -> Result<Box<dyn ReadSeek + 'static>> {
        let file = fs::File::open(path.as_path()).map_err(|e| {
            debug!(error = %e, "failed to open file");
            file_error(path, e)
        })?;
        debug!("file opened successfully");
        Ok(Box::new(file))
    }

    #[instrument(skip(self, service), fields(address = %config.address()))]
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> Result<HttpServerHandle> {
        let address = config.address();
        let server = tiny_http::Server::http(address.as_str())
            .map_err(|e| err!("Failed to bind HTTP server to {}: {}", address, e))?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .unwrap_or_default();

        let service: Arc<dyn HttpService> = Arc::from(service);
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let server_name = config.server_name.clone();
        let listener = std::thread::Builder::new()
            .name("http-listener".to_string())
            .spawn(move || accept_loop(server, service, flag, server_name))
            .map_err(|e| err!("Failed to spawn HTTP listener thread: {}", e))?;

        info!(port, "HTTP server listening");
        Ok(HttpServerHandle::with_shutdown_flag(port, shutdown).with_listener(listener))
    }
}

fn accept_loop(
    server: tiny_http::Server,
    service: Arc<dyn HttpService>,
    shutdown: Arc<AtomicBool>,
    server_name: String,
) {
    while !shutdown.load(Ordering::SeqCst) {
        match server.recv_timeout(ACCEPT_POLL_INTERVAL) {
            Ok(Some(request)) => {
                let service = Arc::clone(&service);
                let server_name = server_name.clone();
                let spawned = std::thread::Builder::new()
                    .name("http-request".to_string())
                    .spawn(move || respond(service.as_ref(), request, &server_name));
                if let Err(e) = spawned {
                    error!(error = %e, "failed to spawn request thread");
                }
            }
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "failed to accept HTTP request");
                break;
            }
        }
    }
    debug!("HTTP listener stopped");
}

/// Why a request never reached the service.
struct Rejection {
    status: HttpStatusCode,
    message: String,
}

fn convert_request(request: &mut tiny_http::Request) -> std::result::Result<HttpRequest, Rejection> {
    let method_name = request.method().to_string();
    let Some(method) = HttpMethod::parse(&method_name) else {
        let route = request.url().split('?').next().unwrap_or_default();
        return Err(Rejection {
            status: HttpStatusCode::MethodNotAllowed,
            message: format!("No route for {} {}", method_name, route),
        });
    };

    let mut body = Vec::new();
    request
        .as_reader()
        .read_to_end(&mut body)
        .map_err(|e| Rejection {
            status: HttpStatusCode::BadRequest,
            message: format!("Failed to read request body: {}", e),
        })?;

    let mut converted = HttpRequest::new(method, request.url().to_string()).with_body(body);
    for header in request.headers() {
        converted = converted.with_header(header.field.to_string(), header.value.to_string());
    }
    Ok(converted)
}

fn failure_response(status: HttpStatusCode, message: &str, error_code: &str) -> HttpResponse {
    let body = serde_json::json!({ "error": message, "error_code": error_code });
    HttpResponse::new(status)
        .with_content_type("application/json")
        .with_body(body.to_string())
}

fn respond(service: &dyn HttpService, mut request: tiny_http::Request, server_name: &str) {
    let response = match convert_request(&mut request) {
        Ok(converted) => {
            let method = *converted.method();
            let path = converted.path().to_string();
            match service.handle_request(converted) {
                Ok(response) => {
                    debug!(%method, %path, status = response.status().as_u16(), "request handled");
                    response
                }
                Err(e) => {
                    error!(%method, %path, error = %e, "service failed to handle request");
                    failure_response(HttpStatusCode::ServiceFailure, &e.to_string(), e.kind().code())
                }
            }
        }
        Err(rejection) => {
            warn!(status = rejection.status.as_u16(), error = %rejection.message, "rejected request");
            failure_response(rejection.status, &rejection.message, "INVALID_REQUEST")
        }
    };

    let status = tiny_http::StatusCode(response.status().as_u16());
    let mut headers = response.headers().clone();
    if !headers.contains("server") {
        headers.insert("server", server_name);
    }
    let mut reply = tiny_http::Response::from_data(response.into_body().into_bytes())
        .with_status_code(status);
    for (key, value) in headers.iter() {
        match tiny_http::Header::from_bytes(key.as_bytes(), value.as_bytes()) {
            Ok(header) => reply.add_header(header),
            Err(()) => warn!(header = %key, "dropping invalid response header"),
        }
    }
    if let Err(e) = request.respond(reply) {
        warn!(error = %e, "failed to send HTTP response");
    }
}
