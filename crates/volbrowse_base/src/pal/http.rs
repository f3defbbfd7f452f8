/* 📖 # How is HTTP modeled?

The volume API is served through plain request and response values. RealPal
translates them to and from tiny_http, while MockPal hands them straight to the
service, so every route can be exercised in tests without binding a port.

There is no async runtime: RealPal runs one thread per request. Bodies are
buffered in memory, which suits JSON metadata and text file contents.
*/

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use parking_lot::Mutex;

/// Request methods understood by the volume API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

const METHOD_NAMES: [(HttpMethod, &str); 5] = [
    (HttpMethod::Get, "GET"),
    (HttpMethod::Post, "POST"),
    (HttpMethod::Put, "PUT"),
    (HttpMethod::Patch, "PATCH"),
    (HttpMethod::Delete, "DELETE"),
];

impl HttpMethod {
    /// Case-insensitive lookup; `None` for methods the API never routes.
    pub fn parse(name: &str) -> Option<Self> {
        METHOD_NAMES
            .iter()
            .find(|(_, known)| known.eq_ignore_ascii_case(name))
            .map(|(method, _)| *method)
    }

    pub fn as_str(&self) -> &'static str {
        METHOD_NAMES
            .iter()
            .find(|(method, _)| method == self)
            .map_or("GET", |(_, name)| *name)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header map keyed by lowercased name, iterated in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeaders(BTreeMap<String, String>);

impl HttpHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any previous value for the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let mut name = name.into();
        name.make_ascii_lowercase();
        self.0.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// Buffered message body.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HttpBody(Vec<u8>);

impl HttpBody {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The body as text, or `None` when it is not UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

// Bodies can hold whole files, so Debug only shows the size.
impl fmt::Debug for HttpBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HttpBody({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for HttpBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<String> for HttpBody {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

impl From<&str> for HttpBody {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

/// An incoming request. The target keeps its query string; use `route` and
/// `query` to split it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    method: HttpMethod,
    target: String,
    headers: HttpHeaders,
    body: HttpBody,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: HttpHeaders::new(),
            body: HttpBody::empty(),
        }
    }

    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    /// Full request target, query string included.
    pub fn path(&self) -> &str {
        &self.target
    }

    pub fn route(&self) -> &str {
        self.split_target().0
    }

    pub fn query(&self) -> Option<&str> {
        self.split_target().1
    }

    fn split_target(&self) -> (&str, Option<&str>) {
        match self.target.split_once('?') {
            Some((route, query)) => (route, Some(query)),
            None => (&self.target, None),
        }
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn body(&self) -> &HttpBody {
        &self.body
    }

    pub fn with_body(mut self, body: impl Into<HttpBody>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Status codes the volume API answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum HttpStatusCode {
    Ok = 200,
    BadRequest = 400,
    NotFound = 404,
    MethodNotAllowed = 405,
    Conflict = 409,
    InternalServerError = 500,
    NotImplemented = 501,
    /// The service returned an error instead of a response.
    ServiceFailure = 599,
}

impl HttpStatusCode {
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: HttpStatusCode,
    headers: HttpHeaders,
    body: HttpBody,
}

impl HttpResponse {
    pub fn new(status: HttpStatusCode) -> Self {
        Self {
            status,
            headers: HttpHeaders::new(),
            body: HttpBody::empty(),
        }
    }

    pub fn ok() -> Self {
        Self::new(HttpStatusCode::Ok)
    }

    /// 200 with an `application/json` body.
    pub fn json(body: impl Into<String>) -> Self {
        Self::ok()
            .with_content_type("application/json")
            .with_body(body.into())
    }

    /// 200 with a UTF-8 `text/plain` body.
    pub fn text(body: impl Into<String>) -> Self {
        Self::ok()
            .with_content_type("text/plain; charset=utf-8")
            .with_body(body.into())
    }

    pub fn status(&self) -> HttpStatusCode {
        self.status
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn body(&self) -> &HttpBody {
        &self.body
    }

    pub fn into_body(self) -> HttpBody {
        self.body
    }

    pub fn with_body(mut self, body: impl Into<HttpBody>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        self.with_header("content-type", content_type)
    }
}

/// Where and as whom the server listens.
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    /// `None` lets the OS choose a free port.
    pub port: Option<u16>,
    /// Value of the `server` header added to responses that lack one.
    pub server_name: String,
}

impl HttpServerConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_port(self, port: u16) -> Self {
        Self {
            port: Some(port),
            ..self
        }
    }

    pub fn with_server_name(self, server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            ..self
        }
    }

    /// Bind address; an unset port becomes 0.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port.unwrap_or_default())
    }
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: None,
            server_name: concat!("volbrowse/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Answers requests for a server started through the PAL.
///
/// Routing is left entirely to the implementation. An `Err` is not fatal: the
/// PAL turns it into a 599 response whose JSON body carries the error message.
pub trait HttpService: fmt::Debug + Send + Sync + 'static {
    fn handle_request(&self, request: HttpRequest) -> crate::error::Result<HttpResponse>;
}

#[derive(Debug)]
struct RunningServer {
    port: u16,
    stop: Arc<AtomicBool>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

// Stop accepting once nobody holds a handle anymore.
impl Drop for RunningServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// Cloneable handle to a started server.
///
/// Dropping the last clone stops the listener; requests already being served
/// still get their response.
#[derive(Debug, Clone)]
pub struct HttpServerHandle(Arc<RunningServer>);

impl HttpServerHandle {
    pub fn new(port: u16) -> Self {
        Self::with_shutdown_flag(port, Arc::default())
    }

    /// Share `stop` with the listener loop, which polls it between requests.
    pub fn with_shutdown_flag(port: u16, stop: Arc<AtomicBool>) -> Self {
        Self(Arc::new(RunningServer {
            port,
            stop,
            listener: Mutex::new(None),
        }))
    }

    pub fn with_listener(self, listener: JoinHandle<()>) -> Self {
        self.0.listener.lock().replace(listener);
        self
    }

    /// The bound port, which differs from the configured one when that was unset.
    pub fn port(&self) -> u16 {
        self.0.port
    }

    pub fn address(&self, host: &str) -> String {
        format!("{}:{}", host, self.port())
    }

    pub fn shutdown(&self) {
        self.0.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.0.stop.load(Ordering::SeqCst)
    }

    /// Wait for the listener thread, if any, to finish.
    pub fn join(&self) {
        let listener = self.0.listener.lock().take();
        if let Some(Err(_)) = listener.map(JoinHandle::join) {
            tracing::error!(port = self.port(), "HTTP listener thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names() {
        assert_eq!(HttpMethod::parse("delete"), Some(HttpMethod::Delete));
        assert_eq!(HttpMethod::parse("PATCH"), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::parse("TRACE"), None);
        assert_eq!(HttpMethod::Put.to_string(), "PUT");
    }

    #[test]
    fn test_headers_ignore_case() {
        let mut headers = HttpHeaders::new();
        headers.insert("X-Volume", "cat.sch.v1");
        headers.insert("x-volume", "cat.sch.v2");

        assert_eq!(headers.get("X-VOLUME"), Some("cat.sch.v2"));
        assert_eq!(headers.iter().count(), 1);
        assert_eq!(headers.remove("x-Volume").as_deref(), Some("cat.sch.v2"));
        assert!(!headers.contains("x-volume"));
    }

    #[test]
    fn test_body_text() {
        let body = HttpBody::from("{\"volume\":\"cat.sch.v1\"}");
        assert_eq!(body.as_str(), Some("{\"volume\":\"cat.sch.v1\"}"));
        assert_eq!(body.len(), 23);
        assert!(HttpBody::empty().is_empty());
        assert_eq!(HttpBody::from(vec![0xC3, 0x28]).as_str(), None);
        assert_eq!(format!("{:?}", HttpBody::from("abc")), "HttpBody(3 bytes)");
    }

    #[test]
    fn test_request_target_split() {
        let request = HttpRequest::new(HttpMethod::Get, "/volumes?catalog_name=cat&schema_name=sch");
        assert_eq!(request.route(), "/volumes");
        assert_eq!(request.query(), Some("catalog_name=cat&schema_name=sch"));
        assert_eq!(request.path(), "/volumes?catalog_name=cat&schema_name=sch");

        let request = HttpRequest::new(HttpMethod::Get, "/volumes/cat.sch.v1");
        assert_eq!(request.route(), "/volumes/cat.sch.v1");
        assert_eq!(request.query(), None);
    }

    #[test]
    fn test_response_constructors() {
        let json = HttpResponse::json("{\"volumes\":[]}");
        assert_eq!(json.status().as_u16(), 200);
        assert_eq!(json.headers().get("Content-Type"), Some("application/json"));

        let text = HttpResponse::text("hello");
        assert_eq!(
            text.headers().get("content-type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(text.into_body().into_bytes(), b"hello");
        assert_eq!(HttpStatusCode::ServiceFailure.as_u16(), 599);
    }

    #[test]
    fn test_server_config_address() {
        let config = HttpServerConfig::new("0.0.0.0")
            .with_port(8080)
            .with_server_name("volbrowse-test");
        assert_eq!(config.address(), "0.0.0.0:8080");
        assert_eq!(config.server_name, "volbrowse-test");
        assert_eq!(HttpServerConfig::default().address(), "127.0.0.1:0");
    }

    #[test]
    fn test_shutdown_flag_shared_across_clones() {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = HttpServerHandle::with_shutdown_flag(8080, Arc::clone(&stop));
        let clone = handle.clone();
        assert_eq!(clone.address("localhost"), "localhost:8080");

        drop(handle);
        assert!(!clone.is_shutdown());
        drop(clone);
        assert!(stop.load(Ordering::SeqCst));

        let handle = HttpServerHandle::new(8081);
        handle.shutdown();
        assert!(handle.is_shutdown());
        handle.join();
    }
}
