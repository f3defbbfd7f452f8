/* 📖 # Why map errors to responses inside the service?

Every failure of a volume request has a meaning for the client: a missing volume is a
404, a traversal attempt a 400, a corrupt storage location a 500. The service turns each
error into a JSON body `{"error": .., "error_code": ..}` with the matching status,
using the stable code carried by the ErrorKind.

Only failures of the service itself (a response that cannot be serialized) are
returned as `Err`, which the PAL reports as HTTP 599.
*/

use std::borrow::Cow;
use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};
use url::form_urlencoded;

use volbrowse_base::pal::http::{
    HttpMethod, HttpRequest, HttpResponse, HttpService, HttpStatusCode,
};
use volbrowse_base::{ErrorKind, VolbrowseError, VolbrowseResult};

use crate::api::payload::{BrowseRequest, EmptyResponse, ErrorResponse, status_for};
use crate::browser::VolumeBrowser;
use crate::directory::DirectoryHandle;
use crate::volume::{CreateVolume, FullName, UpdateVolume};

/// Prefix of all volume routes.
pub const VOLUMES_BASE_PATH: &str = "/api/2.1/unity-catalog/volumes";

fn invalid_request(message: impl Into<String>) -> Box<VolbrowseError> {
    Box::new(VolbrowseError::new(ErrorKind::InvalidRequest {
        message: message.into(),
    }))
}

/// HTTP service for volume management and browsing.
///
/// # Examples
/// ```
/// use volbrowse_base::{MockPal, PalHandle};
/// use volbrowse_engine::{
///     ApiService, ContentAccessor, DirectoryHandle, InMemoryVolumeDirectory, PathResolver,
///     VolumeBrowser,
/// };
///
/// let browser = VolumeBrowser::new(
///     DirectoryHandle::new(InMemoryVolumeDirectory::new()),
///     PathResolver::default(),
///     ContentAccessor::new(PalHandle::new(MockPal::new())),
/// );
/// let service = ApiService::new(browser);
/// ```
#[derive(Debug, Clone)]
pub struct ApiService {
    browser: VolumeBrowser,
}

impl ApiService {
    pub fn new(browser: VolumeBrowser) -> Self {
        Self { browser }
    }

    fn directory(&self) -> &DirectoryHandle {
        self.browser.directory()
    }

    /// Serialize data to JSON and wrap it in a response with the given status.
    fn serialize_json_response<T: Serialize>(
        status: HttpStatusCode,
        data: &T,
    ) -> VolbrowseResult<HttpResponse> {
        serde_json::to_string(data)
            .map(|json| {
                HttpResponse::new(status)
                    .with_content_type("application/json")
                    .with_body(json)
            })
            .map_err(|e| volbrowse_base::err!("JSON serialization error: {}", e))
    }

    fn error_response(error: &VolbrowseError) -> VolbrowseResult<HttpResponse> {
        Self::serialize_json_response(status_for(error.kind()), &ErrorResponse::from_error(error))
    }

    fn route_error(
        status: HttpStatusCode,
        error_code: &'static str,
        request: &HttpRequest,
    ) -> VolbrowseResult<HttpResponse> {
        let body = ErrorResponse {
            error: format!("No route for {} {}", request.method(), request.route()),
            error_code,
        };
        Self::serialize_json_response(status, &body)
    }

    fn parse_json<T: DeserializeOwned>(request: &HttpRequest) -> VolbrowseResult<T> {
        serde_json::from_slice(request.body().as_bytes())
            .map_err(|e| invalid_request(format!("malformed request body: {}", e)))
    }

    fn query_params(request: &HttpRequest) -> HashMap<String, String> {
        request
            .query()
            .map(|query| form_urlencoded::parse(query.as_bytes()).into_owned().collect())
            .unwrap_or_default()
    }

    fn decode_segment(segment: &str) -> VolbrowseResult<String> {
        percent_decode_str(segment)
            .decode_utf8()
            .map(Cow::into_owned)
            .map_err(|_| invalid_request(format!("'{}' is not valid UTF-8", segment)))
    }

    /// A volume name taken from the URL. Names that do not parse cannot exist.
    fn volume_name(segment: &str) -> VolbrowseResult<FullName> {
        let decoded = Self::decode_segment(segment)?;
        FullName::parse(&decoded).map_err(|_| {
            Box::new(VolbrowseError::new(ErrorKind::VolumeNotFound { name: decoded }))
        })
    }

    fn create_volume(&self, request: &HttpRequest) -> VolbrowseResult<HttpResponse> {
        let create: CreateVolume = Self::parse_json(request)?;
        let record = self.directory().create(create)?;
        Self::serialize_json_response(HttpStatusCode::Ok, &record)
    }

    fn list_volumes(&self, request: &HttpRequest) -> VolbrowseResult<HttpResponse> {
        let params = Self::query_params(request);
        let required = |key: &str| {
            params
                .get(key)
                .ok_or_else(|| invalid_request(format!("missing query parameter '{}'", key)))
        };
        let catalog = required("catalog_name")?;
        let schema = required("schema_name")?;
        let max_results = params
            .get("max_results")
            .map(|value| {
                value.parse::<usize>().map_err(|_| {
                    invalid_request(format!("max_results must be a non-negative integer, got '{}'", value))
                })
            })
            .transpose()?;
        let page_token = params.get("page_token").map(String::as_str);

        let page = self
            .directory()
            .list_page(catalog, schema, max_results, page_token)?;
        Self::serialize_json_response(HttpStatusCode::Ok, &page)
    }

    fn get_volume(&self, segment: &str) -> VolbrowseResult<HttpResponse> {
        let name = Self::decode_segment(segment)?;
        let record = self.directory().lookup(&name)?;
        Self::serialize_json_response(HttpStatusCode::Ok, &record)
    }

    fn update_volume(&self, segment: &str, request: &HttpRequest) -> VolbrowseResult<HttpResponse> {
        let name = Self::volume_name(segment)?;
        let update: UpdateVolume = Self::parse_json(request)?;
        let record = self.directory().update(&name, update)?;
        Self::serialize_json_response(HttpStatusCode::Ok, &record)
    }

    fn delete_volume(&self, segment: &str) -> VolbrowseResult<HttpResponse> {
        let name = Self::volume_name(segment)?;
        self.directory().delete(&name)?;
        Self::serialize_json_response(HttpStatusCode::Ok, &EmptyResponse {})
    }

    fn browse(&self, request: &HttpRequest) -> VolbrowseResult<HttpResponse> {
        let browse: BrowseRequest = Self::parse_json(request)?;
        let content = self.browser.browse_path(&browse.volume, &browse.path)?;
        Self::serialize_json_response(HttpStatusCode::Ok, &content)
    }

    fn read_content(&self, segment: &str, request: &HttpRequest) -> VolbrowseResult<HttpResponse> {
        let name = Self::decode_segment(segment)?;
        let params = Self::query_params(request);
        let path = params.get("path").map(String::as_str).unwrap_or_default();
        let text = self.browser.read_file(&name, path)?;
        Ok(HttpResponse::text(text))
    }

    fn route(&self, request: &HttpRequest) -> VolbrowseResult<HttpResponse> {
        let rest = match request.route().strip_prefix(VOLUMES_BASE_PATH) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => return Self::route_error(HttpStatusCode::NotFound, "NOT_FOUND", request),
        };
        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

        match (request.method(), segments.as_slice()) {
            (HttpMethod::Post, []) => self.create_volume(request),
            (HttpMethod::Get, []) => self.list_volumes(request),
            (HttpMethod::Post, ["path"]) => self.browse(request),
            (HttpMethod::Get, [name]) => self.get_volume(name),
            (HttpMethod::Patch, [name]) => self.update_volume(name, request),
            (HttpMethod::Delete, [name]) => self.delete_volume(name),
            (HttpMethod::Get, [name, "content"]) => self.read_content(name, request),
            (_, [] | [_] | [_, "content"]) => {
                Self::route_error(HttpStatusCode::MethodNotAllowed, "INVALID_REQUEST", request)
            }
            _ => Self::route_error(HttpStatusCode::NotFound, "NOT_FOUND", request),
        }
    }
}

impl HttpService for ApiService {
    fn handle_request(&self, request: HttpRequest) -> VolbrowseResult<HttpResponse> {
        debug!(method = %request.method(), path = request.path(), "Handling API request");
        match self.route(&request) {
            Ok(response) => Ok(response),
            Err(e) => {
                if e.kind().is_client_error() {
                    warn!(code = e.kind().code(), error = %e, "Request rejected");
                } else {
                    error!(code = e.kind().code(), error = ?e, "Request failed");
                }
                Self::error_response(&e)
            }
        }
    }
}
