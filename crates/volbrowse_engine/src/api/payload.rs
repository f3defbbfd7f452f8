use serde::{Deserialize, Serialize};

use volbrowse_base::pal::http::HttpStatusCode;
use volbrowse_base::{ErrorKind, VolbrowseError};

/// Body of `POST /volumes/path`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowseRequest {
    /// Fully qualified volume name.
    pub volume: String,
    /// Path inside the volume. The volume root when absent.
    #[serde(default)]
    pub path: String,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: &'static str,
}

impl ErrorResponse {
    pub fn from_error(error: &VolbrowseError) -> Self {
        Self {
            error: error.to_string(),
            error_code: error.kind().code(),
        }
    }
}

/// Body of `DELETE /volumes/{full_name}`.
#[derive(Debug, Serialize)]
pub(crate) struct EmptyResponse {}

pub(crate) fn status_for(kind: &ErrorKind) -> HttpStatusCode {
    match kind {
        ErrorKind::VolumeNotFound { .. } | ErrorKind::PathNotFound { .. } => {
            HttpStatusCode::NotFound
        }
        ErrorKind::PathTraversal { .. } | ErrorKind::InvalidRequest { .. } => {
            HttpStatusCode::BadRequest
        }
        ErrorKind::AlreadyExists { .. } => HttpStatusCode::Conflict,
        ErrorKind::UnsupportedScheme { .. } => HttpStatusCode::NotImplemented,
        ErrorKind::InvalidLocation { .. }
        | ErrorKind::AccessError { .. }
        | ErrorKind::ReadError { .. }
        | ErrorKind::FileError { .. }
        | ErrorKind::Message { .. } => HttpStatusCode::InternalServerError,
    }
}
