/* 📖 # How is a volume-relative path resolved?

1. The storage location is parsed as a URI. Anything without a scheme is not a
   location at all (`InvalidLocation`), and schemes no backend is configured for are
   rejected right away (`UnsupportedScheme`), before any storage is touched.
2. The URI's path component becomes the volume root, percent-decoded and lexically
   normalized.
3. The caller's path is read as a `RelativePath`: `/` is the only separator and leading
   separators carry no meaning, so `/etc/passwd` is just `etc/passwd` inside the volume.
4. Joining interprets `..` logically. The result must still start with the root,
   component by component, or the request is a `PathTraversal`. Nothing is clamped.

This step is pure. Whether the path exists, and where symbolic links inside the
volume point, is the content accessor's business.
*/

use std::collections::BTreeSet;

use percent_encoding::percent_decode_str;
use relative_path::{RelativePath, RelativePathBuf};
use tracing::{debug, instrument, warn};
use url::Url;

use volbrowse_base::{ErrorKind, FilePath, VolbrowseError, VolbrowseResult};

/// Scheme for locations on the local filesystem.
pub const FILE_SCHEME: &str = "file";

/// A request path resolved against a volume's storage location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Lowercase scheme of the storage location.
    pub scheme: String,
    /// The volume root.
    pub root: FilePath,
    /// The normalized path inside the volume. Empty for the root itself.
    pub relative: RelativePathBuf,
    /// `root` joined with `relative`.
    pub path: FilePath,
}

fn invalid_location(location: &str, reason: impl Into<String>) -> Box<VolbrowseError> {
    Box::new(VolbrowseError::new(ErrorKind::InvalidLocation {
        location: location.to_string(),
        reason: reason.into(),
    }))
}

/// Turns (storage location, relative path) pairs into validated storage paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    supported_schemes: BTreeSet<String>,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new([FILE_SCHEME])
    }
}

impl PathResolver {
    pub fn new<S: AsRef<str>>(supported_schemes: impl IntoIterator<Item = S>) -> Self {
        Self {
            supported_schemes: supported_schemes
                .into_iter()
                .map(|scheme| scheme.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn supports(&self, scheme: &str) -> bool {
        self.supported_schemes.contains(&scheme.to_ascii_lowercase())
    }

    #[instrument(skip(self))]
    pub fn resolve(
        &self,
        storage_location: &str,
        relative_path: &str,
    ) -> VolbrowseResult<ResolvedPath> {
        let url = Url::parse(storage_location)
            .map_err(|e| invalid_location(storage_location, e.to_string()))?;
        let scheme = url.scheme().to_string();
        if !self.supports(&scheme) {
            return Err(Box::new(VolbrowseError::new(ErrorKind::UnsupportedScheme {
                scheme,
                location: storage_location.to_string(),
            })));
        }
        let root = storage_root(&url, storage_location)?;

        if relative_path.contains('\0') {
            return Err(Box::new(VolbrowseError::new(ErrorKind::InvalidRequest {
                message: "path contains a NUL byte".to_string(),
            })));
        }

        let path = root.join_relative(RelativePath::new(relative_path));
        let relative = match path.relative_to(&root) {
            Some(relative) if path.starts_with(&root) => relative,
            _ => {
                warn!(root = %root, resolved = %path, "Rejected path outside of volume root");
                return Err(Box::new(VolbrowseError::new(ErrorKind::PathTraversal {
                    path: relative_path.to_string(),
                })));
            }
        };

        debug!(path = %path, "Resolved path");
        Ok(ResolvedPath {
            scheme,
            root,
            relative,
            path,
        })
    }
}

/// The volume root encoded in a storage location URI.
fn storage_root(url: &Url, location: &str) -> VolbrowseResult<FilePath> {
    if url.scheme() == FILE_SCHEME {
        let path = url.to_file_path().map_err(|()| {
            invalid_location(
                location,
                format!(
                    "file location with non-local host '{}'",
                    url.host_str().unwrap_or_default()
                ),
            )
        })?;
        return Ok(FilePath::from(path));
    }

    let decoded = percent_decode_str(url.path())
        .decode_utf8()
        .map_err(|e| invalid_location(location, format!("path is not valid UTF-8: {}", e)))?;
    if decoded.is_empty() {
        return Ok(FilePath::from("/"));
    }
    Ok(FilePath::from(decoded.as_ref()))
}
