/* 📖 # What happens between resolving and answering a browse request?

The resolver only proves the path is lexically inside the volume. The accessor then:

1. canonicalizes the target, following symbolic links (missing or dangling → `PathNotFound`)
2. canonicalizes the volume root and checks the canonical target is still under it,
   so a link inside the volume cannot expose files outside of it (`PathTraversal`)
3. classifies the target: a directory is listed, a regular file is read as text,
   anything else is reported as `PathNotFound`

Reported paths are always the logical request path, never a link target.

# Known race

The entry is classified first and listed or read afterwards. Another process can
replace or delete it in between (time-of-check to time-of-use). This window is not
closed here: doing so needs an atomic open plus fstat, which the PAL does not offer.
A file that disappears before it is read is reported as `ReadFailure::Vanished`,
and a file changed concurrently may be read half-written.
*/

use std::collections::BTreeMap;
use std::io;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use volbrowse_base::{
    ErrorKind, FileKind, FilePath, PalHandle, ReadFailure, ResultExt, VolbrowseError,
    VolbrowseResult,
};

use crate::resolver::{FILE_SCHEME, ResolvedPath};

/// How an entry of a directory listing is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

/// The outcome of a successful browse: a listing or a file's text.
///
/// Serializes as `{"files": {"name": "directory"|"file"}}` or `{"content": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowseContent {
    Files(BTreeMap<String, EntryKind>),
    Content(String),
}

fn path_not_found(path: &FilePath) -> Box<VolbrowseError> {
    Box::new(VolbrowseError::new(ErrorKind::PathNotFound {
        path: path.as_path().to_path_buf(),
    }))
}

/// Extract the I/O error behind a PAL failure.
fn io_source(error: Box<VolbrowseError>) -> io::Error {
    match error.into_kind() {
        ErrorKind::FileError { source, .. } | ErrorKind::AccessError { source, .. } => source,
        ErrorKind::ReadError {
            failure: ReadFailure::Io(source),
            ..
        } => source,
        other => io::Error::other(other.to_string()),
    }
}

/// Lists directories and reads files for resolved paths.
#[derive(Debug, Clone)]
pub struct ContentAccessor {
    pal: PalHandle,
}

impl ContentAccessor {
    pub fn new(pal: PalHandle) -> Self {
        Self { pal }
    }

    #[instrument(skip(self, resolved), fields(path = %resolved.path))]
    pub fn access(&self, resolved: &ResolvedPath) -> VolbrowseResult<BrowseContent> {
        if resolved.scheme != FILE_SCHEME {
            return Err(Box::new(VolbrowseError::new(ErrorKind::UnsupportedScheme {
                scheme: resolved.scheme.clone(),
                location: format!("{}://{}", resolved.scheme, resolved.root),
            })));
        }

        let target = self.contained_target(resolved)?;
        let kind = match self.pal.file_kind(&target) {
            Ok(kind) => kind,
            Err(e) if e.io_error_kind() == Some(io::ErrorKind::NotFound) => {
                return Err(path_not_found(&resolved.path));
            }
            Err(e) => return Err(e),
        };

        match kind {
            FileKind::Directory => self.list(resolved, &target),
            FileKind::File => self.read(resolved, &target),
            FileKind::Other => {
                debug!("Neither a directory nor a file");
                Err(path_not_found(&resolved.path))
            }
        }
    }

    /// Canonical target path, guaranteed to lie within the canonical volume root.
    fn contained_target(&self, resolved: &ResolvedPath) -> VolbrowseResult<FilePath> {
        let target = match self.pal.canonicalize(&resolved.path) {
            Ok(target) => target,
            Err(e) if e.io_error_kind() == Some(io::ErrorKind::NotFound) => {
                debug!("Path does not exist");
                return Err(path_not_found(&resolved.path));
            }
            Err(e) => {
                return Err(Box::new(
                    e.with_context(|| format!("Failed to resolve {}", resolved.path)),
                ));
            }
        };
        let root = self
            .pal
            .canonicalize(&resolved.root)
            .with_context(|| format!("Failed to resolve volume root {}", resolved.root))?;

        if !target.starts_with(&root) {
            warn!(root = %root, target = %target, "Symbolic link leads outside of volume root");
            return Err(Box::new(VolbrowseError::new(ErrorKind::PathTraversal {
                path: resolved.relative.to_string(),
            })));
        }
        Ok(target)
    }

    fn list(&self, resolved: &ResolvedPath, target: &FilePath) -> VolbrowseResult<BrowseContent> {
        let entries = self.pal.list_directory(target).map_err(|e| {
            Box::new(VolbrowseError::new(ErrorKind::AccessError {
                path: resolved.path.as_path().to_path_buf(),
                source: io_source(e),
            }))
        })?;

        // Dangling links and special files are listed as files
        let files: BTreeMap<String, EntryKind> = entries
            .into_iter()
            .map(|entry| {
                let kind = match entry.kind {
                    FileKind::Directory => EntryKind::Directory,
                    FileKind::File | FileKind::Other => EntryKind::File,
                };
                (entry.name, kind)
            })
            .collect();
        debug!(count = files.len(), "Listed directory");
        Ok(BrowseContent::Files(files))
    }

    fn read(&self, resolved: &ResolvedPath, target: &FilePath) -> VolbrowseResult<BrowseContent> {
        let content = self.pal.read_file_to_string(target).map_err(|e| {
            let failure = match e.into_kind() {
                ErrorKind::ReadError { failure, .. } => failure,
                ErrorKind::FileError { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                    ReadFailure::Vanished
                }
                ErrorKind::FileError { source, .. } | ErrorKind::AccessError { source, .. } => {
                    ReadFailure::Io(source)
                }
                other => ReadFailure::Io(io::Error::other(other.to_string())),
            };
            Box::new(VolbrowseError::new(ErrorKind::ReadError {
                path: resolved.path.as_path().to_path_buf(),
                failure,
            }))
        })?;
        debug!(bytes = content.len(), "Read file");
        Ok(BrowseContent::Content(content))
    }
}
