use std::io::{Read, Seek};
use std::sync::Arc;

use crate::error::{Error, ErrorKind, ReadFailure, Result};

use super::file_path::FilePath;
use super::http::{HttpServerConfig, HttpServerHandle, HttpService};

/// An open file: a `std::fs::File` for RealPal, a `Cursor` for MockPal.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// What a storage entry is, after following symbolic links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Directory,
    File,
    /// Dangling links, sockets, devices and anything else that is neither.
    Other,
}

/// An immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: FileKind,
}

impl DirectoryEntry {
    pub fn new(name: impl Into<String>, kind: FileKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/* 📖 # What goes through Pal?

Every storage call made while browsing a volume (classify, canonicalize, list, read)
and the HTTP listener. Resolution and containment checks are written against this
trait only, which is what lets the engine tests run on MockPal's in-memory tree
while the server runs on RealPal.
*/

/// Storage and HTTP operations used by the engine.
pub trait Pal: std::fmt::Debug + Send + Sync + 'static {
    /// Whether `path` names an entry. A dangling link counts as missing.
    fn file_exists(&self, path: &FilePath) -> Result<bool>;

    /// The physical path with every link resolved.
    ///
    /// A missing entry anywhere along the way is a `FileError` with io kind `NotFound`.
    fn canonicalize(&self, path: &FilePath) -> Result<FilePath>;

    /// Directory, file or other, as seen through links.
    fn file_kind(&self, path: &FilePath) -> Result<FileKind>;

    /// Immediate children of a directory in name order.
    ///
    /// Entries whose names are not UTF-8 are left out, since no request path can name them.
    fn list_directory(&self, path: &FilePath) -> Result<Vec<DirectoryEntry>>;

    fn read_file(&self, path: &FilePath) -> Result<Box<dyn ReadSeek + 'static>>;

    /// Whole file as text. Failures after opening are `ReadError`s.
    fn read_file_to_string(&self, path: &FilePath) -> Result<String> {
        let mut reader = self.read_file(path)?;
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).map_err(|e| {
            Box::new(Error::new(ErrorKind::ReadError {
                path: path.as_path().to_path_buf(),
                failure: ReadFailure::Io(e),
            }))
        })?;
        String::from_utf8(contents).map_err(|e| {
            Box::new(Error::new(ErrorKind::ReadError {
                path: path.as_path().to_path_buf(),
                failure: ReadFailure::InvalidText(e.utf8_error()),
            }))
        })
    }

    /// Bind and start serving `service` right away.
    ///
    /// The listener stops after `shutdown()` or once every handle clone is gone.
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> Result<HttpServerHandle>;
}

/// Shared PAL, handed to the accessor, the config loader and the server alike.
///
/// ```
/// use volbrowse_base::{FilePath, MockPal, PalHandle};
///
/// let pal = PalHandle::new(MockPal::new());
/// let for_accessor = pal.clone();
/// assert!(!for_accessor.file_exists(&FilePath::from("/data/v1")).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct PalHandle(Arc<dyn Pal>);

impl PalHandle {
    pub fn new(pal: impl Pal + 'static) -> Self {
        Self(Arc::new(pal))
    }
}

impl std::ops::Deref for PalHandle {
    type Target = dyn Pal;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_entry_creation() {
        let entry = DirectoryEntry::new("sub", FileKind::Directory);
        assert_eq!(entry.name, "sub");
        assert_eq!(entry.kind, FileKind::Directory);
    }

    #[test]
    fn test_pal_handle_clone_shares_state() {
        use crate::pal::mock::MockPal;
        let mock = MockPal::new();
        let pal = PalHandle::new(mock.clone());
        let pal_clone = pal.clone();
        mock.add_file("/data/a.txt", b"x".to_vec());
        assert!(pal_clone.file_exists(&FilePath::from("/data/a.txt")).unwrap());
    }
}
