use tracing::{info, instrument};

use volbrowse_base::{ErrorKind, VolbrowseError, VolbrowseResult};

use crate::accessor::{BrowseContent, ContentAccessor};
use crate::directory::DirectoryHandle;
use crate::resolver::PathResolver;

/// Browses volume contents: directory lookup → path resolution → content access.
///
/// Each call is independent and keeps no state between requests. The only shared
/// state is the directory, which is read-locked for the duration of the lookup.
///
/// # Example
///
/// ```
/// use volbrowse_base::{MockPal, PalHandle};
/// use volbrowse_engine::{
///     BrowseContent, ContentAccessor, CreateVolume, DirectoryHandle, InMemoryVolumeDirectory,
///     PathResolver, VolumeBrowser,
/// };
///
/// let mock = MockPal::new();
/// mock.add_file("/data/v1/a.txt", b"hello".to_vec());
///
/// let directory = DirectoryHandle::new(InMemoryVolumeDirectory::new());
/// directory
///     .create(CreateVolume::new("cat", "sch", "v1", "file:///data/v1"))
///     .unwrap();
///
/// let browser = VolumeBrowser::new(
///     directory,
///     PathResolver::default(),
///     ContentAccessor::new(PalHandle::new(mock)),
/// );
/// let content = browser.browse_path("cat.sch.v1", "a.txt").unwrap();
/// assert_eq!(content, BrowseContent::Content("hello".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct VolumeBrowser {
    directory: DirectoryHandle,
    resolver: PathResolver,
    accessor: ContentAccessor,
}

impl VolumeBrowser {
    pub fn new(
        directory: DirectoryHandle,
        resolver: PathResolver,
        accessor: ContentAccessor,
    ) -> Self {
        Self {
            directory,
            resolver,
            accessor,
        }
    }

    pub fn directory(&self) -> &DirectoryHandle {
        &self.directory
    }

    /// List the directory or read the file at `path` inside `volume`.
    #[instrument(skip(self))]
    pub fn browse_path(&self, volume: &str, path: &str) -> VolbrowseResult<BrowseContent> {
        let record = self.directory.lookup(volume)?;
        let resolved = self.resolver.resolve(&record.storage_location, path)?;
        let content = self.accessor.access(&resolved)?;
        match &content {
            BrowseContent::Files(files) => info!(entries = files.len(), "Listed volume path"),
            BrowseContent::Content(text) => info!(bytes = text.len(), "Read volume file"),
        }
        Ok(content)
    }

    /// Read the file at `path` inside `volume`. Directories are rejected.
    pub fn read_file(&self, volume: &str, path: &str) -> VolbrowseResult<String> {
        match self.browse_path(volume, path)? {
            BrowseContent::Content(text) => Ok(text),
            BrowseContent::Files(_) => Err(Box::new(VolbrowseError::new(
                ErrorKind::InvalidRequest {
                    message: format!("'{}' in volume {} is a directory", path, volume),
                },
            ))),
        }
    }
}
