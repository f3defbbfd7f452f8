use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ffi::OsString;
use std::io::{self, Cursor};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::err;
use crate::error::{Error, ErrorKind, Result};

use super::FilePath;
use super::http::{HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService};
use super::traits::{DirectoryEntry, FileKind, Pal, ReadSeek};

/// Symbolic link chains longer than this are treated as loops.
const MAX_LINK_HOPS: usize = 40;

/* 📖 # Why model symlinks and failures in MockPal?

Volume browsing is mostly about the edges: links that point out of a volume root,
links that point nowhere, and files that disappear or become unreadable between
classification and access. MockPal keeps a flat map of path → entry, resolves
links component by component like the OS does, and lets tests inject an I/O
failure for any path. This keeps those scenarios deterministic and platform independent.
*/

#[derive(Debug, Clone)]
enum MockEntry {
    File(Vec<u8>),
    Directory,
    Symlink(FilePath),
}

/// Pal over an in-memory tree. Clones share the tree.
///
/// Adding an entry creates its missing parent directories.
///
/// ```
/// use volbrowse_base::{FilePath, MockPal, Pal};
///
/// let mock = MockPal::new();
/// mock.add_file("/data/v1/notes.txt", b"hello".to_vec());
/// let text = mock.read_file_to_string(&FilePath::from("/data/v1/notes.txt")).unwrap();
/// assert_eq!(text, "hello");
/// ```
#[derive(Debug, Clone)]
pub struct MockPal {
    entries: Arc<Mutex<BTreeMap<FilePath, MockEntry>>>,
    failures: Arc<Mutex<HashMap<FilePath, io::ErrorKind>>>,
    services: Arc<Mutex<HashMap<u16, Box<dyn HttpService>>>>,
    next_port: Arc<AtomicU16>,
}

/// First port handed out when a server is started without one.
const FIRST_MOCK_PORT: u16 = 10000;

impl MockPal {
    pub fn new() -> Self {
        Self {
            entries: Arc::default(),
            failures: Arc::default(),
            services: Arc::default(),
            next_port: Arc::new(AtomicU16::new(FIRST_MOCK_PORT)),
        }
    }

    /// Add a file, creating missing parent directories.
    pub fn add_file(&self, path: impl Into<FilePath>, content: Vec<u8>) {
        self.insert(path.into(), MockEntry::File(content));
    }

    /// Add a directory, creating missing parent directories.
    pub fn add_directory(&self, path: impl Into<FilePath>) {
        self.insert(path.into(), MockEntry::Directory);
    }

    /// Add a symbolic link. A relative target is interpreted relative to the link's directory.
    pub fn add_symlink(&self, path: impl Into<FilePath>, target: impl Into<FilePath>) {
        let path = path.into();
        let target = target.into();
        let target = if target.as_path().is_absolute() {
            target
        } else {
            let base = path.parent().unwrap_or_else(|| FilePath::from("/"));
            FilePath::from(base.as_path().join(target.as_path()))
        };
        self.insert(path, MockEntry::Symlink(target));
    }

    /// Remove an entry and everything below it.
    pub fn remove(&self, path: impl Into<FilePath>) {
        let path = path.into();
        self.entries.lock().retain(|entry, _| !entry.starts_with(&path));
    }

    /// Make listing or reading `path` fail with the given I/O error kind.
    pub fn fail_path(&self, path: impl Into<FilePath>, kind: io::ErrorKind) {
        self.failures.lock().insert(path.into(), kind);
    }

    /// Hand `request` to the service started on `port`, as if it came over the wire.
    pub fn simulate_request(&self, port: u16, request: HttpRequest) -> Result<HttpResponse> {
        let services = self.services.lock();
        let service = services
            .get(&port)
            .ok_or_else(|| err!("No HTTP server registered on port {}", port))?;
        service.handle_request(request)
    }

    pub fn http_server_count(&self) -> usize {
        self.services.lock().len()
    }

    fn insert(&self, path: FilePath, entry: MockEntry) {
        let mut entries = self.entries.lock();
        let mut ancestor = path.parent();
        while let Some(dir) = ancestor {
            if dir.parent().is_none() {
                break;
            }
            entries.entry(dir.clone()).or_insert(MockEntry::Directory);
            ancestor = dir.parent();
        }
        entries.insert(path, entry);
    }

    fn injected_failure(&self, paths: &[&FilePath]) -> Option<io::Error> {
        let failures = self.failures.lock();
        paths
            .iter()
            .find_map(|path| failures.get(*path))
            .map(|kind| io::Error::new(*kind, "injected failure"))
    }

    /// Follow symbolic links component by component.
    fn resolve(entries: &BTreeMap<FilePath, MockEntry>, path: &FilePath) -> io::Result<FilePath> {
        let mut pending: VecDeque<OsString> = path
            .as_path()
            .components()
            .map(|component| component.as_os_str().to_os_string())
            .collect();
        let mut resolved = PathBuf::new();
        let mut hops = 0;
        while let Some(component) = pending.pop_front() {
            resolved.push(component);
            let current = FilePath::from(resolved.clone());
            if current.parent().is_none() {
                continue;
            }
            match entries.get(&current) {
                Some(MockEntry::Symlink(target)) => {
                    hops += 1;
                    if hops > MAX_LINK_HOPS {
                        return Err(io::Error::other("too many levels of symbolic links"));
                    }
                    for component in target.as_path().components().rev() {
                        pending.push_front(component.as_os_str().to_os_string());
                    }
                    resolved = PathBuf::new();
                }
                Some(_) => {}
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("No such file or directory: {}", path),
                    ));
                }
            }
        }
        Ok(FilePath::from(resolved))
    }

    fn kind_of(entries: &BTreeMap<FilePath, MockEntry>, path: &FilePath) -> FileKind {
        match Self::resolve(entries, path).map(|resolved| entries.get(&resolved).cloned()) {
            Ok(Some(MockEntry::File(_))) => FileKind::File,
            Ok(Some(MockEntry::Directory)) => FileKind::Directory,
            _ => FileKind::Other,
        }
    }
}

fn file_error(path: &FilePath, source: io::Error) -> Box<Error> {
    Box::new(Error::new(ErrorKind::FileError {
        path: path.as_path().to_path_buf(),
        source,
    }))
}

impl Default for MockPal {
    fn default() -> Self {
        Self::new()
    }
}

impl Pal for MockPal {
    fn file_exists(&self, path: &FilePath) -> Result<bool> {
        let entries = self.entries.lock();
        Ok(Self::resolve(&entries, path).is_ok())
    }

    fn canonicalize(&self, path: &FilePath) -> Result<FilePath> {
        let entries = self.entries.lock();
        Self::resolve(&entries, path).map_err(|e| file_error(path, e))
    }

    fn file_kind(&self, path: &FilePath) -> Result<FileKind> {
        let entries = self.entries.lock();
        match Self::resolve(&entries, path) {
            Ok(_) => Ok(Self::kind_of(&entries, path)),
            // The link itself exists but points nowhere
            Err(_) if entries.contains_key(path) => Ok(FileKind::Other),
            Err(e) => Err(file_error(path, e)),
        }
    }

    fn list_directory(&self, path: &FilePath) -> Result<Vec<DirectoryEntry>> {
        let entries = self.entries.lock();
        let resolved = Self::resolve(&entries, path).map_err(|e| file_error(path, e))?;
        if let Some(e) = self.injected_failure(&[path, &resolved]) {
            return Err(file_error(path, e));
        }
        if !matches!(entries.get(&resolved), Some(MockEntry::Directory)) {
            return Err(file_error(path, io::Error::other("not a directory")));
        }

        let mut children: Vec<DirectoryEntry> = entries
            .keys()
            .filter(|candidate| candidate.parent().as_ref() == Some(&resolved))
            .filter_map(|child| {
                let name = child.file_name()?;
                Some(DirectoryEntry::new(name, Self::kind_of(&entries, child)))
            })
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    fn read_file(&self, path: &FilePath) -> Result<Box<dyn ReadSeek + 'static>> {
        let entries = self.entries.lock();
        if let Some(e) = self.injected_failure(&[path]) {
            return Err(file_error(path, e));
        }
        let resolved = Self::resolve(&entries, path).map_err(|e| file_error(path, e))?;
        if let Some(e) = self.injected_failure(&[&resolved]) {
            return Err(file_error(path, e));
        }
        match entries.get(&resolved) {
            Some(MockEntry::File(content)) => Ok(Box::new(Cursor::new(content.clone()))),
            _ => Err(file_error(path, io::Error::other("not a regular file"))),
        }
    }

    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> Result<HttpServerHandle> {
        let port = config
            .port
            .unwrap_or_else(|| self.next_port.fetch_add(1, Ordering::SeqCst));
        if self.services.lock().insert(port, service).is_some() {
            debug!(port, "replaced mock HTTP service");
        }
        Ok(HttpServerHandle::new(port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_exists() {
        let pal = MockPal::new();
        pal.add_file("/data/test.txt", b"content".to_vec());

        assert!(pal.file_exists(&FilePath::from("/data/test.txt")).unwrap());
        assert!(pal.file_exists(&FilePath::from("/data")).unwrap());
        assert!(!pal.file_exists(&FilePath::from("/data/other.txt")).unwrap());
    }

    #[test]
    fn test_add_file_creates_parents() {
        let pal = MockPal::new();
        pal.add_file("/data/v1/sub/a.txt", Vec::new());

        assert_eq!(
            pal.file_kind(&FilePath::from("/data/v1/sub")).unwrap(),
            FileKind::Directory
        );
        assert_eq!(
            pal.file_kind(&FilePath::from("/data/v1/sub/a.txt")).unwrap(),
            FileKind::File
        );
    }

    #[test]
    fn test_canonicalize_follows_symlinks() {
        let pal = MockPal::new();
        pal.add_file("/data/real/a.txt", Vec::new());
        pal.add_symlink("/data/v1/alias", "/data/real");

        assert_eq!(
            pal.canonicalize(&FilePath::from("/data/v1/alias/a.txt")).unwrap(),
            FilePath::from("/data/real/a.txt")
        );
    }

    #[test]
    fn test_relative_symlink_target() {
        let pal = MockPal::new();
        pal.add_file("/data/real/a.txt", Vec::new());
        pal.add_symlink("/data/v1/alias", "../real");

        assert_eq!(
            pal.canonicalize(&FilePath::from("/data/v1/alias")).unwrap(),
            FilePath::from("/data/real")
        );
    }

    #[test]
    fn test_symlink_loop_is_an_error() {
        let pal = MockPal::new();
        pal.add_symlink("/data/a", "/data/b");
        pal.add_symlink("/data/b", "/data/a");

        assert!(pal.canonicalize(&FilePath::from("/data/a")).is_err());
    }

    #[test]
    fn test_dangling_symlink_kind() {
        let pal = MockPal::new();
        pal.add_symlink("/data/v1/broken", "/data/nowhere");

        assert_eq!(
            pal.file_kind(&FilePath::from("/data/v1/broken")).unwrap(),
            FileKind::Other
        );
        assert!(!pal.file_exists(&FilePath::from("/data/v1/broken")).unwrap());
    }

    #[test]
    fn test_list_directory_immediate_children() {
        let pal = MockPal::new();
        pal.add_file("/data/v1/b.txt", Vec::new());
        pal.add_file("/data/v1/a.txt", Vec::new());
        pal.add_file("/data/v1/sub/deep.txt", Vec::new());
        pal.add_symlink("/data/v1/link", "/data/v1/sub");

        let entries = pal.list_directory(&FilePath::from("/data/v1")).unwrap();
        assert_eq!(
            entries,
            vec![
                DirectoryEntry::new("a.txt", FileKind::File),
                DirectoryEntry::new("b.txt", FileKind::File),
                DirectoryEntry::new("link", FileKind::Directory),
                DirectoryEntry::new("sub", FileKind::Directory),
            ]
        );
    }

    #[test]
    fn test_injected_failure() {
        let pal = MockPal::new();
        pal.add_file("/data/v1/secret.txt", b"x".to_vec());
        pal.fail_path("/data/v1/secret.txt", io::ErrorKind::PermissionDenied);

        let err = pal
            .read_file(&FilePath::from("/data/v1/secret.txt"))
            .err()
            .unwrap();
        assert_eq!(err.io_error_kind(), Some(io::ErrorKind::PermissionDenied));
    }

    #[test]
    fn test_remove_entry() {
        let pal = MockPal::new();
        pal.add_file("/data/v1/sub/a.txt", Vec::new());
        pal.remove("/data/v1/sub");

        assert!(!pal.file_exists(&FilePath::from("/data/v1/sub/a.txt")).unwrap());
        assert!(pal.file_exists(&FilePath::from("/data/v1")).unwrap());
    }

    #[test]
    fn test_read_directory_fails() {
        let pal = MockPal::new();
        pal.add_directory("/data/v1");

        assert!(pal.read_file(&FilePath::from("/data/v1")).is_err());
    }
}
