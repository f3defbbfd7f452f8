use relative_path::{RelativePath, RelativePathBuf};
use std::path::{Component, Path, PathBuf};

/* 📖 # Why wrap PathBuf in FilePath?

Every path handed to the PAL is a physical storage path derived from a volume's storage location.
FilePath guarantees these paths are lexically normalized on construction (no `.` or `..`
components), so prefix checks against a volume root compare like with like.

Volume-relative paths stay `RelativePath`s until they are joined onto a root with
`join_relative`, which is the only place where `..` is interpreted.
*/

/// Type-safe wrapper for lexically normalized storage paths.
///
/// `.` components are dropped and `..` components pop the preceding named component.
/// A `..` at the filesystem root is absorbed, mirroring how the OS resolves `/..`.
/// Leading `..` of a relative path are kept, so `../x.toml` still names the parent's file.
///
/// # Examples
///
/// ```
/// use volbrowse_base::FilePath;
///
/// let path = FilePath::from("/data/./v1/../v2");
/// assert_eq!(path, FilePath::from("/data/v2"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilePath(PathBuf);

impl FilePath {
    /// Create a FilePath, normalizing the given path lexically.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let mut normalized = PathBuf::new();
        for component in path.as_ref().components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => match normalized.components().next_back() {
                    Some(Component::Normal(_)) => {
                        normalized.pop();
                    }
                    Some(Component::RootDir | Component::Prefix(_)) => {}
                    _ => normalized.push(Component::ParentDir.as_os_str()),
                },
                other => normalized.push(other.as_os_str()),
            }
        }
        Self(normalized)
    }

    /// Returns the underlying path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Consumes the FilePath and returns a PathBuf.
    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }

    /// Join a volume-relative path onto this path.
    ///
    /// `..` components in `relative` pop components of the result, so the joined
    /// path may end up outside of `self`. Callers check containment with [`FilePath::starts_with`].
    pub fn join_relative(&self, relative: &RelativePath) -> FilePath {
        FilePath::new(relative.to_logical_path(&self.0))
    }

    /// Append a single entry name.
    pub fn join(&self, name: &str) -> FilePath {
        FilePath::new(self.0.join(name))
    }

    /// Component-wise prefix check, so `/data/v10` does not start with `/data/v1`.
    pub fn starts_with(&self, root: &FilePath) -> bool {
        self.0.starts_with(&root.0)
    }

    /// The path of `self` relative to `root`, if `self` lies within it.
    pub fn relative_to(&self, root: &FilePath) -> Option<RelativePathBuf> {
        let stripped = self.0.strip_prefix(&root.0).ok()?;
        RelativePathBuf::from_path(stripped).ok()
    }

    /// The parent path, if any.
    pub fn parent(&self) -> Option<FilePath> {
        self.0.parent().map(|parent| FilePath(parent.to_path_buf()))
    }

    /// The final component as a string, if it is valid UTF-8.
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name().and_then(|name| name.to_str())
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for FilePath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&Path> for FilePath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

impl From<PathBuf> for FilePath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for FilePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}
