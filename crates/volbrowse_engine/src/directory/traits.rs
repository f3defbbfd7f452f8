/* 📖 # Why create a VolumeDirectory trait?

The VolumeDirectory owns volume metadata: which fully qualified names exist and
where their storage lives. The browse pipeline only needs `lookup`, but the HTTP
API also exposes create/list/update/delete, so the trait carries the full set.

Keeping it a trait means the browser is handed a directory explicitly instead of
reaching for a process-wide registry, and tests can plug in a directory holding
records that could never be created through the API (a corrupt storage location, for example).
*/

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use volbrowse_base::{ErrorKind, VolbrowseError, VolbrowseResult};

use crate::volume::{CreateVolume, FullName, UpdateVolume, VolumeRecord};

/// Trait for volume metadata storage.
pub trait VolumeDirectory: Send + Sync + 'static {
    /// Register a new volume.
    ///
    /// Fails with `AlreadyExists` if the full name is taken and with
    /// `InvalidRequest` if the name or storage location is malformed.
    fn create(&mut self, request: CreateVolume) -> VolbrowseResult<VolumeRecord>;

    /// Retrieve a volume by its full name.
    ///
    /// # Returns
    /// * `Ok(Some(record))` - If the volume exists
    /// * `Ok(None)` - If no volume with that name exists
    fn get(&self, name: &FullName) -> VolbrowseResult<Option<VolumeRecord>>;

    /// All volumes of one schema, ordered by volume name.
    fn list(&self, catalog: &str, schema: &str) -> VolbrowseResult<Vec<VolumeRecord>>;

    /// Rename a volume and/or change its comment.
    fn update(&mut self, name: &FullName, update: UpdateVolume) -> VolbrowseResult<VolumeRecord>;

    /// Remove a volume, returning the removed record.
    fn delete(&mut self, name: &FullName) -> VolbrowseResult<VolumeRecord>;
}

/// One page of a volume listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumePage {
    pub volumes: Vec<VolumeRecord>,
    /// Pass back as `page_token` to fetch the next page. Absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

fn volume_not_found(name: impl Into<String>) -> Box<VolbrowseError> {
    Box::new(VolbrowseError::new(ErrorKind::VolumeNotFound { name: name.into() }))
}

/// A thread-safe handle to a volume directory.
///
/// Cheap to clone (via Arc), with interior mutability (via RwLock) so request
/// threads can look volumes up concurrently.
#[derive(Clone)]
pub struct DirectoryHandle(Arc<RwLock<dyn VolumeDirectory>>);

impl DirectoryHandle {
    pub fn new<D: VolumeDirectory>(directory: D) -> Self {
        Self(Arc::new(RwLock::new(directory)))
    }

    /// See [`VolumeDirectory::create`].
    pub fn create(&self, request: CreateVolume) -> VolbrowseResult<VolumeRecord> {
        self.0.write().create(request)
    }

    /// See [`VolumeDirectory::get`].
    pub fn get(&self, name: &FullName) -> VolbrowseResult<Option<VolumeRecord>> {
        self.0.read().get(name)
    }

    /// Resolve a dotted volume name to its record.
    ///
    /// Names that do not parse cannot be registered either, so they are reported
    /// as `VolumeNotFound` rather than as a malformed request.
    pub fn lookup(&self, full_name: &str) -> VolbrowseResult<VolumeRecord> {
        let name = FullName::parse(full_name).map_err(|_| volume_not_found(full_name))?;
        self.get(&name)?.ok_or_else(|| volume_not_found(full_name))
    }

    /// List one schema's volumes a page at a time.
    ///
    /// The page token is the name of the last volume on the previous page, so pages
    /// stay stable when volumes are added or removed in between. `max_results` of
    /// `None` or `0` returns everything after the token.
    pub fn list_page(
        &self,
        catalog: &str,
        schema: &str,
        max_results: Option<usize>,
        page_token: Option<&str>,
    ) -> VolbrowseResult<VolumePage> {
        let mut remaining: Vec<VolumeRecord> = self
            .0
            .read()
            .list(catalog, schema)?
            .into_iter()
            .filter(|record| page_token.is_none_or(|token| record.name.as_str() > token))
            .collect();

        let limit = max_results.filter(|limit| *limit > 0);
        let next_page_token = match limit {
            Some(limit) if remaining.len() > limit => {
                remaining.truncate(limit);
                remaining.last().map(|record| record.name.clone())
            }
            _ => None,
        };

        Ok(VolumePage {
            volumes: remaining,
            next_page_token,
        })
    }

    /// See [`VolumeDirectory::update`].
    pub fn update(&self, name: &FullName, update: UpdateVolume) -> VolbrowseResult<VolumeRecord> {
        self.0.write().update(name, update)
    }

    /// See [`VolumeDirectory::delete`].
    pub fn delete(&self, name: &FullName) -> VolbrowseResult<VolumeRecord> {
        self.0.write().delete(name)
    }
}

impl std::fmt::Debug for DirectoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryVolumeDirectory;

    fn directory_with(names: &[&str]) -> DirectoryHandle {
        let directory = DirectoryHandle::new(InMemoryVolumeDirectory::new());
        for name in names {
            directory
                .create(CreateVolume::new(
                    "cat",
                    "sch",
                    *name,
                    format!("file:///data/{}", name),
                ))
                .unwrap();
        }
        directory
    }

    fn names(page: &VolumePage) -> Vec<&str> {
        page.volumes.iter().map(|record| record.name.as_str()).collect()
    }

    #[test]
    fn test_lookup_existing() {
        let directory = directory_with(&["v1"]);
        let record = directory.lookup("cat.sch.v1").unwrap();
        assert_eq!(record.storage_location, "file:///data/v1");
    }

    #[test]
    fn test_lookup_missing_is_not_found() {
        let directory = directory_with(&["v1"]);
        let err = directory.lookup("cat.sch.v2").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::VolumeNotFound { name } if name == "cat.sch.v2"));
    }

    #[test]
    fn test_lookup_malformed_name_is_not_found() {
        let directory = directory_with(&["v1"]);
        let err = directory.lookup("missing.vol").unwrap_err();
        assert_eq!(err.to_string(), "Volume not found: missing.vol");
    }

    #[test]
    fn test_list_page_without_limit() {
        let directory = directory_with(&["b", "a", "c"]);
        let page = directory.list_page("cat", "sch", None, None).unwrap();
        assert_eq!(names(&page), vec!["a", "b", "c"]);
        assert_eq!(page.next_page_token, None);
    }

    #[test]
    fn test_list_page_walks_all_pages() {
        let directory = directory_with(&["a", "b", "c", "d", "e"]);

        let first = directory.list_page("cat", "sch", Some(2), None).unwrap();
        assert_eq!(names(&first), vec!["a", "b"]);
        assert_eq!(first.next_page_token.as_deref(), Some("b"));

        let second = directory
            .list_page("cat", "sch", Some(2), first.next_page_token.as_deref())
            .unwrap();
        assert_eq!(names(&second), vec!["c", "d"]);

        let last = directory
            .list_page("cat", "sch", Some(2), second.next_page_token.as_deref())
            .unwrap();
        assert_eq!(names(&last), vec!["e"]);
        assert_eq!(last.next_page_token, None);
    }

    #[test]
    fn test_list_page_exact_fit_has_no_token() {
        let directory = directory_with(&["a", "b"]);
        let page = directory.list_page("cat", "sch", Some(2), None).unwrap();
        assert_eq!(names(&page), vec!["a", "b"]);
        assert_eq!(page.next_page_token, None);
    }

    #[test]
    fn test_list_page_other_schema_is_empty() {
        let directory = directory_with(&["a"]);
        let page = directory.list_page("cat", "other", None, None).unwrap();
        assert!(page.volumes.is_empty());
    }
}
