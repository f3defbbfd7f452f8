use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, info};

use volbrowse_base::{ErrorKind, VolbrowseError, VolbrowseResult};

use crate::directory::traits::VolumeDirectory;
use crate::volume::{CreateVolume, FullName, UpdateVolume, VolumeRecord};

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn not_found(name: &FullName) -> Box<VolbrowseError> {
    Box::new(VolbrowseError::new(ErrorKind::VolumeNotFound {
        name: name.to_string(),
    }))
}

fn already_exists(name: &FullName) -> Box<VolbrowseError> {
    Box::new(VolbrowseError::new(ErrorKind::AlreadyExists {
        name: name.to_string(),
    }))
}

/// An in-memory volume directory keyed by full name.
///
/// Volumes are lost on restart. Ordering by full name keeps listings deterministic.
///
/// # Example
///
/// ```
/// use volbrowse_engine::{CreateVolume, FullName, InMemoryVolumeDirectory, VolumeDirectory};
///
/// let mut directory = InMemoryVolumeDirectory::new();
/// directory
///     .create(CreateVolume::new("cat", "sch", "v1", "file:///data/v1"))
///     .unwrap();
///
/// let name = FullName::parse("cat.sch.v1").unwrap();
/// assert!(directory.get(&name).unwrap().is_some());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVolumeDirectory {
    volumes: BTreeMap<FullName, VolumeRecord>,
}

impl InMemoryVolumeDirectory {
    pub fn new() -> Self {
        Self {
            volumes: BTreeMap::new(),
        }
    }
}

impl VolumeDirectory for InMemoryVolumeDirectory {
    fn create(&mut self, request: CreateVolume) -> VolbrowseResult<VolumeRecord> {
        let name = request.full_name()?;
        // URI syntax is checked when the location is resolved, not here
        if request.storage_location.trim().is_empty() {
            return Err(Box::new(VolbrowseError::new(ErrorKind::InvalidRequest {
                message: format!("Volume {} has an empty storage location", name),
            })));
        }
        if self.volumes.contains_key(&name) {
            return Err(already_exists(&name));
        }

        let now = now_millis();
        let record = VolumeRecord {
            volume_id: nanoid::nanoid!(),
            catalog_name: request.catalog_name,
            schema_name: request.schema_name,
            name: request.name,
            full_name: name.to_string(),
            storage_location: request.storage_location,
            volume_type: request.volume_type,
            comment: request.comment,
            created_at: now,
            updated_at: now,
        };
        info!(volume = %name, location = %record.storage_location, "Volume created");
        self.volumes.insert(name, record.clone());
        Ok(record)
    }

    fn get(&self, name: &FullName) -> VolbrowseResult<Option<VolumeRecord>> {
        Ok(self.volumes.get(name).cloned())
    }

    fn list(&self, catalog: &str, schema: &str) -> VolbrowseResult<Vec<VolumeRecord>> {
        Ok(self
            .volumes
            .iter()
            .filter(|(name, _)| name.catalog() == catalog && name.schema() == schema)
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn update(&mut self, name: &FullName, update: UpdateVolume) -> VolbrowseResult<VolumeRecord> {
        let mut record = self.volumes.get(name).cloned().ok_or_else(|| not_found(name))?;

        let target = match &update.new_name {
            Some(new_name) => name.renamed(new_name.clone())?,
            None => name.clone(),
        };
        if &target != name && self.volumes.contains_key(&target) {
            return Err(already_exists(&target));
        }

        if let Some(comment) = update.comment {
            record.comment = Some(comment);
        }
        record.name = target.name().to_string();
        record.full_name = target.to_string();
        record.updated_at = now_millis().max(record.created_at);

        self.volumes.remove(name);
        self.volumes.insert(target.clone(), record.clone());
        debug!(from = %name, to = %target, "Volume updated");
        Ok(record)
    }

    fn delete(&mut self, name: &FullName) -> VolbrowseResult<VolumeRecord> {
        let record = self.volumes.remove(name).ok_or_else(|| not_found(name))?;
        info!(volume = %name, "Volume deleted");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::VolumeType;

    fn name(full: &str) -> FullName {
        FullName::parse(full).unwrap()
    }

    fn directory_with_v1() -> InMemoryVolumeDirectory {
        let mut directory = InMemoryVolumeDirectory::new();
        directory
            .create(CreateVolume::new("cat", "sch", "v1", "file:///data/v1").with_comment("first"))
            .unwrap();
        directory
    }

    #[test]
    fn test_create_and_get() {
        let directory = directory_with_v1();
        let record = directory.get(&name("cat.sch.v1")).unwrap().unwrap();
        assert_eq!(record.full_name, "cat.sch.v1");
        assert_eq!(record.volume_type, VolumeType::External);
        assert_eq!(record.comment.as_deref(), Some("first"));
        assert_eq!(record.created_at, record.updated_at);
        assert!(!record.volume_id.is_empty());
    }

    #[test]
    fn test_create_assigns_unique_ids() {
        let mut directory = directory_with_v1();
        let second = directory
            .create(CreateVolume::new("cat", "sch", "v2", "file:///data/v2"))
            .unwrap();
        let first = directory.get(&name("cat.sch.v1")).unwrap().unwrap();
        assert_ne!(first.volume_id, second.volume_id);
    }

    #[test]
    fn test_create_duplicate_fails() {
        let mut directory = directory_with_v1();
        let err = directory
            .create(CreateVolume::new("cat", "sch", "v1", "file:///other"))
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::AlreadyExists { .. }));
    }

    #[test]
    fn test_create_rejects_bad_name_and_empty_location() {
        let mut directory = InMemoryVolumeDirectory::new();
        let err = directory
            .create(CreateVolume::new("cat", "sch", "a.b", "file:///data"))
            .unwrap_err();
        assert_eq!(err.kind().code(), "INVALID_REQUEST");

        let err = directory
            .create(CreateVolume::new("cat", "sch", "v1", "  "))
            .unwrap_err();
        assert_eq!(err.kind().code(), "INVALID_REQUEST");
    }

    #[test]
    fn test_create_keeps_unparseable_location() {
        let mut directory = InMemoryVolumeDirectory::new();
        let record = directory
            .create(CreateVolume::new("cat", "sch", "v1", "not a uri"))
            .unwrap();
        assert_eq!(record.storage_location, "not a uri");
    }

    #[test]
    fn test_list_filters_by_schema() {
        let mut directory = directory_with_v1();
        directory
            .create(CreateVolume::new("cat", "other", "v9", "file:///data/v9"))
            .unwrap();
        let listed = directory.list("cat", "sch").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "v1");
    }

    #[test]
    fn test_update_rename_keeps_location_and_id() {
        let mut directory = directory_with_v1();
        let before = directory.get(&name("cat.sch.v1")).unwrap().unwrap();

        let renamed = directory
            .update(&name("cat.sch.v1"), UpdateVolume::rename("v2"))
            .unwrap();
        assert_eq!(renamed.full_name, "cat.sch.v2");
        assert_eq!(renamed.storage_location, before.storage_location);
        assert_eq!(renamed.volume_id, before.volume_id);
        assert_eq!(renamed.comment.as_deref(), Some("first"));
        assert!(renamed.updated_at >= before.updated_at);

        assert!(directory.get(&name("cat.sch.v1")).unwrap().is_none());
        assert!(directory.get(&name("cat.sch.v2")).unwrap().is_some());
    }

    #[test]
    fn test_update_comment_only() {
        let mut directory = directory_with_v1();
        let updated = directory
            .update(&name("cat.sch.v1"), UpdateVolume::comment("second"))
            .unwrap();
        assert_eq!(updated.full_name, "cat.sch.v1");
        assert_eq!(updated.comment.as_deref(), Some("second"));
    }

    #[test]
    fn test_update_rename_onto_existing_fails() {
        let mut directory = directory_with_v1();
        directory
            .create(CreateVolume::new("cat", "sch", "v2", "file:///data/v2"))
            .unwrap();
        let err = directory
            .update(&name("cat.sch.v1"), UpdateVolume::rename("v2"))
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::AlreadyExists { .. }));
        assert!(directory.get(&name("cat.sch.v1")).unwrap().is_some());
    }

    #[test]
    fn test_update_missing_fails() {
        let mut directory = InMemoryVolumeDirectory::new();
        let err = directory
            .update(&name("cat.sch.v1"), UpdateVolume::default())
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::VolumeNotFound { .. }));
    }

    #[test]
    fn test_delete() {
        let mut directory = directory_with_v1();
        let removed = directory.delete(&name("cat.sch.v1")).unwrap();
        assert_eq!(removed.name, "v1");
        assert!(directory.get(&name("cat.sch.v1")).unwrap().is_none());

        let err = directory.delete(&name("cat.sch.v1")).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::VolumeNotFound { .. }));
    }
}
