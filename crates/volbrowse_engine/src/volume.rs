/* 📖 # Why a dedicated FullName type?

Volumes are addressed as `catalog.schema.volume` everywhere: in the directory, in the
HTTP routes and in browse requests. Parsing the dotted string once into a validated
three-part value means the directory can key on it directly and never has to
re-split strings. A name that does not parse is rejected before any lookup happens.
*/

use std::fmt;

use serde::{Deserialize, Serialize};

use volbrowse_base::{ErrorKind, VolbrowseError, VolbrowseResult};

/// Fully qualified volume name: `catalog.schema.volume`.
///
/// # Examples
///
/// ```
/// use volbrowse_engine::FullName;
///
/// let name = FullName::parse("cat.sch.v1").unwrap();
/// assert_eq!(name.catalog(), "cat");
/// assert_eq!(name.to_string(), "cat.sch.v1");
/// assert!(FullName::parse("missing.vol").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullName {
    catalog: String,
    schema: String,
    name: String,
}

fn validate_part(full: &str, part: &str) -> VolbrowseResult<()> {
    if part.is_empty() || part.contains(['.', '/']) || part.trim() != part {
        return Err(Box::new(VolbrowseError::new(ErrorKind::InvalidRequest {
            message: format!(
                "'{}' is not a valid volume name, expected catalog.schema.volume",
                full
            ),
        })));
    }
    Ok(())
}

impl FullName {
    pub fn new(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
    ) -> VolbrowseResult<Self> {
        let full_name = Self {
            catalog: catalog.into(),
            schema: schema.into(),
            name: name.into(),
        };
        let rendered = full_name.to_string();
        validate_part(&rendered, &full_name.catalog)?;
        validate_part(&rendered, &full_name.schema)?;
        validate_part(&rendered, &full_name.name)?;
        Ok(full_name)
    }

    /// Parse a dotted name. Exactly three non-empty parts are required.
    pub fn parse(full_name: &str) -> VolbrowseResult<Self> {
        let parts: Vec<&str> = full_name.split('.').collect();
        match parts.as_slice() {
            [catalog, schema, name] => Self::new(*catalog, *schema, *name),
            _ => Err(Box::new(VolbrowseError::new(ErrorKind::InvalidRequest {
                message: format!(
                    "'{}' is not a valid volume name, expected catalog.schema.volume",
                    full_name
                ),
            }))),
        }
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The same catalog and schema with a different volume name.
    pub fn renamed(&self, name: impl Into<String>) -> VolbrowseResult<Self> {
        Self::new(self.catalog.clone(), self.schema.clone(), name)
    }
}

impl fmt::Display for FullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.catalog, self.schema, self.name)
    }
}

/// Whether the catalog owns the storage location or merely points at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeType {
    Managed,
    #[default]
    External,
}

/// A registered volume as returned by the directory and the HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub volume_id: String,
    pub catalog_name: String,
    pub schema_name: String,
    pub name: String,
    pub full_name: String,
    pub storage_location: String,
    pub volume_type: VolumeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    /// Milliseconds since the Unix epoch.
    pub updated_at: i64,
}

impl VolumeRecord {
    /// The record's name as a parsed [`FullName`].
    pub fn qualified_name(&self) -> VolbrowseResult<FullName> {
        FullName::new(
            self.catalog_name.clone(),
            self.schema_name.clone(),
            self.name.clone(),
        )
    }
}

/// Request to register a new volume.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateVolume {
    pub catalog_name: String,
    pub schema_name: String,
    pub name: String,
    pub storage_location: String,
    #[serde(default)]
    pub volume_type: VolumeType,
    #[serde(default)]
    pub comment: Option<String>,
}

impl CreateVolume {
    pub fn new(
        catalog_name: impl Into<String>,
        schema_name: impl Into<String>,
        name: impl Into<String>,
        storage_location: impl Into<String>,
    ) -> Self {
        Self {
            catalog_name: catalog_name.into(),
            schema_name: schema_name.into(),
            name: name.into(),
            storage_location: storage_location.into(),
            volume_type: VolumeType::default(),
            comment: None,
        }
    }

    pub fn with_volume_type(mut self, volume_type: VolumeType) -> Self {
        self.volume_type = volume_type;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn full_name(&self) -> VolbrowseResult<FullName> {
        FullName::new(
            self.catalog_name.clone(),
            self.schema_name.clone(),
            self.name.clone(),
        )
    }
}

/// Request to change a volume. The storage location can never be changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateVolume {
    #[serde(default)]
    pub new_name: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl UpdateVolume {
    pub fn rename(new_name: impl Into<String>) -> Self {
        Self {
            new_name: Some(new_name.into()),
            comment: None,
        }
    }

    pub fn comment(comment: impl Into<String>) -> Self {
        Self {
            new_name: None,
            comment: Some(comment.into()),
        }
    }
}
