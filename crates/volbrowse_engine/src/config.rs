use serde::Deserialize;
use tracing::{info, warn};

use volbrowse_base::{FilePath, PalHandle, ResultExt, VolbrowseResult};

use crate::directory::DirectoryHandle;
use crate::resolver::{FILE_SCHEME, PathResolver};
use crate::volume::{CreateVolume, VolumeType};

/// Configuration for a volbrowse server.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Where the HTTP API listens.
    #[serde(default)]
    pub server: ServerConfig,
    /// Path resolution settings.
    #[serde(default)]
    pub browse: BrowseConfig,
    /// Volumes registered at startup.
    #[serde(default, rename = "volume")]
    pub volumes: Vec<VolumeConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on. The OS picks one when absent.
    #[serde(default)]
    pub port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowseConfig {
    /// Storage location schemes accepted by the resolver.
    #[serde(default = "default_schemes")]
    pub supported_schemes: Vec<String>,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            supported_schemes: default_schemes(),
        }
    }
}

impl BrowseConfig {
    pub fn resolver(&self) -> PathResolver {
        PathResolver::new(&self.supported_schemes)
    }
}

fn default_schemes() -> Vec<String> {
    vec![FILE_SCHEME.to_string()]
}

/// A volume to register at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolumeConfig {
    pub catalog: String,
    pub schema: String,
    pub name: String,
    pub storage_location: String,
    #[serde(default)]
    pub volume_type: VolumeType,
    #[serde(default)]
    pub comment: Option<String>,
}

impl VolumeConfig {
    pub fn to_create_request(&self) -> CreateVolume {
        CreateVolume {
            catalog_name: self.catalog.clone(),
            schema_name: self.schema.clone(),
            name: self.name.clone(),
            storage_location: self.storage_location.clone(),
            volume_type: self.volume_type,
            comment: self.comment.clone(),
        }
    }
}

/// Parse configuration from TOML text.
pub fn parse_config(text: &str) -> VolbrowseResult<Config> {
    toml::from_str(text).map_err(|e| volbrowse_base::err!("Invalid configuration: {}", e))
}

/// Load configuration from a TOML file through the PAL.
pub fn load_config(pal: &PalHandle, path: &FilePath) -> VolbrowseResult<Config> {
    let text = pal
        .read_file_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    parse_config(&text).with_context(|| format!("Failed to load config file {}", path))
}

/// Create every configured volume. Volumes that fail are logged and skipped.
///
/// Returns the number of volumes registered.
pub fn register_volumes(config: &Config, directory: &DirectoryHandle) -> usize {
    let mut registered = 0;
    for volume in &config.volumes {
        match directory.create(volume.to_create_request()) {
            Ok(record) => {
                info!(volume = %record.full_name, "Registered configured volume");
                registered += 1;
            }
            Err(e) => {
                warn!(
                    volume = %format!("{}.{}.{}", volume.catalog, volume.schema, volume.name),
                    error = %e,
                    "Skipping configured volume"
                );
            }
        }
    }
    registered
}
