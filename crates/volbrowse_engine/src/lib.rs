/* 📖 # What does volbrowse_engine contain?

Everything between an HTTP request and the storage backend:
- `volume` and `directory`: volume metadata and the VolumeDirectory that owns it
- `resolver`: turns a storage location plus a request path into a validated storage path
- `accessor`: lists or reads what a resolved path points at
- `browser`: composes the three into `browse_path`
- `config`: TOML configuration and startup volume registration
- `api`: the HTTP service exposing all of the above
*/

pub mod accessor;
pub mod api;
pub mod browser;
pub mod config;
pub mod directory;
pub mod resolver;
pub mod volume;

pub use accessor::{BrowseContent, ContentAccessor, EntryKind};
pub use api::{ApiService, BrowseRequest, ErrorResponse, VOLUMES_BASE_PATH};
pub use browser::VolumeBrowser;
pub use config::{BrowseConfig, Config, ServerConfig, VolumeConfig, load_config, parse_config, register_volumes};
pub use directory::{DirectoryHandle, InMemoryVolumeDirectory, VolumeDirectory, VolumePage};
pub use resolver::{FILE_SCHEME, PathResolver, ResolvedPath};
pub use volume::{CreateVolume, FullName, UpdateVolume, VolumeRecord, VolumeType};
