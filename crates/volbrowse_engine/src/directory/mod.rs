pub mod memory;
pub mod traits;

pub use memory::InMemoryVolumeDirectory;
pub use traits::{DirectoryHandle, VolumeDirectory, VolumePage};
