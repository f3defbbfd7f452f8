/* 📖 # Why a platform layer?

Volumes are browsed through `Pal` rather than `std::fs`. The engine sees one set of
storage calls and one error shape, RealPal backs them with the local filesystem and
tiny_http, and MockPal backs them with an in-memory tree for tests.
*/

mod file_path;
pub mod http;
pub mod mock;
pub mod real_pal;
mod traits;

pub use file_path::FilePath;
pub use mock::MockPal;
pub use real_pal::RealPal;
pub use traits::{DirectoryEntry, FileKind, Pal, PalHandle, ReadSeek};
