/* 📖 # Why have volbrowse_base as a core library?
volbrowse_base provides the error model, tracing setup and the platform abstraction layer
shared by the engine and the CLI. Keeping them here prevents circular dependencies between crates.
*/

pub mod error;
mod error_tests;
pub mod pal;
mod pal_tests;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{Error as VolbrowseError, ErrorKind, ReadFailure, Result as VolbrowseResult, ResultExt};
pub use pal::{DirectoryEntry, FileKind, FilePath, MockPal, Pal, PalHandle, ReadSeek, RealPal};
