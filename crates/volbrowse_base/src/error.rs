use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::Utf8Error;

use tracing_error::{SpanTrace, SpanTraceStatus};

/* 📖 # Why not anyhow or thiserror?

The HTTP layer picks status codes and error codes by matching on what went wrong
(unknown volume, escaping path, bad location), so the failure categories live in one
enum of our own. Context strings, causes and span traces are layered on top of it here
instead of through an external crate.
 */

/// Why reading a file failed after it was classified as a file.
#[derive(Debug)]
pub enum ReadFailure {
    /// The file disappeared between classification and read.
    Vanished,
    /// The underlying read failed.
    Io(io::Error),
    /// The content is not valid UTF-8.
    InvalidText(Utf8Error),
}

impl fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadFailure::Vanished => write!(f, "file no longer exists"),
            ReadFailure::Io(source) => write!(f, "{}", source),
            ReadFailure::InvalidText(source) => write!(f, "content is not valid UTF-8 ({})", source),
        }
    }
}

/// What went wrong, with the data needed to report it.
#[derive(Debug)]
pub enum ErrorKind {
    /// No volume is registered under the given full name
    VolumeNotFound { name: String },

    /// The resolved path is missing or is neither a directory nor a regular file
    PathNotFound { path: PathBuf },

    /// The volume's storage location is not a usable URI
    InvalidLocation { location: String, reason: String },

    /// The requested path would leave the volume root
    PathTraversal { path: String },

    /// The storage location uses a scheme no backend is available for
    UnsupportedScheme { scheme: String, location: String },

    /// Enumerating a directory failed
    AccessError { path: PathBuf, source: io::Error },

    /// Reading a file failed
    ReadError { path: PathBuf, failure: ReadFailure },

    /// A storage call other than list or read failed
    FileError { path: PathBuf, source: io::Error },

    /// The caller sent a malformed request
    InvalidRequest { message: String },

    /// A volume with the same full name is already registered
    AlreadyExists { name: String },

    /// Anything without a category of its own (config, server startup)
    Message { message: String },
}

impl ErrorKind {
    /// Stable, machine readable code for this kind of error.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::VolumeNotFound { .. } | ErrorKind::PathNotFound { .. } => "NOT_FOUND",
            ErrorKind::InvalidLocation { .. } => "INVALID_LOCATION",
            ErrorKind::PathTraversal { .. } => "PATH_TRAVERSAL",
            ErrorKind::UnsupportedScheme { .. } => "UNSUPPORTED_SCHEME",
            ErrorKind::AccessError { .. } => "ACCESS_ERROR",
            ErrorKind::ReadError { .. } => "READ_ERROR",
            ErrorKind::InvalidRequest { .. } => "INVALID_REQUEST",
            ErrorKind::AlreadyExists { .. } => "ALREADY_EXISTS",
            ErrorKind::FileError { .. } | ErrorKind::Message { .. } => "INTERNAL",
        }
    }

    /// Returns true if the error was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::VolumeNotFound { .. }
                | ErrorKind::PathNotFound { .. }
                | ErrorKind::PathTraversal { .. }
                | ErrorKind::InvalidRequest { .. }
                | ErrorKind::AlreadyExists { .. }
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::VolumeNotFound { name } => write!(f, "Volume not found: {}", name),
            ErrorKind::PathNotFound { path } => write!(
                f,
                "{}: the given path is neither a directory nor a file",
                path.display()
            ),
            ErrorKind::InvalidLocation { location, reason } => {
                write!(f, "Invalid location URI '{}': {}", location, reason)
            }
            ErrorKind::PathTraversal { path } => {
                write!(f, "Path '{}' resolves outside of the volume root", path)
            }
            ErrorKind::UnsupportedScheme { scheme, location } => write!(
                f,
                "Unsupported storage scheme '{}' in location '{}'",
                scheme, location
            ),
            ErrorKind::AccessError { path, source } => {
                write!(f, "Error listing directory {}: {}", path.display(), source)
            }
            ErrorKind::ReadError { path, failure } => {
                write!(f, "Error reading the file {}: {}", path.display(), failure)
            }
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::InvalidRequest { message } => write!(f, "Invalid request: {}", message),
            ErrorKind::AlreadyExists { name } => write!(f, "Volume already exists: {}", name),
            ErrorKind::Message { message } => write!(f, "{}", message),
        }
    }
}

/* 📖 # ErrorKind vs Error

`ErrorKind` is what callers match on; the API turns it into a status and an error code.
`Error` adds what a log reader needs: context pushed by each layer the failure passed
through, an optional cause and the span trace at creation.
*/

/// An `ErrorKind` plus its diagnostics.
pub struct Error {
    kind: ErrorKind,
    context: Vec<String>,
    cause: Option<Box<Error>>,
    span_trace: SpanTrace,
}

impl Error {
    /// Captures the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            cause: None,
            span_trace: SpanTrace::capture(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Pushes a context line, shown ahead of the kind in `Display`.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Records the error that led to this one.
    pub fn caused_by(mut self, cause: impl Into<Box<Error>>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Drops context and cause.
    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    /// Context lines, outermost last.
    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    pub fn cause(&self) -> Option<&Error> {
        self.cause.as_deref()
    }

    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// `io::ErrorKind` of the wrapped I/O failure, if the kind carries one.
    pub fn io_error_kind(&self) -> Option<io::ErrorKind> {
        match &self.kind {
            ErrorKind::FileError { source, .. } | ErrorKind::AccessError { source, .. } => {
                Some(source.kind())
            }
            ErrorKind::ReadError {
                failure: ReadFailure::Io(source),
                ..
            } => Some(source.kind()),
            _ => None,
        }
    }

    /// Last error in the `source()` chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut deepest: &(dyn StdError + 'static) = self;
        while let Some(source) = deepest.source() {
            deepest = source;
        }
        deepest
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        let child_count = self.context.len() + usize::from(self.cause.is_some());
        for (index, line) in self.context.iter().enumerate() {
            let branch = if index + 1 == child_count { "└─" } else { "├─" };
            writeln!(f, "{}{} {}", indent, branch, line)?;
        }
        if let Some(cause) = &self.cause {
            writeln!(f, "{}└─ cause: {}", indent, cause.kind)?;
            cause.fmt_tree(f, &format!("{}   ", indent))?;
        }
        Ok(())
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<ErrorKind> for Box<Error> {
    fn from(kind: ErrorKind) -> Self {
        Box::new(Error::new(kind))
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::FileError { source, .. } | ErrorKind::AccessError { source, .. } => {
                Some(source)
            }
            ErrorKind::ReadError {
                failure: ReadFailure::Io(source),
                ..
            } => Some(source),
            ErrorKind::ReadError {
                failure: ReadFailure::InvalidText(source),
                ..
            } => Some(source),
            _ => self.cause.as_deref().map(|cause| cause as &(dyn StdError + 'static)),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.context {
            write!(f, "{}: ", line)?;
        }
        write!(f, "{}", self.kind)?;
        if let Some(cause) = &self.cause {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.kind)?;
        self.fmt_tree(f, "")?;
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            writeln!(f, "Trace: {}", self.span_trace)?;
        }
        Ok(())
    }
}

/* 📖 # Why Box<Error>?

`Error` holds a kind, a Vec, an optional cause and a span trace. Boxing keeps
`Result<T>` one pointer wide on the error side, so the success path stays small.
*/

pub type Result<T> = std::result::Result<T, Box<Error>>;

/// `context`/`with_context` directly on a `Result`.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// The closure only runs on the error path.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}

/// Creates a boxed message error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        Box::new($crate::error::Error::message(format!($($arg)*)))
    };
}

/// Returns early with a boxed message error built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::err!($($arg)*))
    };
}
