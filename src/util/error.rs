use crate::signal::DiskErrorCategory;
use std::io;
use thiserror::Error;

/// OS-level failure description captured at the failing call site.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct OsError {
    code: i32,
    message: String,
}

impl OsError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Describes `err` if it carries a raw OS code; errors synthesized in
    /// userspace (EOF, custom payloads, translated errors) yield `None`.
    pub fn from_io(err: &io::Error) -> Option<Self> {
        err.raw_os_error()
            .map(|code| Self::new(code, err.to_string()))
    }

    pub fn from_code(code: i32) -> Self {
        Self::new(code, io::Error::from_raw_os_error(code).to_string())
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> io::ErrorKind {
        io::Error::from_raw_os_error(self.code).kind()
    }
}

/// Uniform error raised when a disk failure is fatal to the storage subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("storage I/O error on {category} path: {source}")]
pub struct StorageIoError {
    category: DiskErrorCategory,
    source: OsError,
}

impl StorageIoError {
    pub fn new(category: DiskErrorCategory, source: OsError) -> Self {
        Self { category, source }
    }

    pub fn category(&self) -> DiskErrorCategory {
        self.category
    }

    pub fn os_error(&self) -> &OsError {
        &self.source
    }

    pub fn code(&self) -> i32 {
        self.source.code()
    }

    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }

    /// Rebuilds the original OS error, e.g. for callers that report errno.
    pub fn to_io_error(&self) -> io::Error {
        io::Error::from_raw_os_error(self.source.code())
    }
}

/// Outcome of a checked operation that failed.
///
/// `Storage` is produced only for fatal OS errors, after the category
/// channel has fired. Everything else comes back untouched as `Passthrough`.
#[derive(Debug, Error)]
pub enum IoCheckError<E> {
    #[error(transparent)]
    Storage(#[from] StorageIoError),
    #[error(transparent)]
    Passthrough(E),
}

impl<E> IoCheckError<E> {
    pub fn is_storage(&self) -> bool {
        matches!(self, IoCheckError::Storage(_))
    }

    pub fn storage_error(&self) -> Option<&StorageIoError> {
        match self {
            IoCheckError::Storage(err) => Some(err),
            IoCheckError::Passthrough(_) => None,
        }
    }

    pub fn passthrough(&self) -> Option<&E> {
        match self {
            IoCheckError::Storage(_) => None,
            IoCheckError::Passthrough(err) => Some(err),
        }
    }

    pub fn into_passthrough(self) -> Option<E> {
        match self {
            IoCheckError::Storage(_) => None,
            IoCheckError::Passthrough(err) => Some(err),
        }
    }

    pub fn map_passthrough<F, O>(self, f: F) -> IoCheckError<O>
    where
        F: FnOnce(E) -> O,
    {
        match self {
            IoCheckError::Storage(err) => IoCheckError::Storage(err),
            IoCheckError::Passthrough(err) => IoCheckError::Passthrough(f(err)),
        }
    }
}

/// Result of a checked call site operating on `std::io`.
pub type CheckedIoResult<T> = Result<T, IoCheckError<io::Error>>;

impl From<StorageIoError> for io::Error {
    fn from(err: StorageIoError) -> Self {
        // Custom payload drops the raw code, so outer checks see a non-system error.
        io::Error::new(err.kind(), err)
    }
}

impl From<IoCheckError<io::Error>> for io::Error {
    fn from(err: IoCheckError<io::Error>) -> Self {
        match err {
            IoCheckError::Storage(err) => err.into(),
            IoCheckError::Passthrough(err) => err,
        }
    }
}

#[derive(Debug, Error)]
pub enum DiskErrorConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
