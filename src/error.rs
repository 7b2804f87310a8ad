use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GalleryError {
    /// Network failure, timeout or non-success HTTP status
    #[error("{0}")]
    ConnectionFailed(String),

    #[error("Invalid JSON: {message}: {body}")]
    InvalidJson { message: String, body: String },

    #[error("CSRF token not found")]
    CsrfTokenNotFound,

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl GalleryError {
    /// The service could not be reached or refused the request.
    ///
    /// Callers may retry the whole operation later.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, GalleryError::ConnectionFailed(_))
    }

    /// The service answered in a shape this client does not understand.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            GalleryError::InvalidJson { .. }
                | GalleryError::CsrfTokenNotFound
                | GalleryError::UnexpectedResponse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GalleryError>;

/// Problems with a local file, detected before anything is sent.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("File does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("File is not readable: {}", .0.display())]
    NotReadable(PathBuf),

    #[error("File is larger than {limit} B: {}", .path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("Unknown mime type")]
    UnknownMimeType,

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// OS-level message, e.g. "No such file or directory"
    #[error("{0}")]
    Io(String),
}
