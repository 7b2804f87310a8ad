use crate::constants::{ALLOWED_MIME_TYPES, MAX_FILE_SIZE};
use crate::error::FileError;
use crate::utils::io_error_message;
use std::fs::{self, File};
use std::path::Path;

/// Check that `path` is an existing, readable file the service will accept.
///
/// # Returns
/// * `Ok(size)` - File size in bytes
/// * `Err(FileError)` - The first check that failed
pub fn validate_input_path(path: &Path) -> Result<u64, FileError> {
    if !path.exists() {
        return Err(FileError::NotFound(path.to_path_buf()));
    }

    if !path.is_file() || File::open(path).is_err() {
        return Err(FileError::NotReadable(path.to_path_buf()));
    }

    let metadata = fs::metadata(path).map_err(|e| FileError::Io(io_error_message(&e)))?;
    check_file_size(path, metadata.len())?;

    Ok(metadata.len())
}

/// Reject files larger than [`MAX_FILE_SIZE`]
pub fn check_file_size(path: &Path, size: u64) -> Result<(), FileError> {
    if size > MAX_FILE_SIZE {
        return Err(FileError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit: MAX_FILE_SIZE,
        });
    }
    Ok(())
}

/// Guess the MIME type from the file extension and make sure the service accepts it.
pub fn detect_mime_type(path: &Path) -> Result<&'static str, FileError> {
    let mime_type = mime_guess::from_path(path)
        .first_raw()
        .ok_or(FileError::UnknownMimeType)?;

    ALLOWED_MIME_TYPES
        .iter()
        .find(|allowed| **allowed == mime_type)
        .copied()
        .ok_or_else(|| FileError::UnsupportedFileType(mime_type.to_string()))
}
