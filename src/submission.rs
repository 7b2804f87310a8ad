use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// URLs the service reports for a successfully uploaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub image_url: String,
    pub thumbnail_url: String,
    pub web_url: String,
    pub gallery_url: String,
    pub edit_url: String,
}

/// Outcome of uploading one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    Success {
        file_path: PathBuf,
        image: UploadedImage,
    },
    Failure {
        file_path: Option<PathBuf>,
        error: String,
    },
}

impl UploadResult {
    pub fn success(file_path: impl Into<PathBuf>, image: UploadedImage) -> Self {
        UploadResult::Success {
            file_path: file_path.into(),
            image,
        }
    }

    pub fn failure(file_path: Option<PathBuf>, error: impl Into<String>) -> Self {
        UploadResult::Failure {
            file_path,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UploadResult::Success { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            UploadResult::Success { .. } => None,
            UploadResult::Failure { error, .. } => Some(error),
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        match self {
            UploadResult::Success { file_path, .. } => Some(file_path),
            UploadResult::Failure { file_path, .. } => file_path.as_deref(),
        }
    }

    /// Base name of [`file_path`](Self::file_path)
    pub fn file_name(&self) -> Option<String> {
        self.file_path()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        match self {
            UploadResult::Success { image, .. } => Some(image),
            UploadResult::Failure { .. } => None,
        }
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image().map(|i| i.image_url.as_str())
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        self.image().map(|i| i.thumbnail_url.as_str())
    }

    pub fn web_url(&self) -> Option<&str> {
        self.image().map(|i| i.web_url.as_str())
    }

    pub fn gallery_url(&self) -> Option<&str> {
        self.image().map(|i| i.gallery_url.as_str())
    }

    pub fn edit_url(&self) -> Option<&str> {
        self.image().map(|i| i.edit_url.as_str())
    }

    fn record(&self) -> Record<'_> {
        Record {
            success: self.is_success(),
            error: self.error(),
            filename: self.file_name(),
            filepath: self.file_path().map(|p| p.to_string_lossy().into_owned()),
            image_url: self.image_url(),
            thumbnail_url: self.thumbnail_url(),
            web_url: self.web_url(),
            gallery_url: self.gallery_url(),
            edit_url: self.edit_url(),
        }
    }
}

// Flat shape used for JSON output
#[derive(Serialize)]
struct Record<'a> {
    success: bool,
    error: Option<&'a str>,
    filename: Option<String>,
    filepath: Option<String>,
    image_url: Option<&'a str>,
    thumbnail_url: Option<&'a str>,
    web_url: Option<&'a str>,
    gallery_url: Option<&'a str>,
    edit_url: Option<&'a str>,
}

impl Serialize for UploadResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.record().serialize(serializer)
    }
}

impl fmt::Display for UploadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.record();
        write!(f, "UploadResult(success={}", record.success)?;
        let fields = [
            ("error", record.error),
            ("filename", record.filename.as_deref()),
            ("filepath", record.filepath.as_deref()),
            ("image_url", record.image_url),
            ("thumbnail_url", record.thumbnail_url),
            ("web_url", record.web_url),
            ("gallery_url", record.gallery_url),
            ("edit_url", record.edit_url),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                write!(f, ", {}={:?}", key, value)?;
            }
        }
        write!(f, ")")
    }
}
