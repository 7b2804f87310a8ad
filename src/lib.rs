pub mod cli;
pub mod constants;
pub mod error;
pub mod gallery;
pub mod http;
pub mod logger;
pub mod submission;
pub mod thumbnail;
pub mod utils;
pub mod validation;

pub use constants::MAX_FILE_SIZE;
pub use error::{FileError, GalleryError, Result};
pub use gallery::{find_csrf_token, CreatedGallery, Gallery, SessionToken};
pub use http::{HttpClient, ServiceOptions};
pub use submission::{UploadResult, UploadedImage};
pub use thumbnail::{snap_width, ThumbnailSize};
pub use validation::{detect_mime_type, validate_input_path};
