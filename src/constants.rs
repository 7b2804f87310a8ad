use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://imgbox.com";

pub const TOKEN_PATH: &str = "/ajax/token/generate";
pub const PROCESS_PATH: &str = "/upload/process";
pub const GALLERY_PATH: &str = "/g/";
pub const EDIT_PATH: &str = "/upload/edit/";

/// Sent as `X-CSRF-Token`; header names are case-insensitive
pub const CSRF_TOKEN_HEADER: &str = "x-csrf-token";
pub const CSRF_META_NAME: &str = "csrf-token";

/// Request timeout for every call to the service (5 minutes)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Largest file the service accepts, in bytes (10 MiB)
pub const MAX_FILE_SIZE: u64 = 10_485_760;

pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png"];

pub const CONTENT_TYPE_FAMILY: u8 = 1;
pub const CONTENT_TYPE_ADULT: u8 = 2;

pub const DEFAULT_THUMB_WIDTH: u32 = 100;

pub const THUMBNAIL_WIDTHS_SQUARE: &[(u32, &str)] = &[
    (150, "150c"),
    (200, "200c"),
    (250, "250c"),
    (300, "300c"),
    (350, "350c"),
    (500, "500c"),
    (800, "800c"),
];

pub const THUMBNAIL_WIDTHS_KEEP_ASPECT: &[(u32, &str)] = &[
    (100, "100r"),
    (150, "150r"),
    (200, "200r"),
    (250, "250r"),
    (300, "300r"),
    (350, "350r"),
    (500, "500r"),
    (800, "800r"),
];

// Process exit codes of the command-line front end
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_CREATION_FAILED: u8 = 1;
pub const EXIT_UPLOAD_FAILED: u8 = 2;
pub const EXIT_NO_INPUT: u8 = 3;
pub const EXIT_UNEXPECTED_RESPONSE: u8 = 100;

pub const BUG_REPORT_URL: &str = "https://github.com/luojiyin1987/imgbox-uploader/issues";
pub const PROGRESS_SPINNER_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] {pos}/{len} {msg}";

// Common output message prefixes
pub const WARNING_PREFIX: &str = "⚠️";
pub const ERROR_PREFIX: &str = "❌";
pub const INFO_PREFIX: &str = "📋";
