//! Gallery sessions on imgbox.com.
//!
//! A [`Gallery`] is a local draft: title and comment settings can still be
//! changed. [`Gallery::create`] performs the token handshake and turns it into
//! a [`CreatedGallery`], which only exposes the settings the service lets us
//! change per upload. Since `CreatedGallery` has no `create` method and no
//! title or comment setters, those mistakes do not compile.
//!
//! ```compile_fail
//! # async fn demo() -> imgbox_uploader::Result<()> {
//! let gallery = imgbox_uploader::Gallery::default().create().await?;
//! gallery.create().await?;
//! # Ok(())
//! # }
//! ```

use crate::constants::{
    CONTENT_TYPE_ADULT, CONTENT_TYPE_FAMILY, CSRF_META_NAME, CSRF_TOKEN_HEADER,
};
use crate::error::{FileError, GalleryError, Result};
use crate::http::{FilePart, HttpClient, ServiceOptions};
use crate::submission::{UploadResult, UploadedImage};
use crate::thumbnail::ThumbnailSize;
use crate::utils::io_error_message;
use crate::validation::{check_file_size, detect_mime_type};
use futures::stream::{self, Stream, StreamExt};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Gallery settings that have not been sent to the service yet.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    options: ServiceOptions,
    title: Option<String>,
    comments_enabled: bool,
    adult: bool,
    thumbnail: ThumbnailSize,
}

impl Gallery {
    pub fn new(options: ServiceOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_comments_enabled(mut self, enabled: bool) -> Self {
        self.comments_enabled = enabled;
        self
    }

    pub fn with_adult(mut self, adult: bool) -> Self {
        self.adult = adult;
        self
    }

    /// Requested thumbnail width; snaps to the nearest supported value
    pub fn with_thumb_width(mut self, width: i64) -> Self {
        self.thumbnail = self.thumbnail.with_width(width);
        self
    }

    pub fn with_square_thumbs(mut self, square: bool) -> Self {
        self.thumbnail = self.thumbnail.with_square(square);
        self
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn comments_enabled(&self) -> bool {
        self.comments_enabled
    }

    pub fn adult(&self) -> bool {
        self.adult
    }

    pub fn thumb_width(&self) -> u32 {
        self.thumbnail.width()
    }

    pub fn square_thumbs(&self) -> bool {
        self.thumbnail.is_square()
    }

    /// Create the gallery remotely.
    ///
    /// Fetches the CSRF token from the landing page, then exchanges it for
    /// upload and gallery tokens.
    ///
    /// # Returns
    /// * `Ok(CreatedGallery)` - Session ready for uploads
    /// * `Err(GalleryError::ConnectionFailed)` - A request failed; may be retried
    /// * `Err(GalleryError)` - Any other variant means the service answered unexpectedly
    pub async fn create(self) -> Result<CreatedGallery> {
        let mut client = HttpClient::new(self.options.timeout)?;

        let html = client.get(&self.options.root_url(), &[]).await?;
        let csrf_token = find_csrf_token(&html).ok_or(GalleryError::CsrfTokenNotFound)?;
        debug!("Found CSRF token: {}", csrf_token);

        let value = HeaderValue::from_str(&csrf_token).map_err(|_| {
            GalleryError::UnexpectedResponse(format!("Invalid CSRF token: {:?}", csrf_token))
        })?;
        client
            .headers_mut()
            .insert(HeaderName::from_static(CSRF_TOKEN_HEADER), value);

        let fields = [
            ("gallery", "true".to_string()),
            ("gallery_title", self.title.clone().unwrap_or_default()),
            ("comments_enabled", flag(self.comments_enabled)),
        ];
        let response: Value = client
            .post_json(&self.options.token_url(), &fields, None)
            .await?;
        let token = SessionToken::from_response(response)?;
        debug!("Gallery token: {:?}", token);

        Ok(CreatedGallery {
            client,
            options: self.options,
            title: self.title,
            comments_enabled: self.comments_enabled,
            adult: self.adult,
            thumbnail: self.thumbnail,
            token,
        })
    }

    /// Upload `paths` one after another, creating the gallery first.
    ///
    /// Nothing happens until the stream is polled. If creation fails, the
    /// file yields a failed [`UploadResult`] carrying the creation error and
    /// creation is attempted again for the next file.
    pub fn upload<I, P>(self, paths: I) -> impl Stream<Item = Result<UploadResult>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let state = LazyUploads {
            draft: self,
            session: None,
            paths: paths
                .into_iter()
                .map(|p| p.as_ref().to_path_buf())
                .collect(),
        };

        stream::unfold(state, |mut state| async move {
            let path = state.paths.pop_front()?;

            if state.session.is_none() {
                match state.draft.clone().create().await {
                    Ok(gallery) => state.session = Some(gallery),
                    Err(e) => {
                        let failure = UploadResult::failure(Some(path), e.to_string());
                        return Some((Ok(failure), state));
                    }
                }
            }

            let result = state.session.as_ref()?.upload_file(&path).await;
            Some((result, state))
        })
    }
}

impl fmt::Display for Gallery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Gallery(title={:?}, thumb_width={}, square_thumbs={}, adult={}, comments_enabled={})",
            self.title,
            self.thumb_width(),
            self.square_thumbs(),
            self.adult,
            self.comments_enabled
        )
    }
}

struct LazyUploads {
    draft: Gallery,
    session: Option<CreatedGallery>,
    paths: VecDeque<PathBuf>,
}

/// Tokens issued by the token endpoint.
///
/// Stored verbatim; only the fields needed for uploads are read.
/// `token_id` and `token_secret` are required, the gallery fields are not.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionToken(Map<String, Value>);

impl SessionToken {
    fn from_response(response: Value) -> Result<Self> {
        let map = match response {
            Value::Object(map) => map,
            other => {
                return Err(GalleryError::UnexpectedResponse(format!(
                    "Not an object: {}",
                    other
                )))
            }
        };

        let token = Self(map);
        for key in ["token_id", "token_secret"] {
            if token.field(key).is_none() {
                return Err(GalleryError::UnexpectedResponse(format!(
                    "Couldn't find '{}': {}",
                    key,
                    Value::Object(token.0.clone())
                )));
            }
        }
        Ok(token)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    // Form value for `key`; strings are sent without quotes
    fn field(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    fn field_or_null(&self, key: &str) -> String {
        self.field(key).unwrap_or_else(|| "null".to_string())
    }

    pub fn token_id(&self) -> String {
        self.field_or_null("token_id")
    }

    pub fn token_secret(&self) -> String {
        self.field_or_null("token_secret")
    }

    pub fn gallery_id(&self) -> String {
        self.field_or_null("gallery_id")
    }

    pub fn gallery_secret(&self) -> String {
        self.field_or_null("gallery_secret")
    }
}

/// A gallery that exists remotely and accepts uploads.
#[derive(Debug)]
pub struct CreatedGallery {
    client: HttpClient,
    options: ServiceOptions,
    title: Option<String>,
    comments_enabled: bool,
    adult: bool,
    thumbnail: ThumbnailSize,
    token: SessionToken,
}

impl CreatedGallery {
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn comments_enabled(&self) -> bool {
        self.comments_enabled
    }

    pub fn adult(&self) -> bool {
        self.adult
    }

    pub fn set_adult(&mut self, adult: bool) {
        self.adult = adult;
    }

    pub fn thumb_width(&self) -> u32 {
        self.thumbnail.width()
    }

    pub fn set_thumb_width(&mut self, width: i64) {
        self.thumbnail = self.thumbnail.with_width(width);
    }

    pub fn square_thumbs(&self) -> bool {
        self.thumbnail.is_square()
    }

    pub fn set_square_thumbs(&mut self, square: bool) {
        self.thumbnail = self.thumbnail.with_square(square);
    }

    /// Content type code sent with uploads: family or adult
    pub fn content_type(&self) -> u8 {
        if self.adult {
            CONTENT_TYPE_ADULT
        } else {
            CONTENT_TYPE_FAMILY
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Web page with the thumbnails of this gallery
    pub fn gallery_url(&self) -> String {
        self.options.gallery_url(&self.token.gallery_id())
    }

    /// Web page to manage this gallery
    pub fn edit_url(&self) -> String {
        self.options
            .edit_url(&self.token.token_id(), &self.token.token_secret())
    }

    /// Upload one file.
    ///
    /// Local problems (missing file, too large, unsupported type) and
    /// connection failures are reported in the returned [`UploadResult`].
    ///
    /// # Returns
    /// * `Ok(UploadResult)` - Successful or failed upload of this file
    /// * `Err(GalleryError)` - The service answered in a shape this client does not understand
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> Result<UploadResult> {
        let path = path.as_ref();
        let failure = |error: String| UploadResult::failure(Some(path.to_path_buf()), error);

        let (data, mime_type) = match read_image(path).await {
            Ok(image) => image,
            Err(e) => return Ok(failure(e.to_string())),
        };

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = FilePart {
            field: "files[]".to_string(),
            file_name,
            mime_type: mime_type.to_string(),
            data,
        };
        let fields = [
            ("token_id", self.token.token_id()),
            ("token_secret", self.token.token_secret()),
            ("content_type", self.content_type().to_string()),
            ("thumbnail_size", self.thumbnail.code().to_string()),
            ("gallery_id", self.token.gallery_id()),
            ("gallery_secret", self.token.gallery_secret()),
            ("comments_enabled", flag(self.comments_enabled)),
        ];

        let response: Value = match self
            .client
            .post_json(&self.options.process_url(), &fields, Some(file))
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_connection_error() => return Ok(failure(e.to_string())),
            Err(e) => return Err(e),
        };
        debug!("POST response: {}", response);

        let info = first_file(&response)?;
        Ok(UploadResult::success(
            path,
            UploadedImage {
                image_url: string_field(info, "original_url", &response)?,
                thumbnail_url: string_field(info, "thumbnail_url", &response)?,
                web_url: string_field(info, "url", &response)?,
                gallery_url: self.gallery_url(),
                edit_url: self.edit_url(),
            },
        ))
    }

    /// Upload `paths` one after another.
    ///
    /// Each file is read and sent only when the stream is polled for it.
    pub fn upload<'a, I, P>(&'a self, paths: I) -> impl Stream<Item = Result<UploadResult>> + 'a
    where
        I: IntoIterator<Item = P>,
        I::IntoIter: 'a,
        P: AsRef<Path> + 'a,
    {
        stream::iter(paths).then(move |path| async move { self.upload_file(path).await })
    }

    /// Release the connection pool. Dropping the gallery has the same effect.
    pub fn close(self) {
        debug!("Closing session for {}", self.gallery_url());
    }
}

lazy_static! {
    static ref META_TAG_REGEX: Regex = Regex::new(r"(?is)<meta\b[^>]*>").unwrap();
    static ref ATTRIBUTE_REGEX: Regex =
        Regex::new(r#"(?is)([a-z_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#).unwrap();
}

/// Content of the last `<meta name="csrf-token">` tag in `html`
pub fn find_csrf_token(html: &str) -> Option<String> {

    let mut token = None;
    for tag in META_TAG_REGEX.find_iter(html) {
        let mut name = None;
        let mut content = None;
        for caps in ATTRIBUTE_REGEX.captures_iter(tag.as_str()) {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string());
            match caps[1].to_ascii_lowercase().as_str() {
                "name" => name = value,
                "content" => content = value,
                _ => {}
            }
        }
        if name.as_deref() == Some(CSRF_META_NAME) {
            token = content;
        }
    }
    token.filter(|t| !t.is_empty())
}

// The file handle is closed before the request is sent
async fn read_image(path: &Path) -> std::result::Result<(Vec<u8>, &'static str), FileError> {
    let io_error = |e: std::io::Error| FileError::Io(io_error_message(&e));

    let mut file = tokio::fs::File::open(path).await.map_err(io_error)?;
    let size = file.metadata().await.map_err(io_error)?.len();
    check_file_size(path, size)?;
    let mime_type = detect_mime_type(path)?;

    let mut data = Vec::with_capacity(size as usize);
    file.read_to_end(&mut data).await.map_err(io_error)?;
    Ok((data, mime_type))
}

fn first_file(response: &Value) -> Result<&Value> {
    let files = response.get("files").ok_or_else(|| {
        GalleryError::UnexpectedResponse(format!("Couldn't find 'files': {}", response))
    })?;
    let files = files.as_array().ok_or_else(|| {
        GalleryError::UnexpectedResponse(format!("'files' is not a list: {}", response))
    })?;
    files
        .first()
        .ok_or_else(|| GalleryError::UnexpectedResponse(format!("'files' is empty: {}", response)))
}

fn string_field(info: &Value, key: &str, response: &Value) -> Result<String> {
    info.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            GalleryError::UnexpectedResponse(format!("Couldn't find '{}': {}", key, response))
        })
}

fn flag(enabled: bool) -> String {
    if enabled { "1" } else { "0" }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Mock, ServerGuard};
    use std::fs::File;
    use std::io::Write;
    use std::pin::pin;
    use std::time::Duration;
    use tempfile::TempDir;

    const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html><head>
<meta charset="utf-8">
<meta content="authenticity_token" name="csrf-param" />
<meta content="s3cr3t+csrf/token==" name="csrf-token" />
</head><body></body></html>"#;

    const TOKEN_RESPONSE: &str = r#"{"ok": true, "token_id": 1234, "token_secret": "tsecret", "gallery_id": "gal42", "gallery_secret": "gsecret"}"#;

    const PROCESS_RESPONSE: &str = r#"{"files":[{"original_url":"https://x/img.jpg","thumbnail_url":"https://x/t.jpg","url":"https://x/page"}]}"#;

    fn gallery(server: &ServerGuard) -> Gallery {
        Gallery::new(ServiceOptions::new(
            Some(server.url()),
            Some(Duration::from_secs(5)),
        ))
    }

    async fn mock_landing_page(server: &mut ServerGuard) -> Mock {
        server
            .mock("GET", "/")
            .match_header("user-agent", Matcher::Missing)
            .with_body(LANDING_PAGE)
            .create_async()
            .await
    }

    async fn mock_token(server: &mut ServerGuard, body: &str) -> Mock {
        server
            .mock("POST", "/ajax/token/generate")
            .match_header("x-csrf-token", "s3cr3t+csrf/token==")
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    async fn created(server: &mut ServerGuard) -> CreatedGallery {
        let _landing = mock_landing_page(server).await;
        let _token = mock_token(server, TOKEN_RESPONSE).await;
        gallery(server).create().await.unwrap()
    }

    fn write_file(dir: &TempDir, name: &str, size: usize) -> PathBuf {
        let path = dir.path().join(name);
        File::create(&path)
            .unwrap()
            .write_all(&vec![b'x'; size])
            .unwrap();
        path
    }

    #[test]
    fn test_find_csrf_token() {
        assert_eq!(
            find_csrf_token(LANDING_PAGE).as_deref(),
            Some("s3cr3t+csrf/token==")
        );
        assert_eq!(
            find_csrf_token(r#"<META NAME='csrf-token' CONTENT='abc'>"#).as_deref(),
            Some("abc")
        );
        assert_eq!(
            find_csrf_token(r#"<meta name=csrf-token content=abc123>"#).as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_find_csrf_token_missing() {
        assert_eq!(find_csrf_token("<html><head></head></html>"), None);
        assert_eq!(find_csrf_token(r#"<meta name="csrf-param" content="x">"#), None);
        assert_eq!(find_csrf_token(r#"<meta name="csrf-token" content="">"#), None);
    }

    #[test]
    fn test_draft_settings() {
        let draft = Gallery::default()
            .with_title("Holiday")
            .with_comments_enabled(true)
            .with_adult(true)
            .with_thumb_width(100)
            .with_square_thumbs(true);
        assert_eq!(draft.title(), Some("Holiday"));
        assert!(draft.comments_enabled());
        assert!(draft.adult());
        assert!(draft.square_thumbs());
        assert_eq!(draft.thumb_width(), 150);
        assert_eq!(draft.options().base_url, "https://imgbox.com");
        assert_eq!(
            draft.to_string(),
            r#"Gallery(title=Some("Holiday"), thumb_width=150, square_thumbs=true, adult=true, comments_enabled=true)"#
        );
    }

    #[tokio::test]
    async fn test_create() {
        let mut server = mockito::Server::new_async().await;
        let landing = mock_landing_page(&mut server).await;
        let token = server
            .mock("POST", "/ajax/token/generate")
            .match_header("x-csrf-token", "s3cr3t+csrf/token==")
            .match_header("user-agent", Matcher::Missing)
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("gallery".into(), "true".into()),
                Matcher::UrlEncoded("gallery_title".into(), "My Pics".into()),
                Matcher::UrlEncoded("comments_enabled".into(), "1".into()),
            ]))
            .with_body(TOKEN_RESPONSE)
            .create_async()
            .await;

        let created = gallery(&server)
            .with_title("My Pics")
            .with_comments_enabled(true)
            .create()
            .await
            .unwrap();

        landing.assert_async().await;
        token.assert_async().await;
        assert_eq!(created.title(), Some("My Pics"));
        assert!(created.comments_enabled());
        assert_eq!(created.token().token_id(), "1234");
        assert_eq!(created.token().get("ok"), Some(&Value::Bool(true)));
        assert_eq!(created.gallery_url(), format!("{}/g/gal42", server.url()));
        assert_eq!(
            created.edit_url(),
            format!("{}/upload/edit/1234/tsecret", server.url())
        );
    }

    #[tokio::test]
    async fn test_create_without_csrf_token() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_body("<html><head><title>imgbox</title></head></html>")
            .create_async()
            .await;
        let token = server
            .mock("POST", "/ajax/token/generate")
            .expect(0)
            .create_async()
            .await;

        let err = gallery(&server).create().await.unwrap_err();
        assert!(matches!(err, GalleryError::CsrfTokenNotFound));
        assert!(err.is_contract_violation());
        assert!(!err.is_connection_error());
        assert_eq!(err.to_string(), "CSRF token not found");
        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_with_non_object_token() {
        let mut server = mockito::Server::new_async().await;
        let _landing = mock_landing_page(&mut server).await;
        let _token = mock_token(&mut server, "[1, 2, 3]").await;

        let err = gallery(&server).create().await.unwrap_err();
        assert!(err.is_contract_violation());
        assert!(err.to_string().contains("[1,2,3]"));
    }

    #[tokio::test]
    async fn test_create_with_incomplete_token() {
        let mut server = mockito::Server::new_async().await;
        let _landing = mock_landing_page(&mut server).await;
        let _token = mock_token(&mut server, r#"{"token_secret": "abc"}"#).await;

        let err = gallery(&server).create().await.unwrap_err();
        assert!(matches!(err, GalleryError::UnexpectedResponse(_)));
        assert!(err.to_string().contains("token_id"));
    }

    #[tokio::test]
    async fn test_create_connection_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let err = gallery(&server).create().await.unwrap_err();
        assert!(err.is_connection_error());
        assert_eq!(err.to_string(), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_upload_file() {
        let mut server = mockito::Server::new_async().await;
        let gallery = created(&mut server).await;
        let process = server
            .mock("POST", "/upload/process")
            .match_header("x-csrf-token", "s3cr3t+csrf/token==")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="token_id"\r\n\r\n1234\r\n"#.into()),
                Matcher::Regex(r#"name="token_secret"\r\n\r\ntsecret\r\n"#.into()),
                Matcher::Regex(r#"name="content_type"\r\n\r\n1\r\n"#.into()),
                Matcher::Regex(r#"name="thumbnail_size"\r\n\r\n100r\r\n"#.into()),
                Matcher::Regex(r#"name="gallery_id"\r\n\r\ngal42\r\n"#.into()),
                Matcher::Regex(r#"name="gallery_secret"\r\n\r\ngsecret\r\n"#.into()),
                Matcher::Regex(r#"name="comments_enabled"\r\n\r\n0\r\n"#.into()),
                Matcher::Regex(r#"name="files\[\]"; filename="photo.jpg""#.into()),
                Matcher::Regex("Content-Type: image/jpeg".into()),
            ]))
            .with_body(PROCESS_RESPONSE)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "photo.jpg", 1_048_567);

        let result = gallery.upload_file(&path).await.unwrap();
        process.assert_async().await;
        assert!(result.is_success());
        assert_eq!(result.file_name().as_deref(), Some("photo.jpg"));
        assert_eq!(result.file_path(), Some(path.as_path()));
        assert_eq!(result.image_url(), Some("https://x/img.jpg"));
        assert_eq!(result.thumbnail_url(), Some("https://x/t.jpg"));
        assert_eq!(result.web_url(), Some("https://x/page"));
        assert_eq!(result.gallery_url(), Some(gallery.gallery_url().as_str()));
        assert_eq!(result.edit_url(), Some(gallery.edit_url().as_str()));
    }

    #[tokio::test]
    async fn test_upload_uses_current_settings() {
        let mut server = mockito::Server::new_async().await;
        let mut gallery = created(&mut server).await;
        gallery.set_adult(true);
        gallery.set_thumb_width(420);
        gallery.set_square_thumbs(true);
        assert_eq!(gallery.content_type(), 2);
        assert_eq!(gallery.thumb_width(), 350);

        let process = server
            .mock("POST", "/upload/process")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="content_type"\r\n\r\n2\r\n"#.into()),
                Matcher::Regex(r#"name="thumbnail_size"\r\n\r\n350c\r\n"#.into()),
                Matcher::Regex("Content-Type: image/png".into()),
            ]))
            .with_body(PROCESS_RESPONSE)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let result = gallery
            .upload_file(write_file(&dir, "shot.png", 64))
            .await
            .unwrap();
        assert!(result.is_success());
        process.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_without_gallery_id_sends_null() {
        let mut server = mockito::Server::new_async().await;
        let _landing = mock_landing_page(&mut server).await;
        let _token = mock_token(&mut server, r#"{"token_id": "t1", "token_secret": "s1"}"#).await;
        let gallery = gallery(&server).create().await.unwrap();

        let process = server
            .mock("POST", "/upload/process")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="gallery_id"\r\n\r\nnull\r\n"#.into()),
                Matcher::Regex(r#"name="gallery_secret"\r\n\r\nnull\r\n"#.into()),
            ]))
            .with_body(PROCESS_RESPONSE)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let result = gallery
            .upload_file(write_file(&dir, "a.jpg", 16))
            .await
            .unwrap();
        assert!(result.is_success());
        process.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_too_large_file_skips_network() {
        let mut server = mockito::Server::new_async().await;
        let gallery = created(&mut server).await;
        let process = server
            .mock("POST", "/upload/process")
            .expect(0)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("huge.jpg");
        File::create(&path).unwrap().set_len(10_485_761).unwrap();

        let result = gallery.upload_file(&path).await.unwrap();
        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("larger than"));
        assert_eq!(result.image_url(), None);
        process.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_unsupported_type_skips_network() {
        let mut server = mockito::Server::new_async().await;
        let gallery = created(&mut server).await;
        let process = server
            .mock("POST", "/upload/process")
            .expect(0)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let result = gallery
            .upload_file(write_file(&dir, "notes.txt", 12))
            .await
            .unwrap();
        assert_eq!(result.error(), Some("Unsupported file type: text/plain"));
        assert_eq!(result.file_name().as_deref(), Some("notes.txt"));

        let result = gallery
            .upload_file(write_file(&dir, "noextension", 12))
            .await
            .unwrap();
        assert_eq!(result.error(), Some("Unknown mime type"));
        process.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let mut server = mockito::Server::new_async().await;
        let gallery = created(&mut server).await;

        let result = gallery.upload_file("/no/such/dir/photo.jpg").await.unwrap();
        assert_eq!(result.error(), Some("No such file or directory"));
        assert_eq!(result.file_name().as_deref(), Some("photo.jpg"));
    }

    #[tokio::test]
    async fn test_upload_payload_too_large() {
        let mut server = mockito::Server::new_async().await;
        let gallery = created(&mut server).await;
        let _mock = server
            .mock("POST", "/upload/process")
            .with_status(413)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let result = gallery
            .upload_file(write_file(&dir, "photo.jpg", 32))
            .await
            .unwrap();
        assert_eq!(result.error(), Some("file too large"));
    }

    #[tokio::test]
    async fn test_upload_malformed_responses_propagate() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "photo.jpg", 32);

        for (body, expected) in [
            (r#"{"error": "nope"}"#, "Couldn't find 'files'"),
            (r#"{"files": "nope"}"#, "'files' is not a list"),
            (r#"{"files": []}"#, "'files' is empty"),
            (r#"{"files": [{"url": "https://x/page"}]}"#, "Couldn't find 'original_url'"),
        ] {
            let mut server = mockito::Server::new_async().await;
            let gallery = created(&mut server).await;
            let _mock = server
                .mock("POST", "/upload/process")
                .with_body(body)
                .create_async()
                .await;

            let err = gallery.upload_file(&path).await.unwrap_err();
            assert!(err.is_contract_violation());
            assert!(err.to_string().contains(expected), "{}", err);
        }
    }

    #[tokio::test]
    async fn test_upload_invalid_json_propagates() {
        let mut server = mockito::Server::new_async().await;
        let gallery = created(&mut server).await;
        let _mock = server
            .mock("POST", "/upload/process")
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let err = gallery
            .upload_file(write_file(&dir, "photo.jpg", 32))
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::InvalidJson { .. }));
    }

    #[tokio::test]
    async fn test_upload_stream_is_sequential() {
        let mut server = mockito::Server::new_async().await;
        let gallery = created(&mut server).await;
        let process = server
            .mock("POST", "/upload/process")
            .with_body(PROCESS_RESPONSE)
            .expect(2)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let paths = vec![
            write_file(&dir, "one.jpg", 8),
            write_file(&dir, "two.txt", 8),
            write_file(&dir, "three.png", 8),
        ];

        let results: Vec<UploadResult> = gallery
            .upload(&paths)
            .map(|result| result.unwrap())
            .collect()
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_success());
        assert!(!results[1].is_success());
        assert!(results[2].is_success());
        assert_eq!(results[2].file_name().as_deref(), Some("three.png"));
        process.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_stream_is_lazy() {
        let mut server = mockito::Server::new_async().await;
        let gallery = created(&mut server).await;
        let process = server
            .mock("POST", "/upload/process")
            .with_body(PROCESS_RESPONSE)
            .expect(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let paths = vec![write_file(&dir, "one.jpg", 8), write_file(&dir, "two.jpg", 8)];

        let mut uploads = pin!(gallery.upload(&paths));
        let first = uploads.next().await.unwrap().unwrap();
        assert!(first.is_success());
        drop(uploads);
        process.assert_async().await;
    }

    #[tokio::test]
    async fn test_draft_upload_creates_once() {
        let mut server = mockito::Server::new_async().await;
        let landing = mock_landing_page(&mut server).await;
        let _token = mock_token(&mut server, TOKEN_RESPONSE).await;
        let process = server
            .mock("POST", "/upload/process")
            .with_body(PROCESS_RESPONSE)
            .expect(2)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let paths = vec![write_file(&dir, "one.jpg", 8), write_file(&dir, "two.jpg", 8)];

        let results: Vec<Result<UploadResult>> =
            gallery(&server).upload(paths).collect().await;

        assert_eq!(results.len(), 2);
        for result in &results {
            let result = result.as_ref().unwrap();
            assert!(result.is_success());
            assert_eq!(
                result.gallery_url(),
                Some(format!("{}/g/gal42", server.url()).as_str())
            );
        }
        landing.assert_async().await;
        process.assert_async().await;
    }

    #[tokio::test]
    async fn test_draft_upload_creation_failure() {
        let mut server = mockito::Server::new_async().await;
        let landing = server
            .mock("GET", "/")
            .with_status(503)
            .with_body("down")
            .expect(2)
            .create_async()
            .await;
        let process = server
            .mock("POST", "/upload/process")
            .expect(0)
            .create_async()
            .await;

        let results: Vec<Result<UploadResult>> = gallery(&server)
            .upload(["a.jpg", "b.jpg"])
            .collect()
            .await;

        assert_eq!(results.len(), 2);
        for (result, name) in results.iter().zip(["a.jpg", "b.jpg"]) {
            let result = result.as_ref().unwrap();
            assert_eq!(result.error(), Some("down"));
            assert_eq!(result.file_name().as_deref(), Some(name));
        }
        landing.assert_async().await;
        process.assert_async().await;
    }

    #[tokio::test]
    async fn test_draft_upload_without_files_does_nothing() {
        let mut server = mockito::Server::new_async().await;
        let landing = server.mock("GET", "/").expect(0).create_async().await;

        let results: Vec<Result<UploadResult>> = gallery(&server)
            .upload(Vec::<PathBuf>::new())
            .collect()
            .await;
        assert!(results.is_empty());
        landing.assert_async().await;
    }
}
