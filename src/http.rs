//! Thin async HTTP client for the imgbox.com endpoints.
//!
//! Every failure is normalized into [`GalleryError::ConnectionFailed`], except
//! bodies that were expected to be JSON and are not, which become
//! [`GalleryError::InvalidJson`]. Nothing is retried here.

use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT, EDIT_PATH, GALLERY_PATH, PROCESS_PATH, TOKEN_PATH,
};
use crate::error::{GalleryError, Result};
use reqwest::header::{HeaderMap, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, Request, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ServiceOptions {
    pub fn new(base_url: Option<String>, timeout: Option<Duration>) -> Self {
        Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
        }
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Landing page that carries the CSRF meta tag
    pub fn root_url(&self) -> String {
        format!("{}/", self.base())
    }

    pub fn token_url(&self) -> String {
        format!("{}{}", self.base(), TOKEN_PATH)
    }

    pub fn process_url(&self) -> String {
        format!("{}{}", self.base(), PROCESS_PATH)
    }

    pub fn gallery_url(&self, gallery_id: &str) -> String {
        format!("{}{}{}", self.base(), GALLERY_PATH, gallery_id)
    }

    pub fn edit_url(&self, token_id: &str, token_secret: &str) -> String {
        format!("{}{}{}/{}", self.base(), EDIT_PATH, token_id, token_secret)
    }
}

/// A file attached to a multipart POST.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    headers: HeaderMap,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let inner = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GalleryError::ClientBuild(e.to_string()))?;

        Ok(Self {
            inner,
            headers: HeaderMap::new(),
        })
    }

    /// Headers sent with every request made by this client
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub async fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<String> {
        debug!("GET {} {:?}", url, params);
        let builder = self.request(Method::GET, url).query(params);
        self.send(build(builder)?).await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        parse_json(self.get(url, params).await?)
    }

    /// POST `fields` as a urlencoded form, or as a multipart form when a file is attached.
    pub async fn post(
        &self,
        url: &str,
        fields: &[(&str, String)],
        file: Option<FilePart>,
    ) -> Result<String> {
        debug!("POST {} {:?}", url, fields);
        let builder = self.request(Method::POST, url);
        let builder = match file {
            None => builder.form(fields),
            Some(file) => {
                debug!(
                    "Attaching {} ({}, {} bytes) as {}",
                    file.file_name,
                    file.mime_type,
                    file.data.len(),
                    file.field
                );
                let part = Part::bytes(file.data)
                    .file_name(file.file_name)
                    .mime_str(&file.mime_type)
                    .map_err(|_| {
                        GalleryError::ConnectionFailed(format!(
                            "invalid mime type: {}",
                            file.mime_type
                        ))
                    })?;
                let form = fields
                    .iter()
                    .fold(Form::new(), |form, (name, value)| {
                        form.text(name.to_string(), value.clone())
                    })
                    .part(file.field, part);
                builder.multipart(form)
            }
        };
        self.send(build(builder)?).await
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        fields: &[(&str, String)],
        file: Option<FilePart>,
    ) -> Result<T> {
        parse_json(self.post(url, fields, file).await?)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.inner.request(method, url).headers(self.headers.clone())
    }

    async fn send(&self, mut request: Request) -> Result<String> {
        // The service misbehaves when it sees a User-Agent
        request.headers_mut().remove(USER_AGENT);

        let url = request.url().clone();
        let response = self
            .inner
            .execute(request)
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            warn!("{}: {}", url, status);
            return Err(GalleryError::ConnectionFailed("file too large".to_string()));
        }

        let text = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            warn!("{}: {}: {:?}", url, status, text);
            let message = if text.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                text
            };
            return Err(GalleryError::ConnectionFailed(message));
        }

        debug!("Response from {}: {:?}", url, text);
        Ok(text)
    }
}

fn build(builder: RequestBuilder) -> Result<Request> {
    builder.build().map_err(transport_error)
}

fn transport_error(e: reqwest::Error) -> GalleryError {
    debug!("Transport error: {}", e);
    let message = if e.is_timeout() {
        "connection timed out"
    } else if e.is_builder() {
        "invalid URL"
    } else {
        "connection failed"
    };
    GalleryError::ConnectionFailed(message.to_string())
}

fn parse_json<T: DeserializeOwned>(body: String) -> Result<T> {
    serde_json::from_str(&body).map_err(|e| GalleryError::InvalidJson {
        message: e.to_string(),
        body,
    })
}
