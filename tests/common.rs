#![allow(dead_code)]

use assert_fs::prelude::*;
use assert_fs::TempDir;
use mockito::{Mock, ServerGuard};
use std::path::PathBuf;

pub const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html><head>
<meta content="authenticity_token" name="csrf-param" />
<meta content="s3cr3t+csrf/token==" name="csrf-token" />
</head><body></body></html>"#;

pub const TOKEN_RESPONSE: &str = r#"{"ok": true, "token_id": 1234, "token_secret": "tsecret", "gallery_id": "gal42", "gallery_secret": "gsecret"}"#;

pub const PROCESS_RESPONSE: &str = r#"{"files":[{"original_url":"https://x/img.jpg","thumbnail_url":"https://x/t.jpg","url":"https://x/page"}]}"#;

/// Landing page and token endpoint of a working service
pub fn mock_gallery_creation(server: &mut ServerGuard) -> Vec<Mock> {
    vec![
        server.mock("GET", "/").with_body(LANDING_PAGE).create(),
        server
            .mock("POST", "/ajax/token/generate")
            .match_header("x-csrf-token", "s3cr3t+csrf/token==")
            .with_body(TOKEN_RESPONSE)
            .create(),
    ]
}

pub fn mock_process(server: &mut ServerGuard, hits: usize) -> Mock {
    server
        .mock("POST", "/upload/process")
        .match_header("x-csrf-token", "s3cr3t+csrf/token==")
        .with_body(PROCESS_RESPONSE)
        .expect(hits)
        .create()
}

pub fn create_test_file(temp_dir: &TempDir, name: &str, size: usize) -> PathBuf {
    let file = temp_dir.child(name);
    file.write_binary(&vec![b'x'; size]).unwrap();
    file.path().to_path_buf()
}

pub fn create_temp_directory() -> TempDir {
    TempDir::new().unwrap()
}
