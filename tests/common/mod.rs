//! Shared setup for the HTTP API tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use file_store::upload::AllowList;
use file_store::{AppConfig, LocalFileStorage, Storage, build_router};
use tempfile::TempDir;

pub const BASE_URL: &str = "http://files.test";

pub struct TestApp {
    pub server: TestServer,
    pub upload_dir: PathBuf,
    pub staging_dir: PathBuf,
    _dir: TempDir,
}

impl TestApp {
    /// Names of the entries currently in the upload root.
    pub fn stored_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.upload_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub fn test_config(upload_dir: &Path) -> AppConfig {
    AppConfig {
        upload_dir: upload_dir.to_path_buf(),
        public_base_url: Some(BASE_URL.to_string()),
        ..AppConfig::default()
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(|_| {})
}

pub fn spawn_app_with(customize: impl FnOnce(&mut AppConfig)) -> TestApp {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let upload_dir = dir.path().join("uploads");

    let mut config = test_config(&upload_dir);
    customize(&mut config);

    let storage = LocalFileStorage::new(upload_dir.clone()).expect("Failed to create storage");
    let staging_dir = storage.staging_dir().to_path_buf();
    let storage: Arc<dyn Storage> = Arc::new(storage);
    let server = TestServer::new(build_router(config, storage)).expect("Failed to create server");

    TestApp {
        server,
        upload_dir,
        staging_dir,
        _dir: dir,
    }
}

pub fn permissive(config: &mut AppConfig) {
    config.upload.allowed_types = AllowList::Any;
}

pub fn file_form(file_name: &str, mime_type: &str, bytes: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(bytes).file_name(file_name).mime_type(mime_type),
    )
}

/// Deterministic non-trivial payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Path portion of a returned file URL.
pub fn url_path(url: &str) -> &str {
    url.strip_prefix(BASE_URL).expect("url should use the public base")
}
