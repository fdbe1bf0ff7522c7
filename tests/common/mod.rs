//! Shared helpers for configuration tests.

#![allow(dead_code)]

use proxy_server::ProxyRunOptions;
use tempfile::NamedTempFile;

/// Default options with a fixed server ID so comparisons are stable.
pub fn base_options() -> ProxyRunOptions {
    ProxyRunOptions {
        server_id: "proxy-test".into(),
        ..ProxyRunOptions::default()
    }
}

/// A real file on disk, removed when dropped.
pub struct TempFile {
    file: NamedTempFile,
}

impl TempFile {
    pub fn new() -> Self {
        Self {
            file: NamedTempFile::new().unwrap(),
        }
    }

    pub fn path(&self) -> String {
        self.file.path().to_string_lossy().into_owned()
    }
}

/// A path that does not exist.
pub fn missing_path() -> String {
    let dir = tempfile::tempdir().unwrap();
    dir.path().join("missing.pem").to_string_lossy().into_owned()
}
