#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

pub const CMD_TIMEOUT: Duration = Duration::from_secs(15);

/// Isolated root and config file for one test.
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create sandbox dir"),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn config(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    /// Create a configured `xmlsitemap` command pointing at this sandbox.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("xmlsitemap"));
        cmd.timeout(CMD_TIMEOUT);
        cmd.env("XMLSITEMAP_CONFIG", self.config());
        cmd.env("XMLSITEMAP_ROOT", self.root());
        cmd.env("XMLSITEMAP_BASE_URL", "https://example.com");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    /// Run `status --format json` and parse the report.
    pub fn status(&self) -> serde_json::Value {
        let output = self
            .cmd()
            .args(["status", "--format", "json"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).unwrap()
    }

    /// Path of a generated file of the first registered sitemap.
    pub fn generated(&self, file: &str) -> PathBuf {
        let status = self.status();
        let smid = status["sitemaps"][0]["smid"].as_str().unwrap().to_string();
        self.root().join("files").join(smid).join(file)
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

#[allow(dead_code)]
pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}
