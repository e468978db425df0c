//! Temporary installation trees for bootstrap tests.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use emporium_config::{Application, Settings};

/// A site root on disk with option and language files.
pub struct TestSite {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl TestSite {
    /// Creates an empty site with blank `default` and `catalog` option files.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        let site = Self { _dir: dir, root };
        site.write_options("default", "");
        site.write_options("catalog", "");
        site
    }

    /// Installation root.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Writes `system/config/<name>.toml`.
    pub fn write_options(&self, name: &str, contents: &str) {
        self.write(&format!("system/config/{name}.toml"), contents);
    }

    /// Writes `catalog/language/<code>/<name>.toml`.
    pub fn write_language(&self, code: &str, name: &str, contents: &str) {
        self.write(&format!("catalog/language/{code}/{name}.toml"), contents);
    }

    /// Settings pointing at this site.
    pub fn settings(&self) -> Settings {
        Settings {
            root_dir: self.root.clone(),
            application: Application::Catalog,
            ..Settings::default()
        }
    }

    fn write(&self, relative: &str, contents: &str) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create site directory");
        }
        fs::write(&path, contents).expect("write site file");
    }
}
