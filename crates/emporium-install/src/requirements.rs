//! Pre-installation checks.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use emporium_config::SitePaths;

use crate::database::DriverSet;
use crate::errors::InstallError;
use crate::options::InstallOptions;

/// Option file whose `session_autostart` must stay off.
const DEFAULT_OPTIONS: &str = "default.toml";

/// Environment facts the installer depends on.
#[cfg_attr(test, mockall::automock)]
pub trait RequirementProbe {
    /// Returns `true` when uploads can be stored under `dir`.
    fn uploads_writable(&self, dir: &Utf8Path) -> bool;

    /// Returns `true` when the option file at `path` enables
    /// `session_autostart`.
    fn session_autostart(&self, path: &Utf8Path) -> bool;

    /// Returns `true` when the schema file exists.
    fn schema_present(&self, path: &Utf8Path) -> bool;
}

/// Probe reading the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl RequirementProbe for SystemProbe {
    fn uploads_writable(&self, dir: &Utf8Path) -> bool {
        nearest_existing(dir).is_some_and(|existing| {
            fs::metadata(existing)
                .is_ok_and(|metadata| metadata.is_dir() && !metadata.permissions().readonly())
        })
    }

    fn session_autostart(&self, path: &Utf8Path) -> bool {
        fs::read_to_string(path)
            .ok()
            .and_then(|text| text.parse::<toml::Table>().ok())
            .and_then(|table| table.get("session_autostart").cloned())
            .is_some_and(|value| match value {
                toml::Value::Boolean(flag) => flag,
                toml::Value::Integer(number) => number != 0,
                toml::Value::String(text) => !matches!(text.as_str(), "" | "0" | "false"),
                _ => false,
            })
    }

    fn schema_present(&self, path: &Utf8Path) -> bool {
        path.is_file()
    }
}

/// Schema used when `--schema` is not given.
#[must_use]
pub fn default_schema(paths: &SitePaths) -> Utf8PathBuf {
    paths.root().join("install/schema.sql")
}

/// Runs every check and reports the first that fails.
///
/// # Errors
///
/// Returns [`InstallError::Requirement`] naming the failing check.
pub fn check(
    probe: &dyn RequirementProbe,
    options: &InstallOptions,
    paths: &SitePaths,
    drivers: &DriverSet,
    schema: &Utf8Path,
) -> Result<(), InstallError> {
    if !probe.uploads_writable(&paths.storage_dir("upload")) {
        return Err(InstallError::requirement(
            "Warning: file uploads need a writable system/storage/upload directory!",
        ));
    }
    if probe.session_autostart(&paths.config().join(DEFAULT_OPTIONS)) {
        return Err(InstallError::requirement(
            "Warning: Emporium will not work with session_autostart enabled!",
        ));
    }
    if !drivers.contains(&options.db.driver) {
        return Err(InstallError::requirement(format!(
            "Warning: database driver '{}' is not available!",
            options.db.driver
        )));
    }
    if !probe.schema_present(schema) {
        return Err(InstallError::requirement(format!(
            "Warning: could not load sql file {schema}!"
        )));
    }
    Ok(())
}

fn nearest_existing(dir: &Utf8Path) -> Option<&Utf8Path> {
    dir.ancestors().find(|candidate| candidate.exists())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::cli::InstallArgs;

    fn options(driver: &str) -> InstallOptions {
        InstallOptions::try_from(InstallArgs {
            db_hostname: String::from("localhost"),
            db_username: Some(String::from("root")),
            db_password: Some(String::from("secret")),
            db_database: String::from("emporium"),
            db_prefix: String::from("oc_"),
            db_driver: String::from(driver),
            db_port: String::from("3306"),
            username: String::from("admin"),
            password: Some(String::from("admin")),
            email: Some(String::from("shop@example.com")),
            http_server: Some(String::from("http://localhost/shop")),
            root: Utf8PathBuf::from("/srv/shop"),
            schema: None,
        })
        .expect("valid options")
    }

    fn healthy_probe() -> MockRequirementProbe {
        let mut probe = MockRequirementProbe::new();
        probe.expect_uploads_writable().return_const(true);
        probe.expect_session_autostart().return_const(false);
        probe.expect_schema_present().return_const(true);
        probe
    }

    fn run(probe: &MockRequirementProbe, driver: &str) -> Result<(), InstallError> {
        let paths = SitePaths::new("/srv/shop");
        let drivers = DriverSet::builtin(&paths);
        check(probe, &options(driver), &paths, &drivers, &default_schema(&paths))
    }

    #[rstest]
    fn healthy_environments_pass() {
        assert!(run(&healthy_probe(), "script").is_ok());
    }

    #[rstest]
    fn session_autostart_is_refused() {
        let mut probe = MockRequirementProbe::new();
        probe.expect_uploads_writable().return_const(true);
        probe
            .expect_session_autostart()
            .withf(|path| path.as_str() == "/srv/shop/system/config/default.toml")
            .return_const(true);
        let error = run(&probe, "script").expect_err("check should fail");
        assert!(error.to_string().contains("session_autostart enabled"));
    }

    #[rstest]
    fn unavailable_drivers_are_refused() {
        let error = run(&healthy_probe(), "mysqli").expect_err("check should fail");
        assert_eq!(
            error.to_string(),
            "FAILED! Pre-installation check failed: Warning: database driver 'mysqli' is not available!"
        );
    }

    #[rstest]
    fn the_first_failure_wins() {
        let mut probe = MockRequirementProbe::new();
        probe.expect_uploads_writable().return_const(false);
        probe.expect_session_autostart().never();
        probe.expect_schema_present().never();
        let error = run(&probe, "mysqli").expect_err("check should fail");
        assert!(error.to_string().contains("file uploads"));
    }

    #[rstest]
    fn system_probe_reads_session_autostart() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("default.toml")).expect("utf8");
        fs::write(&path, "session_autostart = true\n").expect("write");
        assert!(SystemProbe.session_autostart(&path));
        fs::write(&path, "session_autostart = false\n").expect("write");
        assert!(!SystemProbe.session_autostart(&path));
        assert!(!SystemProbe.session_autostart(&path.with_file_name("absent.toml")));
    }
}
