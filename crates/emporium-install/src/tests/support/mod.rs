//! Installation trees and argument builders shared by the installer suites.

use std::ffi::OsString;
use std::fs;
use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use crate::{DriverSet, RequirementProbe, SystemProbe, run_with};

/// Schema with one table, one insert, and the tables the installer writes to.
pub const SCHEMA: &str = "-- emporium\n\
DROP TABLE IF EXISTS `oc_user`;\n\
CREATE TABLE `oc_user` (`user_id` int(11) NOT NULL);\n\
DROP TABLE IF EXISTS `oc_api`;\n\
CREATE TABLE `oc_api` (`api_id` int(11) NOT NULL AUTO_INCREMENT, PRIMARY KEY (`api_id`));\n\
INSERT INTO `oc_setting` (`key`, `value`) VALUES ('config_name', 'Your Store');\n";

/// Flags that make an `install` invocation complete.
const REQUIRED: [(&str, &str); 5] = [
    ("--db_username", "root"),
    ("--db_password", "secret"),
    ("--password", "admin"),
    ("--email", "shop@example.com"),
    ("--http_server", "http://localhost/shop"),
];

/// Output captured from one installer run.
#[derive(Debug)]
pub struct RunOutput {
    pub exit: ExitCode,
    pub stdout: String,
    pub stderr: String,
}

/// A temporary installation root with a schema and default options.
pub struct InstallSite {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl InstallSite {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        let site = Self { _dir: dir, root };
        site.write("install/schema.sql", SCHEMA);
        site.write("system/config/default.toml", "session_autostart = false\n");
        site
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create site directory");
        }
        fs::write(&path, contents).expect("write site file");
    }

    pub fn read(&self, relative: &str) -> Option<String> {
        fs::read_to_string(self.root.join(relative)).ok()
    }

    /// `install` arguments with every required flag except `omit`; `extra`
    /// flags replace required ones of the same name.
    pub fn install_args(&self, omit: &[&str], extra: &[(&str, &str)]) -> Vec<OsString> {
        let mut args = vec![
            OsString::from("emporium-install"),
            OsString::from("install"),
            OsString::from("--root"),
            OsString::from(self.root.as_str()),
        ];
        let overridden = |flag: &str| extra.iter().any(|(given, _)| *given == flag);
        let required = REQUIRED.iter().filter(|(flag, _)| !overridden(flag));
        for (flag, value) in required.chain(extra) {
            if omit.contains(&flag.trim_start_matches('-')) {
                continue;
            }
            args.push(OsString::from(*flag));
            args.push(OsString::from(*value));
        }
        args
    }

    pub fn run(&self, args: Vec<OsString>) -> RunOutput {
        self.run_with_probe(args, &SystemProbe)
    }

    pub fn run_with_probe(&self, args: Vec<OsString>, probe: &dyn RequirementProbe) -> RunOutput {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = run_with(args, &mut stdout, &mut stderr, probe, DriverSet::builtin);
        RunOutput {
            exit,
            stdout: String::from_utf8(stdout).expect("utf8 stdout"),
            stderr: String::from_utf8(stderr).expect("utf8 stderr"),
        }
    }
}
