//! Command-line installer for an emporium storefront.
//!
//! `install` validates its options, runs the pre-installation checks,
//! imports the SQL schema through a database driver, writes the
//! administrator and store records, generates the site and admin
//! configuration files, and opens up the storage directories. Nothing is
//! written until the checks pass. `usage` prints an example invocation.
//!
//! The runtime takes its IO streams, requirement probe, and drivers as
//! parameters so tests can substitute each of them.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use clap::error::ErrorKind;
use emporium_config::SitePaths;
use tracing::info;

mod cli;
mod config_writer;
mod database;
mod errors;
mod options;
mod permissions;
mod provision;
mod requirements;
mod schema;

use cli::{Cli, CliCommand};

pub use config_writer::{ADMIN_CONFIG, SITE_CONFIG, admin_config, site_config};
pub use database::{DriverSet, SCRIPT_DRIVER, SCRIPT_FILE, ScriptDatabase};
pub use errors::InstallError;
pub use options::InstallOptions;
pub use provision::{password_digest, provision, token};
pub use requirements::{RequirementProbe, SystemProbe, default_schema};
pub use schema::{SCHEMA_PREFIX, statements};

/// Example invocation printed by `usage`.
const USAGE: &str = "Usage:\n\
======\n\
\n\
emporium-install install --db_hostname localhost --db_username root --db_password pass \
--db_database emporium --db_driver script --db_port 3306 --username admin --password admin \
--email youremail@example.com --http_server http://localhost/emporium\n";

/// Runs the installer against the real filesystem.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with(args, stdout, stderr, &SystemProbe, DriverSet::builtin)
}

/// Runs the installer with a custom probe and driver set.
///
/// `drivers` receives the resolved installation layout.
pub fn run_with<I, W, E, D>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    probe: &dyn RequirementProbe,
    drivers: D,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    D: FnOnce(&SitePaths) -> DriverSet,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error)
            if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
        {
            let _ = write!(stdout, "{error}");
            return ExitCode::SUCCESS;
        }
        Err(error) => return report(stderr, &InstallError::CliUsage(error)),
    };

    let Some(CliCommand::Install(args)) = cli.command else {
        return match writeln!(stdout, "{USAGE}") {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        };
    };

    let result = InstallOptions::try_from(*args)
        .and_then(|options| install(&options, probe, drivers).map(|()| options));
    match result {
        Ok(options) => {
            let _ = writeln!(stdout, "SUCCESS! Emporium successfully installed on your server");
            let _ = writeln!(stdout, "Store link: {}", options.http_server);
            let _ = writeln!(stdout, "Admin link: {}\n", options.admin_url());
            ExitCode::SUCCESS
        }
        Err(error) => report(stderr, &error),
    }
}

fn install<D>(options: &InstallOptions, probe: &dyn RequirementProbe, drivers: D) -> Result<(), InstallError>
where
    D: FnOnce(&SitePaths) -> DriverSet,
{
    let paths = SitePaths::new(options.root.clone()).canonicalize()?;
    let schema: Utf8PathBuf = options
        .schema
        .clone()
        .unwrap_or_else(|| default_schema(&paths));
    let drivers = drivers(&paths);
    requirements::check(probe, options, &paths, &drivers, &schema)?;

    let statements = schema::load(&schema, &options.db_prefix)?;
    let mut database = drivers.connect(&options.db)?;
    for statement in &statements {
        database.query(statement)?;
    }
    info!(
        target: "emporium::install",
        statements = statements.len(),
        driver = %options.db.driver,
        "schema imported"
    );
    provision(database.as_mut(), options, &mut rand::thread_rng())?;

    config_writer::write(options, &paths)?;
    permissions::grant_world_write(&paths.writable_dirs())?;
    Ok(())
}

fn report<E: Write>(stderr: &mut E, error: &InstallError) -> ExitCode {
    let _ = writeln!(stderr, "{error}\n");
    ExitCode::from(error.exit_status())
}

#[cfg(test)]
mod tests;
