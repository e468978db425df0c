//! Command-line definitions for the installer.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Installs an emporium storefront from the command line.
#[derive(Parser, Debug)]
#[command(name = "emporium-install", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Subcommand to run; prints usage when omitted.
    #[command(subcommand)]
    pub(crate) command: Option<CliCommand>,
}

/// Installer subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum CliCommand {
    /// Imports the schema and writes the configuration files.
    Install(Box<InstallArgs>),
    /// Prints an example invocation.
    Usage,
}

/// Flags accepted by `install`.
///
/// The long flags keep their underscore spelling. Required values are
/// optional here so that every missing one can be reported at once.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct InstallArgs {
    /// Database host.
    #[arg(long = "db_hostname", default_value = "localhost")]
    pub(crate) db_hostname: String,
    /// Database user.
    #[arg(long = "db_username")]
    pub(crate) db_username: Option<String>,
    /// Database password.
    #[arg(long = "db_password")]
    pub(crate) db_password: Option<String>,
    /// Database name.
    #[arg(long = "db_database", default_value = "emporium")]
    pub(crate) db_database: String,
    /// Prefix applied to every table name.
    #[arg(long = "db_prefix", default_value = "oc_")]
    pub(crate) db_prefix: String,
    /// Database driver.
    #[arg(long = "db_driver", default_value = "script")]
    pub(crate) db_driver: String,
    /// Database port.
    #[arg(long = "db_port", default_value = "3306")]
    pub(crate) db_port: String,
    /// Administrator login.
    #[arg(long = "username", default_value = "admin")]
    pub(crate) username: String,
    /// Administrator password.
    #[arg(long = "password")]
    pub(crate) password: Option<String>,
    /// Administrator and store e-mail address.
    #[arg(long = "email")]
    pub(crate) email: Option<String>,
    /// Public URL of the store.
    #[arg(long = "http_server")]
    pub(crate) http_server: Option<String>,
    /// Installation root.
    #[arg(long = "root", default_value = ".")]
    pub(crate) root: Utf8PathBuf,
    /// SQL schema; defaults to `<root>/install/schema.sql`.
    #[arg(long = "schema")]
    pub(crate) schema: Option<Utf8PathBuf>,
}
