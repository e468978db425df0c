//! Generated site and admin configuration files.
//!
//! Both files are TOML tables of upper-case constants. The rest of the
//! application reads `HTTP_*`, `DIR_*` and `DB_*` from them, so the key
//! names and the site/admin split are fixed.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use emporium_config::{Application, SitePaths};
use toml::{Table, Value};
use tracing::info;

use crate::errors::InstallError;
use crate::options::InstallOptions;

/// Site configuration file below the installation root.
pub const SITE_CONFIG: &str = "config.toml";
/// Admin configuration file below the installation root.
pub const ADMIN_CONFIG: &str = "admin/config.toml";

/// Constants for the storefront.
#[must_use]
pub fn site_config(options: &InstallOptions, paths: &SitePaths) -> Table {
    let mut table = Table::new();
    insert(&mut table, "HTTP_SERVER", &options.http_server);
    insert(&mut table, "HTTP_ADMIN", &options.admin_url());
    insert(&mut table, "HTTPS_SERVER", &options.http_server);
    extend(&mut table, options, paths, Application::Catalog);
    table
}

/// Constants for the back office.
#[must_use]
pub fn admin_config(options: &InstallOptions, paths: &SitePaths) -> Table {
    let mut table = Table::new();
    insert(&mut table, "HTTP_SERVER", &options.admin_url());
    insert(&mut table, "HTTP_CATALOG", &options.http_server);
    insert(&mut table, "HTTPS_SERVER", &options.admin_url());
    insert(&mut table, "HTTPS_CATALOG", &options.http_server);
    extend(&mut table, options, paths, Application::Admin);
    table
}

/// Writes both files and returns their paths.
///
/// # Errors
///
/// Returns [`InstallError::WriteConfig`] when a file cannot be written.
pub fn write(options: &InstallOptions, paths: &SitePaths) -> Result<[Utf8PathBuf; 2], InstallError> {
    let site = paths.root().join(SITE_CONFIG);
    let admin = paths.root().join(ADMIN_CONFIG);
    write_table(&site, &site_config(options, paths))?;
    write_table(&admin, &admin_config(options, paths))?;
    info!(target: "emporium::install", site = %site, admin = %admin, "configuration written");
    Ok([site, admin])
}

fn extend(table: &mut Table, options: &InstallOptions, paths: &SitePaths, application: Application) {
    for (name, value) in paths.constants(application) {
        insert(table, name, &value);
    }
    let db = &options.db;
    insert(table, "DB_DRIVER", &db.driver);
    insert(table, "DB_HOSTNAME", &db.hostname);
    insert(table, "DB_USERNAME", &db.username);
    insert(table, "DB_PASSWORD", &db.password);
    insert(table, "DB_DATABASE", &db.database);
    insert(table, "DB_PREFIX", &options.db_prefix);
    table.insert(String::from("DB_PORT"), Value::Integer(i64::from(db.port)));
}

fn insert(table: &mut Table, key: &str, value: &str) {
    table.insert(key.to_owned(), Value::String(value.to_owned()));
}

fn write_table(path: &Utf8Path, table: &Table) -> Result<(), InstallError> {
    let write_error = |source| InstallError::WriteConfig {
        path: path.to_owned(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, table.to_string()).map_err(write_error)
}
