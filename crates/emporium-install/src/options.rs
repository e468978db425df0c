//! Validated installer options.

use camino::Utf8PathBuf;
use emporium_config::with_trailing_slash;
use emporium_framework::services::DbParams;

use crate::cli::InstallArgs;
use crate::errors::InstallError;

/// Options every later install step works from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Connection parameters for the schema import.
    pub db: DbParams,
    /// Table prefix replacing `oc_`.
    pub db_prefix: String,
    /// Administrator login.
    pub username: String,
    /// Administrator password.
    pub password: String,
    /// Administrator and store e-mail address.
    pub email: String,
    /// Store URL, always ending in `/`.
    pub http_server: String,
    /// Installation root as given.
    pub root: Utf8PathBuf,
    /// Schema file, when given explicitly.
    pub schema: Option<Utf8PathBuf>,
}

impl InstallOptions {
    /// Admin URL below the store URL.
    #[must_use]
    pub fn admin_url(&self) -> String {
        format!("{}admin/", self.http_server)
    }
}

impl TryFrom<InstallArgs> for InstallOptions {
    type Error = InstallError;

    /// Checks the required options in their documented order and lists every
    /// one that is missing, empty, or malformed.
    fn try_from(args: InstallArgs) -> Result<Self, Self::Error> {
        let mut missing = Vec::new();
        let mut require = |name: &'static str, value: Option<String>| {
            let present = value.filter(|text| !text.trim().is_empty());
            if present.is_none() {
                missing.push(name);
            }
            present.unwrap_or_default()
        };

        let hostname = require("db_hostname", Some(args.db_hostname));
        let username = require("db_username", args.db_username);
        let password = require("db_password", args.db_password);
        let database = require("db_database", Some(args.db_database));
        let db_prefix = require("db_prefix", Some(args.db_prefix));
        let port = require(
            "db_port",
            Some(args.db_port).filter(|port| port.trim().parse::<u16>().is_ok()),
        );
        let admin = require("username", Some(args.username));
        let admin_password = require("password", args.password);
        let email = require("email", args.email);
        let http_server = require("http_server", args.http_server);

        if !missing.is_empty() {
            return Err(InstallError::MissingOptions { names: missing });
        }

        Ok(Self {
            db: DbParams {
                driver: args.db_driver,
                hostname,
                username,
                password,
                database,
                port: port.trim().parse().unwrap_or_default(),
            },
            db_prefix,
            username: admin,
            password: admin_password,
            email,
            http_server: with_trailing_slash(&http_server),
            root: args.root,
            schema: args.schema,
        })
    }
}
