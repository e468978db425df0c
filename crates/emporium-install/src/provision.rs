//! Store records written after the schema import.

use emporium_framework::services::{Database, DatabaseError};
use rand::Rng;
use rand::distributions::{Alphanumeric, Distribution};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::options::InstallOptions;

/// Length of the administrator password salt.
pub const SALT_LENGTH: usize = 9;
/// Length of the `config_encryption` key.
pub const ENCRYPTION_KEY_LENGTH: usize = 1024;
/// Length of the default API key.
pub const API_KEY_LENGTH: usize = 256;

/// Random alphanumeric token of `length` characters.
pub fn token<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| char::from(Alphanumeric.sample(rng)))
        .collect()
}

/// Salted digest stored for the administrator:
/// `sha256(salt + sha256(salt + sha256(password)))`, hex encoded.
#[must_use]
pub fn password_digest(salt: &str, password: &str) -> String {
    let inner = hex_sha256(password);
    let middle = hex_sha256(&format!("{salt}{inner}"));
    hex_sha256(&format!("{salt}{middle}"))
}

fn hex_sha256(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Writes the administrator, store settings, and default API key.
///
/// # Errors
///
/// Returns the first [`DatabaseError`] the driver reports.
pub fn provision<R: Rng + ?Sized>(
    database: &mut dyn Database,
    options: &InstallOptions,
    rng: &mut R,
) -> Result<(), DatabaseError> {
    let prefix = &options.db_prefix;
    let salt = token(rng, SALT_LENGTH);
    let username = database.escape(&options.username);
    let email = database.escape(&options.email);
    let digest = database.escape(&password_digest(&salt, &options.password));
    let salt = database.escape(&salt);

    database.query("SET CHARACTER SET utf8")?;
    database.query("SET @@session.sql_mode = ''")?;
    database.query(&format!("DELETE FROM `{prefix}user` WHERE user_id = '1'"))?;
    database.query(&format!(
        "INSERT INTO `{prefix}user` SET user_id = '1', user_group_id = '1', \
         username = '{username}', salt = '{salt}', password = '{digest}', \
         firstname = 'John', lastname = 'Doe', email = '{email}', status = '1', \
         date_added = NOW()"
    ))?;

    replace_setting(database, prefix, "config_email", &email)?;
    let encryption = database.escape(&token(rng, ENCRYPTION_KEY_LENGTH));
    replace_setting(database, prefix, "config_encryption", &encryption)?;

    database.query(&format!("UPDATE `{prefix}product` SET `viewed` = '0'"))?;

    let api_key = database.escape(&token(rng, API_KEY_LENGTH));
    database.query(&format!(
        "INSERT INTO `{prefix}api` SET name = 'Default', `key` = '{api_key}', status = 1, \
         date_added = NOW(), date_modified = NOW()"
    ))?;
    let api_id = database.last_id();
    replace_setting(database, prefix, "config_api_id", &api_id.to_string())?;

    info!(target: "emporium::install", admin = %options.username, api_id, "store records written");
    Ok(())
}

/// Replaces one `config` setting; `value` must already be escaped.
fn replace_setting(
    database: &mut dyn Database,
    prefix: &str,
    key: &str,
    value: &str,
) -> Result<(), DatabaseError> {
    database.query(&format!("DELETE FROM `{prefix}setting` WHERE `key` = '{key}'"))?;
    database.query(&format!(
        "INSERT INTO `{prefix}setting` SET `code` = 'config', `key` = '{key}', value = '{value}'"
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use camino::Utf8PathBuf;
    use emporium_framework::services::{DbParams, QueryResult, escape_sql_literal};
    use mockall::mock;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::rstest;

    use super::*;

    mock! {
        Db {}
        impl Database for Db {
            fn query(&mut self, sql: &str) -> Result<QueryResult, DatabaseError>;
            fn escape(&self, value: &str) -> String;
            fn last_id(&self) -> u64;
        }
    }

    fn options() -> InstallOptions {
        InstallOptions {
            db: DbParams::default(),
            db_prefix: String::from("shop_"),
            username: String::from("admin"),
            password: String::from("hunter2"),
            email: String::from("o'brien@example.com"),
            http_server: String::from("http://localhost/shop/"),
            root: Utf8PathBuf::from("."),
            schema: None,
        }
    }

    fn recording_db(log: &Arc<Mutex<Vec<String>>>) -> MockDb {
        let mut database = MockDb::new();
        let sink = Arc::clone(log);
        database.expect_query().returning(move |sql| {
            sink.lock().expect("log mutex poisoned").push(sql.to_owned());
            Ok(QueryResult::default())
        });
        database.expect_escape().returning(escape_sql_literal);
        database.expect_last_id().return_const(7_u64);
        database
    }

    #[rstest]
    fn tokens_have_the_requested_length() {
        let mut rng = StdRng::seed_from_u64(3);
        let token = token(&mut rng, ENCRYPTION_KEY_LENGTH);
        assert_eq!(token.len(), ENCRYPTION_KEY_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[rstest]
    fn digests_are_lower_case_hex() {
        assert_eq!(
            hex_sha256("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[rstest]
    fn password_digests_depend_on_the_salt() {
        let first = password_digest("abcdefghi", "admin");
        assert_eq!(first.len(), 64);
        assert_eq!(first, password_digest("abcdefghi", "admin"));
        assert_ne!(first, password_digest("ihgfedcba", "admin"));
    }

    #[rstest]
    fn records_use_the_prefix_and_escaped_values() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut database = recording_db(&log);
        let mut rng = StdRng::seed_from_u64(11);
        provision(&mut database, &options(), &mut rng).expect("provision");

        let statements = log.lock().expect("log mutex poisoned").clone();
        assert!(statements.iter().all(|sql| !sql.contains("`oc_")));
        assert!(statements
            .iter()
            .any(|sql| sql.contains("`shop_user`") && sql.contains("email = 'o\\'brien@example.com'")));
        assert_eq!(
            statements.last().map(String::as_str),
            Some("INSERT INTO `shop_setting` SET `code` = 'config', `key` = 'config_api_id', value = '7'")
        );
    }

    #[rstest]
    fn driver_failures_stop_provisioning() {
        let mut database = MockDb::new();
        database.expect_escape().returning(escape_sql_literal);
        database
            .expect_query()
            .times(1)
            .returning(|sql| Err(DatabaseError::query("server has gone away", sql)));
        let mut rng = StdRng::seed_from_u64(5);
        let error = provision(&mut database, &options(), &mut rng).expect_err("should fail");
        assert!(error.to_string().contains("server has gone away"));
    }
}
