//! SQL schema splitting and table-prefix rewriting.

use std::fs;

use camino::Utf8Path;

use crate::errors::InstallError;

/// Table prefix used by the shipped schema.
pub const SCHEMA_PREFIX: &str = "oc_";

/// Statement openers whose table name carries the prefix.
const PREFIXED_CLAUSES: [&str; 3] = ["DROP TABLE IF EXISTS `", "CREATE TABLE `", "INSERT INTO `"];

/// Reads `path` and splits it with [`statements`].
///
/// # Errors
///
/// Returns [`InstallError::Schema`] when the file cannot be read.
pub fn load(path: &Utf8Path, prefix: &str) -> Result<Vec<String>, InstallError> {
    let text = fs::read_to_string(path).map_err(|source| InstallError::Schema {
        path: path.to_owned(),
        source,
    })?;
    Ok(statements(&text, prefix))
}

/// Splits a schema dump into statements.
///
/// Lines starting with `--` or `#` are skipped. A statement ends at a line
/// whose last non-blank character is `;`. Trailing text without a
/// terminator is dropped.
#[must_use]
pub fn statements(text: &str, prefix: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    for line in text.split_inclusive('\n') {
        if line.trim().is_empty() || line.starts_with("--") || line.starts_with('#') {
            continue;
        }
        current.push_str(line);
        if line.trim_end().ends_with(';') {
            statements.push(apply_prefix(current.trim(), prefix));
            current.clear();
        }
    }
    statements
}

fn apply_prefix(statement: &str, prefix: &str) -> String {
    PREFIXED_CLAUSES
        .iter()
        .fold(statement.to_owned(), |sql, clause| {
            sql.replace(
                &format!("{clause}{SCHEMA_PREFIX}"),
                &format!("{clause}{prefix}"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "-- emporium schema\n\
        # generated\n\
        \n\
        DROP TABLE IF EXISTS `oc_user`;\n\
        CREATE TABLE `oc_user` (\n\
          `user_id` int(11) NOT NULL AUTO_INCREMENT,\n\
          PRIMARY KEY (`user_id`)\n\
        );\n\
        INSERT INTO `oc_setting` (`key`) VALUES ('oc_keep');\n\
        SELECT 1\n";

    #[test]
    fn splits_on_terminated_lines_and_skips_comments() {
        let statements = statements(DUMP, "shop_");
        assert_eq!(statements.len(), 3);
        assert_eq!(
            statements.first().map(String::as_str),
            Some("DROP TABLE IF EXISTS `shop_user`;")
        );
        assert!(statements.get(1).is_some_and(|sql| sql.starts_with("CREATE TABLE `shop_user` (")
            && sql.contains("PRIMARY KEY")));
    }

    #[test]
    fn only_table_names_are_rewritten() {
        let statements = statements(DUMP, "shop_");
        assert_eq!(
            statements.get(2).map(String::as_str),
            Some("INSERT INTO `shop_setting` (`key`) VALUES ('oc_keep');")
        );
    }

    #[test]
    fn default_prefix_leaves_statements_untouched() {
        let statements = statements("CREATE TABLE `oc_api` (id int);\n", SCHEMA_PREFIX);
        assert_eq!(statements, vec![String::from("CREATE TABLE `oc_api` (id int);")]);
    }
}
