//! Unit tests for the installer runtime.

use std::ffi::OsString;
use std::process::ExitCode;

use rstest::{fixture, rstest};

use crate::requirements::MockRequirementProbe;
use crate::{ADMIN_CONFIG, SCRIPT_FILE, SITE_CONFIG};

use super::support::InstallSite;

#[fixture]
fn site() -> InstallSite {
    InstallSite::new()
}

#[rstest]
#[case::bare(vec!["emporium-install"])]
#[case::usage(vec!["emporium-install", "usage"])]
fn usage_is_printed(site: InstallSite, #[case] args: Vec<&str>) {
    let output = site.run(args.into_iter().map(OsString::from).collect());
    assert_eq!(output.exit, ExitCode::SUCCESS);
    assert!(output.stdout.starts_with("Usage:\n======\n"));
    assert!(output.stdout.contains("emporium-install install --db_hostname localhost"));
}

#[rstest]
fn unknown_flags_are_usage_errors(site: InstallSite) {
    let mut args = site.install_args(&[], &[]);
    args.push(OsString::from("--db_colour"));
    args.push(OsString::from("blue"));
    let output = site.run(args);
    assert_eq!(output.exit, ExitCode::from(2));
    assert!(output.stderr.contains("--db_colour"));
}

#[rstest]
fn every_missing_option_is_listed_in_order(site: InstallSite) {
    let output = site.run(site.install_args(&["db_password", "email", "http_server"], &[]));
    assert_eq!(output.exit, ExitCode::FAILURE);
    assert_eq!(
        output.stderr,
        "FAILED! Following inputs were missing or invalid: db_password, email, http_server\n\n"
    );
    assert!(site.read(SITE_CONFIG).is_none());
}

#[rstest]
#[case::empty_prefix("--db_prefix", "")]
#[case::port_out_of_range("--db_port", "70000")]
#[case::port_not_a_number("--db_port", "mysql")]
fn invalid_defaults_are_reported(site: InstallSite, #[case] flag: &str, #[case] value: &str) {
    let output = site.run(site.install_args(&[], &[(flag, value)]));
    assert_eq!(output.exit, ExitCode::FAILURE);
    assert!(
        output.stderr.ends_with(&format!("missing or invalid: {}\n\n", flag.trim_start_matches('-'))),
        "stderr: {}",
        output.stderr
    );
}

#[rstest]
fn failed_checks_write_nothing(site: InstallSite) {
    let mut probe = MockRequirementProbe::new();
    probe.expect_uploads_writable().return_const(false);
    let output = site.run_with_probe(site.install_args(&[], &[]), &probe);
    assert_eq!(output.exit, ExitCode::FAILURE);
    assert!(output.stderr.starts_with("FAILED! Pre-installation check failed: "));
    assert!(site.read(SITE_CONFIG).is_none());
    assert!(site.read(&format!("system/storage/{SCRIPT_FILE}")).is_none());
}

#[rstest]
fn session_autostart_in_default_options_blocks_install(site: InstallSite) {
    site.write("system/config/default.toml", "session_autostart = true\n");
    let output = site.run(site.install_args(&[], &[]));
    assert_eq!(output.exit, ExitCode::FAILURE);
    assert!(output.stderr.contains("session_autostart enabled"));
}

#[rstest]
fn missing_schema_blocks_install(site: InstallSite) {
    let output = site.run(site.install_args(&[], &[("--schema", "/nonexistent/schema.sql")]));
    assert_eq!(output.exit, ExitCode::FAILURE);
    assert!(output.stderr.contains("could not load sql file /nonexistent/schema.sql"));
}

#[rstest]
fn successful_install_writes_script_and_configs(site: InstallSite) {
    let output = site.run(site.install_args(&[], &[("--db_prefix", "shop_")]));
    assert_eq!(output.exit, ExitCode::SUCCESS, "stderr: {}", output.stderr);
    assert_eq!(
        output.stdout,
        "SUCCESS! Emporium successfully installed on your server\n\
         Store link: http://localhost/shop/\n\
         Admin link: http://localhost/shop/admin/\n\n"
    );

    let script = site
        .read(&format!("system/storage/{SCRIPT_FILE}"))
        .expect("script written");
    assert!(script.starts_with("DROP TABLE IF EXISTS `shop_user`;\n"));
    assert!(!script.contains("`oc_"));
    assert!(script.contains("`key` = 'config_api_id', value = '1';"));

    let site_config: toml::Table = site
        .read(SITE_CONFIG)
        .expect("site config")
        .parse()
        .expect("parse site config");
    assert_eq!(
        site_config.get("HTTP_SERVER").and_then(toml::Value::as_str),
        Some("http://localhost/shop/")
    );
    assert_eq!(
        site_config.get("DB_PREFIX").and_then(toml::Value::as_str),
        Some("shop_")
    );
    assert!(site.read(ADMIN_CONFIG).is_some_and(|text| text.contains("HTTP_CATALOG")));
}
