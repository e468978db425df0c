//! CLI entrypoint for the emporium installer.
//!
//! Installs telemetry on stderr and delegates to [`emporium_install::run`].

use std::io::{self, StderrLock, StdoutLock, Write};
use std::process::ExitCode;

use emporium_config::{LogFormat, Settings};

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    let settings = Settings {
        log_format: LogFormat::Compact,
        ..Settings::default()
    };
    if let Err(error) = emporium_framework::init_telemetry(&settings) {
        let _ = writeln!(stderr, "{error}");
    }
    emporium_install::run(std::env::args_os(), &mut stdout, &mut stderr)
}
