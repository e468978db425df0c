//! Test suites for the installer runtime.

mod support;
mod unit;
