//! Test suites for the framework crate.

mod bootstrap_behaviour;
mod support;
