//! Configurator - headless product switching driver
//!
//! Loads the product catalog, issues the selections given on the command
//! line, runs a few frames and prints the resulting state.

use std::process::ExitCode;

fn main() -> ExitCode {
    configurator::app::run()
}
