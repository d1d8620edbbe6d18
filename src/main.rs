//! Binary entrypoint for the Scientia server.

use std::process::ExitCode;

use scientia::start_scientia;

fn main() -> ExitCode {
    start_scientia::run()
}
