//! stagehand CLI
//!
//! Usage: stagehand <command> [args] [--stage=<name>] [--verbose]

use std::process::ExitCode;

fn main() -> ExitCode {
    let code = stagehand::presentation::run(std::env::args().skip(1));
    ExitCode::from(code as u8)
}
