//! Process entry: dispatch argv, run the handler, render the outcome

use std::io::{self, Write};

use tracing::{debug, error, warn};

use super::context::CommandContext;
use super::help::render_help;
use super::registry::Dispatch;
use super::tree;
use crate::application::cancel::CancelToken;
use crate::logging::{init_logging, LogSink};
use crate::ui::terminal::detect_capabilities;
use crate::ui::{format_error, UiContext};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Run one invocation and return the process exit code
pub fn run<I, S>(args: I) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let registry = match tree::registry() {
        Ok(registry) => registry,
        Err(err) => {
            eprintln!("invalid command tree: {}", err);
            return EXIT_FAILURE;
        }
    };

    let invocation = match registry.dispatch(args) {
        Dispatch::Help { path, .. } => {
            let color = detect_capabilities().supports_color;
            print!("{}", render_help(&registry, &path, color));
            let _ = io::stdout().flush();
            return EXIT_SUCCESS;
        }
        Dispatch::Run(invocation) => invocation,
    };

    let verbose = invocation.bool("verbose");
    let log = match LogSink::new() {
        Ok(log) => log,
        Err(err) => {
            eprintln!("failed to create log file: {}", err);
            return EXIT_FAILURE;
        }
    };
    if let Err(err) = init_logging(&log, verbose) {
        eprintln!("failed to initialize logging: {}", err);
    }

    let cancel = CancelToken::new();
    if let Err(err) = cancel.install_ctrlc() {
        warn!(error = %err, "Ctrl-C handler not installed");
    }

    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(err) => {
            eprintln!("cannot read the working directory: {}", err);
            return EXIT_FAILURE;
        }
    };

    let Some(handler) = registry.find(&invocation.path).and_then(|c| c.handler) else {
        return EXIT_FAILURE;
    };
    let ui = UiContext::detect(verbose);
    debug!(command = %invocation.command_name(), "dispatching");
    let mut ctx = CommandContext::new(invocation, cancel, log.clone(), cwd, ui);

    match handler(&mut ctx) {
        Ok(()) => EXIT_SUCCESS,
        Err(err) => {
            error!(command = %ctx.invocation.command_name(), error = ?err, "command failed");
            eprint!("{}", format_error(&err, &ui, Some(&log.path())));
            EXIT_FAILURE
        }
    }
}
