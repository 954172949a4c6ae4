//! Provisioning engine run as a child process
//!
//! The configured command is invoked with the stack command appended
//! (`<program> <args...> up`). It reports progress as one JSON
//! `EngineMessage` per line on stdout; anything else it prints is relayed as
//! an informational diagnostic. Stderr goes to the log.

use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Sender};
use tracing::{debug, warn};

use crate::domain::entities::DiagnosticLevel;
use crate::domain::ports::{
    EngineControl, EngineError, EngineMessage, EngineRequest, EngineRun, ProvisioningEngine,
};

pub const APP_ENV: &str = "STAGEHAND_APP";
pub const STAGE_ENV: &str = "STAGEHAND_STAGE";
pub const COMMAND_ENV: &str = "STAGEHAND_COMMAND";

/// How often the waiter checks for engine exit. The child mutex is only
/// held for each check, so `stop()` never waits on a running engine.
const EXIT_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct ProcessEngine {
    program: Vec<String>,
    work_dir: PathBuf,
}

impl ProcessEngine {
    pub fn new(program: Vec<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program,
            work_dir: work_dir.into(),
        }
    }
}

impl ProvisioningEngine for ProcessEngine {
    fn start(&self, request: &EngineRequest) -> Result<EngineRun, EngineError> {
        let (program, args) = self.program.split_first().ok_or(EngineError::NotConfigured)?;

        let mut child = Command::new(program)
            .args(args)
            .arg(request.command.as_str())
            .current_dir(&self.work_dir)
            .env(APP_ENV, request.key.app())
            .env(STAGE_ENV, request.key.stage())
            .env(COMMAND_ENV, request.command.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: program.clone(),
                source,
            })?;
        debug!(pid = child.id(), %program, command = %request.command, "engine started");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let child = Arc::new(Mutex::new(child));
        let (tx, rx) = unbounded();

        if let Some(stderr) = stderr {
            thread::spawn(move || log_stderr(stderr));
        }
        let waiter = child.clone();
        thread::spawn(move || {
            let reported = stdout.map(|out| relay_stdout(out, &tx)).unwrap_or(false);
            match wait_for_exit(&waiter) {
                Ok(status) if !status.success() && !reported => {
                    let _ = tx.send(EngineMessage::Error {
                        message: format!("engine exited with {}", status),
                    });
                }
                Ok(status) => debug!(%status, "engine exited"),
                Err(err) => warn!(error = %err, "failed to wait for engine"),
            }
        });

        Ok(EngineRun {
            messages: rx,
            control: Box::new(ProcessControl { child }),
        })
    }
}

/// Forward stdout lines; returns whether a terminal message was seen
fn relay_stdout(stdout: ChildStdout, tx: &Sender<EngineMessage>) -> bool {
    let mut reported = false;
    for line in BufReader::new(stdout).lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "engine stdout read failed");
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let message = match serde_json::from_str::<EngineMessage>(trimmed) {
            Ok(message) => message,
            Err(_) => EngineMessage::Diagnostic {
                level: DiagnosticLevel::Info,
                message: trimmed.to_string(),
            },
        };
        if matches!(
            message,
            EngineMessage::Finished { .. } | EngineMessage::Error { .. }
        ) {
            reported = true;
        }
        if tx.send(message).is_err() {
            break;
        }
    }
    reported
}

fn wait_for_exit(child: &Mutex<Child>) -> io::Result<ExitStatus> {
    loop {
        let status = child.lock().unwrap_or_else(|e| e.into_inner()).try_wait()?;
        if let Some(status) = status {
            return Ok(status);
        }
        thread::sleep(EXIT_POLL);
    }
}

fn log_stderr(stderr: ChildStderr) {
    for line in BufReader::new(stderr).lines().map_while(Result::ok) {
        debug!(target: "stagehand::engine", "{}", line);
    }
}

struct ProcessControl {
    child: Arc<Mutex<Child>>,
}

impl EngineControl for ProcessControl {
    fn stop(&mut self) -> Result<(), EngineError> {
        let mut child = self.child.lock().unwrap_or_else(|e| e.into_inner());
        match child.kill() {
            Ok(()) => Ok(()),
            // Already exited
            Err(err) if err.kind() == io::ErrorKind::InvalidInput => Ok(()),
            Err(err) => Err(EngineError::Stop(err)),
        }
    }
}
