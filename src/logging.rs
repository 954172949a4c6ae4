//! Log sink and subscriber setup
//!
//! Logging starts before the project directory is known, so the sink begins
//! life as a temp file. Once a command has found its project, the sink is
//! relocated exactly once into `.stagehand/stagehand.log`; everything logged
//! so far is copied over and later lines are appended there.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use is_terminal::IsTerminal;
use tempfile::NamedTempFile;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::application::stage::PROJECT_STATE_DIR;

/// Filter directives, e.g. `STAGEHAND_LOG=stagehand=debug`
pub const LOG_ENV: &str = "STAGEHAND_LOG";
pub const LOG_FILE: &str = "stagehand.log";

enum Target {
    Temp(NamedTempFile),
    Project { file: File, path: PathBuf },
}

/// Shared handle to the current log destination
#[derive(Clone)]
pub struct LogSink {
    target: Arc<Mutex<Target>>,
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink").field("path", &self.path()).finish()
    }
}

impl LogSink {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            target: Arc::new(Mutex::new(Target::Temp(NamedTempFile::new()?))),
        })
    }

    pub fn path(&self) -> PathBuf {
        match &*self.lock() {
            Target::Temp(tmp) => tmp.path().to_path_buf(),
            Target::Project { path, .. } => path.clone(),
        }
    }

    pub fn is_relocated(&self) -> bool {
        matches!(&*self.lock(), Target::Project { .. })
    }

    /// Move the log into `<project>/.stagehand/stagehand.log`.
    ///
    /// Returns `false` if the sink was already relocated; the first project
    /// wins.
    pub fn relocate(&self, project_dir: &Path) -> io::Result<bool> {
        let mut target = self.lock();
        let Target::Temp(tmp) = &*target else {
            return Ok(false);
        };

        let dir = project_dir.join(PROJECT_STATE_DIR);
        fs::create_dir_all(&dir)?;
        let path = dir.join(LOG_FILE);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut earlier = tmp.reopen()?;
        io::copy(&mut earlier, &mut file)?;
        file.flush()?;

        *target = Target::Project { file, path };
        Ok(true)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Target> {
        self.target.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Writer handed to `tracing-subscriber` per event
pub struct SinkWriter {
    target: Arc<Mutex<Target>>,
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut target = self.target.lock().unwrap_or_else(|e| e.into_inner());
        match &mut *target {
            Target::Temp(tmp) => tmp.as_file_mut().write(buf),
            Target::Project { file, .. } => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut target = self.target.lock().unwrap_or_else(|e| e.into_inner());
        match &mut *target {
            Target::Temp(tmp) => tmp.as_file_mut().flush(),
            Target::Project { file, .. } => file.flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter {
            target: self.target.clone(),
        }
    }
}

/// Install the global subscriber: the sink always, stderr with `verbose`
pub fn init_logging(sink: &LogSink, verbose: bool) -> Result<(), TryInitError> {
    let default = if verbose {
        "stagehand=debug"
    } else {
        "stagehand=info"
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    let file_layer = fmt::layer()
        .with_writer(sink.clone())
        .with_ansi(false)
        .with_target(true);

    let stderr_layer = verbose.then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_target(false)
            .without_time()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
}
