//! Test environment builder for isolated stagehand testing.
//!
//! Provides `TestEnv` - a project directory with its own `stagehand.toml`,
//! a separate home directory holding the local provider's data, plus helpers
//! to run the stagehand binary against them.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use stagehand::domain::ports::Backend;
use stagehand::infrastructure::backend::LocalBackend;
use stagehand::StageKey;

use super::fixtures::{APP, STAGE};

/// Result of running a stagehand CLI command
#[derive(Debug)]
pub struct TestResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestResult {
    /// Combine stdout and stderr
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Isolated test environment with temp directories.
pub struct TestEnv {
    /// Project directory containing `stagehand.toml`
    pub project_root: TempDir,
    /// Stands in for `~`; the local provider lives under `store/`
    pub home_dir: TempDir,
    bin: PathBuf,
}

impl TestEnv {
    pub fn builder() -> TestEnvBuilder {
        TestEnvBuilder::new()
    }

    /// Project with the default config and the personal stage already chosen
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn project_path(&self, relative: &str) -> PathBuf {
        self.project_root.path().join(relative)
    }

    /// Root of the local home provider
    pub fn store_root(&self) -> PathBuf {
        self.home_dir.path().join("store")
    }

    pub fn backend(&self) -> LocalBackend {
        LocalBackend::new(self.store_root())
    }

    pub fn key(&self) -> StageKey {
        self.key_for(STAGE)
    }

    pub fn key_for(&self, stage: &str) -> StageKey {
        StageKey::new(APP, stage).unwrap()
    }

    pub fn write_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.project_path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn current_lock_holder(&self) -> Option<String> {
        self.backend()
            .current_lock(&self.key())
            .unwrap()
            .map(|record| record.holder.to_string())
    }

    /// Run stagehand from the project root
    pub fn run(&self, args: &[&str]) -> TestResult {
        self.run_with_env(args, &[])
    }

    pub fn run_with_env(&self, args: &[&str], env_vars: &[(&str, &str)]) -> TestResult {
        self.run_from_with_env(self.project_root.path(), args, env_vars)
    }

    pub fn run_from_with_env(
        &self,
        cwd: &Path,
        args: &[&str],
        env_vars: &[(&str, &str)],
    ) -> TestResult {
        let output = self
            .command(cwd, args, env_vars)
            .output()
            .expect("failed to run stagehand");
        TestResult {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    /// Start stagehand from the project root without waiting for it
    pub fn spawn(&self, args: &[&str]) -> Child {
        self.command(self.project_root.path(), args, &[])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to start stagehand")
    }

    fn command(&self, cwd: &Path, args: &[&str], env_vars: &[(&str, &str)]) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .env("STAGEHAND_TEST_HOME", self.home_dir.path())
            .env("NO_COLOR", "1")
            .env("TERM", "dumb")
            .env_remove("STAGEHAND_HOME")
            .env_remove("STAGEHAND_ENGINE")
            .env_remove("STAGEHAND_LOG")
            .env_remove("EDITOR");
        for (key, value) in env_vars {
            cmd.env(key, value);
        }
        cmd
    }
}

/// Wait for `condition`, polling every 20ms
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    condition()
}

/// Output of a spawned stagehand once it exits
pub fn finish(child: Child) -> TestResult {
    let output = child.wait_with_output().expect("failed to wait for stagehand");
    TestResult {
        success: output.status.success(),
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

/// Builder for `TestEnv`
pub struct TestEnvBuilder {
    engine_script: Option<String>,
    stage: Option<String>,
    extra_config: String,
}

impl TestEnvBuilder {
    pub fn new() -> Self {
        Self {
            engine_script: None,
            stage: Some(STAGE.to_string()),
            extra_config: String::new(),
        }
    }

    /// Install `script` as `engine.sh` and point `[engine] command` at it
    pub fn with_engine_script(mut self, script: &str) -> Self {
        self.engine_script = Some(script.to_string());
        self
    }

    /// Leave the personal stage unresolved
    pub fn without_stage(mut self) -> Self {
        self.stage = None;
        self
    }

    /// Append raw TOML to `stagehand.toml`
    pub fn with_config(mut self, toml: &str) -> Self {
        self.extra_config.push_str(toml);
        self
    }

    pub fn build(self) -> TestEnv {
        let project_root = TempDir::new().unwrap();
        let home_dir = TempDir::new().unwrap();
        let store = home_dir.path().join("store");

        let mut config = format!(
            "[app]\nname = \"{}\"\n\n[home]\npath = '{}'\n",
            APP,
            store.display()
        );
        if let Some(script) = &self.engine_script {
            fs::write(project_root.path().join("engine.sh"), script).unwrap();
            config.push_str("\n[engine]\ncommand = [\"sh\", \"engine.sh\"]\nstop_timeout_ms = 2000\n");
        }
        config.push_str(&self.extra_config);
        fs::write(project_root.path().join("stagehand.toml"), config).unwrap();

        if let Some(stage) = &self.stage {
            let dir = project_root.path().join(".stagehand");
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("stage"), format!("{}\n", stage)).unwrap();
        }

        TestEnv {
            project_root,
            home_dir,
            bin: PathBuf::from(env!("CARGO_BIN_EXE_stagehand")),
        }
    }
}

impl Default for TestEnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}
