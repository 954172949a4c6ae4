//! Wiring: turns a loaded project config and a stage into live components

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::stack::Stack;
use crate::application::stage::PROJECT_STATE_DIR;
use crate::config::{ConfigError, HomeProvider, ProjectConfig};
use crate::domain::ports::{Backend, ProvisioningEngine};
use crate::domain::value_objects::StageKey;
use crate::error::StagehandResult;
use crate::infrastructure::backend::LocalBackend;
use crate::infrastructure::engine::ProcessEngine;

/// Subdirectory of `.stagehand` where state blobs are pulled for editing
const WORK_DIR: &str = "work";

/// A project bound to one stage
pub struct Project {
    pub config: ProjectConfig,
    pub key: StageKey,
    pub backend: Arc<dyn Backend>,
    pub engine: Arc<dyn ProvisioningEngine>,
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("root", &self.config.root)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl Project {
    pub fn open(config: ProjectConfig, stage: &str) -> StagehandResult<Self> {
        let key = StageKey::new(config.app_name()?, stage)?;
        let backend = build_backend(&config)?;
        let engine = build_engine(&config);
        Ok(Self {
            config,
            key,
            backend,
            engine,
        })
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn work_dir(&self) -> PathBuf {
        self.config.root.join(PROJECT_STATE_DIR).join(WORK_DIR)
    }

    /// A fresh lifecycle for this project's stage
    pub fn stack(&self) -> Stack {
        Stack::new(
            self.key.clone(),
            self.backend.clone(),
            self.engine.clone(),
            self.work_dir(),
        )
        .with_stop_timeout(self.config.config.engine.stop_timeout())
    }
}

pub fn build_backend(config: &ProjectConfig) -> Result<Arc<dyn Backend>, ConfigError> {
    match config.config.home.provider {
        HomeProvider::Local => Ok(Arc::new(LocalBackend::new(config.home_root()?))),
    }
}

pub fn build_engine(config: &ProjectConfig) -> Arc<dyn ProvisioningEngine> {
    Arc::new(ProcessEngine::new(
        config.config.engine.command.clone(),
        config.root.clone(),
    ))
}
