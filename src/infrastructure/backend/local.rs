//! Local home provider
//!
//! Keeps each stage in its own directory:
//!
//! ```text
//! <root>/<app>/<stage>/
//!   lock.json        present only while a holder owns the stage
//!   secrets.json
//!   links.json
//!   state.json
//!   state.meta.json  version counter bumped on every state write
//!   .guard           fs2 lock serializing read-modify-write cycles
//! ```
//!
//! Lock creation is a single no-clobber rename, so two processes racing for
//! the same stage cannot both succeed.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::entities::{validate_state_blob, ImportSpec, LockRecord, EMPTY_STATE};
use crate::domain::ports::{Backend, BackendError, BackendResult, LinkMap, SecretMap};
use crate::domain::value_objects::{HolderId, StageKey};
use crate::infrastructure::fs::{create_exclusive, write_atomic};

const LOCK_FILE: &str = "lock.json";
const SECRETS_FILE: &str = "secrets.json";
const LINKS_FILE: &str = "links.json";
const STATE_FILE: &str = "state.json";
const STATE_META_FILE: &str = "state.meta.json";
const GUARD_FILE: &str = ".guard";

/// Lock acquisition retries when the holder releases between our failed
/// create and the read of its record
const ACQUIRE_ATTEMPTS: usize = 3;

/// Bookkeeping written next to the state blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMeta {
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stage_dir(&self, key: &StageKey) -> PathBuf {
        self.root.join(key.app()).join(key.stage())
    }

    /// Version metadata for the stage's state, if it has ever been written
    pub fn state_meta(&self, key: &StageKey) -> BackendResult<Option<StateMeta>> {
        read_json(&self.stage_dir(key).join(STATE_META_FILE))
    }

    /// Replace the linked-resource descriptors for a stage
    pub fn put_links(&self, key: &StageKey, links: &LinkMap) -> BackendResult<()> {
        let dir = self.stage_dir(key);
        let _guard = Guard::acquire(&dir)?;
        write_json(&dir.join(LINKS_FILE), links, "write links")
    }

    fn read_lock(&self, key: &StageKey) -> BackendResult<Option<LockRecord>> {
        read_json(&self.stage_dir(key).join(LOCK_FILE))
    }

    fn read_state(&self, dir: &Path) -> BackendResult<Vec<u8>> {
        match fs::read(dir.join(STATE_FILE)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(EMPTY_STATE.as_bytes().to_vec()),
            Err(e) => Err(BackendError::io("read state")(e)),
        }
    }

    /// Write the blob and bump its version. Caller holds the guard.
    fn write_state(&self, dir: &Path, bytes: &[u8]) -> BackendResult<()> {
        write_atomic(&dir.join(STATE_FILE), bytes).map_err(BackendError::io("write state"))?;
        let meta_path = dir.join(STATE_META_FILE);
        let version = read_json::<StateMeta>(&meta_path)?
            .map(|m| m.version)
            .unwrap_or(0);
        let meta = StateMeta {
            version: version + 1,
            updated_at: Utc::now(),
        };
        write_json(&meta_path, &meta, "write state meta")
    }
}

impl Backend for LocalBackend {
    fn get_secrets(&self, key: &StageKey) -> BackendResult<SecretMap> {
        Ok(read_json(&self.stage_dir(key).join(SECRETS_FILE))?.unwrap_or_default())
    }

    fn put_secrets(&self, key: &StageKey, secrets: &SecretMap) -> BackendResult<()> {
        let dir = self.stage_dir(key);
        let _guard = Guard::acquire(&dir)?;
        write_json(&dir.join(SECRETS_FILE), secrets, "write secrets")
    }

    fn update_secrets(
        &self,
        key: &StageKey,
        update: &mut dyn FnMut(&mut SecretMap) -> bool,
    ) -> BackendResult<bool> {
        let dir = self.stage_dir(key);
        let _guard = Guard::acquire(&dir)?;
        let path = dir.join(SECRETS_FILE);
        let mut secrets: SecretMap = read_json(&path)?.unwrap_or_default();
        if !update(&mut secrets) {
            return Ok(false);
        }
        write_json(&path, &secrets, "write secrets")?;
        Ok(true)
    }

    fn get_links(&self, key: &StageKey) -> BackendResult<LinkMap> {
        Ok(read_json(&self.stage_dir(key).join(LINKS_FILE))?.unwrap_or_default())
    }

    fn acquire_lock(&self, key: &StageKey, holder: &HolderId) -> BackendResult<LockRecord> {
        let path = self.stage_dir(key).join(LOCK_FILE);
        for _ in 0..ACQUIRE_ATTEMPTS {
            let record = LockRecord::new(key.clone(), holder.clone());
            let body = to_json(&record, "encode lock")?;
            if create_exclusive(&path, &body).map_err(BackendError::io("create lock"))? {
                debug!(key = %key, path = %path.display(), "lock file created");
                return Ok(record);
            }
            match self.read_lock(key)? {
                Some(current) if current.is_held_by(holder) => return Ok(current),
                Some(current) => {
                    return Err(BackendError::AlreadyLocked {
                        current: Box::new(current),
                    })
                }
                None => continue,
            }
        }
        Err(BackendError::Io {
            op: "create lock",
            source: io::Error::other("lock file kept changing while acquiring"),
        })
    }

    fn release_lock(&self, key: &StageKey, holder: &HolderId) -> BackendResult<()> {
        let dir = self.stage_dir(key);
        let _guard = Guard::acquire(&dir)?;
        match self.read_lock(key)? {
            Some(current) if current.is_held_by(holder) => {
                fs::remove_file(dir.join(LOCK_FILE)).map_err(BackendError::io("remove lock"))
            }
            current => Err(BackendError::NotHolder {
                key: key.clone(),
                holder: holder.clone(),
                current: current.map(|r| r.holder),
            }),
        }
    }

    fn force_unlock(&self, key: &StageKey) -> BackendResult<Option<LockRecord>> {
        let dir = self.stage_dir(key);
        let _guard = Guard::acquire(&dir)?;
        let path = dir.join(LOCK_FILE);
        // A corrupted record is still a lock worth clearing.
        let current = self.read_lock(key).ok().flatten();
        match fs::remove_file(&path) {
            Ok(()) => Ok(current),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BackendError::io("remove lock")(e)),
        }
    }

    fn current_lock(&self, key: &StageKey) -> BackendResult<Option<LockRecord>> {
        self.read_lock(key)
    }

    fn pull_state(&self, key: &StageKey, dir: &Path) -> BackendResult<PathBuf> {
        let bytes = self.read_state(&self.stage_dir(key))?;
        let target = dir.join(format!("{}.{}.state.json", key.app(), key.stage()));
        write_atomic(&target, &bytes).map_err(BackendError::io("materialize state"))?;
        Ok(target)
    }

    fn push_state(&self, key: &StageKey, path: &Path) -> BackendResult<()> {
        let bytes = fs::read(path).map_err(BackendError::io("read pulled state"))?;
        validate_state_blob(&bytes).map_err(|reason| BackendError::InvalidState {
            path: path.to_path_buf(),
            reason,
        })?;
        let dir = self.stage_dir(key);
        let _guard = Guard::acquire(&dir)?;
        self.write_state(&dir, &bytes)
    }

    fn import_resource(&self, key: &StageKey, spec: &ImportSpec) -> BackendResult<()> {
        let dir = self.stage_dir(key);
        let _guard = Guard::acquire(&dir)?;
        let state_path = dir.join(STATE_FILE);
        let bytes = self.read_state(&dir)?;

        let invalid = |reason: String| BackendError::InvalidState {
            path: state_path.clone(),
            reason,
        };
        let mut state: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| invalid(e.to_string()))?;
        let resources = state
            .as_object_mut()
            .ok_or_else(|| invalid("state is not a JSON object".to_string()))?
            .entry("resources")
            .or_insert_with(|| serde_json::Value::Array(Vec::new()))
            .as_array_mut()
            .ok_or_else(|| invalid("`resources` is not an array".to_string()))?;

        let exists = resources.iter().any(|r| {
            r.get("type").and_then(|v| v.as_str()) == Some(spec.resource_type.as_str())
                && r.get("name").and_then(|v| v.as_str()) == Some(spec.name.as_str())
        });
        if exists {
            return Err(invalid(format!(
                "resource {} '{}' is already tracked",
                spec.resource_type, spec.name
            )));
        }

        let mut entry = serde_json::to_value(spec).map_err(|e| invalid(e.to_string()))?;
        if let Some(obj) = entry.as_object_mut() {
            obj.insert("imported".to_string(), serde_json::Value::Bool(true));
        }
        resources.push(entry);

        let body = serde_json::to_vec_pretty(&state).map_err(|e| invalid(e.to_string()))?;
        self.write_state(&dir, &body)
    }
}

/// Exclusive fs2 lock on the stage's guard file, released on drop
struct Guard {
    file: File,
}

impl Guard {
    fn acquire(dir: &Path) -> BackendResult<Self> {
        fs::create_dir_all(dir).map_err(BackendError::io("create stage dir"))?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(GUARD_FILE))
            .map_err(BackendError::io("open guard"))?;
        file.lock_exclusive().map_err(BackendError::io("lock guard"))?;
        Ok(Self { file })
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> BackendResult<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(BackendError::io("read")(e)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| BackendError::Corrupted {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

fn to_json<T: Serialize>(value: &T, op: &'static str) -> BackendResult<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| BackendError::Io {
        op,
        source: io::Error::other(e),
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T, op: &'static str) -> BackendResult<()> {
    let body = to_json(value, op)?;
    write_atomic(path, &body).map_err(BackendError::io(op))
}
