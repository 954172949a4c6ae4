//! Secret management on top of the backend's key/value map

use thiserror::Error;
use tracing::info;

use crate::domain::ports::{Backend, BackendError, SecretMap};
use crate::domain::value_objects::StageKey;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret '{name}' is not set for {key}")]
    NotFound { name: String, key: StageKey },

    #[error("secret name cannot be empty")]
    EmptyName,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub fn set_secret(
    backend: &dyn Backend,
    key: &StageKey,
    name: &str,
    value: &str,
) -> Result<(), SecretError> {
    if name.trim().is_empty() {
        return Err(SecretError::EmptyName);
    }
    backend.update_secrets(key, &mut |secrets: &mut SecretMap| {
        secrets.insert(name.to_string(), value.to_string());
        true
    })?;
    info!(key = %key, name, "secret set");
    Ok(())
}

pub fn remove_secret(backend: &dyn Backend, key: &StageKey, name: &str) -> Result<(), SecretError> {
    let removed = backend.update_secrets(key, &mut |secrets: &mut SecretMap| {
        secrets.remove(name).is_some()
    })?;
    if !removed {
        return Err(SecretError::NotFound {
            name: name.to_string(),
            key: key.clone(),
        });
    }
    info!(key = %key, name, "secret removed");
    Ok(())
}

pub fn list_secrets(backend: &dyn Backend, key: &StageKey) -> Result<SecretMap, SecretError> {
    Ok(backend.get_secrets(key)?)
}
