//! Runtime secret resolution
//!
//! Deployment secrets arrive as plain environment variables or as files
//! mounted by the orchestrator. `MONGODB_URL` and `API_KEY` override the
//! layered configuration; each also accepts a `*_FILE` variant naming a file
//! whose trimmed contents hold the value.

use crate::core::config::{Config, ConfigError};

pub const DATABASE_URL_VAR: &str = "MONGODB_URL";
pub const API_KEY_VAR: &str = "API_KEY";

/// Apply resolved secrets on top of the layered configuration.
///
/// A resolved API key also enables authentication, so a deployment that
/// mounts a key never runs open by accident.
pub fn apply(config: &mut Config) -> Result<(), ConfigError> {
    if let Some(url) = resolve(DATABASE_URL_VAR)? {
        config.database.url = url;
        config.database.validate()?;
    }

    if let Some(key) = resolve(API_KEY_VAR)? {
        config.security.api_key = key;
        config.security.enable_auth = true;
    }

    Ok(())
}

/// Resolve one secret: the direct variable wins, the `*_FILE` indirection is
/// the fallback. Empty values count as unset.
fn resolve(name: &str) -> Result<Option<String>, ConfigError> {
    if let Ok(value) = std::env::var(name) {
        if !value.is_empty() {
            return Ok(Some(value));
        }
    }

    let file_var = format!("{name}_FILE");
    match std::env::var(&file_var) {
        Ok(path) if !path.is_empty() => {
            let contents = std::fs::read_to_string(&path).map_err(|err| {
                ConfigError::LoadError(format!("failed to read {file_var} at {path}: {err}"))
            })?;
            let trimmed = contents.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        _ => Ok(None),
    }
}
