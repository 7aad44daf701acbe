//! Remembered phone address, stored in ANCS_MIRROR_HOME

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid address file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedDevice {
    address: String,
}

/// ANCS_MIRROR_HOME, or ~/.ancs-mirror
pub fn mirror_home() -> PathBuf {
    std::env::var("ANCS_MIRROR_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".ancs-mirror")
        })
}

pub fn address_file() -> PathBuf {
    mirror_home().join("address.json")
}

/// Read the saved address. A missing file or an empty address is `None`.
pub fn load_saved_address(path: &Path) -> Result<Option<String>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let data = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    let saved: SavedDevice =
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;

    let address = saved.address.trim();
    if address.is_empty() {
        Ok(None)
    } else {
        Ok(Some(address.to_string()))
    }
}

pub fn save_address(path: &Path, address: &str) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|source| ConfigError::Io { path: dir.to_path_buf(), source })?;
    }

    let saved = SavedDevice { address: address.to_string() };
    let data = serde_json::to_string_pretty(&saved)
        .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
    fs::write(path, data).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
}

/// Delete the saved address. Returns whether there was one.
pub fn clear_saved_address(path: &Path) -> Result<bool, ConfigError> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ancs-mirror-test-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir.join("address.json")
    }

    #[test]
    fn test_save_load_clear() {
        let path = scratch_file("roundtrip");

        assert_eq!(load_saved_address(&path).unwrap(), None);

        save_address(&path, "AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(load_saved_address(&path).unwrap().as_deref(), Some("AA:BB:CC:DD:EE:FF"));

        assert!(clear_saved_address(&path).unwrap());
        assert!(!clear_saved_address(&path).unwrap());
        assert_eq!(load_saved_address(&path).unwrap(), None);
    }

    #[test]
    fn test_empty_address_is_none() {
        let path = scratch_file("empty");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"address": "  "}"#).unwrap();

        assert_eq!(load_saved_address(&path).unwrap(), None);
    }

    #[test]
    fn test_garbage_file_is_an_error() {
        let path = scratch_file("garbage");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        assert!(matches!(load_saved_address(&path), Err(ConfigError::Parse { .. })));
    }
}
