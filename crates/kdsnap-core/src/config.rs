use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{KdsnapError, KdsnapResult};

/// Top-level configuration (loaded from kdsnap.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KdsnapConfig {
    pub keys: KeysConfig,
    pub snapshot: SnapshotConfig,
    pub log: LogConfig,
}

impl KdsnapConfig {
    /// Parse a TOML document
    pub fn from_toml(content: &str) -> KdsnapResult<Self> {
        toml::from_str(content).map_err(|e| KdsnapError::Config(e.to_string()))
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> KdsnapResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| KdsnapError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
            .map_err(|e| KdsnapError::Config(format!("parsing {}: {e}", path.display())))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Directory holding the key files (default: /etc/vg-keydesk-snap)
    pub dir: PathBuf,
    /// Realm public keys, authorized_keys format
    pub realms_keys_file: String,
    /// Authority public keys, authorized_keys format
    pub authorities_keys_file: String,
    /// Size cap for key files in bytes (default: 16 KiB)
    pub max_file_size: u64,
}

impl KeysConfig {
    pub fn realms_keys_path(&self) -> PathBuf {
        self.dir.join(&self.realms_keys_file)
    }

    pub fn authorities_keys_path(&self) -> PathBuf {
        self.dir.join(&self.authorities_keys_file)
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(crate::DEFAULT_KEYS_PATH),
            realms_keys_file: "realms_keys".into(),
            authorities_keys_file: "authorities_keys".into(),
            max_file_size: crate::MAX_KEYS_FILE_SIZE,
        }
    }
}

/// Byte layout of the final secret fed to the stream cipher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretLayout {
    /// Decimal text rendering of timestamps and byte strings, as emitted by
    /// every snapshot sealed so far
    #[default]
    Legacy,
    /// Fixed-width big-endian timestamps followed by raw secret bytes
    Binary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Root of per-brigade home directories (db dir = home_root/<brigade id>)
    pub home_root: PathBuf,
    /// Explicit brigade db directory, overrides home_root
    pub db_dir: Option<PathBuf>,
    /// Storage document name inside the db directory
    pub storage_file: String,
    /// Maintenance flag file name inside the db directory
    pub maintenance_file: String,
    pub secret_layout: SecretLayout,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            home_root: PathBuf::from("/home"),
            db_dir: None,
            storage_file: "brigade.json".into(),
            maintenance_file: ".maintenance".into(),
            secret_layout: SecretLayout::Legacy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}
