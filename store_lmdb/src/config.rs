//! Store configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::LmdbError;

/// Longest database name accepted, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// How hard a commit tries to reach stable storage before it is acknowledged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Durability {
    /// Commits are written to the OS but not fsynced. An OS crash may lose
    /// acknowledged writes; a process crash does not.
    #[default]
    Relaxed,
    /// Every commit is fsynced before it is acknowledged.
    Strict,
}

/// Configuration shared by every database opened from one root directory.
///
/// Can be loaded from a TOML file via [`StoreConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one subdirectory per named database.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// LMDB map size in bytes: the largest a single database can grow.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Maximum number of concurrent read transactions.
    #[serde(default = "default_max_readers")]
    pub max_readers: u32,

    /// Commit durability mode.
    #[serde(default)]
    pub durability: Durability,

    /// How long `dispose` waits for other handles on the same database to
    /// close before reporting it blocked.
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_root_dir() -> PathBuf {
    PathBuf::from("./memfs_data")
}

fn default_map_size() -> usize {
    256 * 1024 * 1024
}

fn default_max_readers() -> u32 {
    126
}

fn default_close_timeout_ms() -> u64 {
    1000
}

// ── Impl ───────────────────────────────────────────────────────────────

impl StoreConfig {
    /// Default configuration rooted at `root_dir`.
    pub fn with_root_dir(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, LmdbError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| LmdbError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, LmdbError> {
        toml::from_str(s).map_err(|e| LmdbError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, LmdbError> {
        toml::to_string_pretty(self).map_err(|e| LmdbError::Config(e.to_string()))
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    /// Directory of the database called `name`.
    ///
    /// Names are restricted to ASCII alphanumerics, `-`, `_` and `.` so that a
    /// name can never address anything outside `root_dir`.
    pub fn database_path(&self, name: &str) -> Result<PathBuf, LmdbError> {
        validate_name(name)?;
        Ok(self.root_dir.join(name))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            map_size: default_map_size(),
            max_readers: default_max_readers(),
            durability: Durability::default(),
            close_timeout_ms: default_close_timeout_ms(),
        }
    }
}

fn validate_name(name: &str) -> Result<(), LmdbError> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(LmdbError::InvalidName(format!("'{name}' is reserved")));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(LmdbError::InvalidName(format!(
            "name is {} bytes, limit is {}",
            name.len(),
            MAX_NAME_LEN
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(LmdbError::InvalidName(format!(
            "'{name}' contains '{c}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = StoreConfig::default();
        let toml_str = config.to_toml_string().expect("serializable");
        let parsed = StoreConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = StoreConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.root_dir, PathBuf::from("./memfs_data"));
        assert_eq!(config.durability, Durability::Relaxed);
        assert_eq!(config.close_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            root_dir = "/var/lib/memfs"
            durability = "strict"
            map_size = 1048576
        "#;
        let config = StoreConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.root_dir, PathBuf::from("/var/lib/memfs"));
        assert_eq!(config.durability, Durability::Strict);
        assert_eq!(config.map_size, 1024 * 1024);
        assert_eq!(config.max_readers, 126); // default
    }

    #[test]
    fn unknown_durability_is_rejected() {
        let result = StoreConfig::from_toml_str(r#"durability = "eventual""#);
        assert!(matches!(result, Err(LmdbError::Config(_))));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = StoreConfig::from_toml_file("/nonexistent/memfs.toml");
        assert!(matches!(result, Err(LmdbError::Config(_))));
    }

    #[test]
    fn database_path_joins_root() {
        let config = StoreConfig::with_root_dir("/data");
        let path = config.database_path("vol-1.blocks").unwrap();
        assert_eq!(path, PathBuf::from("/data/vol-1.blocks"));
    }

    #[test]
    fn names_cannot_escape_root() {
        let config = StoreConfig::with_root_dir("/data");
        for name in ["", ".", "..", "../x", "a/b", "a\\b", "sp ace"] {
            assert!(
                matches!(config.database_path(name), Err(LmdbError::InvalidName(_))),
                "{name:?} accepted"
            );
        }
        assert!(config.database_path(&"n".repeat(MAX_NAME_LEN + 1)).is_err());
    }
}
