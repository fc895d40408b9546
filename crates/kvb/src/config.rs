//! Store configuration: which backend to open and which format to use.
//!
//! ```toml
//! [options]
//! marshal_format = "bincode"
//!
//! [backend]
//! kind = "redb"
//! path = "/var/lib/app/kv.redb"
//! table = "sessions"
//! ```

use std::path::{Path, PathBuf};

use kvb_redb::RedbOptions;
use kvb_store::StoreOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid.
    #[error("invalid config: {0}")]
    Parse(String),
}

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// The backend a store is opened on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// [`kvb_store::InMemoryBackend`].
    #[default]
    Memory,
    /// [`kvb_syncmap::SyncMapBackend`].
    #[serde(rename = "syncmap")]
    SyncMap,
    /// [`kvb_redb::RedbBackend`].
    Redb(RedbOptions),
}

/// Everything needed to open a store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub options: StoreOptions,
    pub backend: BackendConfig,
}

impl StoreConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvb_store::MarshalFormat;

    #[test]
    fn empty_document_is_default() {
        let config = StoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.backend, BackendConfig::Memory);
        assert_eq!(config.options.marshal_format, MarshalFormat::Json);
    }

    #[test]
    fn redb_backend() {
        let config = StoreConfig::from_toml_str(
            r#"
            [options]
            marshal_format = "bincode"

            [backend]
            kind = "redb"
            path = "/var/lib/app/kv.redb"
            table = "sessions"
            "#,
        )
        .unwrap();
        assert_eq!(config.options.marshal_format, MarshalFormat::Bincode);
        assert_eq!(
            config.backend,
            BackendConfig::Redb(RedbOptions::new("/var/lib/app/kv.redb").with_table("sessions"))
        );
    }

    #[test]
    fn syncmap_with_custom_format() {
        let config = StoreConfig::from_toml_str(
            r#"
            options = { marshal_format = "custom:bracketed" }
            backend = { kind = "syncmap" }
            "#,
        )
        .unwrap();
        assert_eq!(config.backend, BackendConfig::SyncMap);
        assert_eq!(
            config.options.marshal_format,
            MarshalFormat::custom("bracketed")
        );
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = StoreConfig::from_toml_str("[options]\nmarshal_format = \"gob\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("gob"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = StoreConfig::from_toml_str("[backend]\nkind = \"redis\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn toml_round_trip() {
        let config = StoreConfig {
            options: StoreOptions::with_format(MarshalFormat::Bincode),
            backend: BackendConfig::Redb(RedbOptions::new("data/kv.redb")),
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(StoreConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn toml_round_trip_with_unnamed_custom_format() {
        let config = StoreConfig {
            options: StoreOptions::with_format(MarshalFormat::custom("")),
            backend: BackendConfig::SyncMap,
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(StoreConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.toml");
        std::fs::write(&path, "[backend]\nkind = \"syncmap\"\n").unwrap();
        assert_eq!(StoreConfig::load(&path).unwrap().backend, BackendConfig::SyncMap);

        let err = StoreConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
