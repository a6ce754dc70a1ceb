//! Compile parameters supplied once before compilation.
//!
//! Keys the core does not know about land in [`Config::extra`] so that
//! strategies can read format-specific settings from the same file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

fn default_secnolevel() -> usize {
    2
}

fn default_encoding() -> String {
    "UTF-8".to_string()
}

/// Key-value parameters shared by the compiler and its strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Prefix untagged headlines with their dotted number.
    #[serde(default, alias = "hdnumberingmode")]
    pub heading_numbering: bool,

    /// Deepest headline level that is numbered by the output format.
    #[serde(default = "default_secnolevel")]
    pub secnolevel: usize,

    #[serde(default = "default_encoding")]
    pub inencoding: String,

    #[serde(default = "default_encoding")]
    pub outencoding: String,

    /// Everything else, untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, toml::Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            heading_numbering: false,
            secnolevel: default_secnolevel(),
            inencoding: default_encoding(),
            outencoding: default_encoding(),
            extra: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Read a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_heading_numbering(mut self, on: bool) -> Self {
        self.heading_numbering = on;
        self
    }

    pub fn with_secnolevel(mut self, level: usize) -> Self {
        self.secnolevel = level;
        self
    }

    /// Look up a key the core does not interpret.
    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.extra.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(!config.heading_numbering);
        assert_eq!(config.secnolevel, 2);
        assert_eq!(config.outencoding, "UTF-8");
    }

    #[test]
    fn test_legacy_key_and_extras() {
        let config = Config::from_toml_str(
            r#"
hdnumberingmode = true
secnolevel = 3
stylesheet = "book.css"
"#,
        )
        .unwrap();
        assert!(config.heading_numbering);
        assert_eq!(config.secnolevel, 3);
        assert_eq!(
            config.get("stylesheet").and_then(|v| v.as_str()),
            Some("book.css")
        );
    }

    #[test]
    fn test_load_errors_carry_path() {
        let dir = TempDir::new().unwrap();

        let missing = dir.path().join("missing.toml");
        let err = Config::load(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Read { ref path, .. } if path == &missing));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "secnolevel = [").unwrap();
        let err = Config::load(&broken).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "heading_numbering = true\n").unwrap();
        assert!(Config::load(&path).unwrap().heading_numbering);
    }
}
