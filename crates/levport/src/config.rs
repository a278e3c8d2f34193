//! Configuration for levport.
//!
//! Loaded from the file given with `--config`, else from `levport.toml` in
//! the working directory when present. Every section is optional.
//!
//! Example levport.toml:
//! ```toml
//! [imports]
//! core = "../sp_lev.js"
//! random = "../rng.js"
//! helpers = "./levgen_helpers.js"
//!
//! [output]
//! entry = "generate"
//! extension = "js"
//! ```

use levport_lower::ImportPaths;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "levport.toml";

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Name of the exported entry function.
    pub entry: String,
    /// Extension of files written in batch mode.
    pub extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            entry: "generate".to_string(),
            extension: "js".to_string(),
        }
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LevportConfig {
    pub imports: ImportPaths,
    pub output: OutputConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("entry function name `{0}` is not a JavaScript identifier")]
    InvalidEntry(String),
}

impl LevportConfig {
    /// Load the configuration for a run.
    ///
    /// An explicit path must exist. Without one, `levport.toml` in the
    /// working directory is used if present, else the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_file(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::load_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load config from a file path.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let entry = &self.output.entry;
        let mut chars = entry.chars();
        let valid = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
        if valid {
            Ok(())
        } else {
            Err(ConfigError::InvalidEntry(entry.clone()))
        }
    }

    /// Extension for batch output files, without a leading dot.
    pub fn extension(&self) -> &str {
        self.output.extension.trim_start_matches('.')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("levport.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", content).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = LevportConfig::default();
        assert_eq!(config.imports.core, "../sp_lev.js");
        assert_eq!(config.imports.random, "../rng.js");
        assert_eq!(config.imports.helpers, "./levgen_helpers.js");
        assert_eq!(config.output.entry, "generate");
        assert_eq!(config.extension(), "js");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
[imports]
random = "../engine/rng.mjs"

[output]
extension = ".mjs"
"#,
        );

        let config = LevportConfig::load_file(&path).unwrap();
        assert_eq!(config.imports.random, "../engine/rng.mjs");
        assert_eq!(config.imports.core, "../sp_lev.js"); // default
        assert_eq!(config.output.entry, "generate"); // default
        assert_eq!(config.extension(), "mjs");
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = LevportConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[output\nentry = 1");
        let err = LevportConfig::load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("invalid config"));
    }

    #[test]
    fn test_invalid_entry_name() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[output]\nentry = \"make-level\"");
        let err = LevportConfig::load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEntry(name) if name == "make-level"));
    }
}
