//! Project configuration, read from `kiba.yaml`.
//!
//! ```yaml
//! analyzer:
//!   globals: [std, console]
//! codegen:
//!   indent: "    "
//! ```
//!
//! Every field is optional; missing sections take their defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "kiba.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KibaConfig {
    pub analyzer: AnalyzerConfig,
    pub codegen: CodegenConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// Names that are always defined.
    pub globals: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            globals: vec![crate::codegen::STD_LIBRARY_NAME.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodegenConfig {
    /// One level of indentation in generated blocks.
    pub indent: String,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
        }
    }
}

/// Failure to read or parse a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
}

impl KibaConfig {
    pub fn from_yaml(path: &str, content: &str) -> Result<Self, ConfigError> {
        // an empty document is `null` to serde_yaml
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let name = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: name.clone(),
            source,
        })?;
        Self::from_yaml(&name, &content)
    }

    /// Loads `explicit` if given, else `kiba.yaml` from `dir` when it exists, else defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            Self::from_file(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = KibaConfig::default();
        assert_eq!(config.analyzer.globals, vec!["std"]);
        assert_eq!(config.codegen.indent, "  ");
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = KibaConfig::from_yaml("kiba.yaml", "codegen:\n  indent: \"\\t\"\n").unwrap();
        assert_eq!(config.codegen.indent, "\t");
        assert_eq!(config.analyzer.globals, vec!["std"]);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(KibaConfig::from_yaml("kiba.yaml", "").unwrap(), KibaConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let error = KibaConfig::from_yaml("kiba.yaml", "analyser: {}").unwrap_err();
        assert!(error.to_string().starts_with("invalid configuration in kiba.yaml"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = KibaConfig::discover(Some(Path::new("does/not/exist.yaml")), Path::new("."));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
