use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BASE_DOCUMENT: &str = "tenHundredWords.json";
pub const DEFAULT_INDEX_DOCUMENT: &str = "wordListIndex.json";
pub const DEFAULT_SOURCE: &str = ".";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Where glossary documents come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum GlossarySources {
    /// Fetch an index document listing glossary identifiers, then each glossary.
    Index { document: String },
    /// Fetch one designated glossary.
    Single { document: String },
    /// Fetch the listed glossaries, as if they came from an index.
    Listed { documents: Vec<String> },
}

impl Default for GlossarySources {
    fn default() -> Self {
        GlossarySources::Index {
            document: DEFAULT_INDEX_DOCUMENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(default = "default_base")]
    pub base: String,
    #[serde(default)]
    pub glossaries: GlossarySources,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base: default_base(),
            glossaries: GlossarySources::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServeConfig {
    #[serde(default = "default_addr")]
    pub addr: SocketAddr,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

/// Settings shared by the CLI and the HTTP service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// A directory path or an `http(s)://` base URL.
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub serve: ServeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            loader: LoaderConfig::default(),
            serve: ServeConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn default_base() -> String {
    DEFAULT_BASE_DOCUMENT.to_string()
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

fn default_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_object_uses_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.loader.base, "tenHundredWords.json");
        assert_eq!(
            config.loader.glossaries,
            GlossarySources::Index {
                document: "wordListIndex.json".to_string()
            }
        );
    }

    #[test]
    fn glossary_modes_parse() {
        let single: LoaderConfig =
            serde_json::from_str(r#"{"glossaries":{"mode":"single","document":"bio.json"}}"#)
                .unwrap();
        assert_eq!(
            single.glossaries,
            GlossarySources::Single {
                document: "bio.json".to_string()
            }
        );
        let listed: LoaderConfig = serde_json::from_str(
            r#"{"base":"common.json","glossaries":{"mode":"listed","documents":["a.json","b.json"]}}"#,
        )
        .unwrap();
        assert_eq!(listed.base, "common.json");
        assert!(matches!(
            listed.glossaries,
            GlossarySources::Listed { ref documents } if documents.len() == 2
        ));
    }

    #[test]
    fn from_file_reports_path_on_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"source": "https://example.org/lists/", "serve": {{"addr": "0.0.0.0:9000"}}}}"#).unwrap();
        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.source, "https://example.org/lists/");
        assert_eq!(config.serve.addr.port(), 9000);
        assert_eq!(config.loader, LoaderConfig::default());

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        write!(broken, "{{not json").unwrap();
        let err = AppConfig::from_file(broken.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let missing = AppConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }
}
