use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fields::FieldDirectory;
use crate::table::{DEFAULT_ELLIPSIS, TableOptions};

pub const SERVER_URL_ENV: &str = "HOSTDB_UI_SERVER_URL";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found '{0}'")]
    NotFound(PathBuf),
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub server_url: String,
    /// Search field key -> display name.
    pub fields: BTreeMap<String, String>,
    pub ellipsis: usize,
    pub hidden_columns: Vec<usize>,
    pub default_limit: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            fields: BTreeMap::new(),
            ellipsis: DEFAULT_ELLIPSIS,
            hidden_columns: TableOptions::default().hidden_columns,
            default_limit: 100,
        }
    }
}

impl UiConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Built-in fields with the configured ones merged over them.
    pub fn field_directory(&self) -> FieldDirectory {
        FieldDirectory::shared_builtin()
            .clone()
            .with_fields(&self.fields)
    }

    pub fn table_options(&self) -> TableOptions {
        TableOptions {
            ellipsis: self.ellipsis,
            hidden_columns: self.hidden_columns.clone(),
        }
    }

    /// Applies `HOSTDB_UI_SERVER_URL` when set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = env::var(SERVER_URL_ENV).ok().filter(|url| !url.trim().is_empty()) {
            self.server_url = url;
        }
        self
    }
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".hostdb").join("ui.yml"))
}

/// Reads a YAML config. A missing file yields defaults when `allow_missing`.
pub fn load_config(path: &Path, allow_missing: bool) -> Result<UiConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => UiConfig::from_yaml_str(&contents),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(UiConfig::default())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(ConfigError::NotFound(path.to_path_buf()))
        }
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = UiConfig::from_yaml_str("").unwrap();
        assert_eq!(config, UiConfig::default());
        assert_eq!(config.table_options(), TableOptions::default());
    }

    #[test]
    fn partial_document_fills_remaining_defaults() {
        let config = UiConfig::from_yaml_str(
            "server_url: http://hostdb.example:8080\nfields:\n  env: Environment\n  rack: ''\nellipsis: 30\n",
        )
        .unwrap();
        assert_eq!(config.server_url, "http://hostdb.example:8080");
        assert_eq!(config.ellipsis, 30);
        assert_eq!(config.default_limit, 100);

        let directory = config.field_directory();
        assert_eq!(directory.label("env"), Some("Environment"));
        assert_eq!(directory.label("rack"), Some("rack"));
        assert_eq!(directory.label("_search"), Some("Text Search"));
    }

    #[test]
    fn configured_fields_extend_shared_builtin_without_hidden_keys() {
        let config = UiConfig::from_yaml_str("fields:\n  id: ID\n  type: Record Type\n").unwrap();
        let directory = config.field_directory();
        assert_eq!(directory.label("id"), None);
        assert_eq!(directory.label("type"), Some("Record Type"));
        assert_eq!(FieldDirectory::shared_builtin().label("type"), Some("Type"));

        let plain = UiConfig::default().field_directory();
        assert_eq!(&plain, FieldDirectory::shared_builtin());
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        assert!(matches!(
            UiConfig::from_yaml_str("ellipsis: [not, a, number]"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_respects_allow_missing() {
        let path = env::temp_dir().join("hostdb-ui-config-that-does-not-exist.yml");
        assert_eq!(load_config(&path, true).unwrap(), UiConfig::default());
        assert!(matches!(
            load_config(&path, false),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn load_config_reads_file() {
        let path = env::temp_dir().join(format!("hostdb-ui-config-{}.yml", std::process::id()));
        std::fs::write(&path, "default_limit: 25\nhidden_columns: [2]\n").unwrap();
        let config = load_config(&path, false).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.default_limit, 25);
        assert_eq!(config.hidden_columns, vec![2]);
    }
}
