//! Process configuration for table lookup: where tables live and which
//! optional behaviours (verbose boundary warnings, diagnostic dumps) are on.

use super::constants::{DEFAULT_TABLE_DIR, ENV_DEBUG, ENV_TABLE_PATH, ENV_WRITE_OUTFILES};
use crate::domain::TableVariant;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    #[serde(default = "default_table_dir")]
    pub table_dir: PathBuf,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub write_outfiles: bool,
}

fn default_table_dir() -> PathBuf {
    PathBuf::from(DEFAULT_TABLE_DIR)
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            table_dir: default_table_dir(),
            verbose: false,
            write_outfiles: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read table configuration '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse table configuration '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl TableConfig {
    pub fn new(table_dir: impl Into<PathBuf>) -> Self {
        Self {
            table_dir: table_dir.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let table_dir = lookup(ENV_TABLE_PATH)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_table_dir);

        Self {
            table_dir,
            verbose: lookup(ENV_DEBUG).as_deref().is_some_and(is_enabled),
            write_outfiles: lookup(ENV_WRITE_OUTFILES).as_deref().is_some_and(is_enabled),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn table_path(&self, variant: TableVariant) -> PathBuf {
        self.table_dir.join(variant.filename())
    }
}

fn is_enabled(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, TableConfig};
    use crate::domain::TableVariant;
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_falls_back_to_current_directory() {
        let config = TableConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, TableConfig::default());
        assert_eq!(config.table_dir, PathBuf::from("./"));
    }

    #[test]
    fn environment_toggles_are_parsed() {
        let config = TableConfig::from_lookup(lookup_from(&[
            ("RELXILL_TABLE_PATH", "/opt/tables"),
            ("DEBUG_RELXILL", "1"),
            ("RELXILL_WRITE_OUTFILES", "0"),
        ]));
        assert_eq!(config.table_dir, PathBuf::from("/opt/tables"));
        assert!(config.verbose);
        assert!(!config.write_outfiles);
    }

    #[test]
    fn table_path_joins_directory_and_variant_filename() {
        let config = TableConfig::new("/opt/tables");
        assert_eq!(
            config.table_path(TableVariant::Standard),
            PathBuf::from("/opt/tables/xillver-a-Ec5.fits")
        );
    }

    #[test]
    fn json_config_uses_defaults_for_missing_fields() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("tables.json");
        fs::write(&path, r#"{ "tableDir": "/srv/xillver", "verbose": true }"#)
            .expect("config should be written");

        let config = TableConfig::load(&path).expect("config should parse");
        assert_eq!(config.table_dir, PathBuf::from("/srv/xillver"));
        assert!(config.verbose);
        assert!(!config.write_outfiles);
    }

    #[test]
    fn missing_config_file_reports_read_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = TableConfig::load(temp.path().join("absent.json"))
            .expect_err("missing file should fail");
        assert!(matches!(error, ConfigError::Read { .. }));
    }
}
