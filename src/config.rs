use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::hierarchy::OrphanPolicy;

static CONFIG_FILE: Lazy<&'static Path> = Lazy::new(|| Path::new("config/zentry.toml"));
static DATA_DIR: Lazy<&'static Path> = Lazy::new(|| Path::new("data"));

#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_accounts_file")]
    pub accounts_file: String,
    #[serde(default)]
    pub orphan_policy: OrphanPolicy,
    #[serde(default = "default_code_retry_limit")]
    pub code_retry_limit: u32,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_data_dir() -> PathBuf {
    DATA_DIR.to_path_buf()
}

fn default_accounts_file() -> String {
    "accounts.jsonl".to_string()
}

fn default_code_retry_limit() -> u32 {
    3
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            accounts_file: default_accounts_file(),
            orphan_policy: OrphanPolicy::default(),
            code_retry_limit: default_code_retry_limit(),
            log_filter: default_log_filter(),
        }
    }
}

impl ChartConfig {
    /// Loads `config/zentry.toml` if present, then `ZENTRY_*` environment
    /// variables on top.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(*CONFIG_FILE)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("ZENTRY"))
            .build()?
            .try_deserialize()
    }

    pub fn accounts_path(&self) -> PathBuf {
        self.data_dir.join(&self.accounts_file)
    }
}
