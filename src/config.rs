//! Shop configuration.
//!
//! Settings come from an optional TOML file. Every field has a default, so a
//! missing file or a partial one is fine:
//!
//! ```toml
//! data_dir = "data"
//! min_password_len = 8
//! seed_catalog = true
//! ```

use crate::error::ConfigError;

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

pub const DEFAULT_MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ShopConfig {
    /// Directory holding the CSV data files.
    pub data_dir: PathBuf,

    /// Shortest password accepted at registration.
    pub min_password_len: usize,

    /// Fill an empty catalog with the sample products on startup.
    pub seed_catalog: bool,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
            seed_catalog: false,
        }
    }
}

impl FromStr for ShopConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(data)?)
    }
}

impl ShopConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(data) => data.parse(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
