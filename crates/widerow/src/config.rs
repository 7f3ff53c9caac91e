//! Table configuration loading.
//!
//! A config file describes one table:
//!
//! ```toml
//! table_name = "orders"
//! range_page_size = 250
//!
//! [[primary_key]]
//! name = "tenant"
//! type = "STRING"
//!
//! [[primary_key]]
//! name = "order_id"
//! type = "INTEGER"
//! ```
//!
//! Omitting `primary_key` makes the table fetch its schema from the backend
//! on first use.

use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error as ThisError;
use tracing::debug;

// re-exports
pub use widerow_core::config::{DEFAULT_MAX_VERSIONS, DEFAULT_RANGE_PAGE_SIZE, TableConfig};

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Parse and validate a table config from TOML text.
pub fn from_toml_str(source: &str) -> Result<TableConfig, ConfigError> {
    let config: TableConfig = toml::from_str(source)?;
    config
        .validate()
        .map_err(|err| ConfigError::Invalid(err.message))?;

    debug!(
        table = %config.table_name,
        range_page_size = config.range_page_size,
        local_schema = config.primary_key.is_some(),
        "table config loaded"
    );

    Ok(config)
}

/// Read, parse, and validate a table config file.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<TableConfig, ConfigError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    from_toml_str(&source)
}
