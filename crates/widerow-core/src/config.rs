//! Module: config
//! Responsibility: per-table runtime settings and their defaults.
//! Does not own: loading from files (the public crate parses TOML).
//! Boundary: a config is checked once when a table is built from it.

use crate::{
    error::{ErrorOrigin, InternalError},
    schema::{PrimaryKeyColumn, PrimaryKeySchema},
};
use serde::{Deserialize, Serialize};

///
/// CONSTANTS
///

/// Rows requested per scan by the exhaustive range collector.
pub const DEFAULT_RANGE_PAGE_SIZE: u32 = 100;

/// Cell versions requested by reads.
pub const DEFAULT_MAX_VERSIONS: u32 = 1;

///
/// TableConfig
///
/// Settings for one table handle.
///
/// `primary_key` is optional: when present the schema is known up front and
/// the table never calls `describeTable`; when absent the schema is fetched
/// on first use.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    pub table_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<Vec<PrimaryKeyColumn>>,

    #[serde(default = "default_range_page_size")]
    pub range_page_size: u32,

    #[serde(default = "default_max_versions")]
    pub max_versions: u32,
}

impl TableConfig {
    /// Config with default paging and no local schema.
    #[must_use]
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            primary_key: None,
            range_page_size: DEFAULT_RANGE_PAGE_SIZE,
            max_versions: DEFAULT_MAX_VERSIONS,
        }
    }

    #[must_use]
    pub fn with_primary_key(mut self, columns: Vec<PrimaryKeyColumn>) -> Self {
        self.primary_key = Some(columns);
        self
    }

    #[must_use]
    pub const fn with_range_page_size(mut self, page_size: u32) -> Self {
        self.range_page_size = page_size;
        self
    }

    #[must_use]
    pub const fn with_max_versions(mut self, max_versions: u32) -> Self {
        self.max_versions = max_versions;
        self
    }

    /// Check every field and build the local schema, if one is declared.
    pub fn validate(&self) -> Result<Option<PrimaryKeySchema>, InternalError> {
        if self.table_name.trim().is_empty() {
            return Err(InternalError::invalid_argument(
                ErrorOrigin::Config,
                "table_name must not be empty",
            ));
        }
        if self.range_page_size == 0 {
            return Err(InternalError::invalid_argument(
                ErrorOrigin::Config,
                "range_page_size must be greater than zero",
            ));
        }
        if self.max_versions == 0 {
            return Err(InternalError::invalid_argument(
                ErrorOrigin::Config,
                "max_versions must be greater than zero",
            ));
        }

        self.primary_key
            .clone()
            .map(PrimaryKeySchema::new)
            .transpose()
            .map_err(|err| InternalError::invalid_argument(ErrorOrigin::Config, err.to_string()))
    }
}

const fn default_range_page_size() -> u32 {
    DEFAULT_RANGE_PAGE_SIZE
}

const fn default_max_versions() -> u32 {
    DEFAULT_MAX_VERSIONS
}
