//! Server configuration from the environment

use std::env;
use std::path::PathBuf;

pub const CATALOG_ENV: &str = "CONVERSOR_CATALOG";
pub const SNAPSHOT_ENV: &str = "CONVERSOR_SNAPSHOT";
pub const LOG_ENV: &str = "RUST_LOG";

const DEFAULT_SNAPSHOT_FILE: &str = "conversor-snapshot.json";
const MEMORY_SNAPSHOT: &str = ":memory:";
const DEFAULT_LOG_FILTER: &str = "info";

/// Where the last conversion is saved
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotTarget {
    File(PathBuf),
    /// Kept in process only (`CONVERSOR_SNAPSHOT=:memory:`)
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Catalog JSON file; the embedded catalog when `None`
    pub catalog_path: Option<PathBuf>,
    pub snapshot: SnapshotTarget,
    /// tracing-subscriber filter directive
    pub log_filter: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            catalog_path: non_empty(CATALOG_ENV).map(PathBuf::from),
            snapshot: match non_empty(SNAPSHOT_ENV) {
                Some(v) if v.trim() == MEMORY_SNAPSHOT => SnapshotTarget::Memory,
                Some(v) => SnapshotTarget::File(PathBuf::from(v)),
                None => SnapshotTarget::File(PathBuf::from(DEFAULT_SNAPSHOT_FILE)),
            },
            log_filter: non_empty(LOG_ENV).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }
}
