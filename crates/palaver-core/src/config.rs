use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration read from `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PalaverConfig {
    /// Directory holding the file-backed key-value store.
    /// Falls back to the platform data directory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Default log filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether a delivered message is announced to its recipient.
    #[serde(default = "default_notify_on_delivery")]
    pub notify_on_delivery: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_notify_on_delivery() -> bool {
    true
}

impl Default for PalaverConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            log_level: default_log_level(),
            notify_on_delivery: default_notify_on_delivery(),
        }
    }
}
