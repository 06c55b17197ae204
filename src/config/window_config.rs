use serde::{Deserialize, Serialize};

/// Default number of window slots
pub const DEFAULT_MAX_WINDOWS: usize = 5;

fn default_max_windows() -> usize {
    DEFAULT_MAX_WINDOWS
}

/// Configuration for the window slot registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowConfig {
    /// Number of windows that can hold a tab model selector at once
    #[serde(default = "default_max_windows")]
    pub max_windows: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_windows: default_max_windows(),
        }
    }
}
