use serde::{Deserialize, Serialize};

/// Configuration for tab grouping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TabGroupConfig {
    /// Install the grouping filter instead of the pass-through one
    pub enabled: bool,
    /// Tabs opened from a tab join its group
    pub auto_creation: bool,
}

impl Default for TabGroupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_creation: true,
        }
    }
}
