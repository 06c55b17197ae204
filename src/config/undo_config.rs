use serde::{Deserialize, Serialize};

/// Pending-closure (undo) support per mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UndoConfig {
    pub regular: bool,
    pub incognito: bool,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            regular: true,
            incognito: false,
        }
    }
}
