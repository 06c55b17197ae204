use serde::{Deserialize, Serialize};

/// Why a tab was created. Drives insertion position and foreground selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabLaunchType {
    /// Opened by clicking a link (e.g. `target="_blank"`)
    FromLink,
    /// Opened by another app
    FromExternalApp,
    /// Opened from browser UI such as the "new tab" button
    #[default]
    FromChromeUi,
    /// Recreated from saved tab state
    FromRestore,
    FromLongpressForeground,
    FromLongpressBackground,
    FromLongpressBackgroundInGroup,
    FromLongpressIncognito,
    /// Moved in from another window
    FromReparenting,
    FromLauncherShortcut,
    FromBrowserActions,
    FromRecentTabs,
    FromTabGroupUi,
    FromStartSurface,
    FromTabSwitcherUi,
}

impl TabLaunchType {
    /// Launch types produced by following a link from an existing tab.
    pub fn is_link_click(self) -> bool {
        matches!(
            self,
            Self::FromLink
                | Self::FromLongpressForeground
                | Self::FromLongpressBackground
                | Self::FromLongpressBackgroundInGroup
                | Self::FromLongpressIncognito
        )
    }

    /// Launch types that leave the current tab selected.
    pub fn opens_in_background(self) -> bool {
        matches!(
            self,
            Self::FromLongpressBackground
                | Self::FromLongpressBackgroundInGroup
                | Self::FromRecentTabs
        )
    }

    /// Launch types that bypass the positional insertion policy and always append.
    pub fn bypasses_positioning(self) -> bool {
        matches!(self, Self::FromBrowserActions | Self::FromRecentTabs)
    }

    /// Launch types for which a new tab joins its parent's group even when
    /// automatic group creation is off.
    pub fn joins_parent_group(self) -> bool {
        matches!(
            self,
            Self::FromTabGroupUi | Self::FromLongpressBackgroundInGroup | Self::FromStartSurface
        )
    }
}

/// Why a tab became the selected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabSelectionType {
    FromUser,
    FromClose,
    FromExit,
    FromNew,
    FromUndo,
}

/// State a tab is in when it is added to a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabCreationState {
    #[default]
    LiveInForeground,
    LiveInBackground,
    FrozenOnRestore,
    FrozenForLazyLoad,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_click_types() {
        assert!(TabLaunchType::FromLink.is_link_click());
        assert!(TabLaunchType::FromLongpressIncognito.is_link_click());
        assert!(TabLaunchType::FromLongpressBackgroundInGroup.is_link_click());
        assert!(!TabLaunchType::FromChromeUi.is_link_click());
        assert!(!TabLaunchType::FromRestore.is_link_click());
    }

    #[test]
    fn test_background_types() {
        assert!(TabLaunchType::FromLongpressBackground.opens_in_background());
        assert!(TabLaunchType::FromRecentTabs.opens_in_background());
        assert!(!TabLaunchType::FromLink.opens_in_background());
        assert!(!TabLaunchType::FromRestore.opens_in_background());
    }

    #[test]
    fn test_launch_type_serde_names() {
        let json = serde_json::to_string(&TabLaunchType::FromLongpressBackground).unwrap();
        assert_eq!(json, "\"from_longpress_background\"");
        let parsed: TabLaunchType = serde_json::from_str("\"from_link\"").unwrap();
        assert_eq!(parsed, TabLaunchType::FromLink);
    }
}
