use crate::tab::{TabCreationState, TabRef};

#[derive(Debug, Clone)]
pub enum TabModelSelectorEvent {
    /// Something in either model changed. Coalesced: at most one per drained task queue.
    Change,
    NewTabCreated {
        tab: TabRef,
        creation_state: TabCreationState,
    },
    TabModelSelected {
        new_incognito: bool,
        old_incognito: bool,
    },
    TabStateInitialized,
}

impl TabModelSelectorEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Change => "Change",
            Self::NewTabCreated { .. } => "NewTabCreated",
            Self::TabModelSelected { .. } => "TabModelSelected",
            Self::TabStateInitialized => "TabStateInitialized",
        }
    }
}

pub trait TabModelSelectorObserver {
    fn on_selector_event(&self, event: &TabModelSelectorEvent);
}

impl<F: Fn(&TabModelSelectorEvent)> TabModelSelectorObserver for F {
    fn on_selector_event(&self, event: &TabModelSelectorEvent) {
        self(event)
    }
}
