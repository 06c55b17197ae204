use crate::tab::{TabCreationState, TabId, TabLaunchType, TabRef, TabSelectionType};

/// Lifecycle events emitted by a [`TabModel`](super::TabModel).
///
/// Every variant carries owned handles so observers may keep them past the callback.
#[derive(Debug, Clone)]
pub enum TabModelEvent {
    WillAddTab {
        tab: TabRef,
        launch_type: TabLaunchType,
    },
    DidAddTab {
        tab: TabRef,
        launch_type: TabLaunchType,
        creation_state: TabCreationState,
    },
    DidSelectTab {
        tab: TabRef,
        selection_type: TabSelectionType,
        last_id: Option<TabId>,
    },
    WillCloseTab {
        tab: TabRef,
        animate: bool,
    },
    /// Last chance to look at a tab before it is destroyed
    OnFinishingTabClosure {
        tab: TabRef,
    },
    /// A non-undoable close finished; the tab is already gone
    DidCloseTab {
        tab_id: TabId,
        incognito: bool,
    },
    TabPendingClosure {
        tab: TabRef,
    },
    MultipleTabsPendingClosure {
        tabs: Vec<TabRef>,
        is_all_tabs: bool,
    },
    TabClosureUndone {
        tab: TabRef,
    },
    TabClosureCommitted {
        tab: TabRef,
    },
    WillCloseAllTabs {
        incognito: bool,
    },
    AllTabsPendingClosure {
        tabs: Vec<TabRef>,
    },
    AllTabsClosureCommitted {
        incognito: bool,
    },
    /// The tab left the model without being destroyed (reparenting)
    TabRemoved {
        tab: TabRef,
    },
    DidMoveTab {
        tab: TabRef,
        new_index: usize,
        old_index: usize,
    },
    RestoreCompleted,
}

impl TabModelEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::WillAddTab { .. } => "WillAddTab",
            Self::DidAddTab { .. } => "DidAddTab",
            Self::DidSelectTab { .. } => "DidSelectTab",
            Self::WillCloseTab { .. } => "WillCloseTab",
            Self::OnFinishingTabClosure { .. } => "OnFinishingTabClosure",
            Self::DidCloseTab { .. } => "DidCloseTab",
            Self::TabPendingClosure { .. } => "TabPendingClosure",
            Self::MultipleTabsPendingClosure { .. } => "MultipleTabsPendingClosure",
            Self::TabClosureUndone { .. } => "TabClosureUndone",
            Self::TabClosureCommitted { .. } => "TabClosureCommitted",
            Self::WillCloseAllTabs { .. } => "WillCloseAllTabs",
            Self::AllTabsPendingClosure { .. } => "AllTabsPendingClosure",
            Self::AllTabsClosureCommitted { .. } => "AllTabsClosureCommitted",
            Self::TabRemoved { .. } => "TabRemoved",
            Self::DidMoveTab { .. } => "DidMoveTab",
            Self::RestoreCompleted => "RestoreCompleted",
        }
    }

    /// Id of the single tab the event is about, if any
    pub fn tab_id(&self) -> Option<TabId> {
        match self {
            Self::WillAddTab { tab, .. }
            | Self::DidAddTab { tab, .. }
            | Self::DidSelectTab { tab, .. }
            | Self::WillCloseTab { tab, .. }
            | Self::OnFinishingTabClosure { tab }
            | Self::TabPendingClosure { tab }
            | Self::TabClosureUndone { tab }
            | Self::TabClosureCommitted { tab }
            | Self::TabRemoved { tab }
            | Self::DidMoveTab { tab, .. } => Some(tab.id()),
            Self::DidCloseTab { tab_id, .. } => Some(*tab_id),
            _ => None,
        }
    }
}

pub trait TabModelObserver {
    fn on_event(&self, event: &TabModelEvent);
}

impl<F: Fn(&TabModelEvent)> TabModelObserver for F {
    fn on_event(&self, event: &TabModelEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tab::Tab;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_event_tab_id() {
        let tab = Tab::new(TabId::new(9), false).into_ref();
        let event = TabModelEvent::TabPendingClosure { tab };
        assert_eq!(event.name(), "TabPendingClosure");
        assert_eq!(event.tab_id(), Some(TabId::new(9)));

        let event = TabModelEvent::WillCloseAllTabs { incognito: true };
        assert_eq!(event.tab_id(), None);
    }

    #[test]
    fn test_closure_observer() {
        let count = Rc::new(Cell::new(0));
        let observer: Rc<dyn TabModelObserver> = {
            let count = count.clone();
            Rc::new(move |_: &TabModelEvent| count.set(count.get() + 1))
        };
        observer.on_event(&TabModelEvent::RestoreCompleted);
        assert_eq!(count.get(), 1);
    }
}
