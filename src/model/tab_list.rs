use crate::tab::{Tab, TabId, TabRef};
use std::collections::HashSet;

/// Read-only view over an ordered collection of tabs.
///
/// Index-based methods return `None` for anything out of range; nothing here panics.
pub trait TabList {
    fn is_incognito(&self) -> bool;

    /// Selected position, or `None` when nothing is selected
    fn index(&self) -> Option<usize>;

    fn count(&self) -> usize;

    fn tab_at(&self, index: usize) -> Option<TabRef>;

    fn index_of(&self, tab: &Tab) -> Option<usize>;

    fn is_closure_pending(&self, tab_id: TabId) -> bool;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }

    fn current_tab(&self) -> Option<TabRef> {
        self.index().and_then(|index| self.tab_at(index))
    }

    fn tab_by_id(&self, tab_id: TabId) -> Option<TabRef> {
        (0..self.count())
            .filter_map(|index| self.tab_at(index))
            .find(|tab| tab.id() == tab_id)
    }

    fn index_of_id(&self, tab_id: TabId) -> Option<usize> {
        (0..self.count()).find(|&index| {
            self.tab_at(index)
                .is_some_and(|tab| tab.id() == tab_id)
        })
    }

    fn tabs(&self) -> Vec<TabRef> {
        (0..self.count())
            .filter_map(|index| self.tab_at(index))
            .collect()
    }

    fn tab_ids(&self) -> Vec<TabId> {
        self.tabs().iter().map(|tab| tab.id()).collect()
    }
}

/// Owned snapshot of a model including tabs pending closure (the "comprehensive" view).
#[derive(Debug, Clone, Default)]
pub struct TabListSnapshot {
    tabs: Vec<TabRef>,
    index: Option<usize>,
    incognito: bool,
    pending: HashSet<TabId>,
}

impl TabListSnapshot {
    pub fn new(
        tabs: Vec<TabRef>,
        index: Option<usize>,
        incognito: bool,
        pending: HashSet<TabId>,
    ) -> Self {
        let index = index.filter(|&i| i < tabs.len());
        Self {
            tabs,
            index,
            incognito,
            pending,
        }
    }

    pub fn empty(incognito: bool) -> Self {
        Self {
            incognito,
            ..Self::default()
        }
    }
}

impl TabList for TabListSnapshot {
    fn is_incognito(&self) -> bool {
        self.incognito
    }

    fn index(&self) -> Option<usize> {
        self.index
    }

    fn count(&self) -> usize {
        self.tabs.len()
    }

    fn tab_at(&self, index: usize) -> Option<TabRef> {
        self.tabs.get(index).cloned()
    }

    fn index_of(&self, tab: &Tab) -> Option<usize> {
        self.tabs.iter().position(|t| t.id() == tab.id())
    }

    fn is_closure_pending(&self, tab_id: TabId) -> bool {
        self.pending.contains(&tab_id)
    }

    fn tabs(&self) -> Vec<TabRef> {
        self.tabs.clone()
    }
}
