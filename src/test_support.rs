//! Builders and recording observers shared by the unit tests.

use crate::model::{TabList, TabModel, TabModelEvent, TabModelObserver};
use crate::tab::{Tab, TabCreationState, TabId, TabLaunchType, TabRef};
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) fn tab(id: u32) -> TabRef {
    Tab::new(TabId::new(id), false).into_ref()
}

pub(crate) fn incognito_tab(id: u32) -> TabRef {
    Tab::new(TabId::new(id), true).into_ref()
}

pub(crate) fn child_tab(id: u32, parent: u32, launch_type: TabLaunchType) -> TabRef {
    Tab::new(TabId::new(id), false)
        .with_parent(TabId::new(parent))
        .with_launch_type(launch_type)
        .into_ref()
}

/// Raw ids of a list, in order
pub(crate) fn ids<L: TabList + ?Sized>(list: &L) -> Vec<u32> {
    list.tab_ids().iter().map(|id| id.get()).collect()
}

/// Append tabs as if opened from the new tab button
pub(crate) fn add_all<M: TabModel + ?Sized>(model: &M, tabs: &[TabRef]) {
    for tab in tabs {
        model.add_tab(
            tab.clone(),
            None,
            TabLaunchType::FromChromeUi,
            TabCreationState::LiveInForeground,
        );
    }
}

/// Records every event as `Name(tab_id)` (or just `Name`).
#[derive(Default)]
pub(crate) struct EventLog {
    entries: RefCell<Vec<String>>,
}

impl EventLog {
    pub(crate) fn attach<M: TabModel + ?Sized>(model: &M) -> Rc<Self> {
        let log = Rc::new(Self::default());
        model.add_observer(log.clone());
        log
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    pub(crate) fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl TabModelObserver for EventLog {
    fn on_event(&self, event: &TabModelEvent) {
        let entry = match event.tab_id() {
            Some(id) => format!("{}({})", event.name(), id),
            None => event.name().to_string(),
        };
        self.entries.borrow_mut().push(entry);
    }
}
