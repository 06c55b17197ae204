//! Window slot registry.
//!
//! ```text
//!   slots:        [ 0: Some(selector) | 1: None | 2: Some(selector) | ... max ]
//!   assignments:  ActivityId ──→ slot index
//!
//!   request_selector(activity, preferred)
//!     already assigned      → existing (index, selector)
//!     preferred out of range → treat as 0
//!     preferred occupied    → lowest free slot
//!     all occupied          → None
//! ```

use crate::creator::DefaultTabCreatorManager;
use crate::model::TabModel;
use crate::selector::{SelectorOptions, TabModelSelector, TabModelSelectorImpl};
use crate::tab::{TabId, TabIdAllocator, TabRef};
use crate::task::TaskRunner;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use uuid::Uuid;

/// Identity of a window (host activity)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivityId(Uuid);

impl ActivityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActivityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Builds the selector for a newly assigned window slot.
pub trait TabModelSelectorFactory {
    fn build_selector(&self, index: usize) -> Rc<TabModelSelectorImpl>;
}

/// Initialized selectors with the default tab creators; all windows share one id space.
pub struct DefaultSelectorFactory {
    options: SelectorOptions,
    task_runner: Rc<TaskRunner>,
    ids: Rc<TabIdAllocator>,
}

impl DefaultSelectorFactory {
    pub fn new(
        options: SelectorOptions,
        task_runner: Rc<TaskRunner>,
        ids: Rc<TabIdAllocator>,
    ) -> Self {
        Self {
            options,
            task_runner,
            ids,
        }
    }
}

impl TabModelSelectorFactory for DefaultSelectorFactory {
    fn build_selector(&self, index: usize) -> Rc<TabModelSelectorImpl> {
        let selector = TabModelSelectorImpl::new(self.options, self.task_runner.clone());
        selector.initialize();
        let weak = Rc::downgrade(&selector) as Weak<dyn TabModelSelector>;
        let manager = DefaultTabCreatorManager::new(self.ids.clone(), weak);
        selector.set_tab_creator_manager(Rc::new(manager));
        tracing::trace!(index, "Selector built");
        selector
    }
}

pub struct TabWindowManager {
    factory: Box<dyn TabModelSelectorFactory>,
    slots: RefCell<Vec<Option<Rc<TabModelSelectorImpl>>>>,
    assignments: RefCell<HashMap<ActivityId, usize>>,
}

impl TabWindowManager {
    pub fn new(max_selectors: usize, factory: Box<dyn TabModelSelectorFactory>) -> Self {
        Self {
            factory,
            slots: RefCell::new(vec![None; max_selectors]),
            assignments: RefCell::new(HashMap::new()),
        }
    }

    pub fn max_selector_count(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn assigned_selector_count(&self) -> usize {
        self.slots.borrow().iter().filter(|slot| slot.is_some()).count()
    }

    /// Assign a selector to `activity`, preferring slot `preferred_index`.
    pub fn request_selector(
        &self,
        activity: ActivityId,
        preferred_index: usize,
    ) -> Option<(usize, Rc<TabModelSelectorImpl>)> {
        let assigned = self.assignments.borrow().get(&activity).copied();
        if let Some(index) = assigned {
            return self.selector_at(index).map(|selector| (index, selector));
        }

        let index = {
            let slots = self.slots.borrow();
            let preferred = if preferred_index < slots.len() {
                preferred_index
            } else {
                0
            };
            match slots.get(preferred) {
                Some(None) => preferred,
                _ => slots.iter().position(|slot| slot.is_none())?,
            }
        };

        let selector = self.factory.build_selector(index);
        self.slots.borrow_mut()[index] = Some(selector.clone());
        self.assignments.borrow_mut().insert(activity, index);
        tracing::debug!(%activity, index, preferred_index, "Window slot assigned");
        Some((index, selector))
    }

    /// Free the activity's slot and destroy its selector
    pub fn on_activity_destroyed(&self, activity: ActivityId) {
        let Some(index) = self.assignments.borrow_mut().remove(&activity) else {
            return;
        };
        let selector = self
            .slots
            .borrow_mut()
            .get_mut(index)
            .and_then(|slot| slot.take());
        if let Some(selector) = selector {
            selector.destroy();
        }
        tracing::debug!(%activity, index, "Window slot freed");
    }

    pub fn index_for_activity(&self, activity: ActivityId) -> Option<usize> {
        self.assignments.borrow().get(&activity).copied()
    }

    pub fn selector_at(&self, index: usize) -> Option<Rc<TabModelSelectorImpl>> {
        self.slots.borrow().get(index).cloned().flatten()
    }

    /// Assigned selectors with their slot index, lowest slot first
    pub fn selectors(&self) -> Vec<(usize, Rc<TabModelSelectorImpl>)> {
        self.slots
            .borrow()
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.clone().map(|selector| (index, selector)))
            .collect()
    }

    pub fn tab_model_for_tab_id(&self, tab_id: TabId) -> Option<Rc<dyn TabModel>> {
        self.selectors()
            .into_iter()
            .find_map(|(_, selector)| selector.model_for_tab_id(tab_id))
    }

    pub fn find_tab(&self, tab_id: TabId) -> Option<TabRef> {
        self.selectors()
            .into_iter()
            .find_map(|(_, selector)| selector.tab_by_id(tab_id))
    }
}
