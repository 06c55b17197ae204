mod observer;
mod selector_impl;

pub use observer::{TabModelSelectorEvent, TabModelSelectorObserver};
pub use selector_impl::{SelectorOptions, TabModelSelectorImpl};

use crate::filter::TabModelFilter;
use crate::model::TabModel;
use crate::tab::{TabId, TabRef};
use std::rc::Rc;

/// Per-window aggregate of the regular and incognito models.
pub trait TabModelSelector {
    fn model(&self, incognito: bool) -> Rc<dyn TabModel>;

    fn is_incognito_selected(&self) -> bool;

    fn select_model(&self, incognito: bool);

    /// Filter of the currently selected model, once filters exist
    fn current_filter(&self) -> Option<Rc<dyn TabModelFilter>>;

    fn is_tab_state_initialized(&self) -> bool;

    fn is_reparenting_in_progress(&self) -> bool;

    /// Tabs survive the selector's destruction from now on
    fn enter_reparenting_mode(&self);

    fn current_model(&self) -> Rc<dyn TabModel> {
        self.model(self.is_incognito_selected())
    }

    fn current_tab(&self) -> Option<TabRef> {
        self.current_model().current_tab()
    }

    fn current_tab_id(&self) -> Option<TabId> {
        self.current_tab().map(|tab| tab.id())
    }

    fn total_tab_count(&self) -> usize {
        self.model(false).count() + self.model(true).count()
    }

    fn model_for_tab_id(&self, tab_id: TabId) -> Option<Rc<dyn TabModel>> {
        [false, true]
            .into_iter()
            .map(|incognito| self.model(incognito))
            .find(|model| model.tab_by_id(tab_id).is_some())
    }

    fn tab_by_id(&self, tab_id: TabId) -> Option<TabRef> {
        self.model(false)
            .tab_by_id(tab_id)
            .or_else(|| self.model(true).tab_by_id(tab_id))
    }

    fn commit_all_tab_closures(&self) {
        self.model(false).commit_all_tab_closures();
        self.model(true).commit_all_tab_closures();
    }
}
