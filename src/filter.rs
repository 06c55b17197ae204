//! Filtered views over a tab model.
//!
//! A filter observes one model, keeps whatever secondary state it needs (tab groups)
//! and re-broadcasts model events to its own observers after that state is updated.

mod model_filter;
mod pass_through;
mod provider;
mod tab_group;

pub use model_filter::{FilterStrategy, ModelFilter};
pub use pass_through::{EmptyTabModelFilter, EmptyTabModelFilterFactory, PassThrough};
pub use provider::TabModelFilterProvider;
pub use tab_group::{
    TabGroupEvent, TabGroupModelFilter, TabGroupModelFilterFactory, TabGroupObserver,
    TabGroupState,
};

use crate::model::{TabList, TabModel, TabModelObserver};
use crate::tab::{Tab, TabId, TabRef};
use std::any::Any;
use std::rc::Rc;

/// A [`TabList`] derived from a model.
pub trait TabModelFilter: TabList {
    fn tab_model(&self) -> Rc<dyn TabModel>;

    fn add_observer(&self, observer: Rc<dyn TabModelObserver>);

    fn remove_observer(&self, observer: &Rc<dyn TabModelObserver>);

    fn is_currently_selected_filter(&self) -> bool {
        self.tab_model().is_active_model()
    }

    /// Whether the model has seen `RestoreCompleted`
    fn is_tab_model_restored(&self) -> bool;

    /// Every live tab related to `tab_id`, in model order. Just the tab itself when
    /// nothing relates it to others.
    fn related_tab_list(&self, tab_id: TabId) -> Vec<TabRef>;

    fn related_tab_ids(&self, tab_id: TabId) -> Vec<TabId> {
        self.related_tab_list(tab_id)
            .iter()
            .map(|tab| tab.id())
            .collect()
    }

    fn has_other_related_tabs(&self, tab: &Tab) -> bool;

    /// Adjust a proposed model insertion index so the filter's invariants survive it.
    fn valid_position(&self, new_tab: &Tab, position: Option<usize>) -> Option<usize>;

    fn reset_filter_state(&self);

    /// Detach from the model and drop all observers
    fn destroy(&self);

    fn as_any(&self) -> &dyn Any;
}

/// Builds the filter installed on each model of a window.
pub trait TabModelFilterFactory {
    fn create_tab_model_filter(&self, model: Rc<dyn TabModel>) -> Rc<dyn TabModelFilter>;
}
