use super::{TabModelFilter, TabModelFilterFactory};
use crate::model::{TabModel, TabModelObserver};
use std::cell::RefCell;
use std::rc::Rc;

/// Owns one filter per model of a window.
///
/// Observers registered before [`init`](Self::init) are buffered and attached to every
/// filter once they exist.
#[derive(Default)]
pub struct TabModelFilterProvider {
    filters: RefCell<Vec<Rc<dyn TabModelFilter>>>,
    pending_observers: RefCell<Vec<Rc<dyn TabModelObserver>>>,
}

impl TabModelFilterProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&self, factory: &dyn TabModelFilterFactory, models: &[Rc<dyn TabModel>]) {
        if models.is_empty() || !self.filters.borrow().is_empty() {
            tracing::error!(
                models = models.len(),
                "Filter provider initialized twice or without models"
            );
            debug_assert!(false, "filter provider must be initialized once with models");
            return;
        }

        let filters: Vec<Rc<dyn TabModelFilter>> = models
            .iter()
            .map(|model| factory.create_tab_model_filter(model.clone()))
            .collect();
        let pending = std::mem::take(&mut *self.pending_observers.borrow_mut());
        for observer in pending {
            for filter in &filters {
                filter.add_observer(observer.clone());
            }
        }
        *self.filters.borrow_mut() = filters;
    }

    pub fn is_initialized(&self) -> bool {
        !self.filters.borrow().is_empty()
    }

    pub fn tab_model_filter(&self, incognito: bool) -> Option<Rc<dyn TabModelFilter>> {
        self.filters
            .borrow()
            .iter()
            .find(|filter| filter.is_incognito() == incognito)
            .cloned()
    }

    pub fn current_tab_model_filter(&self) -> Option<Rc<dyn TabModelFilter>> {
        self.filters
            .borrow()
            .iter()
            .find(|filter| filter.is_currently_selected_filter())
            .cloned()
    }

    pub fn add_observer(&self, observer: Rc<dyn TabModelObserver>) {
        let filters = self.filters.borrow().clone();
        if filters.is_empty() {
            self.pending_observers.borrow_mut().push(observer);
            return;
        }
        for filter in filters {
            filter.add_observer(observer.clone());
        }
    }

    pub fn remove_observer(&self, observer: &Rc<dyn TabModelObserver>) {
        self.pending_observers
            .borrow_mut()
            .retain(|pending| !Rc::ptr_eq(pending, observer));
        let filters = self.filters.borrow().clone();
        for filter in filters {
            filter.remove_observer(observer);
        }
    }

    /// Recompute every filter from its model
    pub fn reset_tab_model_filters(&self) {
        let filters = self.filters.borrow().clone();
        for filter in filters {
            filter.reset_filter_state();
        }
    }

    pub fn destroy(&self) {
        let filters = std::mem::take(&mut *self.filters.borrow_mut());
        for filter in filters {
            filter.destroy();
        }
        self.pending_observers.borrow_mut().clear();
    }
}
