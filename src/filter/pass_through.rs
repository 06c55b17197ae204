use super::model_filter::{FilterStrategy, ModelFilter};
use super::{TabModelFilter, TabModelFilterFactory};
use crate::model::{TabList, TabModel};
use crate::tab::{Tab, TabRef};
use std::rc::Rc;

/// Identity strategy: the filter is exactly its model.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl FilterStrategy for PassThrough {
    fn add_tab(
        &mut self,
        _model: &dyn TabModel,
        _tab: &TabRef,
        _restored: bool,
        _resetting: bool,
    ) {
    }

    fn close_tab(&mut self, _model: &dyn TabModel, _tab: &TabRef) {}

    fn select_tab(&mut self, _model: &dyn TabModel, _tab: &TabRef) {}

    fn reorder(&mut self, _model: &dyn TabModel) {}

    fn reset_internal(&mut self) {}

    fn finish_reset(&mut self, _model: &dyn TabModel) {}

    fn count(&self, model: &dyn TabModel) -> usize {
        model.count()
    }

    fn index(&self, model: &dyn TabModel) -> Option<usize> {
        model.index()
    }

    fn tab_at(&self, model: &dyn TabModel, index: usize) -> Option<TabRef> {
        model.tab_at(index)
    }

    fn index_of(&self, model: &dyn TabModel, tab: &Tab) -> Option<usize> {
        model.index_of(tab)
    }
}

/// Filter used when tab grouping is disabled
pub type EmptyTabModelFilter = ModelFilter<PassThrough>;

impl ModelFilter<PassThrough> {
    pub fn create(model: Rc<dyn TabModel>) -> Rc<Self> {
        ModelFilter::new(model, PassThrough)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyTabModelFilterFactory;

impl TabModelFilterFactory for EmptyTabModelFilterFactory {
    fn create_tab_model_filter(&self, model: Rc<dyn TabModel>) -> Rc<dyn TabModelFilter> {
        EmptyTabModelFilter::create(model)
    }
}
