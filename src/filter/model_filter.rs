use super::TabModelFilter;
use crate::model::{TabList, TabModel, TabModelEvent, TabModelObserver};
use crate::observer::ObserverList;
use crate::tab::{Tab, TabId, TabRef};
use std::any::Any;
use std::cell::{Cell, Ref, RefCell};
use std::rc::{Rc, Weak};

/// Secondary state a [`ModelFilter`] keeps on top of its model.
///
/// Hooks run with the strategy mutably borrowed, so they may read the model but must
/// not notify anyone directly. Notifications are queued and handed out through
/// [`take_pending_notifications`](Self::take_pending_notifications) once the borrow is
/// released.
pub trait FilterStrategy: 'static {
    fn add_tab(&mut self, model: &dyn TabModel, tab: &TabRef, restored: bool, resetting: bool);

    fn close_tab(&mut self, model: &dyn TabModel, tab: &TabRef);

    fn remove_tab(&mut self, model: &dyn TabModel, tab: &TabRef) {
        self.close_tab(model, tab);
    }

    fn select_tab(&mut self, model: &dyn TabModel, tab: &TabRef);

    fn reorder(&mut self, model: &dyn TabModel);

    fn reset_internal(&mut self);

    /// Called after every live tab has been replayed into a cleared state.
    fn finish_reset(&mut self, model: &dyn TabModel) {
        if let Some(tab) = model.current_tab() {
            self.select_tab(model, &tab);
        }
    }

    /// Returns whether the move should be relayed to filter observers.
    fn on_move(
        &mut self,
        model: &dyn TabModel,
        _tab: &TabRef,
        _new_index: usize,
        _old_index: usize,
        _restored: bool,
    ) -> bool {
        self.reorder(model);
        true
    }

    fn should_notify_on_select(&self) -> bool {
        true
    }

    fn take_pending_notifications(&mut self) -> Option<Box<dyn FnOnce()>> {
        None
    }

    fn count(&self, model: &dyn TabModel) -> usize;

    fn index(&self, model: &dyn TabModel) -> Option<usize>;

    fn tab_at(&self, model: &dyn TabModel, index: usize) -> Option<TabRef>;

    fn index_of(&self, model: &dyn TabModel, tab: &Tab) -> Option<usize>;

    fn related_tab_list(&self, model: &dyn TabModel, tab_id: TabId) -> Vec<TabRef> {
        model.tab_by_id(tab_id).into_iter().collect()
    }

    fn has_other_related_tabs(&self, _model: &dyn TabModel, _tab: &Tab) -> bool {
        false
    }

    fn valid_position(
        &self,
        _model: &dyn TabModel,
        _tab: &Tab,
        position: Option<usize>,
        _restored: bool,
    ) -> Option<usize> {
        position
    }

    /// Rebuild everything from the model: clear, replay live tabs in order, reselect.
    fn reset(&mut self, model: &dyn TabModel, restored: bool) {
        self.reset_internal();
        for tab in model.tabs() {
            self.add_tab(model, &tab, restored, true);
        }
        self.finish_reset(model);
    }
}

/// Relays one model's events through a [`FilterStrategy`] and re-broadcasts them.
pub struct ModelFilter<S: FilterStrategy> {
    model: Rc<dyn TabModel>,
    state: RefCell<S>,
    restored: Cell<bool>,
    observers: ObserverList<dyn TabModelObserver>,
    bridge: RefCell<Option<Rc<dyn TabModelObserver>>>,
}

/// Registered on the model in place of the filter so the model never owns the filter
struct FilterBridge<S: FilterStrategy> {
    filter: Weak<ModelFilter<S>>,
}

impl<S: FilterStrategy> TabModelObserver for FilterBridge<S> {
    fn on_event(&self, event: &TabModelEvent) {
        if let Some(filter) = self.filter.upgrade() {
            filter.handle_event(event);
        }
    }
}

impl<S: FilterStrategy> ModelFilter<S> {
    pub fn new(model: Rc<dyn TabModel>, strategy: S) -> Rc<Self> {
        let filter = Rc::new(Self {
            model,
            state: RefCell::new(strategy),
            restored: Cell::new(false),
            observers: ObserverList::new(),
            bridge: RefCell::new(None),
        });
        let bridge: Rc<dyn TabModelObserver> = Rc::new(FilterBridge {
            filter: Rc::downgrade(&filter),
        });
        filter.model.add_observer(bridge.clone());
        *filter.bridge.borrow_mut() = Some(bridge);

        if !filter.model.is_empty() {
            filter.reset_filter_state();
        }
        filter
    }

    pub(super) fn state(&self) -> Ref<'_, S> {
        self.state.borrow()
    }

    /// Run a strategy hook, then deliver whatever it queued.
    pub(super) fn with_state<R>(&self, f: impl FnOnce(&mut S, &dyn TabModel) -> R) -> R {
        let result = {
            let mut state = self.state.borrow_mut();
            f(&mut *state, &*self.model)
        };
        let pending = self.state.borrow_mut().take_pending_notifications();
        if let Some(deliver) = pending {
            deliver();
        }
        result
    }

    pub(super) fn handle_event(&self, event: &TabModelEvent) {
        let restored = self.restored.get();
        match event {
            TabModelEvent::DidAddTab { tab, .. } | TabModelEvent::TabClosureUndone { tab } => {
                self.with_state(|state, model| state.add_tab(model, tab, restored, false));
            }
            TabModelEvent::WillCloseTab { tab, .. } => {
                self.with_state(|state, model| state.close_tab(model, tab));
            }
            TabModelEvent::TabRemoved { tab } => {
                self.with_state(|state, model| state.remove_tab(model, tab));
            }
            TabModelEvent::DidSelectTab { tab, .. } => {
                let notify = self.with_state(|state, model| {
                    state.select_tab(model, tab);
                    state.should_notify_on_select()
                });
                if !notify {
                    return;
                }
            }
            TabModelEvent::DidMoveTab {
                tab,
                new_index,
                old_index,
            } => {
                let relay = self.with_state(|state, model| {
                    state.on_move(model, tab, *new_index, *old_index, restored)
                });
                if !relay {
                    return;
                }
            }
            TabModelEvent::RestoreCompleted => {
                self.restored.set(true);
                self.reset_filter_state();
            }
            _ => {}
        }
        self.observers.for_each(|observer| observer.on_event(event));
    }

    /// Recompute all secondary state from the model's current content
    pub fn reset_filter_state(&self) {
        let restored = self.restored.get();
        tracing::trace!(incognito = self.model.is_incognito(), "Resetting filter state");
        self.with_state(|state, model| state.reset(model, restored));
    }
}

impl<S: FilterStrategy> TabList for ModelFilter<S> {
    fn is_incognito(&self) -> bool {
        self.model.is_incognito()
    }

    fn index(&self) -> Option<usize> {
        self.state.borrow().index(&*self.model)
    }

    fn count(&self) -> usize {
        self.state.borrow().count(&*self.model)
    }

    fn tab_at(&self, index: usize) -> Option<TabRef> {
        self.state.borrow().tab_at(&*self.model, index)
    }

    fn index_of(&self, tab: &Tab) -> Option<usize> {
        self.state.borrow().index_of(&*self.model, tab)
    }

    fn is_closure_pending(&self, tab_id: TabId) -> bool {
        self.model.is_closure_pending(tab_id)
    }
}

impl<S: FilterStrategy> TabModelFilter for ModelFilter<S> {
    fn tab_model(&self) -> Rc<dyn TabModel> {
        self.model.clone()
    }

    fn add_observer(&self, observer: Rc<dyn TabModelObserver>) {
        self.observers.add(observer);
    }

    fn remove_observer(&self, observer: &Rc<dyn TabModelObserver>) {
        self.observers.remove(observer);
    }

    fn is_tab_model_restored(&self) -> bool {
        self.restored.get()
    }

    fn related_tab_list(&self, tab_id: TabId) -> Vec<TabRef> {
        self.state.borrow().related_tab_list(&*self.model, tab_id)
    }

    fn has_other_related_tabs(&self, tab: &Tab) -> bool {
        self.state.borrow().has_other_related_tabs(&*self.model, tab)
    }

    fn valid_position(&self, new_tab: &Tab, position: Option<usize>) -> Option<usize> {
        self.state
            .borrow()
            .valid_position(&*self.model, new_tab, position, self.restored.get())
    }

    fn reset_filter_state(&self) {
        ModelFilter::reset_filter_state(self);
    }

    fn destroy(&self) {
        let bridge = self.bridge.borrow_mut().take();
        if let Some(bridge) = bridge {
            self.model.remove_observer(&bridge);
        }
        self.observers.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
