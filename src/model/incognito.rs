use super::empty::EmptyTabModel;
use super::observer::{TabModelEvent, TabModelObserver};
use super::tab_list::{TabList, TabListSnapshot};
use super::tab_model::{CloseTabParams, TabModel};
use crate::observer::ObserverList;
use crate::tab::{Tab, TabCreationState, TabId, TabLaunchType, TabRef, TabSelectionType};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Builds the real incognito model when the first incognito tab arrives.
pub type TabModelFactory = Box<dyn Fn() -> Rc<dyn TabModel>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncognitoTabModelEvent {
    /// The first tab of an incognito session was added
    WasFirstTabCreated,
    /// The last incognito tab is gone and the real model was torn down
    DidBecomeEmpty,
}

pub trait IncognitoTabModelObserver {
    fn on_incognito_event(&self, event: IncognitoTabModelEvent);
}

impl<F: Fn(IncognitoTabModelEvent)> IncognitoTabModelObserver for F {
    fn on_incognito_event(&self, event: IncognitoTabModelEvent) {
        self(event)
    }
}

/// Marks a mutation in flight. The delegate is never swapped while one is alive.
struct MutationGuard<'a> {
    depth: &'a Cell<u32>,
}

impl<'a> MutationGuard<'a> {
    fn new(depth: &'a Cell<u32>) -> Self {
        depth.set(depth.get() + 1);
        Self { depth }
    }
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

/// Incognito model that only holds a real model while incognito tabs exist.
///
/// ```text
///            add_tab (delegate is EmptyTabModel)
///   EMPTY ─────────────────────────────────────────▶ LIVE
///     ▲                                                │
///     └────────────────────────────────────────────────┘
///       end of close/commit/remove/set_active(false),
///       comprehensive count == 0 and no mutation in flight
/// ```
///
/// Observers registered here survive any number of EMPTY/LIVE cycles: they are replayed
/// onto every new delegate.
pub struct IncognitoTabModel {
    factory: TabModelFactory,
    delegate: RefCell<Option<Rc<dyn TabModel>>>,
    observers: ObserverList<dyn TabModelObserver>,
    incognito_observers: ObserverList<dyn IncognitoTabModelObserver>,
    active: Cell<bool>,
    mutation_depth: Cell<u32>,
    first_tab_notified: Cell<bool>,
}

impl IncognitoTabModel {
    pub fn new(factory: TabModelFactory) -> Self {
        Self {
            factory,
            delegate: RefCell::new(None),
            observers: ObserverList::new(),
            incognito_observers: ObserverList::new(),
            active: Cell::new(false),
            mutation_depth: Cell::new(0),
            first_tab_notified: Cell::new(false),
        }
    }

    /// Whether a real model currently backs this one
    pub fn is_live(&self) -> bool {
        self.delegate.borrow().is_some()
    }

    pub fn add_incognito_observer(&self, observer: Rc<dyn IncognitoTabModelObserver>) {
        self.incognito_observers.add(observer);
    }

    pub fn remove_incognito_observer(&self, observer: &Rc<dyn IncognitoTabModelObserver>) {
        self.incognito_observers.remove(observer);
    }

    fn delegate(&self) -> Rc<dyn TabModel> {
        self.delegate
            .borrow()
            .clone()
            .unwrap_or_else(|| EmptyTabModel::shared(true))
    }

    fn ensure_tab_model(&self) {
        if self.is_live() {
            return;
        }
        let model = (self.factory)();
        for observer in self.observers.snapshot() {
            model.add_observer(observer);
        }
        model.set_active(self.active.get());
        *self.delegate.borrow_mut() = Some(model);
        tracing::debug!("Incognito tab model created");
    }

    fn destroy_if_necessary(&self) {
        if self.mutation_depth.get() != 0 {
            return;
        }
        let model = match self.delegate.borrow().as_ref() {
            Some(model) if model.comprehensive_count() == 0 => model.clone(),
            _ => return,
        };
        *self.delegate.borrow_mut() = None;
        model.destroy();
        self.first_tab_notified.set(false);
        tracing::debug!("Incognito tab model destroyed");
        self.incognito_observers
            .for_each(|o| o.on_incognito_event(IncognitoTabModelEvent::DidBecomeEmpty));
    }

    /// Run a mutation on the delegate, then drop the delegate if it ended up empty.
    fn mutate<R>(&self, f: impl FnOnce(&dyn TabModel) -> R) -> R {
        let result = {
            let _guard = MutationGuard::new(&self.mutation_depth);
            let delegate = self.delegate();
            f(&*delegate)
        };
        self.destroy_if_necessary();
        result
    }
}

impl TabList for IncognitoTabModel {
    fn is_incognito(&self) -> bool {
        true
    }

    fn index(&self) -> Option<usize> {
        self.delegate().index()
    }

    fn count(&self) -> usize {
        self.delegate().count()
    }

    fn tab_at(&self, index: usize) -> Option<TabRef> {
        self.delegate().tab_at(index)
    }

    fn index_of(&self, tab: &Tab) -> Option<usize> {
        self.delegate().index_of(tab)
    }

    fn is_closure_pending(&self, tab_id: TabId) -> bool {
        self.delegate().is_closure_pending(tab_id)
    }

    fn tab_by_id(&self, tab_id: TabId) -> Option<TabRef> {
        self.delegate().tab_by_id(tab_id)
    }

    fn tabs(&self) -> Vec<TabRef> {
        self.delegate().tabs()
    }
}

impl TabModel for IncognitoTabModel {
    fn supports_pending_closures(&self) -> bool {
        self.delegate().supports_pending_closures()
    }

    fn is_active_model(&self) -> bool {
        self.active.get()
    }

    fn set_active(&self, active: bool) {
        self.active.set(active);
        {
            let _guard = MutationGuard::new(&self.mutation_depth);
            self.delegate().set_active(active);
        }
        if !active {
            self.destroy_if_necessary();
        }
    }

    fn add_tab(
        &self,
        tab: TabRef,
        index: Option<usize>,
        launch_type: TabLaunchType,
        creation_state: TabCreationState,
    ) {
        let was_empty = {
            let _guard = MutationGuard::new(&self.mutation_depth);
            self.ensure_tab_model();
            let delegate = self.delegate();
            let was_empty = delegate.comprehensive_count() == 0;
            delegate.add_tab(tab, index, launch_type, creation_state);
            was_empty
        };

        if was_empty && !self.first_tab_notified.get() && self.comprehensive_count() > 0 {
            self.first_tab_notified.set(true);
            self.incognito_observers
                .for_each(|o| o.on_incognito_event(IncognitoTabModelEvent::WasFirstTabCreated));
        }
        // A rejected tab must not leave an empty live model behind
        self.destroy_if_necessary();
    }

    fn close_tab(&self, tab: &TabRef, params: CloseTabParams) -> bool {
        self.mutate(|model| model.close_tab(tab, params))
    }

    fn close_multiple_tabs(&self, tabs: &[TabRef], can_undo: bool) {
        self.mutate(|model| model.close_multiple_tabs(tabs, can_undo))
    }

    fn close_all_tabs(&self, upon_exit: bool) {
        self.mutate(|model| model.close_all_tabs(upon_exit))
    }

    fn move_tab(&self, tab_id: TabId, new_index: usize) {
        let _guard = MutationGuard::new(&self.mutation_depth);
        self.delegate().move_tab(tab_id, new_index);
    }

    fn set_index(&self, index: usize, selection_type: TabSelectionType, skip_loading_tab: bool) {
        let _guard = MutationGuard::new(&self.mutation_depth);
        self.delegate()
            .set_index(index, selection_type, skip_loading_tab);
    }

    fn remove_tab(&self, tab: &TabRef) {
        self.mutate(|model| model.remove_tab(tab))
    }

    fn commit_tab_closure(&self, tab_id: TabId) -> bool {
        self.mutate(|model| model.commit_tab_closure(tab_id))
    }

    /// Nothing to commit while EMPTY, so this never creates or destroys the real model
    /// on its own; an add in flight keeps it alive through the mutation guard.
    fn commit_all_tab_closures(&self) {
        if self.comprehensive_count() == 0 {
            return;
        }
        self.mutate(|model| model.commit_all_tab_closures())
    }

    fn cancel_tab_closure(&self, tab_id: TabId) -> bool {
        let _guard = MutationGuard::new(&self.mutation_depth);
        self.delegate().cancel_tab_closure(tab_id)
    }

    fn comprehensive_model(&self) -> TabListSnapshot {
        match self.delegate.borrow().as_ref() {
            Some(model) => model.comprehensive_model(),
            None => TabListSnapshot::empty(true),
        }
    }

    fn comprehensive_count(&self) -> usize {
        self.delegate().comprehensive_count()
    }

    fn next_tab_if_closed(&self, tab_id: TabId, upon_exit: bool) -> Option<TabRef> {
        self.delegate().next_tab_if_closed(tab_id, upon_exit)
    }

    fn complete_restore(&self) {
        let delegate = self.delegate.borrow().clone();
        match delegate {
            Some(model) => model.complete_restore(),
            // Observers still learn about it while there is no real model
            None => self
                .observers
                .for_each(|o| o.on_event(&TabModelEvent::RestoreCompleted)),
        }
    }

    fn add_observer(&self, observer: Rc<dyn TabModelObserver>) {
        self.observers.add(observer.clone());
        let delegate = self.delegate.borrow().clone();
        if let Some(model) = delegate {
            model.add_observer(observer);
        }
    }

    fn remove_observer(&self, observer: &Rc<dyn TabModelObserver>) {
        self.observers.remove(observer);
        let delegate = self.delegate.borrow().clone();
        if let Some(model) = delegate {
            model.remove_observer(observer);
        }
    }

    fn destroy(&self) {
        let model = self.delegate.borrow_mut().take();
        if let Some(model) = model {
            model.destroy();
        }
        self.first_tab_notified.set(false);
        self.observers.clear();
        self.incognito_observers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TabModelImpl;
    use crate::test_support::{add_all, ids, incognito_tab, EventLog};

    fn incognito_model(undo: bool) -> Rc<IncognitoTabModel> {
        Rc::new(IncognitoTabModel::new(Box::new(move || {
            Rc::new(TabModelImpl::new(true, undo)) as Rc<dyn TabModel>
        })))
    }

    fn record_incognito_events(
        model: &IncognitoTabModel,
    ) -> Rc<RefCell<Vec<IncognitoTabModelEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        model.add_incognito_observer(Rc::new(move |event: IncognitoTabModelEvent| {
            sink.borrow_mut().push(event)
        }));
        events
    }

    // === Lazy lifecycle tests ===

    #[test]
    fn test_starts_empty() {
        let model = incognito_model(false);
        assert!(!model.is_live());
        assert!(model.is_incognito());
        assert_eq!(model.count(), 0);
        assert!(model.current_tab().is_none());
    }

    #[test]
    fn test_first_add_creates_real_model() {
        let model = incognito_model(false);
        let events = record_incognito_events(&model);
        add_all(&*model, &[incognito_tab(1)]);

        assert!(model.is_live());
        assert_eq!(ids(&*model), vec![1]);
        assert_eq!(
            *events.borrow(),
            vec![IncognitoTabModelEvent::WasFirstTabCreated]
        );
    }

    #[test]
    fn test_closing_last_tab_destroys_real_model() {
        let model = incognito_model(false);
        let events = record_incognito_events(&model);
        let tab = incognito_tab(1);
        add_all(&*model, &[tab.clone()]);

        assert!(model.close_tab(&tab, CloseTabParams::immediate()));
        assert!(!model.is_live());
        assert!(tab.is_destroyed());
        assert_eq!(
            *events.borrow(),
            vec![
                IncognitoTabModelEvent::WasFirstTabCreated,
                IncognitoTabModelEvent::DidBecomeEmpty
            ]
        );
    }

    #[test]
    fn test_batch_close_destroys_once_at_end() {
        let model = incognito_model(false);
        let events = record_incognito_events(&model);
        let tabs: Vec<TabRef> = (1..=3).map(incognito_tab).collect();
        add_all(&*model, &tabs);

        model.close_multiple_tabs(&tabs, false);
        assert!(!model.is_live());
        assert!(tabs.iter().all(|t| t.is_destroyed()));
        let empties = events
            .borrow()
            .iter()
            .filter(|e| **e == IncognitoTabModelEvent::DidBecomeEmpty)
            .count();
        assert_eq!(empties, 1);
    }

    #[test]
    fn test_pending_closure_keeps_model_live() {
        let model = incognito_model(true);
        let tab = incognito_tab(1);
        add_all(&*model, &[tab.clone()]);

        model.close_tab(&tab, CloseTabParams::undoable());
        assert!(model.is_live());
        assert_eq!(model.count(), 0);
        assert_eq!(model.comprehensive_count(), 1);

        assert!(model.cancel_tab_closure(tab.id()));
        assert_eq!(ids(&*model), vec![1]);

        model.close_tab(&tab, CloseTabParams::undoable());
        assert!(model.commit_tab_closure(tab.id()));
        assert!(!model.is_live());
    }

    #[test]
    fn test_commit_all_on_empty_model_is_noop() {
        let model = incognito_model(true);
        model.commit_all_tab_closures();
        assert!(!model.is_live());
    }

    #[test]
    fn test_first_tab_notified_once_per_period() {
        let model = incognito_model(false);
        let events = record_incognito_events(&model);
        let first = incognito_tab(1);
        add_all(&*model, &[first.clone(), incognito_tab(2)]);
        assert_eq!(events.borrow().len(), 1);

        model.close_all_tabs(false);
        assert!(!model.is_live());
        add_all(&*model, &[incognito_tab(3)]);
        assert_eq!(
            *events.borrow(),
            vec![
                IncognitoTabModelEvent::WasFirstTabCreated,
                IncognitoTabModelEvent::DidBecomeEmpty,
                IncognitoTabModelEvent::WasFirstTabCreated
            ]
        );
    }

    #[test]
    fn test_set_inactive_keeps_model_with_tabs() {
        let model = incognito_model(false);
        model.set_active(true);
        add_all(&*model, &[incognito_tab(1)]);
        assert!(model.is_active_model());
        assert!(model.is_live());

        model.set_active(false);
        assert!(model.is_live());
    }

    #[test]
    fn test_set_inactive_tears_down_live_model_without_tabs() {
        let inner: Rc<RefCell<Option<Rc<TabModelImpl>>>> = Rc::new(RefCell::new(None));
        let slot = inner.clone();
        let model = IncognitoTabModel::new(Box::new(move || {
            let real = Rc::new(TabModelImpl::new(true, true));
            *slot.borrow_mut() = Some(real.clone());
            real as Rc<dyn TabModel>
        }));
        let events = record_incognito_events(&model);
        model.set_active(true);
        let tab = incognito_tab(1);
        add_all(&model, &[tab.clone()]);
        model.close_tab(&tab, CloseTabParams::undoable());

        // Committed behind the wrapper's back, so nothing has checked for emptiness yet
        let real = inner.borrow().clone().unwrap();
        assert!(real.commit_tab_closure(tab.id()));
        assert!(model.is_live());
        assert_eq!(model.comprehensive_count(), 0);

        model.set_active(false);
        assert!(!model.is_live());
        assert!(!model.is_active_model());
        assert_eq!(
            *events.borrow(),
            vec![
                IncognitoTabModelEvent::WasFirstTabCreated,
                IncognitoTabModelEvent::DidBecomeEmpty
            ]
        );
    }

    // === Observer replay tests ===

    #[test]
    fn test_observers_replayed_onto_new_delegate() {
        let model = incognito_model(false);
        let log = EventLog::attach(&*model);
        let tab = incognito_tab(1);
        add_all(&*model, &[tab.clone()]);
        model.close_tab(&tab, CloseTabParams::immediate());
        add_all(&*model, &[incognito_tab(2)]);

        let entries = log.entries();
        assert!(entries.contains(&"DidAddTab(1)".to_string()));
        assert!(entries.contains(&"DidCloseTab(1)".to_string()));
        assert!(entries.contains(&"DidAddTab(2)".to_string()));
    }

    #[test]
    fn test_active_flag_replayed() {
        let model = incognito_model(false);
        model.set_active(true);
        let tab = incognito_tab(1);
        add_all(&*model, &[tab]);
        let delegate = model.delegate();
        assert!(delegate.is_active_model());
    }

    #[test]
    fn test_restore_completed_reaches_observers_while_empty() {
        let model = incognito_model(false);
        let log = EventLog::attach(&*model);
        model.complete_restore();
        assert_eq!(log.entries(), vec!["RestoreCompleted"]);
    }

    // === Reentrancy tests ===

    #[test]
    fn test_observer_closing_other_tab_does_not_destroy_early() {
        let model = incognito_model(false);
        let events = record_incognito_events(&model);
        let first = incognito_tab(1);
        let second = incognito_tab(2);
        add_all(&*model, &[first.clone(), second.clone()]);

        // While tab 1 closes, an observer closes tab 2 through the wrapper
        let weak = Rc::downgrade(&model);
        let other = second.clone();
        let observer: Rc<dyn TabModelObserver> = Rc::new(move |event: &TabModelEvent| {
            if let TabModelEvent::WillCloseTab { tab, .. } = event {
                if tab.id() == TabId::new(1) {
                    if let Some(model) = weak.upgrade() {
                        model.close_tab(&other, CloseTabParams::immediate());
                        // The outer close is still running, so the model must survive
                        assert!(model.is_live());
                    }
                }
            }
        });
        model.add_observer(observer);

        assert!(model.close_tab(&first, CloseTabParams::immediate()));
        assert!(first.is_destroyed());
        assert!(second.is_destroyed());
        assert!(!model.is_live());
        let empties = events
            .borrow()
            .iter()
            .filter(|e| **e == IncognitoTabModelEvent::DidBecomeEmpty)
            .count();
        assert_eq!(empties, 1);
    }

    #[test]
    fn test_observer_adding_tab_during_add_notifies_first_once() {
        let model = incognito_model(false);
        let events = record_incognito_events(&model);
        let weak = Rc::downgrade(&model);
        let observer: Rc<dyn TabModelObserver> = Rc::new(move |event: &TabModelEvent| {
            if let TabModelEvent::DidAddTab { tab, .. } = event {
                if tab.id() == TabId::new(1) {
                    if let Some(model) = weak.upgrade() {
                        add_all(&*model, &[incognito_tab(2)]);
                    }
                }
            }
        });
        model.add_observer(observer);

        add_all(&*model, &[incognito_tab(1)]);
        assert_eq!(ids(&*model), vec![1, 2]);
        assert_eq!(
            *events.borrow(),
            vec![IncognitoTabModelEvent::WasFirstTabCreated]
        );
    }

    #[test]
    fn test_destroy_releases_tabs() {
        let model = incognito_model(true);
        let tabs: Vec<TabRef> = (1..=2).map(incognito_tab).collect();
        add_all(&*model, &tabs);
        model.close_tab(&tabs[0], CloseTabParams::undoable());
        model.destroy();
        assert!(tabs.iter().all(|t| t.is_destroyed()));
        assert!(!model.is_live());
    }
}
