use super::observer::{TabModelEvent, TabModelObserver};
use super::tab_list::{TabList, TabListSnapshot};
use super::tab_model::{CloseTabParams, TabModel, TabModelDelegate, TabModelOrderController};
use crate::observer::ObserverList;
use crate::tab::{Tab, TabCreationState, TabId, TabLaunchType, TabRef, TabSelectionType};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};

#[derive(Default)]
struct ModelState {
    /// Every tab in display order, live or pending closure
    tabs: Vec<TabRef>,
    pending: HashSet<TabId>,
    selected: Option<TabId>,
}

impl ModelState {
    fn live(&self) -> impl Iterator<Item = &TabRef> + '_ {
        self.tabs
            .iter()
            .filter(move |tab| !self.pending.contains(&tab.id()))
    }

    fn live_count(&self) -> usize {
        self.live().count()
    }

    fn live_at(&self, index: usize) -> Option<&TabRef> {
        self.live().nth(index)
    }

    fn live_index_of(&self, tab_id: TabId) -> Option<usize> {
        self.live().position(|tab| tab.id() == tab_id)
    }

    fn is_live(&self, tab_id: TabId) -> bool {
        self.live_index_of(tab_id).is_some()
    }

    fn position_of(&self, tab_id: TabId) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.id() == tab_id)
    }

    fn selected_index(&self) -> Option<usize> {
        self.selected.and_then(|id| self.live_index_of(id))
    }

    /// Position in `tabs` that makes a new tab appear at live `index`
    fn insertion_position(&self, index: usize) -> usize {
        self.live_at(index)
            .and_then(|tab| self.position_of(tab.id()))
            .unwrap_or(self.tabs.len())
    }

    fn take(&mut self, tab_id: TabId) -> Option<TabRef> {
        let position = self.position_of(tab_id)?;
        self.pending.remove(&tab_id);
        if self.selected == Some(tab_id) {
            self.selected = None;
        }
        Some(self.tabs.remove(position))
    }
}

/// The real tab container.
///
/// Live tabs and tabs pending closure share one ordered vector; the live view skips the
/// pending ones. Cancelling a closure therefore puts the tab back exactly where it was.
/// No `RefCell` borrow is held while observers run.
pub struct TabModelImpl {
    incognito: bool,
    supports_undo: bool,
    state: RefCell<ModelState>,
    active: Cell<bool>,
    destroyed: Cell<bool>,
    observers: ObserverList<dyn TabModelObserver>,
    order_controller: Option<Rc<dyn TabModelOrderController>>,
    delegate: Option<Weak<dyn TabModelDelegate>>,
}

impl TabModelImpl {
    pub fn new(incognito: bool, supports_undo: bool) -> Self {
        Self {
            incognito,
            supports_undo,
            state: RefCell::new(ModelState::default()),
            active: Cell::new(false),
            destroyed: Cell::new(false),
            observers: ObserverList::new(),
            order_controller: None,
            delegate: None,
        }
    }

    pub fn with_order_controller(mut self, controller: Rc<dyn TabModelOrderController>) -> Self {
        self.order_controller = Some(controller);
        self
    }

    pub fn with_delegate(mut self, delegate: Weak<dyn TabModelDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    fn delegate(&self) -> Option<Rc<dyn TabModelDelegate>> {
        self.delegate.as_ref()?.upgrade()
    }

    fn is_current_model(&self) -> bool {
        match self.delegate() {
            Some(delegate) => delegate.is_incognito_selected() == self.incognito,
            None => true,
        }
    }

    fn is_live(&self, tab_id: TabId) -> bool {
        self.state.borrow().is_live(tab_id)
    }

    fn notify(&self, event: TabModelEvent) {
        tracing::trace!(
            event = event.name(),
            incognito = self.incognito,
            "Dispatching tab model event"
        );
        self.observers.for_each(|observer| observer.on_event(&event));
    }

    /// Look in this model first, then in the sibling model of the same window
    fn find_tab(&self, tab_id: TabId) -> Option<TabRef> {
        self.tab_by_id(tab_id)
            .or_else(|| self.delegate().and_then(|d| d.find_tab(tab_id)))
    }

    /// Nearest live neighbour that is not closing, looking left first
    fn adjacent_live_tab(&self, tab_id: TabId) -> Option<TabRef> {
        let index = self.index_of_id(tab_id)?;
        (0..index)
            .rev()
            .chain(index + 1..self.count())
            .filter_map(|i| self.tab_at(i))
            .find(|tab| tab.id() != tab_id && !tab.is_closing())
    }

    fn start_tab_closure(
        &self,
        tab: &TabRef,
        recommended_next: Option<&TabRef>,
        animate: bool,
        upon_exit: bool,
        can_undo: bool,
    ) -> bool {
        if !self.is_live(tab.id()) {
            return false;
        }
        tab.set_closing(true);
        self.notify(TabModelEvent::WillCloseTab {
            tab: tab.clone(),
            animate,
        });
        if !self.is_live(tab.id()) {
            return false;
        }

        let next = recommended_next
            .filter(|next| next.id() != tab.id() && !next.is_closing() && self.is_live(next.id()))
            .cloned()
            .or_else(|| self.next_tab_if_closed(tab.id(), upon_exit));

        if !can_undo {
            self.commit_all_tab_closures();
        }

        let selection_type = if upon_exit {
            TabSelectionType::FromExit
        } else {
            TabSelectionType::FromClose
        };
        tracing::debug!(
            tab_id = %tab.id(),
            incognito = self.incognito,
            can_undo,
            next = ?next.as_ref().map(|t| t.id()),
            "Closing tab"
        );
        self.detach_and_select_next(tab, next, can_undo, selection_type);
        true
    }

    /// Take `tab` out of the live view and move the selection to `next`.
    fn detach_and_select_next(
        &self,
        tab: &TabRef,
        next: Option<TabRef>,
        keep_pending: bool,
        selection_type: TabSelectionType,
    ) {
        let current_id = self.current_tab().map(|t| t.id());
        let adjacent = self.adjacent_live_tab(tab.id());
        {
            let mut state = self.state.borrow_mut();
            if keep_pending {
                state.pending.insert(tab.id());
                if state.selected == Some(tab.id()) {
                    state.selected = None;
                }
            } else {
                state.take(tab.id());
            }
        }

        let Some(next) = next else {
            return;
        };
        if current_id == Some(next.id()) && current_id != Some(tab.id()) {
            // A background tab closed; the selection stays put
            return;
        }

        if next.is_incognito() != self.incognito {
            // Keep something selected here for when this model is shown again
            if let Some(adjacent) = adjacent.filter(|t| self.is_live(t.id())) {
                self.state.borrow_mut().selected = Some(adjacent.id());
            }
            if let Some(delegate) = self.delegate() {
                let model = delegate.model(next.is_incognito());
                if let Some(index) = model.index_of(&next) {
                    model.set_index(index, selection_type, false);
                }
            }
        } else if let Some(index) = self.index_of(&next) {
            self.set_index(index, selection_type, false);
        }
    }

    fn finalize_tab_closure(&self, tab: &TabRef, committed: bool) {
        self.notify(TabModelEvent::OnFinishingTabClosure { tab: tab.clone() });
        if committed {
            self.notify(TabModelEvent::TabClosureCommitted { tab: tab.clone() });
        } else {
            self.notify(TabModelEvent::DidCloseTab {
                tab_id: tab.id(),
                incognito: self.incognito,
            });
        }
        tab.destroy();
    }

    /// Live tabs in order, marked closing, for the batch close paths.
    fn mark_closing(&self, tabs: &[TabRef]) -> Vec<TabRef> {
        let tabs: Vec<TabRef> = tabs
            .iter()
            .filter(|tab| !tab.is_closing() && self.is_live(tab.id()))
            .cloned()
            .collect();
        for tab in &tabs {
            tab.set_closing(true);
        }
        tabs
    }
}

impl TabList for TabModelImpl {
    fn is_incognito(&self) -> bool {
        self.incognito
    }

    fn index(&self) -> Option<usize> {
        self.state.borrow().selected_index()
    }

    fn count(&self) -> usize {
        self.state.borrow().live_count()
    }

    fn tab_at(&self, index: usize) -> Option<TabRef> {
        self.state.borrow().live_at(index).cloned()
    }

    fn index_of(&self, tab: &Tab) -> Option<usize> {
        self.state.borrow().live_index_of(tab.id())
    }

    fn is_closure_pending(&self, tab_id: TabId) -> bool {
        self.state.borrow().pending.contains(&tab_id)
    }

    fn tab_by_id(&self, tab_id: TabId) -> Option<TabRef> {
        self.state
            .borrow()
            .live()
            .find(|tab| tab.id() == tab_id)
            .cloned()
    }

    fn tabs(&self) -> Vec<TabRef> {
        self.state.borrow().live().cloned().collect()
    }
}

impl TabModel for TabModelImpl {
    fn supports_pending_closures(&self) -> bool {
        self.supports_undo
    }

    fn is_active_model(&self) -> bool {
        self.active.get()
    }

    fn set_active(&self, active: bool) {
        self.active.set(active);
    }

    fn add_tab(
        &self,
        tab: TabRef,
        index: Option<usize>,
        launch_type: TabLaunchType,
        creation_state: TabCreationState,
    ) {
        if tab.is_incognito() != self.incognito {
            tracing::error!(
                tab_id = %tab.id(),
                incognito = self.incognito,
                "Attempting to add a tab to the wrong model"
            );
            debug_assert!(false, "tab {} added to the wrong model", tab.id());
            return;
        }
        if self.state.borrow().position_of(tab.id()).is_some() {
            tracing::error!(tab_id = %tab.id(), "Tab is already in this model");
            debug_assert!(false, "tab {} added twice", tab.id());
            return;
        }

        tab.set_closing(false);
        self.notify(TabModelEvent::WillAddTab {
            tab: tab.clone(),
            launch_type,
        });

        let (index, foreground) = match &self.order_controller {
            Some(controller) => (
                controller.determine_insertion_index(launch_type, index, &tab),
                controller.will_open_in_foreground(launch_type, self.incognito),
            ),
            None => (
                index,
                launch_type != TabLaunchType::FromRestore && !launch_type.opens_in_background(),
            ),
        };

        // Undo is no longer offered once a new tab shows up
        self.commit_all_tab_closures();

        let current_model = self.is_current_model();
        let new_index = {
            let mut state = self.state.borrow_mut();
            let position = match index {
                Some(index) => state.insertion_position(index),
                None => state.tabs.len(),
            };
            state.tabs.insert(position, tab.clone());
            if !current_model && state.selected.is_none() {
                state.selected = state.live_at(0).map(|t| t.id());
            }
            state.live_index_of(tab.id())
        };
        tracing::debug!(
            tab_id = %tab.id(),
            incognito = self.incognito,
            index = ?new_index,
            ?launch_type,
            "Tab added"
        );

        self.notify(TabModelEvent::DidAddTab {
            tab: tab.clone(),
            launch_type,
            creation_state,
        });

        if foreground {
            if let Some(delegate) = self.delegate() {
                delegate.select_model(self.incognito);
            }
            if let Some(index) = self.index_of(&tab) {
                self.set_index(index, TabSelectionType::FromNew, false);
            }
        }
    }

    fn close_tab(&self, tab: &TabRef, params: CloseTabParams) -> bool {
        if tab.is_closing() || !self.is_live(tab.id()) {
            return false;
        }
        let can_undo = params.can_undo && self.supports_pending_closures();
        if !self.start_tab_closure(
            tab,
            params.recommended_next.as_ref(),
            params.animate,
            params.upon_exit,
            can_undo,
        ) {
            return false;
        }
        if can_undo {
            self.notify(TabModelEvent::TabPendingClosure { tab: tab.clone() });
        } else {
            self.finalize_tab_closure(tab, false);
        }
        true
    }

    fn close_multiple_tabs(&self, tabs: &[TabRef], can_undo: bool) {
        let can_undo = can_undo && self.supports_pending_closures();
        // The whole batch is closing before any selection is worked out
        let tabs = self.mark_closing(tabs);
        if !can_undo {
            for tab in tabs {
                if self.start_tab_closure(&tab, None, false, false, false) {
                    self.finalize_tab_closure(&tab, false);
                }
            }
            return;
        }
        if tabs.is_empty() {
            return;
        }
        let mut closed = Vec::with_capacity(tabs.len());
        for tab in tabs {
            if self.start_tab_closure(&tab, None, false, false, true) {
                closed.push(tab);
            }
        }
        let is_all_tabs = self.is_empty();
        self.notify(TabModelEvent::MultipleTabsPendingClosure {
            tabs: closed,
            is_all_tabs,
        });
    }

    fn close_all_tabs(&self, upon_exit: bool) {
        let tabs = self.tabs();
        self.notify(TabModelEvent::WillCloseAllTabs {
            incognito: self.incognito,
        });

        if !upon_exit && self.supports_pending_closures() {
            let tabs = self.mark_closing(&tabs);
            let mut closed = Vec::with_capacity(tabs.len());
            for tab in tabs {
                if self.start_tab_closure(&tab, None, false, false, true) {
                    closed.push(tab);
                }
            }
            self.notify(TabModelEvent::AllTabsPendingClosure { tabs: closed });
        } else {
            self.commit_all_tab_closures();
            let params = CloseTabParams {
                upon_exit,
                ..CloseTabParams::immediate()
            };
            for tab in &tabs {
                self.close_tab(tab, params.clone());
            }
        }
    }

    fn move_tab(&self, tab_id: TabId, new_index: usize) {
        {
            let state = self.state.borrow();
            let new_index = new_index.min(state.live_count());
            match state.live_index_of(tab_id) {
                Some(current) if current != new_index && current + 1 != new_index => {}
                _ => return,
            }
        }
        self.commit_all_tab_closures();

        let (tab, new_index, old_index) = {
            let mut state = self.state.borrow_mut();
            let new_index = new_index.min(state.tabs.len());
            let Some(current) = state.position_of(tab_id) else {
                return;
            };
            if current == new_index || current + 1 == new_index {
                return;
            }
            let tab = state.tabs.remove(current);
            let target = if current < new_index {
                new_index - 1
            } else {
                new_index
            };
            state.tabs.insert(target, tab.clone());
            (tab, target, current)
        };
        tracing::debug!(%tab_id, old_index, new_index, "Tab moved");
        self.notify(TabModelEvent::DidMoveTab {
            tab,
            new_index,
            old_index,
        });
    }

    fn set_index(&self, index: usize, selection_type: TabSelectionType, _skip_loading_tab: bool) {
        let (tab, last_id) = {
            let mut state = self.state.borrow_mut();
            let count = state.live_count();
            if count == 0 {
                state.selected = None;
                return;
            }
            let Some(tab) = state.live_at(index.min(count - 1)).cloned() else {
                return;
            };
            let last_id = state.selected.replace(tab.id());
            (tab, last_id)
        };

        if !self.is_current_model() {
            if let Some(delegate) = self.delegate() {
                delegate.select_model(self.incognito);
            }
        }
        self.notify(TabModelEvent::DidSelectTab {
            tab,
            selection_type,
            last_id,
        });
    }

    fn remove_tab(&self, tab: &TabRef) {
        if self.is_live(tab.id()) {
            let next = self.next_tab_if_closed(tab.id(), false);
            self.detach_and_select_next(tab, next, false, TabSelectionType::FromClose);
        } else if self.state.borrow_mut().take(tab.id()).is_none() {
            return;
        }
        tracing::debug!(tab_id = %tab.id(), incognito = self.incognito, "Tab removed");
        self.notify(TabModelEvent::TabRemoved { tab: tab.clone() });
    }

    fn commit_tab_closure(&self, tab_id: TabId) -> bool {
        let tab = {
            let mut state = self.state.borrow_mut();
            if !state.pending.contains(&tab_id) {
                return false;
            }
            state.take(tab_id)
        };
        let Some(tab) = tab else {
            return false;
        };
        tracing::debug!(%tab_id, incognito = self.incognito, "Tab closure committed");
        self.finalize_tab_closure(&tab, true);
        true
    }

    fn commit_all_tab_closures(&self) {
        let pending: Vec<TabId> = {
            let state = self.state.borrow();
            state
                .tabs
                .iter()
                .map(|tab| tab.id())
                .filter(|id| state.pending.contains(id))
                .collect()
        };
        if pending.is_empty() {
            return;
        }
        for tab_id in pending {
            self.commit_tab_closure(tab_id);
        }
        self.notify(TabModelEvent::AllTabsClosureCommitted {
            incognito: self.incognito,
        });
    }

    fn cancel_tab_closure(&self, tab_id: TabId) -> bool {
        let (tab, reselect) = {
            let mut state = self.state.borrow_mut();
            if !state.pending.remove(&tab_id) {
                return false;
            }
            let Some(tab) = state.tabs.iter().find(|tab| tab.id() == tab_id).cloned() else {
                return false;
            };
            let reselect = state.selected.is_none();
            if reselect {
                state.selected = Some(tab_id);
            }
            (tab, reselect)
        };
        tab.set_closing(false);
        tracing::debug!(%tab_id, incognito = self.incognito, "Tab closure undone");
        self.notify(TabModelEvent::TabClosureUndone { tab: tab.clone() });
        if reselect {
            self.notify(TabModelEvent::DidSelectTab {
                tab,
                selection_type: TabSelectionType::FromUndo,
                last_id: None,
            });
        }
        true
    }

    fn comprehensive_model(&self) -> TabListSnapshot {
        let state = self.state.borrow();
        let index = state.selected.and_then(|id| state.position_of(id));
        TabListSnapshot::new(
            state.tabs.clone(),
            index,
            self.incognito,
            state.pending.clone(),
        )
    }

    fn comprehensive_count(&self) -> usize {
        self.state.borrow().tabs.len()
    }

    fn next_tab_if_closed(&self, tab_id: TabId, upon_exit: bool) -> Option<TabRef> {
        let Some(closing) = self.tab_by_id(tab_id) else {
            return self.current_tab();
        };

        if let Some(current) = self
            .current_tab()
            .filter(|current| current.id() != tab_id && !current.is_closing())
        {
            return Some(current);
        }

        let parent = closing
            .parent_id()
            .and_then(|parent_id| self.find_tab(parent_id))
            .filter(|parent| parent.id() != tab_id && !parent.is_closing());
        if let Some(parent) = parent {
            if upon_exit || parent.is_incognito() == self.incognito {
                return Some(parent);
            }
        }

        if let Some(adjacent) = self.adjacent_live_tab(tab_id) {
            return Some(adjacent);
        }

        if self.incognito {
            return self
                .delegate()
                .and_then(|delegate| delegate.model(false).current_tab())
                .filter(|tab| !tab.is_closing());
        }
        None
    }

    fn complete_restore(&self) {
        self.notify(TabModelEvent::RestoreCompleted);
    }

    fn add_observer(&self, observer: Rc<dyn TabModelObserver>) {
        self.observers.add(observer);
    }

    fn remove_observer(&self, observer: &Rc<dyn TabModelObserver>) {
        self.observers.remove(observer);
    }

    fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        let reparenting = self
            .delegate()
            .is_some_and(|delegate| delegate.is_reparenting_in_progress());
        let tabs = {
            let mut state = self.state.borrow_mut();
            state.pending.clear();
            state.selected = None;
            std::mem::take(&mut state.tabs)
        };
        tracing::debug!(
            incognito = self.incognito,
            tabs = tabs.len(),
            reparenting,
            "Tab model destroyed"
        );
        if !reparenting {
            for tab in &tabs {
                tab.destroy();
            }
        }
        self.observers.clear();
    }
}
