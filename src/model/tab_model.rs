use super::observer::TabModelObserver;
use super::tab_list::{TabList, TabListSnapshot};
use crate::tab::{Tab, TabCreationState, TabId, TabLaunchType, TabRef, TabSelectionType};
use std::rc::Rc;

/// How a single tab should be closed.
#[derive(Debug, Clone, Default)]
pub struct CloseTabParams {
    /// Tab to select instead of the one the model would pick
    pub recommended_next: Option<TabRef>,
    pub animate: bool,
    /// The close comes from leaving the tab (back button), so the opener may be in the
    /// other model
    pub upon_exit: bool,
    pub can_undo: bool,
}

impl CloseTabParams {
    pub fn undoable() -> Self {
        Self {
            animate: true,
            can_undo: true,
            ..Self::default()
        }
    }

    pub fn immediate() -> Self {
        Self::default()
    }

    pub fn with_recommended_next(mut self, tab: TabRef) -> Self {
        self.recommended_next = Some(tab);
        self
    }

    pub fn upon_exit(mut self) -> Self {
        self.upon_exit = true;
        self
    }
}

/// Mutable tab container for one mode (regular or incognito) of one window.
pub trait TabModel: TabList {
    fn supports_pending_closures(&self) -> bool;

    fn is_active_model(&self) -> bool;

    fn set_active(&self, active: bool);

    /// Insert `tab`. `index` is a hint; an attached order controller has the final say.
    fn add_tab(
        &self,
        tab: TabRef,
        index: Option<usize>,
        launch_type: TabLaunchType,
        creation_state: TabCreationState,
    );

    /// Returns `false` when the tab is not live in this model.
    fn close_tab(&self, tab: &TabRef, params: CloseTabParams) -> bool;

    fn close_multiple_tabs(&self, tabs: &[TabRef], can_undo: bool);

    fn close_all_tabs(&self, upon_exit: bool);

    /// Move a tab so it sits before the tab currently at `new_index`.
    fn move_tab(&self, tab_id: TabId, new_index: usize);

    fn set_index(&self, index: usize, selection_type: TabSelectionType, skip_loading_tab: bool);

    /// Detach a tab without destroying it
    fn remove_tab(&self, tab: &TabRef);

    /// Returns `false` when the tab has no pending closure.
    fn commit_tab_closure(&self, tab_id: TabId) -> bool;

    fn commit_all_tab_closures(&self);

    /// Returns `false` when the tab has no pending closure.
    fn cancel_tab_closure(&self, tab_id: TabId) -> bool;

    /// Live tabs plus tabs pending closure, in display order
    fn comprehensive_model(&self) -> TabListSnapshot;

    fn comprehensive_count(&self) -> usize {
        self.comprehensive_model().count()
    }

    /// The tab that would be selected if `tab_id` were closed now.
    fn next_tab_if_closed(&self, tab_id: TabId, upon_exit: bool) -> Option<TabRef>;

    fn complete_restore(&self);

    fn add_observer(&self, observer: Rc<dyn TabModelObserver>);

    fn remove_observer(&self, observer: &Rc<dyn TabModelObserver>);

    fn destroy(&self);
}

/// Window-level services a model calls back into. Implemented by the selector.
pub trait TabModelDelegate {
    fn select_model(&self, incognito: bool);

    fn is_incognito_selected(&self) -> bool;

    fn model(&self, incognito: bool) -> Rc<dyn TabModel>;

    fn is_reparenting_in_progress(&self) -> bool;

    /// Find a live tab in either model
    fn find_tab(&self, tab_id: TabId) -> Option<TabRef> {
        self.model(false)
            .tab_by_id(tab_id)
            .or_else(|| self.model(true).tab_by_id(tab_id))
    }
}

/// Insertion policy consulted by [`TabModel::add_tab`].
pub trait TabModelOrderController {
    fn determine_insertion_index(
        &self,
        launch_type: TabLaunchType,
        position: Option<usize>,
        new_tab: &Tab,
    ) -> Option<usize>;

    fn will_open_in_foreground(&self, launch_type: TabLaunchType, is_new_tab_incognito: bool)
        -> bool;
}
