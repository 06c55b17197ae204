use super::observer::TabModelObserver;
use super::tab_list::{TabList, TabListSnapshot};
use super::tab_model::{CloseTabParams, TabModel};
use crate::tab::{Tab, TabCreationState, TabId, TabLaunchType, TabRef, TabSelectionType};
use std::rc::Rc;

/// Stateless stand-in used before a real model exists and after it is torn down.
///
/// Queries report an empty list of its mode and mutations are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyTabModel {
    incognito: bool,
}

thread_local! {
    static SHARED_REGULAR: Rc<dyn TabModel> = Rc::new(EmptyTabModel::new(false));
    static SHARED_INCOGNITO: Rc<dyn TabModel> = Rc::new(EmptyTabModel::new(true));
}

impl EmptyTabModel {
    pub const fn new(incognito: bool) -> Self {
        Self { incognito }
    }

    /// The per-thread instance for `incognito`
    pub fn shared(incognito: bool) -> Rc<dyn TabModel> {
        if incognito {
            SHARED_INCOGNITO.with(Rc::clone)
        } else {
            SHARED_REGULAR.with(Rc::clone)
        }
    }
}

impl TabList for EmptyTabModel {
    fn is_incognito(&self) -> bool {
        self.incognito
    }

    fn index(&self) -> Option<usize> {
        None
    }

    fn count(&self) -> usize {
        0
    }

    fn tab_at(&self, _index: usize) -> Option<TabRef> {
        None
    }

    fn index_of(&self, _tab: &Tab) -> Option<usize> {
        None
    }

    fn is_closure_pending(&self, _tab_id: TabId) -> bool {
        false
    }
}

impl TabModel for EmptyTabModel {
    fn supports_pending_closures(&self) -> bool {
        false
    }

    fn is_active_model(&self) -> bool {
        false
    }

    fn set_active(&self, _active: bool) {}

    fn add_tab(
        &self,
        tab: TabRef,
        _index: Option<usize>,
        _launch_type: TabLaunchType,
        _creation_state: TabCreationState,
    ) {
        tracing::warn!(tab_id = %tab.id(), "Ignoring tab added to the empty tab model");
    }

    fn close_tab(&self, _tab: &TabRef, _params: CloseTabParams) -> bool {
        false
    }

    fn close_multiple_tabs(&self, _tabs: &[TabRef], _can_undo: bool) {}

    fn close_all_tabs(&self, _upon_exit: bool) {}

    fn move_tab(&self, _tab_id: TabId, _new_index: usize) {}

    fn set_index(&self, _index: usize, _selection_type: TabSelectionType, _skip_loading_tab: bool) {
    }

    fn remove_tab(&self, _tab: &TabRef) {}

    fn commit_tab_closure(&self, _tab_id: TabId) -> bool {
        false
    }

    fn commit_all_tab_closures(&self) {}

    fn cancel_tab_closure(&self, _tab_id: TabId) -> bool {
        false
    }

    fn comprehensive_model(&self) -> TabListSnapshot {
        TabListSnapshot::empty(self.incognito)
    }

    fn comprehensive_count(&self) -> usize {
        0
    }

    fn next_tab_if_closed(&self, _tab_id: TabId, _upon_exit: bool) -> Option<TabRef> {
        None
    }

    fn complete_restore(&self) {}

    fn add_observer(&self, _observer: Rc<dyn TabModelObserver>) {}

    fn remove_observer(&self, _observer: &Rc<dyn TabModelObserver>) {}

    fn destroy(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tab;

    #[test]
    fn test_empty_model_reports_its_mode() {
        let regular = EmptyTabModel::shared(false);
        let incognito = EmptyTabModel::shared(true);
        assert!(!regular.is_incognito());
        assert!(incognito.is_incognito());
        assert!(incognito.comprehensive_model().is_incognito());
        assert!(Rc::ptr_eq(&incognito, &EmptyTabModel::shared(true)));
    }

    #[test]
    fn test_empty_model_ignores_mutations() {
        let model = EmptyTabModel::default();
        let t = tab(1);
        model.add_tab(
            t.clone(),
            None,
            TabLaunchType::FromChromeUi,
            TabCreationState::LiveInForeground,
        );
        assert_eq!(model.count(), 0);
        assert!(!model.close_tab(&t, CloseTabParams::undoable()));
        assert!(!model.cancel_tab_closure(t.id()));
        assert!(model.current_tab().is_none());
        assert!(model.comprehensive_model().is_empty());
        assert!(!t.is_destroyed());
    }
}
