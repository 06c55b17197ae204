use super::tab_list::TabList;
use super::tab_model::{TabModel, TabModelOrderController};
use crate::selector::TabModelSelector;
use crate::tab::{Tab, TabId, TabLaunchType};
use std::rc::{Rc, Weak};

/// Decides where new tabs go and whether they take the foreground.
///
/// Holds the window's selector weakly; with the selector gone every tab is appended.
pub struct TabModelOrderControllerImpl {
    selector: Weak<dyn TabModelSelector>,
}

impl TabModelOrderControllerImpl {
    pub fn new(selector: Weak<dyn TabModelSelector>) -> Self {
        Self { selector }
    }

    fn selector(&self) -> Option<Rc<dyn TabModelSelector>> {
        self.selector.upgrade()
    }

    /// Position for a tab opened from the current tab (link clicks).
    ///
    /// Foreground opens land right after their opener. Background opens are queued after
    /// the opener's previous background children so they read left to right in the
    /// order they were opened.
    pub fn determine_insertion_index_for_tab(
        &self,
        launch_type: TabLaunchType,
        new_tab: &Tab,
    ) -> Option<usize> {
        let selector = self.selector()?;
        let current_model = selector.current_model();

        if new_tab.is_incognito() != current_model.is_incognito() {
            return Some(selector.model(new_tab.is_incognito()).count());
        }
        if current_model.is_empty() {
            return Some(0);
        }
        let Some(current_tab) = current_model.current_tab() else {
            return Some(current_model.count());
        };
        let current_index = current_model.index_of(&current_tab)?;

        if self.will_open_in_foreground(launch_type, new_tab.is_incognito()) {
            let parent_index = new_tab
                .parent_id()
                .filter(|&parent_id| parent_id != current_tab.id())
                .and_then(|parent_id| current_model.index_of_id(parent_id));
            return Some(parent_index.unwrap_or(current_index) + 1);
        }

        let last_child =
            index_of_last_tab_opened_by(&*current_model, current_tab.id(), current_index);
        Some(last_child.unwrap_or(current_index) + 1)
    }

    /// A foreground open ends every opener relationship in the current model
    fn forget_all_openers(&self) {
        let Some(selector) = self.selector() else {
            return;
        };
        for tab in selector.current_model().tabs() {
            tab.set_grouped_with_parent(false);
        }
    }
}

/// Scan from the end down to `start` for the last tab still grouped with `opener`.
fn index_of_last_tab_opened_by(model: &dyn TabModel, opener: TabId, start: usize) -> Option<usize> {
    (start..model.count()).rev().find(|&index| {
        model.tab_at(index).is_some_and(|tab| {
            tab.parent_id() == Some(opener) && tab.is_grouped_with_parent()
        })
    })
}

impl TabModelOrderController for TabModelOrderControllerImpl {
    fn determine_insertion_index(
        &self,
        launch_type: TabLaunchType,
        position: Option<usize>,
        new_tab: &Tab,
    ) -> Option<usize> {
        if launch_type.bypasses_positioning() {
            return None;
        }

        let mut position = position;
        if launch_type.is_link_click() {
            position = self.determine_insertion_index_for_tab(launch_type, new_tab);
        }

        if self.will_open_in_foreground(launch_type, new_tab.is_incognito()) {
            self.forget_all_openers();
        }

        match self.selector().and_then(|selector| selector.current_filter()) {
            Some(filter) if filter.is_incognito() == new_tab.is_incognito() => {
                filter.valid_position(new_tab, position)
            }
            _ => position,
        }
    }

    fn will_open_in_foreground(
        &self,
        launch_type: TabLaunchType,
        is_new_tab_incognito: bool,
    ) -> bool {
        if launch_type == TabLaunchType::FromRestore {
            return false;
        }
        if !launch_type.opens_in_background() {
            return true;
        }
        // Opening an incognito tab from the regular model always switches modes
        let incognito_selected = self
            .selector()
            .map(|selector| selector.is_incognito_selected())
            .unwrap_or(is_new_tab_incognito);
        !incognito_selected && is_new_tab_incognito
    }
}
