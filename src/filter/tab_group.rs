use super::model_filter::{FilterStrategy, ModelFilter};
use super::{TabModelFilter, TabModelFilterFactory};
use crate::model::{TabList, TabModel, TabModelEvent};
use crate::observer::ObserverList;
use crate::tab::{Tab, TabId, TabRef};
use std::collections::HashMap;
use std::rc::Rc;

/// Group-level notifications from a [`TabGroupModelFilter`].
#[derive(Debug, Clone)]
pub enum TabGroupEvent {
    WillMergeTabToGroup {
        moved_tab: TabRef,
        new_root_id: TabId,
    },
    DidMergeTabToGroup {
        moved_tab: TabRef,
        selected_tab_id: Option<TabId>,
    },
    WillMoveTabOutOfGroup {
        moved_tab: TabRef,
        new_root_id: TabId,
    },
    DidMoveTabOutOfGroup {
        moved_tab: TabRef,
        prev_filter_index: Option<usize>,
    },
    DidMoveWithinGroup {
        moved_tab: TabRef,
        tab_model_old_index: usize,
        tab_model_new_index: usize,
    },
    DidMoveTabGroup {
        moved_tab: TabRef,
        tab_model_old_index: usize,
        tab_model_new_index: usize,
    },
    DidCreateGroup {
        tabs: Vec<TabRef>,
        original_indexes: Vec<usize>,
        is_same_group: bool,
    },
}

impl TabGroupEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::WillMergeTabToGroup { .. } => "WillMergeTabToGroup",
            Self::DidMergeTabToGroup { .. } => "DidMergeTabToGroup",
            Self::WillMoveTabOutOfGroup { .. } => "WillMoveTabOutOfGroup",
            Self::DidMoveTabOutOfGroup { .. } => "DidMoveTabOutOfGroup",
            Self::DidMoveWithinGroup { .. } => "DidMoveWithinGroup",
            Self::DidMoveTabGroup { .. } => "DidMoveTabGroup",
            Self::DidCreateGroup { .. } => "DidCreateGroup",
        }
    }
}

pub trait TabGroupObserver {
    fn on_group_event(&self, event: &TabGroupEvent);
}

impl<F: Fn(&TabGroupEvent)> TabGroupObserver for F {
    fn on_group_event(&self, event: &TabGroupEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TabGroup {
    root_id: TabId,
    tab_ids: Vec<TabId>,
    last_shown: Option<TabId>,
}

impl TabGroup {
    fn new(root_id: TabId) -> Self {
        Self {
            root_id,
            tab_ids: Vec::new(),
            last_shown: None,
        }
    }

    fn add(&mut self, tab_id: TabId) {
        if !self.tab_ids.contains(&tab_id) {
            self.tab_ids.push(tab_id);
        }
        if self.last_shown.is_none() {
            self.last_shown = Some(tab_id);
        }
    }

    /// Removing the last shown tab hands the role to its left neighbour, or its right
    /// one when it was first.
    fn remove(&mut self, tab_id: TabId) {
        let Some(position) = self.tab_ids.iter().position(|&id| id == tab_id) else {
            return;
        };
        if self.last_shown == Some(tab_id) {
            let neighbour = match position {
                0 => self.tab_ids.get(1),
                _ => self.tab_ids.get(position - 1),
            };
            self.last_shown = neighbour.copied();
        }
        self.tab_ids.remove(position);
    }

    fn contains(&self, tab_id: TabId) -> bool {
        self.tab_ids.contains(&tab_id)
    }

    fn len(&self) -> usize {
        self.tab_ids.len()
    }
}

/// Tabs sharing a root id form a group; the filter shows one entry per group.
pub struct TabGroupState {
    auto_creation: bool,
    groups: Vec<TabGroup>,
    current_group: Option<usize>,
    /// Selected tab that is not in any group yet (selection raced its addition)
    absent_selected: Option<TabRef>,
    last_shown_before_reset: HashMap<TabId, TabId>,
    observers: Rc<ObserverList<dyn TabGroupObserver>>,
    queued: Vec<TabGroupEvent>,
}

impl TabGroupState {
    pub fn new(auto_creation: bool) -> Self {
        Self {
            auto_creation,
            groups: Vec::new(),
            current_group: None,
            absent_selected: None,
            last_shown_before_reset: HashMap::new(),
            observers: Rc::new(ObserverList::new()),
            queued: Vec::new(),
        }
    }

    fn group_index_of_tab(&self, tab_id: TabId) -> Option<usize> {
        self.groups.iter().position(|group| group.contains(tab_id))
    }

    fn group_index_of_root(&self, root_id: TabId) -> Option<usize> {
        self.groups.iter().position(|group| group.root_id == root_id)
    }

    fn last_shown_of_root(&self, root_id: TabId) -> Option<TabId> {
        self.group_index_of_root(root_id)
            .and_then(|index| self.groups[index].last_shown)
    }

    /// Groups with more than one tab
    fn group_count(&self) -> usize {
        self.groups.iter().filter(|group| group.len() > 1).count()
    }

    fn joins_parent_group(&self, tab: &Tab, restored: bool) -> bool {
        restored && (self.auto_creation || tab.launch_type().joins_parent_group())
    }

    fn is_move_tab_out_of_group(&self, tab: &Tab) -> bool {
        self.group_index_of_root(tab.root_id()).is_none()
    }

    fn is_merge_tab_to_group(&self, tab: &Tab) -> bool {
        self.group_index_of_root(tab.root_id())
            .is_some_and(|index| !self.groups[index].contains(tab.id()))
    }

    fn is_move_within_group(
        model: &dyn TabModel,
        tab: &Tab,
        old_index: usize,
        new_index: usize,
    ) -> bool {
        let (start, end) = (old_index.min(new_index), old_index.max(new_index));
        (start..=end).all(|index| {
            model
                .tab_at(index)
                .is_some_and(|other| other.root_id() == tab.root_id())
        })
    }

    /// A group is moved one tab at a time; it is done once the whole group sits
    /// contiguously ending at the last moved tab.
    fn has_finished_moving_group(&self, model: &dyn TabModel, tab: &Tab, new_index: usize) -> bool {
        let size = self
            .group_index_of_root(tab.root_id())
            .map_or(1, |index| self.groups[index].len());
        if new_index + 1 < size {
            return false;
        }
        (new_index + 1 - size..=new_index).all(|index| {
            model
                .tab_at(index)
                .is_some_and(|other| other.root_id() == tab.root_id())
        })
    }
}

impl FilterStrategy for TabGroupState {
    fn add_tab(&mut self, model: &dyn TabModel, tab: &TabRef, restored: bool, resetting: bool) {
        if tab.is_incognito() != model.is_incognito() {
            tracing::error!(tab_id = %tab.id(), "Tab added to a filter of the other mode");
            debug_assert!(false, "tab {} added to the wrong filter", tab.id());
            return;
        }

        if !resetting && self.joins_parent_group(tab, restored) {
            if let Some(parent) = tab.parent_id().and_then(|id| model.tab_by_id(id)) {
                tab.set_root_id(parent.root_id());
            }
        }

        let root_id = tab.root_id();
        let index = match self.group_index_of_root(root_id) {
            Some(index) => index,
            None => {
                self.groups.push(TabGroup::new(root_id));
                self.groups.len() - 1
            }
        };
        self.groups[index].add(tab.id());

        if let Some(absent) = self.absent_selected.take() {
            self.select_tab(model, &absent);
        }
        if !resetting {
            self.reorder(model);
        }
    }

    fn close_tab(&mut self, _model: &dyn TabModel, tab: &TabRef) {
        let Some(index) = self.group_index_of_tab(tab.id()) else {
            tracing::debug!(tab_id = %tab.id(), "Closing tab not tracked by any group");
            return;
        };
        self.groups[index].remove(tab.id());
        if self.groups[index].tab_ids.is_empty() {
            self.groups.remove(index);
            self.current_group = match self.current_group {
                Some(current) if current == index => None,
                Some(current) if current > index => Some(current - 1),
                current => current,
            };
        }
    }

    fn select_tab(&mut self, _model: &dyn TabModel, tab: &TabRef) {
        match self.group_index_of_tab(tab.id()) {
            Some(index) => {
                self.groups[index].last_shown = Some(tab.id());
                self.current_group = Some(index);
                self.absent_selected = None;
            }
            None => self.absent_selected = Some(tab.clone()),
        }
    }

    /// Sort groups (and tabs inside them) by model position
    fn reorder(&mut self, model: &dyn TabModel) {
        let positions: HashMap<TabId, usize> = model
            .tabs()
            .iter()
            .enumerate()
            .map(|(index, tab)| (tab.id(), index))
            .collect();
        let position = |id: &TabId| positions.get(id).copied().unwrap_or(usize::MAX);

        for group in &mut self.groups {
            group.tab_ids.sort_by_key(position);
        }
        self.groups.sort_by_key(|group| {
            group
                .tab_ids
                .iter()
                .map(position)
                .min()
                .unwrap_or(usize::MAX)
        });

        let current = model
            .current_tab()
            .and_then(|tab| Some((self.group_index_of_tab(tab.id())?, tab.id())));
        self.current_group = current.map(|(index, _)| index);
        if let Some((index, tab_id)) = current {
            self.groups[index].last_shown = Some(tab_id);
        }
    }

    fn reset_internal(&mut self) {
        self.last_shown_before_reset = self
            .groups
            .iter()
            .filter_map(|group| group.last_shown.map(|id| (group.root_id, id)))
            .collect();
        self.groups.clear();
        self.current_group = None;
        self.absent_selected = None;
    }

    fn finish_reset(&mut self, model: &dyn TabModel) {
        let last_shown = std::mem::take(&mut self.last_shown_before_reset);
        for group in &mut self.groups {
            if let Some(&tab_id) = last_shown.get(&group.root_id) {
                if group.contains(tab_id) {
                    group.last_shown = Some(tab_id);
                }
            }
        }
        if let Some(tab) = model.current_tab() {
            self.select_tab(model, &tab);
        }
    }

    fn on_move(
        &mut self,
        model: &dyn TabModel,
        tab: &TabRef,
        new_index: usize,
        old_index: usize,
        restored: bool,
    ) -> bool {
        if !restored {
            self.reset(model, restored);
            return false;
        }

        let prev_filter_index = self.group_index_of_tab(tab.id());
        let size_before = prev_filter_index.map(|index| self.groups[index].len());

        if self.is_move_tab_out_of_group(tab) {
            self.reset(model, restored);
            self.queued.push(TabGroupEvent::DidMoveTabOutOfGroup {
                moved_tab: tab.clone(),
                prev_filter_index,
            });
        } else if self.is_merge_tab_to_group(tab) {
            self.reset(model, restored);
            // Merging a whole group arrives one tab at a time; only single tabs notify
            if size_before.is_some_and(|size| size != 1) {
                return false;
            }
            self.queued.push(TabGroupEvent::DidMergeTabToGroup {
                moved_tab: tab.clone(),
                selected_tab_id: self.last_shown_of_root(tab.root_id()),
            });
        } else {
            self.reorder(model);
            if Self::is_move_within_group(model, tab, old_index, new_index) {
                self.queued.push(TabGroupEvent::DidMoveWithinGroup {
                    moved_tab: tab.clone(),
                    tab_model_old_index: old_index,
                    tab_model_new_index: new_index,
                });
            } else {
                if !self.has_finished_moving_group(model, tab, new_index) {
                    return false;
                }
                self.queued.push(TabGroupEvent::DidMoveTabGroup {
                    moved_tab: tab.clone(),
                    tab_model_old_index: old_index,
                    tab_model_new_index: new_index,
                });
            }
        }
        true
    }

    fn should_notify_on_select(&self) -> bool {
        self.absent_selected.is_none()
    }

    fn take_pending_notifications(&mut self) -> Option<Box<dyn FnOnce()>> {
        if self.queued.is_empty() {
            return None;
        }
        let events = std::mem::take(&mut self.queued);
        let observers = self.observers.clone();
        Some(Box::new(move || {
            for event in &events {
                observers.for_each(|observer| observer.on_group_event(event));
            }
        }))
    }

    fn count(&self, _model: &dyn TabModel) -> usize {
        self.groups.len()
    }

    fn index(&self, model: &dyn TabModel) -> Option<usize> {
        model.index()?;
        self.current_group
    }

    fn tab_at(&self, model: &dyn TabModel, index: usize) -> Option<TabRef> {
        let tab_id = self.groups.get(index)?.last_shown?;
        model.tab_by_id(tab_id)
    }

    fn index_of(&self, model: &dyn TabModel, tab: &Tab) -> Option<usize> {
        if tab.is_incognito() != model.is_incognito() {
            return None;
        }
        self.group_index_of_tab(tab.id())
    }

    fn related_tab_list(&self, model: &dyn TabModel, tab_id: TabId) -> Vec<TabRef> {
        match self.group_index_of_tab(tab_id) {
            Some(index) => self.groups[index]
                .tab_ids
                .iter()
                .filter_map(|&id| model.tab_by_id(id))
                .collect(),
            None => model.tab_by_id(tab_id).into_iter().collect(),
        }
    }

    fn has_other_related_tabs(&self, _model: &dyn TabModel, tab: &Tab) -> bool {
        self.group_index_of_tab(tab.id())
            .is_some_and(|index| self.groups[index].len() > 1)
    }

    /// Never split a run of tabs sharing a root, unless the new tab will join that run.
    fn valid_position(
        &self,
        model: &dyn TabModel,
        tab: &Tab,
        position: Option<usize>,
        restored: bool,
    ) -> Option<usize> {
        let position = position?;
        let predicted_root = if self.joins_parent_group(tab, restored) {
            tab.parent_id()
                .and_then(|id| model.tab_by_id(id))
                .map_or(tab.root_id(), |parent| parent.root_id())
        } else {
            tab.root_id()
        };

        if position == 0 || position >= model.count() {
            return Some(position);
        }
        let (Some(before), Some(after)) = (model.tab_at(position - 1), model.tab_at(position))
        else {
            return Some(position);
        };
        let run_root = before.root_id();
        if after.root_id() != run_root || run_root == predicted_root {
            return Some(position);
        }

        let mut end = position;
        while model
            .tab_at(end)
            .is_some_and(|other| other.root_id() == run_root)
        {
            end += 1;
        }
        Some(end)
    }
}

/// Filter that collapses each tab group into a single entry
pub type TabGroupModelFilter = ModelFilter<TabGroupState>;

impl ModelFilter<TabGroupState> {
    pub fn create(model: Rc<dyn TabModel>, auto_creation: bool) -> Rc<Self> {
        ModelFilter::new(model, TabGroupState::new(auto_creation))
    }

    pub fn add_tab_group_observer(&self, observer: Rc<dyn TabGroupObserver>) {
        self.state().observers.add(observer);
    }

    pub fn remove_tab_group_observer(&self, observer: &Rc<dyn TabGroupObserver>) {
        self.state().observers.remove(observer);
    }

    /// Number of groups holding more than one tab
    pub fn tab_group_count(&self) -> usize {
        self.state().group_count()
    }

    pub fn related_tab_list_for_root_id(&self, root_id: TabId) -> Vec<TabRef> {
        let tab_ids = {
            let state = self.state();
            match state.group_index_of_root(root_id) {
                Some(index) => state.groups[index].tab_ids.clone(),
                None => return Vec::new(),
            }
        };
        let model = self.tab_model();
        tab_ids
            .into_iter()
            .filter_map(|id| model.tab_by_id(id))
            .collect()
    }

    /// Size of the group rooted at `root_id`; a root with no group is a lone tab
    pub fn related_tab_count_for_root_id(&self, root_id: TabId) -> usize {
        let state = self.state();
        state
            .group_index_of_root(root_id)
            .map_or(1, |index| state.groups[index].len())
    }

    /// Move the whole group of `tab_id` so it starts before the tab at `new_index`
    pub fn move_related_tabs(&self, tab_id: TabId, new_index: usize) {
        let model = self.tab_model();
        let tabs = self.related_tab_list(tab_id);
        let Some(current_index) = tabs.first().and_then(|first| model.index_of(first)) else {
            return;
        };
        let new_index = new_index.min(model.count());
        if current_index == new_index {
            return;
        }

        let mut offset = 0;
        for tab in &tabs {
            if model.index_of(tab).is_none() {
                continue;
            }
            if new_index > current_index {
                model.move_tab(tab.id(), new_index);
            } else {
                model.move_tab(tab.id(), new_index + offset);
                offset += 1;
            }
        }
    }

    /// Move the group of `source_id` into the group of `destination_id`
    pub fn merge_tabs_to_group(&self, source_id: TabId, destination_id: TabId) {
        let model = self.tab_model();
        let (Some(source), Some(destination)) =
            (model.tab_by_id(source_id), model.tab_by_id(destination_id))
        else {
            tracing::warn!(%source_id, %destination_id, "Cannot merge tabs missing from the model");
            return;
        };
        let destination_root = destination.root_id();
        if source.root_id() == destination_root {
            return;
        }

        let tabs_to_merge = self.related_tab_list(source_id);
        let Some(destination_index) = self.destination_index(&destination) else {
            return;
        };
        let first_index = tabs_to_merge.first().and_then(|tab| model.index_of(tab));

        if first_index == Some(destination_index) {
            // Already adjacent: only root ids change
            let Some(last) = tabs_to_merge.last().cloned() else {
                return;
            };
            self.notify_group(TabGroupEvent::WillMergeTabToGroup {
                moved_tab: last.clone(),
                new_root_id: destination_root,
            });
            for tab in &tabs_to_merge {
                tab.set_root_id(destination_root);
            }
            self.reset_filter_state();
            let selected_tab_id = self.state().last_shown_of_root(destination_root);
            self.notify_group(TabGroupEvent::DidMergeTabToGroup {
                moved_tab: last,
                selected_tab_id,
            });
        } else {
            self.merge_list_of_tabs_to_group(&tabs_to_merge, &destination, true, false);
        }
    }

    /// Append `tabs` to the group of `destination`, moving each in the model.
    ///
    /// `is_same_group` means the tabs already share a group, so only the last one
    /// announces the merge. `notify` emits `DidCreateGroup` for undo.
    pub fn merge_list_of_tabs_to_group(
        &self,
        tabs: &[TabRef],
        destination: &TabRef,
        is_same_group: bool,
        notify: bool,
    ) {
        let model = self.tab_model();
        let destination_root = destination.root_id();
        let Some(mut destination_index) = self.destination_index(destination) else {
            tracing::warn!(tab_id = %destination.id(), "Merge destination is not in the model");
            return;
        };

        let mut original_indexes = Vec::with_capacity(tabs.len());
        let mut unmoved = Vec::new();
        for (position, tab) in tabs.iter().enumerate() {
            if !is_same_group || position + 1 == tabs.len() {
                self.notify_group(TabGroupEvent::WillMergeTabToGroup {
                    moved_tab: tab.clone(),
                    new_root_id: destination_root,
                });
            }
            let Some(index) = model.index_of(tab) else {
                tracing::warn!(
                    tab_id = %tab.id(),
                    "Skipping merge of a tab missing from the model"
                );
                continue;
            };
            original_indexes.push(index);
            if tab.root_id() == destination_root {
                continue;
            }

            tab.set_root_id(destination_root);
            if index < destination_index {
                model.move_tab(tab.id(), destination_index);
            } else {
                if index == destination_index {
                    unmoved.push(tab.clone());
                } else {
                    model.move_tab(tab.id(), destination_index);
                }
                destination_index += 1;
            }
        }

        // Tabs already in place produced no move event
        if !unmoved.is_empty() {
            self.reset_filter_state();
            let selected_tab_id = self.state().last_shown_of_root(destination_root);
            for tab in unmoved {
                self.notify_group(TabGroupEvent::DidMergeTabToGroup {
                    moved_tab: tab,
                    selected_tab_id,
                });
            }
        }

        if notify {
            self.notify_group(TabGroupEvent::DidCreateGroup {
                tabs: tabs.to_vec(),
                original_indexes,
                is_same_group,
            });
        }
    }

    /// Take a tab out of its group, parking it at the group's leading or trailing edge
    pub fn move_tab_out_of_group(&self, source_id: TabId, trailing: bool) {
        let model = self.tab_model();
        let Some(source) = model.tab_by_id(source_id) else {
            return;
        };
        let Some(source_index) = model.index_of(&source) else {
            return;
        };
        let (group_ids, prev_filter_index) = {
            let state = self.state();
            let Some(index) = state.group_index_of_tab(source_id) else {
                return;
            };
            (state.groups[index].tab_ids.clone(), index)
        };
        let edge = if trailing {
            group_ids.last()
        } else {
            group_ids.first()
        };
        let Some(edge_index) = edge.and_then(|&id| model.index_of_id(id)) else {
            return;
        };

        if group_ids.len() == 1 {
            self.notify_group(TabGroupEvent::DidMoveTabOutOfGroup {
                moved_tab: source,
                prev_filter_index: Some(prev_filter_index),
            });
            return;
        }

        let old_root = source.root_id();
        let new_root = if source_id == old_root {
            group_ids
                .iter()
                .copied()
                .find(|&id| id != source_id)
                .unwrap_or(old_root)
        } else {
            old_root
        };
        self.notify_group(TabGroupEvent::WillMoveTabOutOfGroup {
            moved_tab: source.clone(),
            new_root_id: new_root,
        });

        if new_root != old_root {
            for tab in group_ids.iter().filter_map(|&id| model.tab_by_id(id)) {
                tab.set_root_id(new_root);
            }
            self.reset_filter_state();
        }
        source.set_root_id(source_id);

        if source_index == edge_index {
            self.reset_filter_state();
            self.notify_group(TabGroupEvent::DidMoveTabOutOfGroup {
                moved_tab: source,
                prev_filter_index: Some(prev_filter_index),
            });
            return;
        }
        let new_index = if trailing { edge_index + 1 } else { edge_index };
        model.move_tab(source_id, new_index);
    }

    /// Reverse a grouping: restore the tab's root id and model position
    pub fn undo_grouped_tab(&self, tab: &TabRef, original_index: usize, original_root_id: TabId) {
        let model = self.tab_model();
        let Some(current_index) = model.index_of(tab) else {
            return;
        };
        tab.set_root_id(original_root_id);

        if current_index == original_index {
            self.handle_event(&TabModelEvent::DidMoveTab {
                tab: tab.clone(),
                new_index: original_index,
                old_index: current_index,
            });
            return;
        }
        let target = if current_index < original_index {
            original_index + 1
        } else {
            original_index
        };
        model.move_tab(tab.id(), target);
    }

    /// Model index right after the last tab of `destination`'s group
    fn destination_index(&self, destination: &Tab) -> Option<usize> {
        let last = self
            .related_tab_list(destination.id())
            .last()
            .map(|tab| tab.id())?;
        self.tab_model().index_of_id(last).map(|index| index + 1)
    }

    fn notify_group(&self, event: TabGroupEvent) {
        let observers = self.state().observers.clone();
        observers.for_each(|observer| observer.on_group_event(&event));
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TabGroupModelFilterFactory {
    pub auto_creation: bool,
}

impl TabGroupModelFilterFactory {
    pub fn new(auto_creation: bool) -> Self {
        Self { auto_creation }
    }
}

impl TabModelFilterFactory for TabGroupModelFilterFactory {
    fn create_tab_model_filter(&self, model: Rc<dyn TabModel>) -> Rc<dyn TabModelFilter> {
        TabGroupModelFilter::create(model, self.auto_creation)
    }
}
