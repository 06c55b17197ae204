//! Scripted driver for the tab model stack.
//!
//! A scenario is a JSON array of actions. Each action runs against the windows opened so
//! far, then the task queue is drained so coalesced notifications settle before the next
//! one. The final state is reported as a [`ScenarioSnapshot`].
//!
//! ```json
//! [
//!   { "type": "openWindow", "window": "main" },
//!   { "type": "newTab", "window": "main", "url": "https://example.com" },
//!   { "type": "closeTab", "tab": 1, "undo": true }
//! ]
//! ```

use crate::config::Config;
use crate::creator::TabSpec;
use crate::filter::{TabGroupModelFilter, TabModelFilter};
use crate::model::{CloseTabParams, TabList, TabModel};
use crate::selector::{SelectorOptions, TabModelSelector, TabModelSelectorImpl};
use crate::tab::{TabId, TabIdAllocator, TabLaunchType, TabSelectionType};
use crate::task::TaskRunner;
use crate::window_manager::{ActivityId, DefaultSelectorFactory, TabWindowManager};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse scenario")]
    Parse(#[from] serde_json::Error),
    #[error("Unknown window: {0}")]
    UnknownWindow(String),
    #[error("Unknown tab: {0}")]
    UnknownTab(TabId),
    #[error("No window slot available for {0}")]
    NoSlotAvailable(String),
    #[error("Window {0} cannot create tabs")]
    NotInitialized(String),
}

pub type ScenarioResult<T> = Result<T, ScenarioError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Action {
    OpenWindow {
        window: String,
        #[serde(default)]
        preferred_index: usize,
    },
    CloseWindow {
        window: String,
    },
    NewTab {
        window: String,
        #[serde(default)]
        url: String,
        #[serde(default)]
        launch_type: TabLaunchType,
        #[serde(default)]
        parent: Option<TabId>,
        #[serde(default)]
        incognito: bool,
        #[serde(default)]
        position: Option<usize>,
    },
    CloseTab {
        tab: TabId,
        #[serde(default)]
        undo: bool,
    },
    CloseAllTabs {
        window: String,
    },
    CancelClosure {
        tab: TabId,
    },
    CommitClosure {
        tab: TabId,
    },
    CommitAll {
        window: String,
    },
    SelectTab {
        tab: TabId,
    },
    SelectModel {
        window: String,
        incognito: bool,
    },
    MoveTab {
        tab: TabId,
        index: usize,
    },
    MergeTabs {
        source: TabId,
        destination: TabId,
    },
    UngroupTab {
        tab: TabId,
        #[serde(default)]
        trailing: bool,
    },
    RestoreCompleted {
        window: String,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenWindow { .. } => "openWindow",
            Self::CloseWindow { .. } => "closeWindow",
            Self::NewTab { .. } => "newTab",
            Self::CloseTab { .. } => "closeTab",
            Self::CloseAllTabs { .. } => "closeAllTabs",
            Self::CancelClosure { .. } => "cancelClosure",
            Self::CommitClosure { .. } => "commitClosure",
            Self::CommitAll { .. } => "commitAll",
            Self::SelectTab { .. } => "selectTab",
            Self::SelectModel { .. } => "selectModel",
            Self::MoveTab { .. } => "moveTab",
            Self::MergeTabs { .. } => "mergeTabs",
            Self::UngroupTab { .. } => "ungroupTab",
            Self::RestoreCompleted { .. } => "restoreCompleted",
        }
    }

    /// Parse a JSON array of actions
    pub fn parse_list(json: &str) -> ScenarioResult<Vec<Self>> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_list(path: &Path) -> ScenarioResult<Vec<Self>> {
        let content = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_list(&content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSnapshot {
    pub tabs: Vec<TabId>,
    pub selected: Option<usize>,
    pub pending: Vec<TabId>,
    /// Root id of every live tab, in order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<Vec<TabId>>,
}

impl ModelSnapshot {
    fn capture(model: &dyn TabModel, with_roots: bool) -> Self {
        let live = model.tabs();
        let comprehensive = model.comprehensive_model();
        let pending = comprehensive
            .tabs()
            .iter()
            .map(|tab| tab.id())
            .filter(|id| comprehensive.is_closure_pending(*id))
            .collect();
        Self {
            tabs: live.iter().map(|tab| tab.id()).collect(),
            selected: model.index(),
            pending,
            roots: with_roots.then(|| live.iter().map(|tab| tab.root_id()).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSnapshot {
    pub window: String,
    pub index: usize,
    pub incognito_selected: bool,
    pub regular: ModelSnapshot,
    pub incognito: ModelSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSnapshot {
    pub windows: Vec<WindowSnapshot>,
}

/// Composition root: owns the id allocator, the task queue and the window registry.
pub struct Scenario {
    task_runner: Rc<TaskRunner>,
    manager: TabWindowManager,
    windows: HashMap<String, ActivityId>,
}

impl Scenario {
    pub fn new(config: &Config) -> Self {
        let task_runner = Rc::new(TaskRunner::new());
        let factory = DefaultSelectorFactory::new(
            SelectorOptions::from(config),
            task_runner.clone(),
            Rc::new(TabIdAllocator::new()),
        );
        Self {
            task_runner,
            manager: TabWindowManager::new(config.window.max_windows, Box::new(factory)),
            windows: HashMap::new(),
        }
    }

    pub fn window_manager(&self) -> &TabWindowManager {
        &self.manager
    }

    /// Apply every action in order and report the final state
    pub fn run(&mut self, actions: &[Action]) -> ScenarioResult<ScenarioSnapshot> {
        for action in actions {
            self.apply(action)?;
        }
        Ok(self.snapshot())
    }

    pub fn apply(&mut self, action: &Action) -> ScenarioResult<()> {
        tracing::debug!(action = action.name(), "Applying scenario action");
        self.dispatch(action)?;
        let drained = self.task_runner.run_until_idle();
        tracing::trace!(drained, "Task queue drained");
        Ok(())
    }

    fn dispatch(&mut self, action: &Action) -> ScenarioResult<()> {
        match action {
            Action::OpenWindow {
                window,
                preferred_index,
            } => {
                let activity = self
                    .windows
                    .get(window)
                    .copied()
                    .unwrap_or_else(ActivityId::new);
                if self
                    .manager
                    .request_selector(activity, *preferred_index)
                    .is_none()
                {
                    return Err(ScenarioError::NoSlotAvailable(window.clone()));
                }
                self.windows.insert(window.clone(), activity);
            }
            Action::CloseWindow { window } => {
                let activity = self
                    .windows
                    .remove(window)
                    .ok_or_else(|| ScenarioError::UnknownWindow(window.clone()))?;
                self.manager.on_activity_destroyed(activity);
            }
            Action::NewTab {
                window,
                url,
                launch_type,
                parent,
                incognito,
                position,
            } => {
                let selector = self.selector(window)?;
                let mut spec = TabSpec::new(url.as_str(), *launch_type);
                if let Some(id) = *parent {
                    let parent = self.manager.find_tab(id);
                    spec = spec.with_parent(parent.ok_or(ScenarioError::UnknownTab(id))?);
                }
                if let Some(position) = position {
                    spec = spec.with_position(*position);
                }
                selector
                    .open_tab(spec, *incognito)
                    .ok_or_else(|| ScenarioError::NotInitialized(window.clone()))?;
            }
            Action::CloseTab { tab, undo } => {
                let model = self.live_model(*tab)?;
                let tab_ref = model.tab_by_id(*tab).ok_or(ScenarioError::UnknownTab(*tab))?;
                let params = if *undo {
                    CloseTabParams::undoable()
                } else {
                    CloseTabParams::immediate()
                };
                model.close_tab(&tab_ref, params);
            }
            Action::CloseAllTabs { window } => self.selector(window)?.close_all_tabs(),
            Action::CancelClosure { tab } => {
                self.pending_model(*tab)?.cancel_tab_closure(*tab);
            }
            Action::CommitClosure { tab } => {
                self.pending_model(*tab)?.commit_tab_closure(*tab);
            }
            Action::CommitAll { window } => {
                TabModelSelector::commit_all_tab_closures(self.selector(window)?.as_ref());
            }
            Action::SelectTab { tab } => {
                let model = self.live_model(*tab)?;
                let index = model.index_of_id(*tab).ok_or(ScenarioError::UnknownTab(*tab))?;
                if let Some(selector) = self.owning_selector(*tab) {
                    selector.select_model(model.is_incognito());
                }
                model.set_index(index, TabSelectionType::FromUser, false);
            }
            Action::SelectModel { window, incognito } => {
                self.selector(window)?.select_model(*incognito);
            }
            Action::MoveTab { tab, index } => {
                self.live_model(*tab)?.move_tab(*tab, *index);
            }
            Action::MergeTabs {
                source,
                destination,
            } => {
                let model = self.live_model(*source)?;
                self.with_group_filter(*source, model.is_incognito(), |filter| {
                    filter.merge_tabs_to_group(*source, *destination)
                })?;
            }
            Action::UngroupTab { tab, trailing } => {
                let model = self.live_model(*tab)?;
                self.with_group_filter(*tab, model.is_incognito(), |filter| {
                    filter.move_tab_out_of_group(*tab, *trailing)
                })?;
            }
            Action::RestoreCompleted { window } => self.selector(window)?.on_restore_completed(),
        }
        Ok(())
    }

    fn selector(&self, window: &str) -> ScenarioResult<Rc<TabModelSelectorImpl>> {
        self.windows
            .get(window)
            .and_then(|activity| self.manager.index_for_activity(*activity))
            .and_then(|index| self.manager.selector_at(index))
            .ok_or_else(|| ScenarioError::UnknownWindow(window.to_string()))
    }

    fn owning_selector(&self, tab_id: TabId) -> Option<Rc<TabModelSelectorImpl>> {
        self.manager
            .selectors()
            .into_iter()
            .map(|(_, selector)| selector)
            .find(|selector| selector.model_for_tab_id(tab_id).is_some())
    }

    fn live_model(&self, tab_id: TabId) -> ScenarioResult<Rc<dyn TabModel>> {
        self.manager
            .tab_model_for_tab_id(tab_id)
            .ok_or(ScenarioError::UnknownTab(tab_id))
    }

    fn pending_model(&self, tab_id: TabId) -> ScenarioResult<Rc<dyn TabModel>> {
        self.manager
            .selectors()
            .into_iter()
            .flat_map(|(_, selector)| [selector.model(false), selector.model(true)])
            .find(|model| model.is_closure_pending(tab_id))
            .ok_or(ScenarioError::UnknownTab(tab_id))
    }

    /// Run `f` on the grouping filter of the model holding `tab_id`; skipped with a
    /// warning when grouping is off
    fn with_group_filter(
        &self,
        tab_id: TabId,
        incognito: bool,
        f: impl FnOnce(&TabGroupModelFilter),
    ) -> ScenarioResult<()> {
        let selector = self
            .owning_selector(tab_id)
            .ok_or(ScenarioError::UnknownTab(tab_id))?;
        let filter = selector.filter_provider().tab_model_filter(incognito);
        match filter
            .as_ref()
            .and_then(|filter| filter.as_any().downcast_ref::<TabGroupModelFilter>())
        {
            Some(group_filter) => f(group_filter),
            None => tracing::warn!(tab_id = %tab_id, "Tab grouping is disabled; action ignored"),
        }
        Ok(())
    }

    /// State of every open window, lowest slot first
    pub fn snapshot(&self) -> ScenarioSnapshot {
        let names: HashMap<ActivityId, &String> = self
            .windows
            .iter()
            .map(|(name, activity)| (*activity, name))
            .collect();
        let mut windows = names
            .iter()
            .filter_map(|(activity, name)| {
                let index = self.manager.index_for_activity(*activity)?;
                let selector = self.manager.selector_at(index)?;
                let with_roots = selector.options().tab_groups_enabled;
                Some(WindowSnapshot {
                    window: (*name).clone(),
                    index,
                    incognito_selected: selector.is_incognito_selected(),
                    regular: ModelSnapshot::capture(selector.model(false).as_ref(), with_roots),
                    incognito: ModelSnapshot::capture(selector.model(true).as_ref(), with_roots),
                })
            })
            .collect::<Vec<_>>();
        windows.sort_by_key(|window| window.index);
        ScenarioSnapshot { windows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn run(json: &str) -> ScenarioSnapshot {
        run_with(&Config::default(), json)
    }

    fn run_with(config: &Config, json: &str) -> ScenarioSnapshot {
        let actions = Action::parse_list(json).unwrap();
        Scenario::new(config).run(&actions).unwrap()
    }

    fn tab_ids(raw: &[u32]) -> Vec<TabId> {
        raw.iter().copied().map(TabId::new).collect()
    }

    // === Parsing tests ===

    #[test]
    fn test_parse_actions() {
        let actions = Action::parse_list(
            r#"[
                {"type": "openWindow", "window": "main", "preferredIndex": 2},
                {"type": "newTab", "window": "main", "launchType": "from_link", "parent": 1},
                {"type": "closeTab", "tab": 1}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            actions,
            vec![
                Action::OpenWindow {
                    window: "main".to_string(),
                    preferred_index: 2,
                },
                Action::NewTab {
                    window: "main".to_string(),
                    url: String::new(),
                    launch_type: TabLaunchType::FromLink,
                    parent: Some(TabId::new(1)),
                    incognito: false,
                    position: None,
                },
                Action::CloseTab {
                    tab: TabId::new(1),
                    undo: false,
                },
            ]
        );
        assert_eq!(actions[1].name(), "newTab");
    }

    #[test]
    fn test_parse_unknown_action_fails() {
        let err = Action::parse_list(r#"[{"type": "explode"}]"#).unwrap_err();
        assert!(matches!(err, ScenarioError::Parse(_)));
    }

    #[test]
    fn test_load_list_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"type": "openWindow", "window": "w"}}]"#).unwrap();
        assert_eq!(Action::load_list(file.path()).unwrap().len(), 1);

        let dir = tempfile::tempdir().unwrap();
        let err = Action::load_list(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ScenarioError::Io { .. }));
    }

    // === End-to-end tests ===

    #[test]
    fn test_pending_closure_commit() {
        let snapshot = run(
            r#"[
                {"type": "openWindow", "window": "main"},
                {"type": "newTab", "window": "main"},
                {"type": "newTab", "window": "main"},
                {"type": "newTab", "window": "main"},
                {"type": "selectTab", "tab": 2},
                {"type": "closeTab", "tab": 2, "undo": true}
            ]"#,
        );
        let regular = &snapshot.windows[0].regular;
        assert_eq!(regular.tabs, tab_ids(&[1, 3]));
        assert_eq!(regular.pending, tab_ids(&[2]));

        let snapshot = run(
            r#"[
                {"type": "openWindow", "window": "main"},
                {"type": "newTab", "window": "main"},
                {"type": "newTab", "window": "main"},
                {"type": "newTab", "window": "main"},
                {"type": "selectTab", "tab": 2},
                {"type": "closeTab", "tab": 2, "undo": true},
                {"type": "commitClosure", "tab": 2}
            ]"#,
        );
        let regular = &snapshot.windows[0].regular;
        assert_eq!(regular.tabs, tab_ids(&[1, 3]));
        assert!(regular.pending.is_empty());
    }

    #[test]
    fn test_new_tab_at_position() {
        let snapshot = run(
            r#"[
                {"type": "openWindow", "window": "main"},
                {"type": "newTab", "window": "main"},
                {"type": "newTab", "window": "main"},
                {"type": "newTab", "window": "main", "position": 0}
            ]"#,
        );
        let regular = &snapshot.windows[0].regular;
        assert_eq!(regular.tabs, tab_ids(&[3, 1, 2]));
        assert_eq!(regular.selected, Some(0));
    }

    #[test]
    fn test_cancel_closure_restores_tab() {
        let snapshot = run(
            r#"[
                {"type": "openWindow", "window": "main"},
                {"type": "newTab", "window": "main"},
                {"type": "newTab", "window": "main"},
                {"type": "closeTab", "tab": 1, "undo": true},
                {"type": "cancelClosure", "tab": 1}
            ]"#,
        );
        let regular = &snapshot.windows[0].regular;
        assert_eq!(regular.tabs, tab_ids(&[1, 2]));
        assert!(regular.pending.is_empty());
    }

    #[test]
    fn test_incognito_tabs_and_mode() {
        let snapshot = run(
            r#"[
                {"type": "openWindow", "window": "main"},
                {"type": "newTab", "window": "main"},
                {"type": "newTab", "window": "main", "incognito": true},
                {"type": "selectModel", "window": "main", "incognito": true}
            ]"#,
        );
        let window = &snapshot.windows[0];
        assert!(window.incognito_selected);
        assert_eq!(window.regular.tabs, tab_ids(&[1]));
        assert_eq!(window.incognito.tabs, tab_ids(&[2]));
        assert_eq!(window.incognito.selected, Some(0));
    }

    #[test]
    fn test_link_child_joins_parent_group() {
        let snapshot = run(
            r#"[
                {"type": "openWindow", "window": "main"},
                {"type": "restoreCompleted", "window": "main"},
                {"type": "newTab", "window": "main"},
                {"type": "newTab", "window": "main"},
                {"type": "newTab", "window": "main", "launchType": "from_link", "parent": 1}
            ]"#,
        );
        let regular = &snapshot.windows[0].regular;
        assert_eq!(regular.tabs, tab_ids(&[1, 3, 2]));
        assert_eq!(regular.roots, Some(tab_ids(&[1, 1, 2])));
    }

    #[test]
    fn test_merge_and_ungroup() {
        let merged = r#"[
            {"type": "openWindow", "window": "main"},
            {"type": "restoreCompleted", "window": "main"},
            {"type": "newTab", "window": "main"},
            {"type": "newTab", "window": "main"},
            {"type": "newTab", "window": "main"},
            {"type": "mergeTabs", "source": 3, "destination": 1}"#;

        let snapshot = run(&format!("{merged}]"));
        let regular = &snapshot.windows[0].regular;
        assert_eq!(regular.tabs, tab_ids(&[1, 3, 2]));
        assert_eq!(regular.roots, Some(tab_ids(&[1, 1, 2])));

        let snapshot = run(&format!(
            r#"{merged}, {{"type": "ungroupTab", "tab": 3, "trailing": true}}]"#
        ));
        let regular = &snapshot.windows[0].regular;
        assert_eq!(regular.roots.as_ref().map(|roots| roots.len()), Some(3));
        assert_eq!(regular.roots.as_ref().map(|roots| roots[0]), Some(TabId::new(1)));
        assert_ne!(regular.roots.as_ref().map(|roots| roots[1]), Some(TabId::new(1)));
    }

    #[test]
    fn test_roots_omitted_without_grouping() {
        let mut config = Config::default();
        config.tab_groups.enabled = false;
        let snapshot = run_with(
            &config,
            r#"[
                {"type": "openWindow", "window": "main"},
                {"type": "newTab", "window": "main"},
                {"type": "mergeTabs", "source": 1, "destination": 1}
            ]"#,
        );
        assert_eq!(snapshot.windows[0].regular.roots, None);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("roots"));
        assert!(json.contains("incognitoSelected"));
    }

    #[test]
    fn test_windows_reported_by_slot() {
        let mut config = Config::default();
        config.window.max_windows = 2;
        let snapshot = run_with(
            &config,
            r#"[
                {"type": "openWindow", "window": "first", "preferredIndex": 1},
                {"type": "openWindow", "window": "second", "preferredIndex": 1}
            ]"#,
        );
        let windows: Vec<_> = snapshot
            .windows
            .iter()
            .map(|window| (window.window.as_str(), window.index))
            .collect();
        assert_eq!(windows, vec![("second", 0), ("first", 1)]);
    }

    #[test]
    fn test_closed_window_frees_its_slot() {
        let mut config = Config::default();
        config.window.max_windows = 1;
        let snapshot = run_with(
            &config,
            r#"[
                {"type": "openWindow", "window": "first"},
                {"type": "closeWindow", "window": "first"},
                {"type": "openWindow", "window": "second"}
            ]"#,
        );
        assert_eq!(snapshot.windows.len(), 1);
        assert_eq!(snapshot.windows[0].window, "second");
    }

    // === Error tests ===

    #[test]
    fn test_errors() {
        let mut config = Config::default();
        config.window.max_windows = 1;
        let mut scenario = Scenario::new(&config);

        let err = scenario
            .apply(&Action::CloseAllTabs {
                window: "nowhere".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, ScenarioError::UnknownWindow(_)));

        let err = scenario
            .apply(&Action::SelectTab { tab: TabId::new(9) })
            .unwrap_err();
        assert!(matches!(err, ScenarioError::UnknownTab(_)));

        scenario
            .apply(&Action::OpenWindow {
                window: "a".to_string(),
                preferred_index: 0,
            })
            .unwrap();
        let err = scenario
            .apply(&Action::OpenWindow {
                window: "b".to_string(),
                preferred_index: 0,
            })
            .unwrap_err();
        assert!(matches!(err, ScenarioError::NoSlotAvailable(_)));
        assert_eq!(err.to_string(), "No window slot available for b");
        assert_eq!(scenario.window_manager().assigned_selector_count(), 1);
    }
}
