use super::observer::{TabModelSelectorEvent, TabModelSelectorObserver};
use super::TabModelSelector;
use crate::config::Config;
use crate::creator::{TabCreatorManager, TabSpec};
use crate::filter::{
    EmptyTabModelFilterFactory, TabGroupModelFilterFactory, TabModelFilter, TabModelFilterFactory,
    TabModelFilterProvider,
};
use crate::model::{
    CloseTabParams, EmptyTabModel, IncognitoTabModel, TabModel, TabModelDelegate, TabModelEvent,
    TabModelFactory, TabModelImpl, TabModelObserver, TabModelOrderControllerImpl,
};
use crate::observer::ObserverList;
use crate::task::TaskRunner;
use crate::tab::{TabLaunchType, TabRef};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Per-window behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorOptions {
    pub tab_groups_enabled: bool,
    pub group_auto_creation: bool,
    /// Pending-closure (undo) support of the regular model
    pub regular_undo: bool,
    pub incognito_undo: bool,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            tab_groups_enabled: true,
            group_auto_creation: true,
            regular_undo: true,
            incognito_undo: false,
        }
    }
}

impl From<&Config> for SelectorOptions {
    fn from(config: &Config) -> Self {
        Self {
            tab_groups_enabled: config.tab_groups.enabled,
            group_auto_creation: config.tab_groups.auto_creation,
            regular_undo: config.undo.regular,
            incognito_undo: config.undo.incognito,
        }
    }
}

struct Models {
    regular: Rc<TabModelImpl>,
    incognito: Rc<IncognitoTabModel>,
    observer: Rc<dyn TabModelObserver>,
}

/// The selector of one window.
///
/// Built empty: every model getter returns the empty model until
/// [`initialize`](Self::initialize) creates the real models and their filters.
pub struct TabModelSelectorImpl {
    this: Weak<Self>,
    options: SelectorOptions,
    task_runner: Rc<TaskRunner>,
    models: RefCell<Option<Models>>,
    filter_provider: TabModelFilterProvider,
    creator_manager: RefCell<Option<Rc<dyn TabCreatorManager>>>,
    observers: ObserverList<dyn TabModelSelectorObserver>,
    /// Observers that should see both models, attached on initialize when added earlier
    pending_model_observers: RefCell<Vec<Rc<dyn TabModelObserver>>>,
    incognito_selected: Cell<bool>,
    tab_state_initialized: Cell<bool>,
    reparenting: Cell<bool>,
    change_pending: Cell<bool>,
    destroyed: Cell<bool>,
}

impl TabModelSelectorImpl {
    pub fn new(options: SelectorOptions, task_runner: Rc<TaskRunner>) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            options,
            task_runner,
            models: RefCell::new(None),
            filter_provider: TabModelFilterProvider::new(),
            creator_manager: RefCell::new(None),
            observers: ObserverList::new(),
            pending_model_observers: RefCell::new(Vec::new()),
            incognito_selected: Cell::new(false),
            tab_state_initialized: Cell::new(false),
            reparenting: Cell::new(false),
            change_pending: Cell::new(false),
            destroyed: Cell::new(false),
        })
    }

    pub fn options(&self) -> SelectorOptions {
        self.options
    }

    pub fn set_tab_creator_manager(&self, manager: Rc<dyn TabCreatorManager>) {
        *self.creator_manager.borrow_mut() = Some(manager);
    }

    pub fn is_initialized(&self) -> bool {
        self.models.borrow().is_some()
    }

    /// Build both models, the order controller and the filters.
    pub fn initialize(&self) {
        if self.is_initialized() || self.destroyed.get() {
            tracing::error!("Tab model selector initialized twice or after destroy");
            debug_assert!(false, "selector initialized twice");
            return;
        }

        let selector: Weak<dyn TabModelSelector> = self.this.clone();
        let delegate: Weak<dyn TabModelDelegate> = self.this.clone();
        let controller = Rc::new(TabModelOrderControllerImpl::new(selector));

        let regular = Rc::new(
            TabModelImpl::new(false, self.options.regular_undo)
                .with_order_controller(controller.clone())
                .with_delegate(delegate.clone()),
        );
        let incognito_undo = self.options.incognito_undo;
        let factory: TabModelFactory = Box::new(move || {
            Rc::new(
                TabModelImpl::new(true, incognito_undo)
                    .with_order_controller(controller.clone())
                    .with_delegate(delegate.clone()),
            ) as Rc<dyn TabModel>
        });
        let incognito = Rc::new(IncognitoTabModel::new(factory));

        let incognito_selected = self.incognito_selected.get();
        regular.set_active(!incognito_selected);
        incognito.set_active(incognito_selected);

        let models: Vec<Rc<dyn TabModel>> = vec![regular.clone(), incognito.clone()];
        let filter_factory: Box<dyn TabModelFilterFactory> = if self.options.tab_groups_enabled {
            Box::new(TabGroupModelFilterFactory::new(
                self.options.group_auto_creation,
            ))
        } else {
            Box::new(EmptyTabModelFilterFactory)
        };
        self.filter_provider.init(&*filter_factory, &models);

        let this = self.this.clone();
        let observer: Rc<dyn TabModelObserver> = Rc::new(move |event: &TabModelEvent| {
            if let Some(selector) = this.upgrade() {
                selector.on_model_event(event);
            }
        });
        let pending = std::mem::take(&mut *self.pending_model_observers.borrow_mut());
        for model in &models {
            model.add_observer(observer.clone());
            for pending_observer in &pending {
                model.add_observer(pending_observer.clone());
            }
        }

        *self.models.borrow_mut() = Some(Models {
            regular,
            incognito,
            observer,
        });
        tracing::debug!(
            tab_groups = self.options.tab_groups_enabled,
            "Tab model selector initialized"
        );
    }

    pub fn model(&self, incognito: bool) -> Rc<dyn TabModel> {
        match self.models.borrow().as_ref() {
            Some(models) if incognito => models.incognito.clone() as Rc<dyn TabModel>,
            Some(models) => models.regular.clone() as Rc<dyn TabModel>,
            None => EmptyTabModel::shared(incognito),
        }
    }

    pub fn incognito_model(&self) -> Option<Rc<IncognitoTabModel>> {
        self.models
            .borrow()
            .as_ref()
            .map(|models| models.incognito.clone())
    }

    pub fn is_incognito_selected(&self) -> bool {
        self.incognito_selected.get()
    }

    pub fn select_model(&self, incognito: bool) {
        let old_incognito = self.incognito_selected.replace(incognito);
        if old_incognito == incognito {
            return;
        }
        self.model(old_incognito).set_active(false);
        self.model(incognito).set_active(true);
        tracing::debug!(incognito, "Tab model selected");

        self.notify(&TabModelSelectorEvent::TabModelSelected {
            new_incognito: incognito,
            old_incognito,
        });
        self.notify_changed();
    }

    pub fn current_filter(&self) -> Option<Rc<dyn TabModelFilter>> {
        self.filter_provider
            .tab_model_filter(self.incognito_selected.get())
    }

    pub fn filter_provider(&self) -> &TabModelFilterProvider {
        &self.filter_provider
    }

    pub fn is_tab_state_initialized(&self) -> bool {
        self.tab_state_initialized.get()
    }

    pub fn is_reparenting_in_progress(&self) -> bool {
        self.reparenting.get()
    }

    pub fn enter_reparenting_mode(&self) {
        tracing::debug!("Entering reparenting mode");
        self.reparenting.set(true);
    }

    /// Persistence finished loading tabs into both models
    pub fn on_restore_completed(&self) {
        self.model(false).complete_restore();
        self.model(true).complete_restore();
        if !self.tab_state_initialized.replace(true) {
            tracing::debug!("Tab state initialized");
            self.notify(&TabModelSelectorEvent::TabStateInitialized);
        }
    }

    /// Close a live tab of either model right away
    pub fn close_tab(&self, tab: &TabRef) -> bool {
        match TabModelSelector::model_for_tab_id(self, tab.id()) {
            Some(model) => model.close_tab(tab, CloseTabParams::immediate()),
            None => false,
        }
    }

    pub fn close_all_tabs(&self) {
        TabModelSelector::commit_all_tab_closures(self);
        self.model(false).close_all_tabs(false);
        self.model(true).close_all_tabs(false);
    }

    pub fn open_new_tab(
        &self,
        url: &str,
        launch_type: TabLaunchType,
        parent: Option<TabRef>,
        incognito: bool,
    ) -> Option<TabRef> {
        let mut spec = TabSpec::new(url, launch_type);
        spec.parent = parent;
        self.open_tab(spec, incognito)
    }

    /// Hand `spec` to the installed creator for `incognito`
    pub fn open_tab(&self, spec: TabSpec, incognito: bool) -> Option<TabRef> {
        let Some(manager) = self.creator_manager.borrow().clone() else {
            tracing::warn!(url = %spec.url, "No tab creator installed; cannot open tab");
            return None;
        };
        manager.tab_creator(incognito).create_new_tab(spec)
    }

    pub fn add_observer(&self, observer: Rc<dyn TabModelSelectorObserver>) {
        self.observers.add(observer);
    }

    pub fn remove_observer(&self, observer: &Rc<dyn TabModelSelectorObserver>) {
        self.observers.remove(observer);
    }

    /// Attach `observer` to both models, now or once they exist
    pub fn observe_all_models(&self, observer: Rc<dyn TabModelObserver>) {
        if !self.is_initialized() {
            self.pending_model_observers.borrow_mut().push(observer);
            return;
        }
        self.model(false).add_observer(observer.clone());
        self.model(true).add_observer(observer);
    }

    pub fn stop_observing_all_models(&self, observer: &Rc<dyn TabModelObserver>) {
        self.pending_model_observers
            .borrow_mut()
            .retain(|pending| !Rc::ptr_eq(pending, observer));
        self.model(false).remove_observer(observer);
        self.model(true).remove_observer(observer);
    }

    /// Tear down filters and models. Tabs are destroyed unless reparenting.
    pub fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        self.filter_provider.destroy();
        let models = self.models.borrow_mut().take();
        if let Some(models) = models {
            models.regular.remove_observer(&models.observer);
            models.incognito.remove_observer(&models.observer);
            models.regular.destroy();
            models.incognito.destroy();
        }
        self.observers.clear();
        tracing::debug!(reparenting = self.reparenting.get(), "Tab model selector destroyed");
    }

    fn on_model_event(&self, event: &TabModelEvent) {
        match event {
            TabModelEvent::DidAddTab {
                tab,
                creation_state,
                ..
            } => {
                self.notify_changed();
                self.notify(&TabModelSelectorEvent::NewTabCreated {
                    tab: tab.clone(),
                    creation_state: *creation_state,
                });
            }
            TabModelEvent::DidSelectTab { .. }
            | TabModelEvent::DidCloseTab { .. }
            | TabModelEvent::TabPendingClosure { .. }
            | TabModelEvent::MultipleTabsPendingClosure { .. }
            | TabModelEvent::AllTabsPendingClosure { .. }
            | TabModelEvent::TabClosureUndone { .. }
            | TabModelEvent::TabClosureCommitted { .. }
            | TabModelEvent::AllTabsClosureCommitted { .. }
            | TabModelEvent::DidMoveTab { .. }
            | TabModelEvent::TabRemoved { .. } => self.notify_changed(),
            _ => {}
        }
    }

    /// Post one `Change` for any number of changes made before the queue drains
    fn notify_changed(&self) {
        if self.change_pending.replace(true) {
            return;
        }
        let this = self.this.clone();
        self.task_runner.post_task(move || {
            if let Some(selector) = this.upgrade() {
                selector.change_pending.set(false);
                selector.notify(&TabModelSelectorEvent::Change);
            }
        });
    }

    fn notify(&self, event: &TabModelSelectorEvent) {
        tracing::trace!(event = event.name(), "Dispatching selector event");
        self.observers
            .for_each(|observer| observer.on_selector_event(event));
    }
}

impl TabModelSelector for TabModelSelectorImpl {
    fn model(&self, incognito: bool) -> Rc<dyn TabModel> {
        TabModelSelectorImpl::model(self, incognito)
    }

    fn is_incognito_selected(&self) -> bool {
        TabModelSelectorImpl::is_incognito_selected(self)
    }

    fn select_model(&self, incognito: bool) {
        TabModelSelectorImpl::select_model(self, incognito);
    }

    fn current_filter(&self) -> Option<Rc<dyn TabModelFilter>> {
        TabModelSelectorImpl::current_filter(self)
    }

    fn is_tab_state_initialized(&self) -> bool {
        TabModelSelectorImpl::is_tab_state_initialized(self)
    }

    fn is_reparenting_in_progress(&self) -> bool {
        TabModelSelectorImpl::is_reparenting_in_progress(self)
    }

    fn enter_reparenting_mode(&self) {
        TabModelSelectorImpl::enter_reparenting_mode(self);
    }
}

impl TabModelDelegate for TabModelSelectorImpl {
    fn select_model(&self, incognito: bool) {
        TabModelSelectorImpl::select_model(self, incognito);
    }

    fn is_incognito_selected(&self) -> bool {
        TabModelSelectorImpl::is_incognito_selected(self)
    }

    fn model(&self, incognito: bool) -> Rc<dyn TabModel> {
        TabModelSelectorImpl::model(self, incognito)
    }

    fn is_reparenting_in_progress(&self) -> bool {
        TabModelSelectorImpl::is_reparenting_in_progress(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creator::DefaultTabCreatorManager;
    use crate::filter::TabGroupModelFilter;
    use crate::model::TabList;
    use crate::tab::{TabId, TabIdAllocator};
    use crate::test_support::ids;

    struct Window {
        selector: Rc<TabModelSelectorImpl>,
        runner: Rc<TaskRunner>,
        events: Rc<RefCell<Vec<&'static str>>>,
    }

    fn window(options: SelectorOptions) -> Window {
        let runner = Rc::new(TaskRunner::new());
        let selector = TabModelSelectorImpl::new(options, runner.clone());
        selector.initialize();
        let weak = Rc::downgrade(&selector) as Weak<dyn TabModelSelector>;
        selector.set_tab_creator_manager(Rc::new(DefaultTabCreatorManager::new(
            Rc::new(TabIdAllocator::new()),
            weak,
        )));

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        selector.add_observer(Rc::new(move |event: &TabModelSelectorEvent| {
            sink.borrow_mut().push(event.name());
        }));
        Window {
            selector,
            runner,
            events,
        }
    }

    fn open(window: &Window, incognito: bool) -> TabRef {
        window
            .selector
            .open_new_tab("about:blank", TabLaunchType::FromChromeUi, None, incognito)
            .unwrap()
    }

    // === Lifecycle tests ===

    #[test]
    fn test_uninitialized_selector_exposes_empty_models() {
        let selector =
            TabModelSelectorImpl::new(SelectorOptions::default(), Rc::new(TaskRunner::new()));
        assert!(!selector.is_initialized());
        assert_eq!(selector.model(false).count(), 0);
        assert_eq!(selector.total_tab_count(), 0);
        assert!(selector.current_tab().is_none());
        assert!(selector.current_filter().is_none());
        assert!(selector
            .open_new_tab("a", TabLaunchType::FromChromeUi, None, false)
            .is_none());
    }

    #[test]
    fn test_uninitialized_models_keep_their_mode() {
        let selector =
            TabModelSelectorImpl::new(SelectorOptions::default(), Rc::new(TaskRunner::new()));
        assert!(selector.model(true).is_incognito());
        assert!(selector.model(true).comprehensive_model().is_incognito());
        assert!(!selector.model(false).is_incognito());

        selector.select_model(true);
        assert!(selector.current_model().is_incognito());
    }

    #[test]
    fn test_open_tabs_in_both_modes() {
        let window = window(SelectorOptions::default());
        let a = open(&window, false);
        let b = open(&window, false);
        assert_eq!(window.selector.current_tab_id(), Some(b.id()));

        let c = open(&window, true);
        assert!(window.selector.is_incognito_selected());
        assert!(window.selector.current_model().is_incognito());
        assert_eq!(window.selector.current_tab_id(), Some(c.id()));
        assert_eq!(window.selector.total_tab_count(), 3);
        assert!(window.selector.model_for_tab_id(c.id()).unwrap().is_incognito());
        assert_eq!(window.selector.tab_by_id(a.id()).map(|t| t.id()), Some(a.id()));
        assert!(window.selector.tab_by_id(TabId::new(99)).is_none());
    }

    #[test]
    fn test_select_model_toggles_active_flags() {
        let window = window(SelectorOptions::default());
        open(&window, false);
        assert!(window.selector.model(false).is_active_model());

        window.selector.select_model(true);
        assert!(!window.selector.model(false).is_active_model());
        assert!(window.selector.model(true).is_active_model());
        assert!(window.selector.current_filter().unwrap().is_incognito());
        assert!(window.events.borrow().contains(&"TabModelSelected"));
    }

    #[test]
    fn test_closing_last_incognito_tab_returns_to_regular() {
        let window = window(SelectorOptions::default());
        let regular = open(&window, false);
        let incognito = open(&window, true);
        assert!(window.selector.incognito_model().unwrap().is_live());

        assert!(window.selector.close_tab(&incognito));
        assert!(!window.selector.is_incognito_selected());
        assert_eq!(window.selector.current_tab_id(), Some(regular.id()));
        assert!(!window.selector.incognito_model().unwrap().is_live());
    }

    // === Observer tests ===

    #[test]
    fn test_change_notifications_are_coalesced() {
        let window = window(SelectorOptions::default());
        open(&window, false);
        open(&window, false);
        open(&window, false);
        assert!(!window.events.borrow().contains(&"Change"));

        window.runner.run_until_idle();
        let changes = window
            .events
            .borrow()
            .iter()
            .filter(|name| **name == "Change")
            .count();
        assert_eq!(changes, 1);
        assert_eq!(
            window
                .events
                .borrow()
                .iter()
                .filter(|name| **name == "NewTabCreated")
                .count(),
            3
        );

        open(&window, false);
        window.runner.run_until_idle();
        let changes = window
            .events
            .borrow()
            .iter()
            .filter(|name| **name == "Change")
            .count();
        assert_eq!(changes, 2);
    }

    #[test]
    fn test_restore_completed_initializes_tab_state_once() {
        let window = window(SelectorOptions::default());
        assert!(!window.selector.is_tab_state_initialized());
        window.selector.on_restore_completed();
        window.selector.on_restore_completed();
        assert!(window.selector.is_tab_state_initialized());
        let initialized = window
            .events
            .borrow()
            .iter()
            .filter(|name| **name == "TabStateInitialized")
            .count();
        assert_eq!(initialized, 1);
        let filter = window.selector.filter_provider().tab_model_filter(false);
        assert!(filter.unwrap().is_tab_model_restored());
    }

    #[test]
    fn test_observe_all_models_before_initialize() {
        let runner = Rc::new(TaskRunner::new());
        let selector = TabModelSelectorImpl::new(SelectorOptions::default(), runner);
        let added = Rc::new(Cell::new(0));
        let sink = added.clone();
        selector.observe_all_models(Rc::new(move |event: &TabModelEvent| {
            if matches!(event, TabModelEvent::DidAddTab { .. }) {
                sink.set(sink.get() + 1);
            }
        }));
        selector.initialize();

        let tab = crate::test_support::tab(1);
        selector.model(false).add_tab(
            tab,
            None,
            TabLaunchType::FromChromeUi,
            crate::tab::TabCreationState::LiveInForeground,
        );
        let tab = crate::test_support::incognito_tab(2);
        selector.model(true).add_tab(
            tab,
            None,
            TabLaunchType::FromChromeUi,
            crate::tab::TabCreationState::LiveInForeground,
        );
        assert_eq!(added.get(), 2);
    }

    // === Filter wiring tests ===

    #[test]
    fn test_group_filter_installed_when_enabled() {
        let window = window(SelectorOptions::default());
        let filter = window.selector.filter_provider().tab_model_filter(false).unwrap();
        assert!(filter.as_any().is::<TabGroupModelFilter>());

        let window = self::window(SelectorOptions {
            tab_groups_enabled: false,
            ..SelectorOptions::default()
        });
        let filter = window.selector.filter_provider().tab_model_filter(false).unwrap();
        assert!(!filter.as_any().is::<TabGroupModelFilter>());
    }

    #[test]
    fn test_link_children_group_and_stay_contiguous() {
        let window = window(SelectorOptions::default());
        let a = open(&window, false);
        let b = open(&window, false);
        window.selector.on_restore_completed();
        window.selector.model(false).set_index(0, crate::tab::TabSelectionType::FromUser, false);

        let child = window
            .selector
            .open_new_tab("c", TabLaunchType::FromLongpressBackground, Some(a.clone()), false)
            .unwrap();
        assert_eq!(
            ids(&*window.selector.model(false)),
            vec![a.id().get(), child.id().get(), b.id().get()]
        );
        let filter = window.selector.current_filter().unwrap();
        assert_eq!(filter.count(), 2);
        assert_eq!(filter.related_tab_ids(a.id()), vec![a.id(), child.id()]);
    }

    // === Teardown tests ===

    #[test]
    fn test_destroy_destroys_tabs() {
        let window = window(SelectorOptions::default());
        let a = open(&window, false);
        let b = open(&window, true);
        window.selector.destroy();
        assert!(a.is_destroyed());
        assert!(b.is_destroyed());
        assert_eq!(window.selector.total_tab_count(), 0);
        assert!(window.selector.current_filter().is_none());
    }

    #[test]
    fn test_reparenting_keeps_tabs_alive() {
        let window = window(SelectorOptions::default());
        let a = open(&window, false);
        window.selector.enter_reparenting_mode();
        window.selector.destroy();
        assert!(!a.is_destroyed());
    }
}
