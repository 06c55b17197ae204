use crate::selector::TabModelSelector;
use crate::tab::{Tab, TabCreationState, TabIdAllocator, TabLaunchType, TabRef};
use std::rc::{Rc, Weak};

/// What to open
#[derive(Debug, Clone, Default)]
pub struct TabSpec {
    pub url: String,
    pub launch_type: TabLaunchType,
    pub parent: Option<TabRef>,
    /// Insertion hint; the order controller has the final say
    pub position: Option<usize>,
    pub creation_state: TabCreationState,
}

impl TabSpec {
    pub fn new(url: impl Into<String>, launch_type: TabLaunchType) -> Self {
        Self {
            url: url.into(),
            launch_type,
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent: TabRef) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}

/// Creates tabs for one mode and adds them to that mode's model.
pub trait TabCreator {
    fn create_new_tab(&self, spec: TabSpec) -> Option<TabRef>;
}

pub trait TabCreatorManager {
    fn tab_creator(&self, incognito: bool) -> Rc<dyn TabCreator>;
}

pub struct DefaultTabCreator {
    incognito: bool,
    ids: Rc<TabIdAllocator>,
    selector: Weak<dyn TabModelSelector>,
}

impl DefaultTabCreator {
    pub fn new(
        incognito: bool,
        ids: Rc<TabIdAllocator>,
        selector: Weak<dyn TabModelSelector>,
    ) -> Self {
        Self {
            incognito,
            ids,
            selector,
        }
    }
}

impl TabCreator for DefaultTabCreator {
    fn create_new_tab(&self, spec: TabSpec) -> Option<TabRef> {
        let Some(selector) = self.selector.upgrade() else {
            tracing::warn!(url = %spec.url, "Tab requested after its window was destroyed");
            return None;
        };

        let mut tab = Tab::new(self.ids.allocate(), self.incognito)
            .with_launch_type(spec.launch_type)
            .with_url(spec.url);
        if let Some(parent) = &spec.parent {
            tab = tab.with_parent(parent.id());
        }
        let tab = tab.into_ref();

        selector.model(self.incognito).add_tab(
            tab.clone(),
            spec.position,
            spec.launch_type,
            spec.creation_state,
        );
        Some(tab)
    }
}

/// One [`DefaultTabCreator`] per mode, sharing an id allocator
pub struct DefaultTabCreatorManager {
    regular: Rc<dyn TabCreator>,
    incognito: Rc<dyn TabCreator>,
}

impl DefaultTabCreatorManager {
    pub fn new(ids: Rc<TabIdAllocator>, selector: Weak<dyn TabModelSelector>) -> Self {
        Self {
            regular: Rc::new(DefaultTabCreator::new(false, ids.clone(), selector.clone())),
            incognito: Rc::new(DefaultTabCreator::new(true, ids, selector)),
        }
    }
}

impl TabCreatorManager for DefaultTabCreatorManager {
    fn tab_creator(&self, incognito: bool) -> Rc<dyn TabCreator> {
        if incognito {
            self.incognito.clone()
        } else {
            self.regular.clone()
        }
    }
}
