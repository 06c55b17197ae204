mod launch_type;
mod tab_id;

pub use launch_type::{TabCreationState, TabLaunchType, TabSelectionType};
pub use tab_id::{TabId, TabIdAllocator};

use std::cell::Cell;
use std::rc::Rc;

/// Shared handle to a tab. Models, filters and observers all hold clones of the same `Rc`.
pub type TabRef = Rc<Tab>;

/// Represents a single browser tab as seen by the tab model layer.
///
/// Identity and opener information are fixed at creation; the closing/destroyed flags and
/// the group root id are interior-mutable because they change while the tab is shared.
#[derive(Debug)]
pub struct Tab {
    id: TabId,
    parent_id: Option<TabId>,
    incognito: bool,
    launch_type: TabLaunchType,
    url: String,
    root_id: Cell<TabId>,
    grouped_with_parent: Cell<bool>,
    closing: Cell<bool>,
    destroyed: Cell<bool>,
}

impl Tab {
    pub fn new(id: TabId, incognito: bool) -> Self {
        Self {
            id,
            parent_id: None,
            incognito,
            launch_type: TabLaunchType::default(),
            url: String::new(),
            root_id: Cell::new(id),
            grouped_with_parent: Cell::new(false),
            closing: Cell::new(false),
            destroyed: Cell::new(false),
        }
    }

    /// Record the opener. A freshly opened child is considered grouped with its parent
    /// until the user moves focus elsewhere.
    pub fn with_parent(mut self, parent_id: TabId) -> Self {
        self.parent_id = Some(parent_id);
        self.grouped_with_parent.set(true);
        self
    }

    pub fn with_launch_type(mut self, launch_type: TabLaunchType) -> Self {
        self.launch_type = launch_type;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Restore a tab into an existing group
    pub fn with_root_id(self, root_id: TabId) -> Self {
        self.root_id.set(root_id);
        self
    }

    pub fn into_ref(self) -> TabRef {
        Rc::new(self)
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn parent_id(&self) -> Option<TabId> {
        self.parent_id
    }

    pub fn is_incognito(&self) -> bool {
        self.incognito
    }

    pub fn launch_type(&self) -> TabLaunchType {
        self.launch_type
    }

    pub fn url(&self) -> &str {
        &self.url
    }


    pub fn root_id(&self) -> TabId {
        self.root_id.get()
    }

    pub fn set_root_id(&self, root_id: TabId) {
        self.root_id.set(root_id);
    }

    pub fn is_grouped_with_parent(&self) -> bool {
        self.grouped_with_parent.get()
    }

    pub fn set_grouped_with_parent(&self, grouped: bool) {
        self.grouped_with_parent.set(grouped);
    }

    pub fn is_closing(&self) -> bool {
        self.closing.get()
    }

    pub fn set_closing(&self, closing: bool) {
        self.closing.set(closing);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Release the tab. Only the model that owns the tab calls this, exactly once.
    pub fn destroy(&self) {
        if self.destroyed.replace(true) {
            tracing::error!(tab_id = %self.id, "Tab destroyed twice");
            debug_assert!(false, "tab {} destroyed twice", self.id);
            return;
        }
        tracing::trace!(tab_id = %self.id, incognito = self.incognito, "Tab destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Construction tests ===

    #[test]
    fn test_tab_new_defaults() {
        let tab = Tab::new(TabId::new(3), false);
        assert_eq!(tab.id(), TabId::new(3));
        assert_eq!(tab.root_id(), TabId::new(3));
        assert_eq!(tab.parent_id(), None);
        assert!(!tab.is_grouped_with_parent());
        assert!(!tab.is_closing());
        assert!(!tab.is_destroyed());
        assert_eq!(tab.launch_type(), TabLaunchType::FromChromeUi);
    }

    #[test]
    fn test_tab_with_parent_is_grouped() {
        let tab = Tab::new(TabId::new(4), false)
            .with_parent(TabId::new(1))
            .with_launch_type(TabLaunchType::FromLink);
        assert_eq!(tab.parent_id(), Some(TabId::new(1)));
        assert!(tab.is_grouped_with_parent());
        assert_eq!(tab.launch_type(), TabLaunchType::FromLink);
    }

    #[test]
    fn test_tab_with_root_id() {
        let tab = Tab::new(TabId::new(5), false).with_root_id(TabId::new(2));
        assert_eq!(tab.root_id(), TabId::new(2));
        tab.set_root_id(TabId::new(5));
        assert_eq!(tab.root_id(), TabId::new(5));
    }

    // === Destroy tests ===

    #[test]
    fn test_destroy_sets_flag() {
        let tab = Tab::new(TabId::new(1), true);
        tab.destroy();
        assert!(tab.is_destroyed());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "destroyed twice")]
    fn test_double_destroy_asserts() {
        let tab = Tab::new(TabId::new(1), false);
        tab.destroy();
        tab.destroy();
    }
}
