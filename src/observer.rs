//! Observer registry shared by models, filters and selectors.
//!
//! Dispatch always iterates over a snapshot, and the internal `RefCell` is never borrowed
//! while an observer runs, so an observer may add or remove observers (or mutate the
//! thing it observes) from inside its callback.

use std::cell::RefCell;
use std::rc::Rc;

pub struct ObserverList<O: ?Sized> {
    observers: RefCell<Vec<Rc<O>>>,
}

impl<O: ?Sized> Default for ObserverList<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: ?Sized> ObserverList<O> {
    pub fn new() -> Self {
        Self {
            observers: RefCell::new(Vec::new()),
        }
    }

    /// Register an observer. Registering the same `Rc` twice is a no-op.
    pub fn add(&self, observer: Rc<O>) {
        let mut observers = self.observers.borrow_mut();
        if !observers.iter().any(|o| Rc::ptr_eq(o, &observer)) {
            observers.push(observer);
        }
    }

    pub fn remove(&self, observer: &Rc<O>) -> bool {
        let mut observers = self.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|o| !Rc::ptr_eq(o, observer));
        observers.len() != before
    }

    pub fn snapshot(&self) -> Vec<Rc<O>> {
        self.observers.borrow().clone()
    }

    /// Call `f` for every observer registered at the time of the call.
    pub fn for_each(&self, mut f: impl FnMut(&O)) {
        for observer in self.snapshot() {
            f(&observer);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.observers.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    trait Counter {
        fn hit(&self);
    }

    struct Hits(Cell<u32>);

    impl Counter for Hits {
        fn hit(&self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_add_is_idempotent() {
        let list: ObserverList<dyn Counter> = ObserverList::new();
        let hits = Rc::new(Hits(Cell::new(0)));
        let observer: Rc<dyn Counter> = hits.clone();
        list.add(observer.clone());
        list.add(observer);
        assert_eq!(list.len(), 1);

        list.for_each(|o| o.hit());
        assert_eq!(hits.0.get(), 1);
    }

    #[test]
    fn test_remove() {
        let list: ObserverList<dyn Counter> = ObserverList::new();
        let observer: Rc<dyn Counter> = Rc::new(Hits(Cell::new(0)));
        list.add(observer.clone());
        assert!(list.remove(&observer));
        assert!(!list.remove(&observer));
        assert!(list.is_empty());
    }

    #[test]
    fn test_mutation_during_dispatch() {
        // An observer that registers another observer while being notified
        struct Adder {
            list: Rc<ObserverList<dyn Counter>>,
        }
        impl Counter for Adder {
            fn hit(&self) {
                self.list.add(Rc::new(Hits(Cell::new(0))));
            }
        }

        let list: Rc<ObserverList<dyn Counter>> = Rc::new(ObserverList::new());
        list.add(Rc::new(Adder { list: list.clone() }));
        list.for_each(|o| o.hit());
        assert_eq!(list.len(), 2);
        list.clear();
    }
}
