use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;

/// Stable identifier of a tab, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(u32);

impl TabId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for TabId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out tab ids.
///
/// One allocator is owned by the composition root and shared by reference with every
/// tab creator, so ids stay unique across windows without a process-wide static.
#[derive(Debug)]
pub struct TabIdAllocator {
    next: Cell<u32>,
}

impl Default for TabIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl TabIdAllocator {
    pub fn new() -> Self {
        Self { next: Cell::new(1) }
    }

    /// Allocate the next unused id
    pub fn allocate(&self) -> TabId {
        let id = self.next.get();
        self.next.set(id + 1);
        TabId(id)
    }
}
