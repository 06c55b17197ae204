//! Tab model layer of a multi-window browser.
//!
//! ```text
//!   TabWindowManager ── slot ──→ TabModelSelectorImpl (one per window)
//!                                  ├── TabModelImpl        (regular)
//!                                  ├── IncognitoTabModel   (lazy)
//!                                  └── TabModelFilterProvider
//!                                        └── one filter per model
//! ```

pub mod config;
pub mod creator;
pub mod filter;
pub mod model;
pub mod observer;
pub mod scenario;
pub mod selector;
pub mod tab;
pub mod task;
pub mod window_manager;

#[cfg(test)]
mod test_support;
