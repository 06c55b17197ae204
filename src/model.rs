//! Tab containers.
//!
//! ```text
//!   TabList (read-only view)
//!      ▲
//!   TabModel (mutations, pending closures, observers)
//!      ▲
//!      ├── TabModelImpl        real container for one mode of one window
//!      ├── EmptyTabModel       null object, never mutated
//!      └── IncognitoTabModel   EMPTY ⇄ LIVE wrapper over a lazily built TabModelImpl
//! ```
//!
//! Models call back into their window through [`TabModelDelegate`] and ask a
//! [`TabModelOrderController`] where new tabs go.

mod empty;
mod incognito;
mod observer;
mod order_controller;
mod tab_list;
mod tab_model;
mod tab_model_impl;

pub use empty::EmptyTabModel;
pub use incognito::{
    IncognitoTabModel, IncognitoTabModelEvent, IncognitoTabModelObserver, TabModelFactory,
};
pub use observer::{TabModelEvent, TabModelObserver};
pub use order_controller::TabModelOrderControllerImpl;
pub use tab_list::{TabList, TabListSnapshot};
pub use tab_model::{CloseTabParams, TabModel, TabModelDelegate, TabModelOrderController};
pub use tab_model_impl::TabModelImpl;
