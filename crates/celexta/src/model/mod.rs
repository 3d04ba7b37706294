//! Observable collections and the models views read from.
//!
//! # Core Types
//!
//! - [`ItemCollection`]: ordered, deduplicated items with visibility flags
//! - [`ChangeNotifier`] / [`CollectionEvent`]: what a collection announces
//! - [`ModelIndex`]: a row token, or the "not found" sentinel
//! - [`ColorPool`]: cyclic color allocator
//! - [`ItemListModel`]: checkable list rows over a collection
//!
//! # Architecture Overview
//!
//! ```text
//! ┌────────────────┐  CollectionEvent  ┌──────────────────────┐
//! │ ItemCollection │──────────────────>│ PresentationAdapter  │ (list rows,
//! │  (per kind)    │   ChangeNotifier  │  (one per surface)   │  frame artists,
//! └────────────────┘                   └──────────────────────┘  light curve)
//!         ^
//!         │ add / remove / update / set_visibility
//! ┌────────────────┐
//! │   Controller   │
//! └────────────────┘
//! ```

mod collection;
mod color_pool;
mod index;
mod list_model;
mod role;

pub use collection::{ChangeNotifier, CollectionEvent, ItemCollection};
pub use color_pool::{ColorPool, DEFAULT_PALETTE};
pub use index::ModelIndex;
pub use list_model::{ItemFlags, ItemListModel};
pub use role::{CheckState, ItemData, ItemRole};
