//! Checkable list view-model over an item collection.
//!
//! This is what a list widget in the side panel reads: one row per item,
//! the name as text, the color as a swatch and the visibility as a check
//! box. Toggling the check box goes straight back to the collection.

use std::sync::Arc;

use crate::items::CollectionItem;

use super::collection::ItemCollection;
use super::index::ModelIndex;
use super::role::{CheckState, ItemData, ItemRole};

/// Flags indicating what operations are allowed on a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemFlags {
    /// Row can be selected.
    pub selectable: bool,
    /// Row has a checkbox.
    pub checkable: bool,
    /// Row is enabled (can interact).
    pub enabled: bool,
}

impl ItemFlags {
    /// Flags of a row without an item.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Creates flags for a checkable row.
    pub fn checkable() -> Self {
        Self {
            selectable: true,
            checkable: true,
            enabled: true,
        }
    }
}

/// A list model mirroring an [`ItemCollection`].
///
/// The model holds no state of its own: every query reads the collection,
/// so it can never fall out of sync.
pub struct ItemListModel<T: CollectionItem> {
    collection: Arc<ItemCollection<T>>,
}

impl<T: CollectionItem> Clone for ItemListModel<T> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
        }
    }
}

impl<T: CollectionItem> ItemListModel<T> {
    /// Creates a model over `collection`.
    pub fn new(collection: Arc<ItemCollection<T>>) -> Self {
        Self { collection }
    }

    /// The underlying collection.
    pub fn collection(&self) -> &Arc<ItemCollection<T>> {
        &self.collection
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.collection.len()
    }

    /// Index of `row`, or an invalid index when out of range.
    pub fn index(&self, row: usize) -> ModelIndex {
        self.collection
            .at(row)
            .map_or(ModelIndex::invalid(), |item| ModelIndex::new(row, item.id()))
    }

    /// The item `index` refers to, if it is still at that row.
    pub fn item(&self, index: &ModelIndex) -> Option<Arc<T>> {
        let id = index.item_id()?;
        self.collection
            .at(index.row())
            .filter(|item| item.id() == id)
    }

    /// Data for a row and role.
    pub fn data(&self, index: &ModelIndex, role: ItemRole) -> ItemData {
        let Some(item) = self.item(index) else {
            return ItemData::None;
        };
        match role {
            ItemRole::Display => ItemData::from(item.name()),
            ItemRole::Decoration => item.color().map_or(ItemData::None, ItemData::Color),
            ItemRole::ToolTip => ItemData::from(format!("{}: {}", T::KIND, item.name())),
            ItemRole::CheckState => self
                .collection
                .is_visible(item.id())
                .map_or(ItemData::None, |visible| {
                    ItemData::CheckState(CheckState::from(visible))
                }),
            ItemRole::User => ItemData::Item(item.id()),
        }
    }

    /// Flags for a row.
    pub fn flags(&self, index: &ModelIndex) -> ItemFlags {
        if self.item(index).is_some() {
            ItemFlags::checkable()
        } else {
            ItemFlags::disabled()
        }
    }

    /// Sets data on a row. Only [`ItemRole::CheckState`] is writable; it
    /// changes the item's visibility.
    ///
    /// Returns true if anything changed.
    pub fn set_data(&self, index: &ModelIndex, value: ItemData, role: ItemRole) -> bool {
        let (Some(item), ItemRole::CheckState) = (self.item(index), role) else {
            return false;
        };
        match value.as_check_state() {
            Some(state) => self.collection.set_visibility(item.id(), state.is_checked()),
            None => false,
        }
    }
}
