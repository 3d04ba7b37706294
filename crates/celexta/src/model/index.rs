//! Position tokens handed out by collections and list models.

use crate::items::ItemId;

/// Represents a position within an [`ItemCollection`] or [`ItemListModel`].
///
/// An index names both the row and the item that sat there when the index
/// was created.
///
/// # Index Validity
///
/// Model indices should be used immediately and not stored long-term. After
/// an insertion or removal the row may point elsewhere; [`ItemListModel`]
/// re-checks the item id and treats a stale index as invalid.
///
/// [`ItemCollection`]: super::ItemCollection
/// [`ItemListModel`]: super::ItemListModel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModelIndex {
    row: usize,
    item: Option<ItemId>,
}

impl ModelIndex {
    /// Creates an invalid (null) model index, the "not found" value.
    #[inline]
    pub const fn invalid() -> Self {
        Self { row: 0, item: None }
    }

    /// Creates a valid index for `item` at `row`.
    #[inline]
    pub fn new(row: usize, item: ItemId) -> Self {
        Self {
            row,
            item: Some(item),
        }
    }

    /// Returns true if this index refers to an item.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.item.is_some()
    }

    /// The row. Meaningless for an invalid index.
    #[inline]
    pub fn row(&self) -> usize {
        self.row
    }

    /// The item this index was created for.
    #[inline]
    pub fn item_id(&self) -> Option<ItemId> {
        self.item
    }
}
