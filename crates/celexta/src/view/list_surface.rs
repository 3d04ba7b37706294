//! Side-panel list mirroring a whole collection.

use std::sync::Arc;

use celexta_core::logging::targets;

use crate::items::{CollectionItem, Color, ItemId};

use super::{HandleMap, PresentationAdapter, VisualHandle};

/// One checkable row.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRow {
    /// Item name.
    pub name: String,
    /// Swatch color.
    pub color: Option<Color>,
    /// Check box state; mirrors visibility.
    pub checked: bool,
}

impl VisualHandle for ListRow {
    fn set_visible(&mut self, visible: bool) {
        self.checked = visible;
    }

    fn is_visible(&self) -> bool {
        self.checked
    }
}

/// A list with one row per item of a collection, in collection order.
#[derive(Debug)]
pub struct ListSurface<T> {
    rows: HandleMap<ListRow>,
    _kind: std::marker::PhantomData<fn() -> T>,
}

impl<T: CollectionItem> Default for ListSurface<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CollectionItem> ListSurface<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            rows: HandleMap::new(),
            _kind: std::marker::PhantomData,
        }
    }

    /// The row for `id`.
    pub fn row(&self, id: ItemId) -> Option<&ListRow> {
        self.rows.get(id)
    }

    /// Rows in display order.
    pub fn rows(&self) -> impl Iterator<Item = (ItemId, &ListRow)> {
        self.rows.iter()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn build(item: &T) -> ListRow {
        ListRow {
            name: item.name().to_string(),
            color: item.color(),
            checked: true,
        }
    }
}

impl<T: CollectionItem> PresentationAdapter<T> for ListSurface<T> {
    fn on_inserted(&mut self, item: &Arc<T>, position: usize) {
        if self.rows.insert_with(item.id(), || Some(Self::build(item))) {
            tracing::trace!(target: targets::VIEW, kind = %T::KIND, id = %item.id(), position, "list row added");
        }
    }

    fn on_removed(&mut self, item: &Arc<T>) {
        self.rows.remove(item.id());
    }

    fn on_updated(&mut self, item: &Arc<T>) {
        self.rows.recreate_with(item.id(), || Some(Self::build(item)));
    }

    fn on_visibility_changed(&mut self, item: &Arc<T>, visible: bool) {
        self.rows.set_visible(item.id(), visible);
    }
}
