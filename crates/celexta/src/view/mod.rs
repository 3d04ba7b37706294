//! Presentation surfaces that mirror collections.
//!
//! A surface keeps one visual handle per item it shows, in a [`HandleMap`],
//! and is driven by [`CollectionEvent`]s through the [`PresentationAdapter`]
//! trait. The handle contract is the same for every surface:
//!
//! - inserting an item that already has a handle does nothing
//! - removing an item without a handle does nothing
//! - an update destroys the handle and builds a new one from the item
//! - a visibility change shows or hides the handle in place
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use celexta::items::{CatalogTable, CollectionItem};
//! use celexta::model::ItemCollection;
//! use celexta::view::{attach, ListSurface};
//!
//! let tables = ItemCollection::<CatalogTable>::new();
//! let list = Arc::new(Mutex::new(ListSurface::new()));
//! attach(&list, &tables);
//!
//! let table = CatalogTable::new([]).with_name("table_A");
//! tables.add(table.clone());
//! assert_eq!(list.lock().row(table.id()).map(|row| row.name.as_str()), Some("table_A"));
//! ```

mod artist;
mod frame_view;
mod light_curve;
mod list_surface;

use std::collections::HashMap;
use std::sync::Arc;

use celexta_core::ConnectionId;
use parking_lot::Mutex;

use crate::items::{CollectionItem, ItemId};
use crate::model::{CollectionEvent, ItemCollection};

pub use artist::{Artist, ArtistShape, IMAGE_Z_VALUE, OVERLAY_Z_VALUE};
pub use frame_view::{FrameView, OverlayLayer, SkyOverlay, ViewRange};
pub use light_curve::{CurvePoint, LightCurve, LightCurveView};
pub use list_surface::{ListRow, ListSurface};

/// Something a surface draws for one item.
pub trait VisualHandle {
    /// Shows or hides the handle.
    fn set_visible(&mut self, visible: bool);

    /// Whether the handle is shown.
    fn is_visible(&self) -> bool;

    /// Stacking order; higher is drawn on top.
    fn z_value(&self) -> f64 {
        0.0
    }
}

/// Visual handles keyed by item, in insertion order.
#[derive(Debug, Clone)]
pub struct HandleMap<H> {
    handles: HashMap<ItemId, H>,
    order: Vec<ItemId>,
}

impl<H> Default for HandleMap<H> {
    fn default() -> Self {
        Self {
            handles: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<H: VisualHandle> HandleMap<H> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds and registers a handle for `id` unless one exists.
    ///
    /// `build` may refuse by returning `None`. Returns true if a handle was
    /// added.
    pub fn insert_with<F>(&mut self, id: ItemId, build: F) -> bool
    where
        F: FnOnce() -> Option<H>,
    {
        if self.handles.contains_key(&id) {
            return false;
        }
        let Some(handle) = build() else {
            return false;
        };
        self.handles.insert(id, handle);
        self.order.push(id);
        true
    }

    /// Destroys the handle for `id`, returning it.
    pub fn remove(&mut self, id: ItemId) -> Option<H> {
        let handle = self.handles.remove(&id)?;
        self.order.retain(|other| *other != id);
        Some(handle)
    }

    /// Replaces the handle for `id` with a freshly built one, keeping its
    /// slot in the drawing order and its visibility.
    ///
    /// Items without a handle are left alone. If `build` refuses, the old
    /// handle is dropped. Returns true if a new handle is in place.
    pub fn recreate_with<F>(&mut self, id: ItemId, build: F) -> bool
    where
        F: FnOnce() -> Option<H>,
    {
        let Some(old) = self.handles.remove(&id) else {
            return false;
        };
        let visible = old.is_visible();
        drop(old);
        match build() {
            Some(mut handle) => {
                handle.set_visible(visible);
                self.handles.insert(id, handle);
                true
            }
            None => {
                self.order.retain(|other| *other != id);
                false
            }
        }
    }

    /// Shows or hides the handle for `id`. Returns true if it exists.
    pub fn set_visible(&mut self, id: ItemId, visible: bool) -> bool {
        match self.handles.get_mut(&id) {
            Some(handle) => {
                handle.set_visible(visible);
                true
            }
            None => false,
        }
    }

    /// The handle for `id`.
    pub fn get(&self, id: ItemId) -> Option<&H> {
        self.handles.get(&id)
    }

    /// Mutable access to the handle for `id`.
    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut H> {
        self.handles.get_mut(&id)
    }

    /// Returns true if `id` has a handle.
    pub fn contains(&self, id: ItemId) -> bool {
        self.handles.contains_key(&id)
    }

    /// Number of handles.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if there are no handles.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Item ids in insertion order.
    pub fn ids(&self) -> &[ItemId] {
        &self.order
    }

    /// Handles in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &H)> {
        self.order
            .iter()
            .filter_map(|id| self.handles.get(id).map(|h| (*id, h)))
    }

    /// Mutable handles, in no particular order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut H> {
        self.handles.values_mut()
    }

    /// Handles sorted for drawing: by z-value, then insertion order.
    pub fn draw_order(&self) -> Vec<(ItemId, &H)> {
        let mut handles: Vec<_> = self.iter().collect();
        handles.sort_by(|(_, a), (_, b)| a.z_value().total_cmp(&b.z_value()));
        handles
    }

    /// Destroys every handle.
    pub fn clear(&mut self) {
        self.handles.clear();
        self.order.clear();
    }
}

/// A surface that mirrors a collection of `T`.
pub trait PresentationAdapter<T: CollectionItem>: Send {
    /// `item` entered the collection.
    fn on_inserted(&mut self, item: &Arc<T>, position: usize);

    /// `item` left the collection.
    fn on_removed(&mut self, item: &Arc<T>);

    /// `item` changed; rebuild its handle.
    fn on_updated(&mut self, item: &Arc<T>);

    /// `item` was shown or hidden.
    fn on_visibility_changed(&mut self, item: &Arc<T>, visible: bool);

    /// Routes one event to the matching method.
    fn handle_event(&mut self, event: &CollectionEvent<T>) {
        match event {
            CollectionEvent::Inserted { item, position } => self.on_inserted(item, *position),
            CollectionEvent::Removed { item, .. } => self.on_removed(item),
            CollectionEvent::Updated { item } => self.on_updated(item),
            CollectionEvent::VisibilityChanged { item, visible } => {
                self.on_visibility_changed(item, *visible)
            }
        }
    }
}

/// Subscribes `adapter` to every event of `collection`.
///
/// The connection holds the adapter weakly: once the last strong reference
/// is dropped, events are ignored. Items already in the collection are not
/// replayed. The adapter must not mutate `collection` from its handlers.
pub fn attach<T, A>(adapter: &Arc<Mutex<A>>, collection: &ItemCollection<T>) -> ConnectionId
where
    T: CollectionItem,
    A: PresentationAdapter<T> + 'static,
{
    let weak = Arc::downgrade(adapter);
    collection.notifier().connect(move |event| {
        if let Some(adapter) = weak.upgrade() {
            adapter.lock().handle_event(event);
        }
    })
}
