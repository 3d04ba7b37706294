//! The authoritative store of one kind of item in a tab.
//!
//! An [`ItemCollection`] keeps items in insertion order, each with a
//! visibility flag, and announces every change through its
//! [`ChangeNotifier`]. Views never mutate items directly; they observe.
//!
//! Mutations never fail. Duplicate adds, unknown ids and redundant
//! visibility changes are logged at debug level and ignored.
//!
//! # Delivery
//!
//! Events are emitted after the internal lock is released, so observers may
//! read (or even mutate) the collection from inside a slot. Mutation and
//! dispatch are serialized by a reentrant lock, so events for a given
//! collection are delivered in the order the mutations happened.
//!
//! A mutation made from inside a slot is applied at once, but its event is
//! queued. The outermost mutation delivers queued events one at a time, each
//! to every observer, so no observer sees a removal before the matching
//! insertion.
//!
//! # Example
//!
//! ```
//! use celexta::astro::{Angle, SkyCoord};
//! use celexta::items::{CollectionItem, Region};
//! use celexta::model::{CollectionEvent, ItemCollection};
//!
//! let regions = ItemCollection::<Region>::new();
//! regions.notifier().connect(|event| {
//!     if let CollectionEvent::Inserted { item, position } = event {
//!         println!("{} inserted at {position}", item.name());
//!     }
//! });
//!
//! let circle = Region::circle(SkyCoord::from_deg(10.0, 20.0), Angle::from_arcsec(5.0));
//! let id = circle.id();
//! regions.add(circle);
//! regions.set_visibility(id, false);
//! assert_eq!(regions.is_visible(id), Some(false));
//! ```

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use celexta_core::logging::targets;
use celexta_core::Signal;
use parking_lot::{Mutex, ReentrantMutex, RwLock};

use crate::items::{CollectionItem, Color, ItemId, ItemUpdate};

use super::index::ModelIndex;

/// A change to an [`ItemCollection`].
#[derive(Debug, Clone)]
pub enum CollectionEvent<T> {
    /// `item` was appended at `position`.
    Inserted {
        /// The new item.
        item: Arc<T>,
        /// Its row.
        position: usize,
    },
    /// `item` was removed from `position`.
    Removed {
        /// The removed item.
        item: Arc<T>,
        /// The row it occupied.
        position: usize,
    },
    /// Attributes of `item` changed; it is the new state.
    Updated {
        /// The item after the change.
        item: Arc<T>,
    },
    /// `item` was shown or hidden.
    VisibilityChanged {
        /// The item.
        item: Arc<T>,
        /// The new flag.
        visible: bool,
    },
}

impl<T> CollectionEvent<T> {
    /// The item the event is about.
    pub fn item(&self) -> &Arc<T> {
        match self {
            CollectionEvent::Inserted { item, .. }
            | CollectionEvent::Removed { item, .. }
            | CollectionEvent::Updated { item }
            | CollectionEvent::VisibilityChanged { item, .. } => item,
        }
    }
}

/// The signal a collection emits its events on.
pub type ChangeNotifier<T> = Signal<CollectionEvent<T>>;

struct Entry<T> {
    item: Arc<T>,
    visible: bool,
}

struct State<T> {
    order: Vec<ItemId>,
    entries: HashMap<ItemId, Entry<T>>,
}

impl<T> State<T> {
    fn position(&self, id: ItemId) -> Option<usize> {
        self.order.iter().position(|other| *other == id)
    }
}

/// An ordered, deduplicated set of items with visibility flags.
pub struct ItemCollection<T: CollectionItem> {
    state: RwLock<State<T>>,
    /// Held across mutation and delivery. The flag is set while events are
    /// being delivered.
    dispatch: ReentrantMutex<Cell<bool>>,
    pending: Mutex<VecDeque<CollectionEvent<T>>>,
    notifier: Arc<ChangeNotifier<T>>,
}

impl<T: CollectionItem> Default for ItemCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CollectionItem> ItemCollection<T> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                order: Vec::new(),
                entries: HashMap::new(),
            }),
            dispatch: ReentrantMutex::new(Cell::new(false)),
            pending: Mutex::new(VecDeque::new()),
            notifier: Arc::new(Signal::new()),
        }
    }

    /// The signal carrying this collection's events.
    pub fn notifier(&self) -> &Arc<ChangeNotifier<T>> {
        &self.notifier
    }

    /// Queues `event` and, unless a delivery is already running further up
    /// the stack, delivers everything queued in order.
    fn publish(&self, delivering: &Cell<bool>, event: CollectionEvent<T>) {
        self.pending.lock().push_back(event);
        if delivering.replace(true) {
            tracing::trace!(target: targets::COLLECTION, kind = %T::KIND, "event queued behind current delivery");
            return;
        }
        loop {
            let next = self.pending.lock().pop_front();
            let Some(event) = next else {
                break;
            };
            self.notifier.emit(event);
        }
        delivering.set(false);
    }

    /// Appends `item`, visible.
    ///
    /// If an item with the same id is already present this does nothing and
    /// returns its index. An item of a colored kind without a color gets
    /// [`Color::FALLBACK`] and a warning.
    pub fn add(&self, mut item: T) -> ModelIndex {
        let dispatch = self.dispatch.lock();
        let id = item.id();
        let (item, position) = {
            let mut state = self.state.write();
            if let Some(row) = state.position(id) {
                tracing::debug!(target: targets::COLLECTION, kind = %T::KIND, %id, "item already present, ignoring add");
                return ModelIndex::new(row, id);
            }
            if T::COLORED && item.color().is_none() {
                tracing::warn!(
                    target: targets::COLLECTION,
                    kind = %T::KIND,
                    name = item.name(),
                    fallback = %Color::FALLBACK,
                    "item has no color, using fallback"
                );
                item.set_color(Color::FALLBACK);
            }
            let item = Arc::new(item);
            state.order.push(id);
            state.entries.insert(
                id,
                Entry {
                    item: item.clone(),
                    visible: true,
                },
            );
            (item, state.order.len() - 1)
        };

        tracing::debug!(target: targets::COLLECTION, kind = %T::KIND, %id, position, "item inserted");
        self.publish(&dispatch, CollectionEvent::Inserted { item, position });
        ModelIndex::new(position, id)
    }

    /// Removes the item with `id`, returning it. Unknown ids are ignored.
    ///
    /// Every observer has processed the removal when this returns, unless
    /// it was called from inside a slot of this collection.
    pub fn remove(&self, id: ItemId) -> Option<Arc<T>> {
        let dispatch = self.dispatch.lock();
        let removed = {
            let mut state = self.state.write();
            match state.position(id) {
                Some(position) => {
                    state.order.remove(position);
                    state.entries.remove(&id).map(|entry| (entry.item, position))
                }
                None => None,
            }
        };

        let Some((item, position)) = removed else {
            tracing::debug!(target: targets::COLLECTION, kind = %T::KIND, %id, "item not present, ignoring remove");
            return None;
        };
        tracing::debug!(target: targets::COLLECTION, kind = %T::KIND, %id, position, "item removed");
        self.publish(
            &dispatch,
            CollectionEvent::Removed {
                item: item.clone(),
                position,
            },
        );
        Some(item)
    }

    /// Removes the item at `row`. Out-of-range rows are ignored.
    pub fn remove_row(&self, row: usize) -> Option<Arc<T>> {
        let _dispatch = self.dispatch.lock();
        let id = self.state.read().order.get(row).copied();
        match id {
            Some(id) => self.remove(id),
            None => {
                tracing::debug!(target: targets::COLLECTION, kind = %T::KIND, row, "row out of range, ignoring remove");
                None
            }
        }
    }

    /// Shows or hides the item with `id`.
    ///
    /// Returns true if the flag changed. Setting the current value emits
    /// nothing.
    pub fn set_visibility(&self, id: ItemId, visible: bool) -> bool {
        let dispatch = self.dispatch.lock();
        let item = {
            let mut state = self.state.write();
            match state.entries.get_mut(&id) {
                Some(entry) if entry.visible != visible => {
                    entry.visible = visible;
                    Some(entry.item.clone())
                }
                Some(_) => {
                    tracing::trace!(target: targets::COLLECTION, %id, visible, "visibility unchanged");
                    return false;
                }
                None => None,
            }
        };

        let Some(item) = item else {
            tracing::debug!(target: targets::COLLECTION, kind = %T::KIND, %id, "item not present, ignoring visibility change");
            return false;
        };
        tracing::debug!(target: targets::COLLECTION, kind = %T::KIND, %id, visible, "visibility changed");
        self.publish(&dispatch, CollectionEvent::VisibilityChanged { item, visible });
        true
    }

    /// Applies the recognized fields of `update` to the item with `id` and
    /// emits [`CollectionEvent::Updated`].
    ///
    /// Returns true if the item exists. Fields the item type does not have
    /// are ignored.
    pub fn update(&self, id: ItemId, update: &ItemUpdate) -> bool {
        self.modify(id, |item| {
            if !item.apply_update(update) {
                tracing::debug!(target: targets::COLLECTION, kind = %T::KIND, %id, ?update, "no recognized field in update");
            }
        })
        .is_some()
    }

    /// Edits the item with `id` in place and emits
    /// [`CollectionEvent::Updated`].
    ///
    /// Returns the closure's result, or `None` for an unknown id. Observers
    /// still holding the previous `Arc` keep seeing the previous state.
    pub fn modify<F, R>(&self, id: ItemId, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let dispatch = self.dispatch.lock();
        let (item, result) = {
            let mut state = self.state.write();
            let Some(entry) = state.entries.get_mut(&id) else {
                tracing::debug!(target: targets::COLLECTION, kind = %T::KIND, %id, "item not present, ignoring update");
                return None;
            };
            let item = Arc::make_mut(&mut entry.item);
            let result = f(item);
            debug_assert_eq!(item.id(), id, "an edit must not change the item id");
            (entry.item.clone(), result)
        };

        tracing::debug!(target: targets::COLLECTION, kind = %T::KIND, %id, "item updated");
        self.publish(&dispatch, CollectionEvent::Updated { item });
        Some(result)
    }

    /// Position of the item with `id`, or [`ModelIndex::invalid`].
    pub fn index_of(&self, id: ItemId) -> ModelIndex {
        self.state
            .read()
            .position(id)
            .map_or(ModelIndex::invalid(), |row| ModelIndex::new(row, id))
    }

    /// The item with `id`.
    pub fn get(&self, id: ItemId) -> Option<Arc<T>> {
        self.state.read().entries.get(&id).map(|e| e.item.clone())
    }

    /// The item at `row`.
    pub fn at(&self, row: usize) -> Option<Arc<T>> {
        let state = self.state.read();
        let id = state.order.get(row)?;
        state.entries.get(id).map(|e| e.item.clone())
    }

    /// Returns true if an item with `id` is present.
    pub fn contains(&self, id: ItemId) -> bool {
        self.state.read().entries.contains_key(&id)
    }

    /// Visibility flag of the item with `id`.
    pub fn is_visible(&self, id: ItemId) -> Option<bool> {
        self.state.read().entries.get(&id).map(|e| e.visible)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.state.read().order.len()
    }

    /// Returns true if the collection holds no item.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All items in insertion order.
    pub fn items(&self) -> Vec<Arc<T>> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|id| state.entries.get(id).map(|e| e.item.clone()))
            .collect()
    }

    /// Ids of all items in insertion order.
    pub fn ids(&self) -> Vec<ItemId> {
        self.state.read().order.clone()
    }

    /// Removes every item, last first, emitting one removal per item.
    pub fn clear(&self) {
        let _dispatch = self.dispatch.lock();
        loop {
            let last = self.state.read().order.last().copied();
            let Some(id) = last else {
                break;
            };
            self.remove(id);
        }
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        let state = self.state.read();
        assert_eq!(state.order.len(), state.entries.len());
        for id in &state.order {
            assert!(state.entries.contains_key(id));
        }
    }
}

impl<T: CollectionItem> std::fmt::Debug for ItemCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemCollection")
            .field("kind", &T::KIND)
            .field("len", &self.len())
            .field("observers", &self.notifier.connection_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astro::{Angle, SkyCoord};
    use crate::items::{ImageFrame, Region};
    use parking_lot::Mutex;

    fn circle(name: &str) -> Region {
        Region::circle(SkyCoord::from_deg(10.0, 20.0), Angle::from_arcsec(5.0))
            .with_name(name)
            .with_color(Color::rgb(0x4a, 0x9e, 0xbc))
    }

    fn record(collection: &ItemCollection<Region>) -> Arc<Mutex<Vec<String>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        collection.notifier().connect(move |event| {
            let line = match event {
                CollectionEvent::Inserted { item, position } => format!("inserted {} {position}", item.name()),
                CollectionEvent::Removed { item, position } => format!("removed {} {position}", item.name()),
                CollectionEvent::Updated { item } => format!("updated {}", item.name()),
                CollectionEvent::VisibilityChanged { item, visible } => {
                    format!("visibility {} {visible}", item.name())
                }
            };
            sink.lock().push(line);
        });
        log
    }

    #[test]
    fn test_add_is_idempotent() {
        let collection = ItemCollection::new();
        let log = record(&collection);
        let region = circle("a");

        let first = collection.add(region.clone());
        let second = collection.add(region);

        assert_eq!(collection.len(), 1);
        assert_eq!(first, second);
        assert_eq!(*log.lock(), vec!["inserted a 0"]);
        collection.check_invariants();
    }

    #[test]
    fn test_add_marks_visible_and_fills_color() {
        let collection = ItemCollection::new();
        let bare = Region::circle(SkyCoord::from_deg(1.0, 1.0), Angle::from_arcsec(1.0));
        let id = bare.id();
        collection.add(bare);
        assert_eq!(collection.is_visible(id), Some(true));
        assert_eq!(collection.get(id).unwrap().color(), Some(Color::FALLBACK));
    }

    #[test]
    fn test_frames_have_no_color_to_fill() {
        let frames = ItemCollection::new();
        let frame = ImageFrame::new();
        let id = frame.id();
        frames.add(frame);
        assert_eq!(frames.get(id).unwrap().color(), None);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let collection = ItemCollection::new();
        collection.add(circle("a"));
        let log = record(&collection);

        assert!(collection.remove(circle("stranger").id()).is_none());
        assert!(collection.remove_row(5).is_none());
        assert_eq!(collection.len(), 1);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_remove_clears_visibility_and_index() {
        let collection = ItemCollection::new();
        let region = circle("a");
        let id = region.id();
        collection.add(region);
        collection.remove(id);

        assert_eq!(collection.is_visible(id), None);
        assert!(!collection.index_of(id).is_valid());
        collection.check_invariants();
    }

    #[test]
    fn test_redundant_visibility_emits_nothing() {
        let collection = ItemCollection::new();
        let region = circle("a");
        let id = region.id();
        collection.add(region);
        let log = record(&collection);

        assert!(!collection.set_visibility(id, true));
        assert!(collection.set_visibility(id, false));
        assert!(!collection.set_visibility(id, false));
        assert!(collection.set_visibility(id, true));

        assert_eq!(*log.lock(), vec!["visibility a false", "visibility a true"]);
    }

    #[test]
    fn test_update_applies_known_fields_and_notifies() {
        let collection = ItemCollection::new();
        let region = circle("a");
        let id = region.id();
        collection.add(region);
        let log = record(&collection);

        assert!(collection.update(id, &ItemUpdate::new().name("b").marker_size(3.0)));
        assert!(!collection.update(ItemId::next(), &ItemUpdate::new().name("c")));

        assert_eq!(collection.get(id).unwrap().name(), "b");
        assert_eq!(*log.lock(), vec!["updated b"]);
    }

    #[test]
    fn test_events_follow_mutation_order() {
        let collection = ItemCollection::new();
        let log = record(&collection);
        let (a, b) = (circle("a"), circle("b"));
        let (id_a, id_b) = (a.id(), b.id());

        collection.add(a);
        collection.add(b);
        collection.set_visibility(id_a, false);
        collection.remove(id_a);
        collection.update(id_b, &ItemUpdate::new().name("b2"));

        assert_eq!(
            *log.lock(),
            vec![
                "inserted a 0",
                "inserted b 1",
                "visibility a false",
                "removed a 0",
                "updated b2",
            ]
        );
        assert_eq!(collection.index_of(id_b), ModelIndex::new(0, id_b));
    }

    #[test]
    fn test_observer_may_mutate_collection() {
        let collection = Arc::new(ItemCollection::<Region>::new());
        let weak = Arc::downgrade(&collection);
        // Hide everything as soon as it is inserted.
        collection.notifier().connect(move |event| {
            if let (CollectionEvent::Inserted { item, .. }, Some(collection)) = (event, weak.upgrade()) {
                collection.set_visibility(item.id(), false);
            }
        });

        let region = circle("a");
        let id = region.id();
        collection.add(region);
        assert_eq!(collection.is_visible(id), Some(false));
    }

    #[test]
    fn test_mutation_inside_slot_is_delivered_after_current_event() {
        let collection = Arc::new(ItemCollection::<Region>::new());
        let weak = Arc::downgrade(&collection);
        // Reject every insertion on sight.
        collection.notifier().connect(move |event| {
            if let (CollectionEvent::Inserted { item, .. }, Some(collection)) = (event, weak.upgrade()) {
                collection.remove(item.id());
            }
        });
        let log = record(&collection);
        let rows = Arc::new(Mutex::new(Vec::new()));
        let sink = rows.clone();
        collection.notifier().connect(move |event| match event {
            CollectionEvent::Inserted { item, .. } => sink.lock().push(item.id()),
            CollectionEvent::Removed { item, .. } => sink.lock().retain(|id| *id != item.id()),
            _ => {}
        });

        collection.add(circle("a"));

        assert!(collection.is_empty());
        assert_eq!(*log.lock(), vec!["inserted a 0", "removed a 0"]);
        assert!(rows.lock().is_empty());
        assert!(collection.pending.lock().is_empty());
        collection.check_invariants();
    }

    #[test]
    fn test_panicking_observer_does_not_block_others() {
        let collection = ItemCollection::new();
        collection.notifier().connect(|_| panic!("broken view"));
        let log = record(&collection);

        collection.add(circle("a"));
        assert_eq!(*log.lock(), vec!["inserted a 0"]);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_clear_removes_last_first() {
        let collection = ItemCollection::new();
        collection.add(circle("a"));
        collection.add(circle("b"));
        let log = record(&collection);

        collection.clear();

        assert!(collection.is_empty());
        assert_eq!(*log.lock(), vec!["removed b 1", "removed a 0"]);
    }

    #[test]
    fn test_read_accessors() {
        let collection = ItemCollection::new();
        let (a, b) = (circle("a"), circle("b"));
        let id_b = b.id();
        collection.add(a);
        collection.add(b);

        assert_eq!(collection.at(1).unwrap().id(), id_b);
        assert!(collection.at(2).is_none());
        assert!(collection.contains(id_b));
        let names: Vec<_> = collection.items().iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(collection.ids()[1], id_b);
    }
}
