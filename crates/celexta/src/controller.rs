//! The per-tab mediator between user actions, collections and surfaces.
//!
//! A [`Controller`] owns one [`ItemCollection`] per item kind, a list
//! surface for each, the frame views of the tab, the light-curve plot and
//! the tab's [`ColorPool`]. User gestures come in as controller calls; the
//! controller picks the right collection by item kind, keeps the color
//! bookkeeping, and decides which frames an item is drawn on.
//!
//! Once an item is on a frame, the collections drive that frame directly:
//! removals, updates and visibility changes of regions, tables and
//! candidates reach every frame, focused or not. Adding to frames is the
//! controller's decision (the focused frame by default).
//!
//! Unknown ids are dropped with an error log; no controller operation
//! panics or fails on them.

use std::path::Path;
use std::sync::{Arc, Weak};

use celexta_core::logging::targets;
use parking_lot::{Mutex, RwLock};

use crate::error::Result;
use crate::items::{
    AnyItem, Candidate, CatalogTable, CollectionItem, ImageFrame, ItemId, ItemKind, ItemUpdate,
    Region,
};
use crate::model::{CollectionEvent, ColorPool, ItemCollection, ItemListModel};
use crate::persist::{Persist, TabState};
use crate::view::{attach, FrameView, LightCurveView, ListSurface, SkyOverlay};

/// The frame views of a tab and which one has focus.
#[derive(Debug, Default)]
struct Surfaces {
    views: Vec<FrameView>,
    focused: Option<ItemId>,
}

impl Surfaces {
    fn view_mut(&mut self, id: ItemId) -> Option<&mut FrameView> {
        self.views.iter_mut().find(|view| view.frame_id() == id)
    }

    fn focus(&mut self, id: Option<ItemId>) {
        // Defocus everything first so at most one view is ever focused.
        for view in &mut self.views {
            view.set_focused(false);
        }
        self.focused = id;
        if let Some(view) = id.and_then(|id| self.view_mut(id)) {
            view.set_focused(true);
        }
    }
}

/// Which frames a controller operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Focused,
    All,
}

/// Item kinds a [`Controller`] keeps a collection for.
pub trait Managed: CollectionItem {
    /// The controller's collection of this kind.
    fn collection(controller: &Controller) -> &Arc<ItemCollection<Self>>;

    /// The controller's list surface of this kind.
    fn list_surface(controller: &Controller) -> &Arc<Mutex<ListSurface<Self>>>;
}

macro_rules! impl_managed {
    ($ty:ty, $collection:ident, $list:ident) => {
        impl Managed for $ty {
            fn collection(controller: &Controller) -> &Arc<ItemCollection<Self>> {
                &controller.$collection
            }

            fn list_surface(controller: &Controller) -> &Arc<Mutex<ListSurface<Self>>> {
                &controller.$list
            }
        }
    };
}

impl_managed!(ImageFrame, frames, frame_list);
impl_managed!(Region, regions, region_list);
impl_managed!(CatalogTable, tables, table_list);
impl_managed!(Candidate, candidates, candidate_list);

/// Mediates user actions for one tab.
pub struct Controller {
    frames: Arc<ItemCollection<ImageFrame>>,
    regions: Arc<ItemCollection<Region>>,
    tables: Arc<ItemCollection<CatalogTable>>,
    candidates: Arc<ItemCollection<Candidate>>,
    frame_list: Arc<Mutex<ListSurface<ImageFrame>>>,
    region_list: Arc<Mutex<ListSurface<Region>>>,
    table_list: Arc<Mutex<ListSurface<CatalogTable>>>,
    candidate_list: Arc<Mutex<ListSurface<Candidate>>>,
    surfaces: Arc<RwLock<Surfaces>>,
    light_curve: Arc<Mutex<LightCurveView>>,
    colors: Mutex<ColorPool>,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    /// A controller with the default palette.
    pub fn new() -> Self {
        Self::with_colors(ColorPool::default())
    }

    /// A controller allocating colors from `colors`.
    pub fn with_colors(colors: ColorPool) -> Self {
        let controller = Self {
            frames: Arc::new(ItemCollection::new()),
            regions: Arc::new(ItemCollection::new()),
            tables: Arc::new(ItemCollection::new()),
            candidates: Arc::new(ItemCollection::new()),
            frame_list: Arc::new(Mutex::new(ListSurface::new())),
            region_list: Arc::new(Mutex::new(ListSurface::new())),
            table_list: Arc::new(Mutex::new(ListSurface::new())),
            candidate_list: Arc::new(Mutex::new(ListSurface::new())),
            surfaces: Arc::new(RwLock::new(Surfaces::default())),
            light_curve: Arc::new(Mutex::new(LightCurveView::new())),
            colors: Mutex::new(colors),
        };
        controller.wire();
        controller
    }

    fn wire(&self) {
        attach(&self.frame_list, &self.frames);
        attach(&self.region_list, &self.regions);
        attach(&self.table_list, &self.tables);
        attach(&self.candidate_list, &self.candidates);
        attach(&self.light_curve, &self.candidates);

        let surfaces = Arc::downgrade(&self.surfaces);
        self.frames
            .notifier()
            .connect(move |event| sync_frame_views(&surfaces, event));
        connect_overlay(&self.regions, &self.surfaces);
        connect_overlay(&self.tables, &self.surfaces);
        connect_overlay(&self.candidates, &self.surfaces);
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// The collection of kind `T`.
    pub fn collection<T: Managed>(&self) -> &Arc<ItemCollection<T>> {
        T::collection(self)
    }

    /// A list view-model over the collection of kind `T`.
    pub fn list_model<T: Managed>(&self) -> ItemListModel<T> {
        ItemListModel::new(T::collection(self).clone())
    }

    /// The side-panel list of kind `T`.
    pub fn list_surface<T: Managed>(&self) -> &Arc<Mutex<ListSurface<T>>> {
        T::list_surface(self)
    }

    /// The light-curve plot.
    pub fn light_curve(&self) -> &Arc<Mutex<LightCurveView>> {
        &self.light_curve
    }

    /// Snapshot of the color pool.
    pub fn colors(&self) -> ColorPool {
        self.colors.lock().clone()
    }

    /// Kind of the item with `id`, if any collection holds it.
    pub fn kind_of(&self, id: ItemId) -> Option<ItemKind> {
        if self.frames.contains(id) {
            Some(ItemKind::Frame)
        } else if self.regions.contains(id) {
            Some(ItemKind::Region)
        } else if self.tables.contains(id) {
            Some(ItemKind::Table)
        } else if self.candidates.contains(id) {
            Some(ItemKind::Candidate)
        } else {
            None
        }
    }

    /// A copy of the item with `id`.
    pub fn item(&self, id: ItemId) -> Option<AnyItem> {
        match self.kind_of(id)? {
            ItemKind::Frame => self.frames.get(id).map(|f| AnyItem::Frame((*f).clone())),
            ItemKind::Region => self.regions.get(id).map(|r| AnyItem::Region((*r).clone())),
            ItemKind::Table => self.tables.get(id).map(|t| AnyItem::Table((*t).clone())),
            ItemKind::Candidate => self
                .candidates
                .get(id)
                .map(|c| AnyItem::Candidate((*c).clone())),
        }
    }

    /// Total number of items across all kinds.
    pub fn item_count(&self) -> usize {
        self.frames.len() + self.regions.len() + self.tables.len() + self.candidates.len()
    }

    /// Number of items of one kind.
    pub fn count(&self, kind: ItemKind) -> usize {
        match kind {
            ItemKind::Frame => self.frames.len(),
            ItemKind::Region => self.regions.len(),
            ItemKind::Table => self.tables.len(),
            ItemKind::Candidate => self.candidates.len(),
        }
    }

    // -------------------------------------------------------------------------
    // Item operations
    // -------------------------------------------------------------------------

    /// Adds an item of any kind and returns its id.
    ///
    /// Items without a color get the next pool color; items with one claim
    /// it. Regions, tables and candidates are drawn on the focused frame if
    /// there is one; candidates also join the light curve. Frames become
    /// the focused frame. Adding an item that is already present does
    /// nothing.
    pub fn add(&self, item: impl Into<AnyItem>) -> ItemId {
        match item.into() {
            AnyItem::Frame(frame) => self.add_image_frame(frame),
            AnyItem::Region(region) => self.add_overlay(region),
            AnyItem::Table(table) => self.add_overlay(table),
            AnyItem::Candidate(candidate) => self.add_overlay(candidate),
        }
    }

    fn add_overlay<T: Managed + SkyOverlay>(&self, mut item: T) -> ItemId {
        let id = item.id();
        let collection = T::collection(self);
        if collection.contains(id) {
            tracing::debug!(target: targets::CONTROLLER, kind = %T::KIND, %id, "item already present, ignoring add");
            return id;
        }
        {
            let mut colors = self.colors.lock();
            match item.color() {
                Some(color) => {
                    colors.claim(color);
                }
                None => item.set_color(colors.next_color()),
            }
        }
        tracing::info!(target: targets::CONTROLLER, kind = %T::KIND, %id, name = item.name(), "adding item");
        collection.add(item);
        self.add_to_active_surface(id);
        id
    }

    /// Deletes the item with `id` from its collection, every frame and
    /// every list, and returns its color to the pool. Deleting a frame
    /// removes its view.
    pub fn delete(&self, id: ItemId) -> bool {
        match self.kind_of(id) {
            Some(ItemKind::Frame) => self.delete_frame(id),
            Some(ItemKind::Region) => self.delete_overlay::<Region>(id),
            Some(ItemKind::Table) => self.delete_overlay::<CatalogTable>(id),
            Some(ItemKind::Candidate) => self.delete_overlay::<Candidate>(id),
            None => {
                tracing::error!(target: targets::CONTROLLER, %id, "unknown item, ignoring delete");
                false
            }
        }
    }

    fn delete_overlay<T: Managed>(&self, id: ItemId) -> bool {
        let Some(item) = T::collection(self).remove(id) else {
            return false;
        };
        if let Some(color) = item.color() {
            self.colors.lock().release(color);
        }
        tracing::info!(target: targets::CONTROLLER, kind = %T::KIND, %id, name = item.name(), "deleted item");
        true
    }

    /// Applies `update` to the item with `id`. Frames rebuild their
    /// artists of it. Returns false for unknown ids.
    pub fn edit(&self, id: ItemId, update: &ItemUpdate) -> bool {
        match self.kind_of(id) {
            Some(ItemKind::Frame) => self.frames.update(id, update),
            Some(ItemKind::Region) => self.edit_colored::<Region>(id, update),
            Some(ItemKind::Table) => self.edit_colored::<CatalogTable>(id, update),
            Some(ItemKind::Candidate) => self.edit_colored::<Candidate>(id, update),
            None => {
                tracing::error!(target: targets::CONTROLLER, %id, "unknown item, ignoring edit");
                false
            }
        }
    }

    fn edit_colored<T: Managed>(&self, id: ItemId, update: &ItemUpdate) -> bool {
        let collection = T::collection(self);
        if let (Some(new), Some(item)) = (update.color, collection.get(id)) {
            let old = item.color();
            if old != Some(new) {
                let mut colors = self.colors.lock();
                if let Some(old) = old {
                    colors.release(old);
                }
                colors.claim(new);
            }
        }
        collection.update(id, update)
    }

    /// Shows or hides the item with `id` everywhere it is drawn.
    pub fn set_visibility(&self, id: ItemId, visible: bool) -> bool {
        match self.kind_of(id) {
            Some(ItemKind::Frame) => self.frames.set_visibility(id, visible),
            Some(ItemKind::Region) => self.regions.set_visibility(id, visible),
            Some(ItemKind::Table) => self.tables.set_visibility(id, visible),
            Some(ItemKind::Candidate) => self.candidates.set_visibility(id, visible),
            None => {
                tracing::error!(target: targets::CONTROLLER, %id, "unknown item, ignoring visibility change");
                false
            }
        }
    }

    // -------------------------------------------------------------------------
    // Surface targeting
    // -------------------------------------------------------------------------

    /// Draws the item on the focused frame. Returns the number of frames
    /// that gained it (0 or 1); without a focused frame nothing changes.
    pub fn add_to_active_surface(&self, id: ItemId) -> usize {
        self.add_to_surfaces(id, Target::Focused)
    }

    /// Draws the item on every frame. Returns the number of frames that
    /// gained it.
    pub fn add_to_all_surfaces(&self, id: ItemId) -> usize {
        self.add_to_surfaces(id, Target::All)
    }

    /// Removes the item from the focused frame only.
    pub fn remove_from_active_surface(&self, id: ItemId) -> usize {
        self.remove_from_surfaces(id, Target::Focused)
    }

    /// Removes the item from every frame.
    pub fn remove_from_all_surfaces(&self, id: ItemId) -> usize {
        self.remove_from_surfaces(id, Target::All)
    }

    fn add_to_surfaces(&self, id: ItemId, target: Target) -> usize {
        match self.kind_of(id) {
            Some(ItemKind::Region) => self.add_overlay_to::<Region>(id, target),
            Some(ItemKind::Table) => self.add_overlay_to::<CatalogTable>(id, target),
            Some(ItemKind::Candidate) => self.add_overlay_to::<Candidate>(id, target),
            Some(ItemKind::Frame) => {
                tracing::error!(target: targets::CONTROLLER, %id, "a frame cannot be drawn on a frame");
                0
            }
            None => {
                tracing::error!(target: targets::CONTROLLER, %id, "unknown item, ignoring add to frames");
                0
            }
        }
    }

    fn add_overlay_to<T: Managed + SkyOverlay>(&self, id: ItemId, target: Target) -> usize {
        let collection = T::collection(self);
        let Some(item) = collection.get(id) else {
            return 0;
        };
        let visible = collection.is_visible(id).unwrap_or(true);

        let mut surfaces = self.surfaces.write();
        let focused = surfaces.focused;
        if target == Target::Focused && focused.is_none() {
            tracing::debug!(target: targets::CONTROLLER, %id, "no focused frame, item not drawn");
            return 0;
        }
        surfaces
            .views
            .iter_mut()
            .filter(|view| target == Target::All || Some(view.frame_id()) == focused)
            .map(|view| view.add_item(item.as_ref(), visible))
            .filter(|added| *added)
            .count()
    }

    fn remove_from_surfaces(&self, id: ItemId, target: Target) -> usize {
        let mut surfaces = self.surfaces.write();
        let focused = surfaces.focused;
        if target == Target::Focused && focused.is_none() {
            tracing::debug!(target: targets::CONTROLLER, %id, "no focused frame, nothing to remove from");
            return 0;
        }
        let removed = surfaces
            .views
            .iter_mut()
            .filter(|view| target == Target::All || Some(view.frame_id()) == focused)
            .map(|view| view.remove_any(id))
            .filter(|removed| *removed)
            .count();
        if removed == 0 {
            tracing::debug!(target: targets::CONTROLLER, %id, "item not drawn on targeted frames");
        }
        removed
    }

    // -------------------------------------------------------------------------
    // Frames
    // -------------------------------------------------------------------------

    /// Adds a frame, creates its view and focuses it.
    pub fn add_image_frame(&self, frame: ImageFrame) -> ItemId {
        let id = frame.id();
        if self.frames.contains(id) {
            tracing::debug!(target: targets::CONTROLLER, %id, "frame already present, ignoring add");
            return id;
        }
        tracing::info!(target: targets::CONTROLLER, %id, name = frame.name(), "adding image frame");
        self.frames.add(frame);
        self.set_focused_surface(Some(id));
        id
    }

    /// Deletes a frame and its view. The tab is left without focus if it
    /// was the focused one.
    pub fn delete_frame(&self, id: ItemId) -> bool {
        match self.frames.remove(id) {
            Some(frame) => {
                tracing::info!(target: targets::CONTROLLER, %id, name = frame.name(), "deleted image frame");
                true
            }
            None => {
                tracing::error!(target: targets::CONTROLLER, %id, "unknown frame, ignoring delete");
                false
            }
        }
    }

    /// Focuses the frame `id`, or clears focus with `None`. Unknown frames
    /// clear focus.
    pub fn set_focused_surface(&self, id: Option<ItemId>) {
        let mut surfaces = self.surfaces.write();
        let id = id.filter(|id| {
            let known = surfaces.views.iter().any(|view| view.frame_id() == *id);
            if !known {
                tracing::error!(target: targets::CONTROLLER, %id, "unknown frame, clearing focus");
            }
            known
        });
        surfaces.focus(id);
        tracing::debug!(target: targets::CONTROLLER, focused = ?id, "focus changed");
    }

    /// The focused frame.
    pub fn focused_surface(&self) -> Option<ItemId> {
        self.surfaces.read().focused
    }

    /// Frame ids in tab order.
    pub fn surface_ids(&self) -> Vec<ItemId> {
        self.surfaces
            .read()
            .views
            .iter()
            .map(FrameView::frame_id)
            .collect()
    }

    /// Runs `f` on the view of frame `id`.
    pub fn with_surface<R>(&self, id: ItemId, f: impl FnOnce(&FrameView) -> R) -> Option<R> {
        let surfaces = self.surfaces.read();
        surfaces
            .views
            .iter()
            .find(|view| view.frame_id() == id)
            .map(f)
    }

    /// Makes every frame show the focused frame's patch of sky at its
    /// rotation. Returns the number of frames that followed.
    pub fn match_to_focused(&self) -> usize {
        let Some(focused) = self.focused_surface() else {
            tracing::debug!(target: targets::CONTROLLER, "no focused frame to match to");
            return 0;
        };
        let rotation = self.frames.get(focused).map_or(0.0, |f| f.rotation_deg());
        for id in self.surface_ids() {
            if id != focused {
                self.frames.update(id, &ItemUpdate::new().rotation_deg(rotation));
            }
        }

        let mut surfaces = self.surfaces.write();
        let Some(index) = surfaces.views.iter().position(|v| v.frame_id() == focused) else {
            return 0;
        };
        let reference = surfaces.views.remove(index);
        let matched = surfaces
            .views
            .iter_mut()
            .map(|view| view.match_to(&reference))
            .filter(|matched| *matched)
            .count();
        surfaces.views.insert(index, reference);
        matched
    }

    /// Sets the display rotation of the focused frame.
    pub fn update_rotation(&self, degrees: f64) -> bool {
        match self.focused_surface() {
            Some(id) => self.frames.update(id, &ItemUpdate::new().rotation_deg(degrees)),
            None => {
                tracing::debug!(target: targets::CONTROLLER, "no focused frame to rotate");
                false
            }
        }
    }

    /// `(rows, columns)` of the frame grid: as many columns as the
    /// ceiling of the square root of the frame count.
    pub fn grid_layout(&self) -> (usize, usize) {
        grid_shape(self.surfaces.read().views.len())
    }

    /// `(frame, row, column)` of every frame in the grid.
    pub fn grid_positions(&self) -> Vec<(ItemId, usize, usize)> {
        let ids = self.surface_ids();
        let (_, columns) = grid_shape(ids.len());
        ids.into_iter()
            .enumerate()
            .map(|(index, id)| (id, index / columns, index % columns))
            .collect()
    }

    /// Shows or hides the light-curve plot; returns the new state.
    pub fn toggle_light_curve(&self) -> bool {
        self.light_curve.lock().toggle()
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Saves every item, writing side files under `dir`.
    pub fn to_tab_state(&self, dir: &Path) -> Result<TabState> {
        tracing::debug!(target: targets::PERSIST, dir = %dir.display(), "saving tab");
        let mut state = TabState::default();
        for frame in self.frames.items() {
            state.frame.push(frame.to_descriptor(dir)?);
        }
        for region in self.regions.items() {
            state.region.push(region.to_descriptor(dir)?);
        }
        for table in self.tables.items() {
            state.table.push(table.to_descriptor(dir)?);
        }
        for candidate in self.candidates.items() {
            state.candidate.push(candidate.to_descriptor(dir)?);
        }
        Ok(state)
    }

    /// Adds every item of `state`.
    ///
    /// All descriptors are decoded before anything is added, so a broken
    /// side file leaves the tab untouched. Frames come first; the last one
    /// ends up focused and receives the sky items.
    pub fn load_tab_state(&self, state: &TabState) -> Result<()> {
        let frames = state
            .frame
            .iter()
            .map(ImageFrame::from_descriptor)
            .collect::<Result<Vec<_>>>()?;
        let regions = state
            .region
            .iter()
            .map(Region::from_descriptor)
            .collect::<Result<Vec<_>>>()?;
        let tables = state
            .table
            .iter()
            .map(CatalogTable::from_descriptor)
            .collect::<Result<Vec<_>>>()?;
        let candidates = state
            .candidate
            .iter()
            .map(Candidate::from_descriptor)
            .collect::<Result<Vec<_>>>()?;

        for frame in frames {
            self.add_image_frame(frame);
        }
        for region in regions {
            self.add(region);
        }
        for table in tables {
            self.add(table);
        }
        for candidate in candidates {
            self.add(candidate);
        }
        tracing::debug!(target: targets::PERSIST, items = state.len(), "loaded tab");
        Ok(())
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("frames", &self.frames.len())
            .field("regions", &self.regions.len())
            .field("tables", &self.tables.len())
            .field("candidates", &self.candidates.len())
            .field("focused", &self.focused_surface())
            .finish()
    }
}

fn grid_shape(count: usize) -> (usize, usize) {
    if count == 0 {
        return (0, 0);
    }
    let columns = (count as f64).sqrt().ceil() as usize;
    (count.div_ceil(columns), columns)
}

/// Keeps the frame views in step with the frame collection.
fn sync_frame_views(surfaces: &Weak<RwLock<Surfaces>>, event: &CollectionEvent<ImageFrame>) {
    let Some(surfaces) = surfaces.upgrade() else {
        return;
    };
    let mut surfaces = surfaces.write();
    match event {
        CollectionEvent::Inserted { item, .. } => {
            if surfaces.view_mut(item.id()).is_none() {
                surfaces.views.push(FrameView::new(item));
            }
        }
        CollectionEvent::Removed { item, .. } => {
            let id = item.id();
            surfaces.views.retain(|view| view.frame_id() != id);
            if surfaces.focused == Some(id) {
                surfaces.focus(None);
            }
        }
        CollectionEvent::Updated { item } => {
            if let Some(view) = surfaces.view_mut(item.id()) {
                view.apply_frame(item);
            }
        }
        CollectionEvent::VisibilityChanged { item, visible } => {
            if let Some(view) = surfaces.view_mut(item.id()) {
                view.set_visible(*visible);
            }
        }
    }
}

/// Forwards removals, updates and visibility changes of an overlay kind to
/// every frame. Insertions are not forwarded: the controller chooses the
/// frames.
fn connect_overlay<T: SkyOverlay>(
    collection: &ItemCollection<T>,
    surfaces: &Arc<RwLock<Surfaces>>,
) {
    let surfaces = Arc::downgrade(surfaces);
    collection.notifier().connect(move |event| {
        if matches!(event, CollectionEvent::Inserted { .. }) {
            return;
        }
        let Some(surfaces) = surfaces.upgrade() else {
            return;
        };
        for view in surfaces.write().views.iter_mut() {
            crate::view::PresentationAdapter::<T>::handle_event(view, event);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astro::{Angle, SkyCoord, Wcs};
    use crate::items::{Color, ImageData};
    use crate::model::DEFAULT_PALETTE;

    fn frame(name: &str) -> ImageFrame {
        ImageFrame::new()
            .with_name(name)
            .with_image(ImageData::new(10, 10, vec![0.0; 100]).unwrap())
            .with_wcs(Wcs::simple(
                SkyCoord::from_deg(10.0, 20.0),
                Angle::from_arcsec(1.0),
                (10, 10),
            ))
    }

    fn circle() -> Region {
        Region::circle(SkyCoord::from_deg(10.0, 20.0), Angle::from_arcsec(2.0))
    }

    #[test]
    fn test_grid_shape() {
        assert_eq!(grid_shape(0), (0, 0));
        assert_eq!(grid_shape(1), (1, 1));
        assert_eq!(grid_shape(2), (1, 2));
        assert_eq!(grid_shape(3), (2, 2));
        assert_eq!(grid_shape(5), (2, 3));
        assert_eq!(grid_shape(10), (3, 4));
    }

    #[test]
    fn test_add_allocates_and_delete_releases_color() {
        let controller = Controller::new();
        let id = controller.add(circle());
        let Some(AnyItem::Region(region)) = controller.item(id) else {
            panic!("expected a region");
        };
        assert_eq!(region.color(), Some(DEFAULT_PALETTE[0]));
        assert_eq!(controller.colors().allocated(), &[DEFAULT_PALETTE[0]]);

        assert!(controller.delete(id));
        assert!(controller.colors().allocated().is_empty());
        assert!(!controller.delete(id));
    }

    #[test]
    fn test_own_color_is_claimed() {
        let controller = Controller::new();
        controller.add(circle().with_color(DEFAULT_PALETTE[0]));
        let next = controller.add(circle());
        assert_eq!(
            controller.item(next).and_then(|item| item.color()),
            Some(DEFAULT_PALETTE[1])
        );
    }

    #[test]
    fn test_duplicate_add_does_not_allocate() {
        let controller = Controller::new();
        let region = circle();
        controller.add(region.clone());
        controller.add(region);
        assert_eq!(controller.collection::<Region>().len(), 1);
        assert_eq!(controller.colors().allocated().len(), 1);
    }

    #[test]
    fn test_frames_focus_and_defocus() {
        let controller = Controller::new();
        let a = controller.add(frame("a"));
        let b = controller.add(frame("b"));
        assert_eq!(controller.focused_surface(), Some(b));
        assert_eq!(controller.with_surface(a, |v| v.is_focused()), Some(false));

        controller.set_focused_surface(Some(a));
        assert_eq!(controller.with_surface(a, |v| v.is_focused()), Some(true));
        assert_eq!(controller.with_surface(b, |v| v.is_focused()), Some(false));

        assert!(controller.delete(a));
        assert_eq!(controller.focused_surface(), None);
        assert_eq!(controller.surface_ids(), vec![b]);

        controller.set_focused_surface(Some(a));
        assert_eq!(controller.focused_surface(), None);
    }

    #[test]
    fn test_items_go_to_focused_frame_only() {
        let controller = Controller::new();
        let a = controller.add(frame("a"));
        let b = controller.add(frame("b"));
        let region = controller.add(circle());

        assert_eq!(controller.with_surface(b, |v| v.has_item(region)), Some(true));
        assert_eq!(controller.with_surface(a, |v| v.has_item(region)), Some(false));

        assert_eq!(controller.add_to_all_surfaces(region), 1);
        assert_eq!(controller.with_surface(a, |v| v.has_item(region)), Some(true));

        assert_eq!(controller.remove_from_active_surface(region), 1);
        assert_eq!(controller.with_surface(b, |v| v.has_item(region)), Some(false));
        assert_eq!(controller.with_surface(a, |v| v.has_item(region)), Some(true));
    }

    #[test]
    fn test_collection_changes_reach_every_frame() {
        let controller = Controller::new();
        let a = controller.add(frame("a"));
        let b = controller.add(frame("b"));
        let region = controller.add(circle());
        controller.add_to_all_surfaces(region);

        controller.set_visibility(region, false);
        for frame in [a, b] {
            let visible = controller.with_surface(frame, |v| {
                v.artist(region).map(crate::view::VisualHandle::is_visible)
            });
            assert_eq!(visible, Some(Some(false)));
        }

        controller.edit(region, &ItemUpdate::new().color(Color::rgb(9, 9, 9)));
        let pen = controller.with_surface(a, |v| v.artist(region).and_then(|artist| artist.pen()));
        assert_eq!(pen, Some(Some(Color::rgb(9, 9, 9))));
        assert!(!controller.colors().allocated().contains(&DEFAULT_PALETTE[0]));

        controller.delete(region);
        for frame in [a, b] {
            assert_eq!(controller.with_surface(frame, |v| v.handle_count()), Some(0));
        }
    }

    #[test]
    fn test_unknown_ids_are_dropped() {
        let controller = Controller::new();
        let unknown = ItemId::next();
        assert!(!controller.delete(unknown));
        assert!(!controller.edit(unknown, &ItemUpdate::new().name("x")));
        assert!(!controller.set_visibility(unknown, false));
        assert_eq!(controller.add_to_all_surfaces(unknown), 0);
        assert!(controller.kind_of(unknown).is_none());
    }

    #[test]
    fn test_rotation_applies_to_focused_frame() {
        let controller = Controller::new();
        assert!(!controller.update_rotation(45.0));
        let a = controller.add(frame("a"));
        let b = controller.add(frame("b"));
        assert!(controller.update_rotation(45.0));
        assert!(controller.update_rotation(45.0));
        assert_eq!(controller.with_surface(b, |v| v.rotation_deg()), Some(45.0));
        assert_eq!(controller.with_surface(a, |v| v.rotation_deg()), Some(0.0));

        assert_eq!(controller.match_to_focused(), 1);
        assert_eq!(controller.with_surface(a, |v| v.rotation_deg()), Some(45.0));
    }

    #[test]
    fn test_candidates_join_light_curve() {
        let controller = Controller::new();
        let id = controller.add(Candidate::new(SkyCoord::from_deg(1.0, 1.0)));
        assert!(controller.light_curve().lock().curve(id).is_some());
        assert!(!controller.toggle_light_curve());
        controller.delete(id);
        assert!(controller.light_curve().lock().is_empty());
    }

    #[test]
    fn test_grid_positions() {
        let controller = Controller::new();
        let ids: Vec<ItemId> = (0..3).map(|i| controller.add(frame(&i.to_string()))).collect();
        assert_eq!(controller.grid_layout(), (2, 2));
        let positions = controller.grid_positions();
        assert_eq!(positions[2], (ids[2], 1, 0));
    }
}
