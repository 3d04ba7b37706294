//! The plot surface of one image frame.
//!
//! A [`FrameView`] shows the frame's image and whatever regions, tables and
//! candidates were added to it. Sky items are projected through the frame's
//! WCS when their artist is built; a frame without a WCS refuses them.
//!
//! Items are not added to a frame automatically when they enter their
//! collection. The controller decides which frames get an item; removals,
//! updates and visibility changes then reach every frame that has it.

use std::sync::Arc;

use celexta_core::logging::targets;
use glam::{DAffine2, DVec2};

use crate::astro::Wcs;
use crate::items::{
    Candidate, CatalogTable, CollectionItem, ImageFrame, ItemId, ItemKind, Region,
};

use super::artist::{Artist, ArtistShape, IMAGE_Z_VALUE, OVERLAY_Z_VALUE};
use super::{HandleMap, PresentationAdapter, VisualHandle};

/// Vertices used to outline a region.
const OUTLINE_VERTICES: usize = 64;

/// Pen width of region outlines.
const REGION_PEN_WIDTH: f64 = 2.0;

/// Which layer of a frame an item kind is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayLayer {
    /// Region outlines.
    Regions,
    /// Catalog markers.
    Tables,
    /// Candidate markers.
    Candidates,
}

/// An item that can be drawn over a frame.
pub trait SkyOverlay: CollectionItem {
    /// Layer the item's artist lives in.
    const LAYER: OverlayLayer;

    /// Builds the artist in pixel coordinates of `wcs`, or `None` if nothing
    /// of the item projects onto the image plane.
    fn build_artist(&self, wcs: &Wcs) -> Option<Artist>;
}

impl SkyOverlay for Region {
    const LAYER: OverlayLayer = OverlayLayer::Regions;

    fn build_artist(&self, wcs: &Wcs) -> Option<Artist> {
        let points: Vec<DVec2> = self
            .outline(OUTLINE_VERTICES)
            .iter()
            .filter_map(|coord| wcs.world_to_pixel(coord))
            .collect();
        if points.len() < 2 {
            return None;
        }
        let mut artist = Artist::new(self.id(), ArtistShape::Polyline(points))
            .with_pen_width(REGION_PEN_WIDTH)
            .with_z_value(self.z_value());
        if let Some(color) = self.color() {
            artist = artist.with_pen(color);
        }
        Some(artist)
    }
}

impl SkyOverlay for CatalogTable {
    const LAYER: OverlayLayer = OverlayLayer::Tables;

    fn build_artist(&self, wcs: &Wcs) -> Option<Artist> {
        let points = self
            .rows()
            .iter()
            .filter_map(|row| wcs.world_to_pixel(&row.position))
            .collect();
        let shape = ArtistShape::Markers {
            points,
            size: self.marker_size(),
            px_mode: true,
        };
        let mut artist = Artist::new(self.id(), shape).with_z_value(OVERLAY_Z_VALUE);
        if let Some(color) = self.color() {
            artist = artist.with_pen(color);
        }
        Some(artist)
    }
}

impl SkyOverlay for Candidate {
    const LAYER: OverlayLayer = OverlayLayer::Candidates;

    fn build_artist(&self, wcs: &Wcs) -> Option<Artist> {
        let center = wcs.world_to_pixel(&self.position())?;
        let (sx, sy) = wcs.axis_scales();
        let size = self.uncertainty().deg() / (sx.deg() * sy.deg()).sqrt();
        let shape = ArtistShape::Markers {
            points: vec![center],
            size,
            px_mode: false,
        };
        let mut artist = Artist::new(self.id(), shape).with_z_value(OVERLAY_Z_VALUE);
        if let Some(color) = self.color() {
            artist = artist.with_pen(color);
        }
        Some(artist)
    }
}

/// Visible rectangle of a frame, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRange {
    /// Lower-left corner.
    pub min: DVec2,
    /// Upper-right corner.
    pub max: DVec2,
}

impl ViewRange {
    /// The rectangle spanned by `a` and `b`.
    pub fn new(a: DVec2, b: DVec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// The four corners, counter-clockwise from `min`.
    pub fn corners(&self) -> [DVec2; 4] {
        [
            self.min,
            DVec2::new(self.max.x, self.min.y),
            self.max,
            DVec2::new(self.min.x, self.max.y),
        ]
    }

    /// Middle of the rectangle.
    pub fn center(&self) -> DVec2 {
        (self.min + self.max) / 2.0
    }

    /// Smallest rectangle containing `points`.
    fn bounding(points: &[DVec2]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p)));
        Some(Self { min, max })
    }
}

/// One frame's plot: the image plus overlay artists.
#[derive(Debug)]
pub struct FrameView {
    frame: ItemId,
    name: String,
    wcs: Option<Wcs>,
    image_center: DVec2,
    image: Option<Artist>,
    regions: HandleMap<Artist>,
    tables: HandleMap<Artist>,
    candidates: HandleMap<Artist>,
    rotation_deg: f64,
    view_range: ViewRange,
    focused: bool,
    visible: bool,
}

impl FrameView {
    /// A surface for `frame`, showing the whole image, unfocused.
    pub fn new(frame: &ImageFrame) -> Self {
        let (image, image_center, view_range) = match frame.image() {
            Some(data) => {
                let (w, h) = (data.width() as f64, data.height() as f64);
                let artist = Artist::new(
                    frame.id(),
                    ArtistShape::Image {
                        width: data.width(),
                        height: data.height(),
                        levels: frame.levels(),
                    },
                )
                .with_z_value(IMAGE_Z_VALUE);
                (
                    Some(artist),
                    DVec2::new(w / 2.0, h / 2.0),
                    ViewRange::new(DVec2::ZERO, DVec2::new(w, h)),
                )
            }
            None => (None, DVec2::ZERO, ViewRange::new(DVec2::ZERO, DVec2::ONE)),
        };
        let mut view = Self {
            frame: frame.id(),
            name: frame.name().to_string(),
            wcs: frame.wcs().cloned(),
            image_center,
            image,
            regions: HandleMap::new(),
            tables: HandleMap::new(),
            candidates: HandleMap::new(),
            rotation_deg: 0.0,
            view_range,
            focused: false,
            visible: true,
        };
        view.set_rotation(frame.rotation_deg());
        view
    }

    /// Id of the frame this view shows.
    pub fn frame_id(&self) -> ItemId {
        self.frame
    }

    /// Frame name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The frame's projection.
    pub fn wcs(&self) -> Option<&Wcs> {
        self.wcs.as_ref()
    }

    /// The image artist.
    pub fn image(&self) -> Option<&Artist> {
        self.image.as_ref()
    }

    /// Whether this is the focused frame.
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub(crate) fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    /// Whether the frame is shown.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Shows or hides the whole frame.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if let Some(image) = self.image.as_mut() {
            image.set_visible(visible);
        }
    }

    /// Display rotation in degrees.
    pub fn rotation_deg(&self) -> f64 {
        self.rotation_deg
    }

    /// Rotates the display about the image center. Rotations replace each
    /// other; they do not accumulate.
    pub fn set_rotation(&mut self, degrees: f64) {
        self.rotation_deg = degrees;
        let transform = self.scene_transform();
        if let Some(image) = self.image.as_mut() {
            image.set_transform(transform);
        }
        for layer in [&mut self.regions, &mut self.tables, &mut self.candidates] {
            for artist in layer.values_mut() {
                artist.set_transform(transform);
            }
        }
    }

    /// Visible rectangle in image pixels.
    pub fn view_range(&self) -> ViewRange {
        self.view_range
    }

    /// Changes the visible rectangle.
    pub fn set_view_range(&mut self, range: ViewRange) {
        self.view_range = range;
    }

    /// Shows the same patch of sky as `reference`.
    ///
    /// The corners of the reference view are mapped to the sky and back
    /// into this frame's pixels. Returns false (and changes nothing) when
    /// either frame lacks a WCS or a corner does not project.
    pub fn match_to(&mut self, reference: &FrameView) -> bool {
        let (Some(own), Some(theirs)) = (self.wcs.as_ref(), reference.wcs.as_ref()) else {
            tracing::debug!(target: targets::VIEW, frame = %self.frame, "cannot match views without WCS");
            return false;
        };
        let corners: Option<Vec<DVec2>> = reference
            .view_range
            .corners()
            .iter()
            .map(|pixel| own.world_to_pixel(&theirs.pixel_to_world(*pixel)))
            .collect();
        match corners.as_deref().and_then(ViewRange::bounding) {
            Some(range) => {
                self.view_range = range;
                true
            }
            None => {
                tracing::debug!(target: targets::VIEW, frame = %self.frame, "reference view does not project onto frame");
                false
            }
        }
    }

    /// Picks up new frame attributes: name, display levels and rotation.
    pub fn apply_frame(&mut self, frame: &ImageFrame) {
        self.name = frame.name().to_string();
        if self.image.is_some() {
            if let Some(data) = frame.image() {
                let transform = self.scene_transform();
                let mut artist = Artist::new(
                    frame.id(),
                    ArtistShape::Image {
                        width: data.width(),
                        height: data.height(),
                        levels: frame.levels(),
                    },
                )
                .with_z_value(IMAGE_Z_VALUE)
                .with_visible(self.visible);
                artist.set_transform(transform);
                self.image = Some(artist);
            }
        }
        if self.rotation_deg != frame.rotation_deg() {
            self.set_rotation(frame.rotation_deg());
        }
    }

    /// Draws `item` on this frame unless it is already there.
    ///
    /// Returns true if an artist was added. Items are refused with an error
    /// log when the frame has no WCS.
    pub fn add_item<T: SkyOverlay>(&mut self, item: &T, visible: bool) -> bool {
        let id = item.id();
        if self.layer(T::LAYER).contains(id) {
            tracing::trace!(target: targets::VIEW, frame = %self.frame, %id, "item already on frame");
            return false;
        }
        let Some(artist) = self.build(item) else {
            return false;
        };
        let artist = artist.with_visible(visible);
        let added = self.layer_mut(T::LAYER).insert_with(id, || Some(artist));
        if added {
            tracing::debug!(target: targets::VIEW, frame = %self.frame, kind = %T::KIND, %id, "item added to frame");
        }
        added
    }

    /// Removes the artist of `id` in `T`'s layer. Returns true if it existed.
    pub fn remove_item<T: SkyOverlay>(&mut self, id: ItemId) -> bool {
        let removed = self.layer_mut(T::LAYER).remove(id).is_some();
        if removed {
            tracing::debug!(target: targets::VIEW, frame = %self.frame, kind = %T::KIND, %id, "item removed from frame");
        }
        removed
    }

    /// Rebuilds the artist of `item` if this frame shows it.
    pub fn update_item<T: SkyOverlay>(&mut self, item: &T) -> bool {
        let id = item.id();
        if !self.layer(T::LAYER).contains(id) {
            return false;
        }
        let artist = self.build(item);
        self.layer_mut(T::LAYER).recreate_with(id, || artist)
    }

    /// Shows or hides the artist of `id` in `T`'s layer.
    pub fn set_item_visible<T: SkyOverlay>(&mut self, id: ItemId, visible: bool) -> bool {
        self.layer_mut(T::LAYER).set_visible(id, visible)
    }

    /// Removes the artist of `id` from whichever layer holds it.
    pub fn remove_any(&mut self, id: ItemId) -> bool {
        [&mut self.regions, &mut self.tables, &mut self.candidates]
            .into_iter()
            .any(|layer| layer.remove(id).is_some())
    }

    /// The overlay artist of `id`, in any layer.
    pub fn artist(&self, id: ItemId) -> Option<&Artist> {
        self.regions
            .get(id)
            .or_else(|| self.tables.get(id))
            .or_else(|| self.candidates.get(id))
    }

    /// Returns true if `id` is drawn on this frame.
    pub fn has_item(&self, id: ItemId) -> bool {
        self.artist(id).is_some()
    }

    /// Ids drawn in the layer of `kind`, in insertion order. Frames have no
    /// layer and yield nothing.
    pub fn item_ids(&self, kind: ItemKind) -> &[ItemId] {
        match kind {
            ItemKind::Region => self.regions.ids(),
            ItemKind::Table => self.tables.ids(),
            ItemKind::Candidate => self.candidates.ids(),
            ItemKind::Frame => &[],
        }
    }

    /// Number of overlay artists.
    pub fn handle_count(&self) -> usize {
        self.regions.len() + self.tables.len() + self.candidates.len()
    }

    /// Every artist, image first, overlays by z-value.
    pub fn draw_order(&self) -> Vec<&Artist> {
        let mut overlays: Vec<&Artist> = [&self.regions, &self.tables, &self.candidates]
            .into_iter()
            .flat_map(|layer| layer.iter().map(|(_, artist)| artist))
            .collect();
        overlays.sort_by(|a, b| a.z_value().total_cmp(&b.z_value()));
        self.image.iter().chain(overlays).collect()
    }

    fn build<T: SkyOverlay>(&self, item: &T) -> Option<Artist> {
        let Some(wcs) = self.wcs.as_ref() else {
            tracing::error!(
                target: targets::VIEW,
                frame = %self.frame,
                kind = %T::KIND,
                id = %item.id(),
                "frame has no WCS, cannot draw item"
            );
            return None;
        };
        let Some(mut artist) = item.build_artist(wcs) else {
            tracing::warn!(target: targets::VIEW, frame = %self.frame, id = %item.id(), "item does not project onto frame");
            return None;
        };
        artist.set_transform(self.scene_transform());
        Some(artist)
    }

    fn scene_transform(&self) -> DAffine2 {
        DAffine2::from_translation(self.image_center)
            * DAffine2::from_angle(self.rotation_deg.to_radians())
            * DAffine2::from_translation(-self.image_center)
    }

    fn layer(&self, layer: OverlayLayer) -> &HandleMap<Artist> {
        match layer {
            OverlayLayer::Regions => &self.regions,
            OverlayLayer::Tables => &self.tables,
            OverlayLayer::Candidates => &self.candidates,
        }
    }

    fn layer_mut(&mut self, layer: OverlayLayer) -> &mut HandleMap<Artist> {
        match layer {
            OverlayLayer::Regions => &mut self.regions,
            OverlayLayer::Tables => &mut self.tables,
            OverlayLayer::Candidates => &mut self.candidates,
        }
    }
}

impl<T: SkyOverlay> PresentationAdapter<T> for FrameView {
    fn on_inserted(&mut self, item: &Arc<T>, _position: usize) {
        self.add_item(item.as_ref(), true);
    }

    fn on_removed(&mut self, item: &Arc<T>) {
        self.remove_item::<T>(item.id());
    }

    fn on_updated(&mut self, item: &Arc<T>) {
        self.update_item(item.as_ref());
    }

    fn on_visibility_changed(&mut self, item: &Arc<T>, visible: bool) {
        self.set_item_visible::<T>(item.id(), visible);
    }
}
