//! Headless drawing primitives.
//!
//! An [`Artist`] is what a rendering backend would draw for one item: a
//! shape in pixel coordinates, a pen and a stacking order. Nothing here
//! touches a window.

use glam::{DAffine2, DVec2};

use crate::items::{Color, ItemId};

use super::VisualHandle;

/// Stacking order of the image itself.
pub const IMAGE_Z_VALUE: f64 = 0.0;

/// Stacking order of tables and candidates drawn over an image.
pub const OVERLAY_Z_VALUE: f64 = 5.0;

/// What an artist draws.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtistShape {
    /// Connected vertices.
    Polyline(Vec<DVec2>),
    /// Unconnected markers.
    Markers {
        /// Marker centers.
        points: Vec<DVec2>,
        /// Marker diameter.
        size: f64,
        /// Whether `size` is in screen pixels (fixed on zoom) or image
        /// pixels (scales with zoom).
        px_mode: bool,
    },
    /// A pixel raster of the given shape, mapped to gray between `levels`.
    Image {
        /// Columns.
        width: usize,
        /// Rows.
        height: usize,
        /// `(black, white)` levels.
        levels: Option<(f64, f64)>,
    },
}

/// One drawable item.
#[derive(Debug, Clone, PartialEq)]
pub struct Artist {
    item: ItemId,
    shape: ArtistShape,
    pen: Option<Color>,
    pen_width: f64,
    z_value: f64,
    visible: bool,
    transform: DAffine2,
}

impl Artist {
    /// A visible artist for `item` with no pen, width 1 and z-value 0.
    pub fn new(item: ItemId, shape: ArtistShape) -> Self {
        Self {
            item,
            shape,
            pen: None,
            pen_width: 1.0,
            z_value: 0.0,
            visible: true,
            transform: DAffine2::IDENTITY,
        }
    }

    /// Sets the pen color.
    pub fn with_pen(mut self, pen: Color) -> Self {
        self.pen = Some(pen);
        self
    }

    /// Sets the pen width.
    pub fn with_pen_width(mut self, width: f64) -> Self {
        self.pen_width = width;
        self
    }

    /// Sets the stacking order.
    pub fn with_z_value(mut self, z: f64) -> Self {
        self.z_value = z;
        self
    }

    /// Sets the initial visibility.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Item this artist draws.
    pub fn item(&self) -> ItemId {
        self.item
    }

    /// The shape, in item pixel coordinates.
    pub fn shape(&self) -> &ArtistShape {
        &self.shape
    }

    /// Pen color.
    pub fn pen(&self) -> Option<Color> {
        self.pen
    }

    /// Pen width.
    pub fn pen_width(&self) -> f64 {
        self.pen_width
    }

    /// Transform from item pixels to scene coordinates.
    pub fn transform(&self) -> DAffine2 {
        self.transform
    }

    /// Replaces the scene transform.
    pub fn set_transform(&mut self, transform: DAffine2) {
        self.transform = transform;
    }

    /// The shape's vertices or marker centers, mapped to scene coordinates.
    pub fn scene_points(&self) -> Vec<DVec2> {
        match &self.shape {
            ArtistShape::Polyline(points) | ArtistShape::Markers { points, .. } => points
                .iter()
                .map(|p| self.transform.transform_point2(*p))
                .collect(),
            ArtistShape::Image { width, height, .. } => {
                let (w, h) = (*width as f64, *height as f64);
                [DVec2::ZERO, DVec2::new(w, 0.0), DVec2::new(w, h), DVec2::new(0.0, h)]
                    .into_iter()
                    .map(|p| self.transform.transform_point2(p))
                    .collect()
            }
        }
    }
}

impl VisualHandle for Artist {
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn z_value(&self) -> f64 {
        self.z_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_builder() {
        let id = ItemId::next();
        let artist = Artist::new(id, ArtistShape::Polyline(vec![DVec2::ZERO]))
            .with_pen(Color::FALLBACK)
            .with_pen_width(2.0)
            .with_z_value(10.0)
            .with_visible(false);
        assert_eq!(artist.item(), id);
        assert_eq!(artist.pen(), Some(Color::FALLBACK));
        assert_eq!(artist.pen_width(), 2.0);
        assert_eq!(artist.z_value(), 10.0);
        assert!(!artist.is_visible());
    }

    #[test]
    fn test_scene_points_follow_transform() {
        let mut artist = Artist::new(
            ItemId::next(),
            ArtistShape::Markers {
                points: vec![DVec2::new(1.0, 0.0)],
                size: 3.0,
                px_mode: true,
            },
        );
        artist.set_transform(DAffine2::from_angle(std::f64::consts::FRAC_PI_2));
        let points = artist.scene_points();
        assert_relative_eq!(points[0].x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(points[0].y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_image_corners() {
        let artist = Artist::new(
            ItemId::next(),
            ArtistShape::Image {
                width: 4,
                height: 2,
                levels: None,
            },
        );
        assert_eq!(artist.scene_points()[2], DVec2::new(4.0, 2.0));
    }
}
