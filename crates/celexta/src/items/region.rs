use crate::astro::{spherical_circle, Angle, SkyCoord};

use super::{CollectionItem, Color, ItemId, ItemKind, ItemUpdate};

/// Default stacking order of region outlines, above images.
pub const REGION_Z_VALUE: f64 = 10.0;

/// Geometry of a sky region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionShape {
    /// Every point within `radius` of `center`.
    Circle {
        /// Center of the circle.
        center: SkyCoord,
        /// Angular radius.
        radius: Angle,
    },
    /// A longitude/latitude box whose lower-left corner is `anchor`.
    ///
    /// `width` extends towards increasing right ascension, `height`
    /// towards increasing declination. Edges follow constant RA and Dec.
    Quadrangle {
        /// Lower-left corner.
        anchor: SkyCoord,
        /// Extent in right ascension.
        width: Angle,
        /// Extent in declination.
        height: Angle,
    },
}

/// A named, colored region drawn on image frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    id: ItemId,
    name: String,
    shape: RegionShape,
    color: Option<Color>,
    z_value: f64,
}

impl Region {
    /// A circle named "Circle".
    pub fn circle(center: SkyCoord, radius: Angle) -> Self {
        Self::new("Circle", RegionShape::Circle { center, radius })
    }

    /// A quadrangle named "Quadrangle". A missing height makes it square.
    pub fn quadrangle(anchor: SkyCoord, width: Angle, height: Option<Angle>) -> Self {
        Self::new(
            "Quadrangle",
            RegionShape::Quadrangle {
                anchor,
                width,
                height: height.unwrap_or(width),
            },
        )
    }

    fn new(name: &str, shape: RegionShape) -> Self {
        Self {
            id: ItemId::next(),
            name: name.to_string(),
            shape,
            color: None,
            z_value: REGION_Z_VALUE,
        }
    }

    /// Replaces the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Geometry.
    pub fn shape(&self) -> &RegionShape {
        &self.shape
    }

    /// Stacking order of the outline.
    pub fn z_value(&self) -> f64 {
        self.z_value
    }

    /// A representative point: the circle center or the quadrangle middle.
    pub fn center(&self) -> SkyCoord {
        match self.shape {
            RegionShape::Circle { center, .. } => center,
            RegionShape::Quadrangle {
                anchor,
                width,
                height,
            } => SkyCoord {
                ra: Angle::from_deg(anchor.ra.deg() + width.deg() / 2.0).wrap_360(),
                dec: Angle::from_deg(anchor.dec.deg() + height.deg() / 2.0),
                frame: anchor.frame,
            },
        }
    }

    /// Closed outline on the sky with roughly `vertices` points.
    pub fn outline(&self, vertices: usize) -> Vec<SkyCoord> {
        match self.shape {
            RegionShape::Circle { center, radius } => spherical_circle(&center, radius, vertices),
            RegionShape::Quadrangle {
                anchor,
                width,
                height,
            } => {
                let per_side = (vertices / 4).max(1);
                let (ra0, dec0) = (anchor.ra.deg(), anchor.dec.deg());
                let (ra1, dec1) = (ra0 + width.deg(), dec0 + height.deg());
                let corners = [(ra0, dec0), (ra1, dec0), (ra1, dec1), (ra0, dec1), (ra0, dec0)];

                let mut points = Vec::with_capacity(4 * per_side + 1);
                for pair in corners.windows(2) {
                    let ((ra_a, dec_a), (ra_b, dec_b)) = (pair[0], pair[1]);
                    for step in 0..per_side {
                        let t = step as f64 / per_side as f64;
                        points.push(SkyCoord {
                            ra: Angle::from_deg(ra_a + (ra_b - ra_a) * t).wrap_360(),
                            dec: Angle::from_deg(dec_a + (dec_b - dec_a) * t),
                            frame: anchor.frame,
                        });
                    }
                }
                points.push(points[0]);
                points
            }
        }
    }
}

impl CollectionItem for Region {
    const KIND: ItemKind = ItemKind::Region;

    fn id(&self) -> ItemId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn color(&self) -> Option<Color> {
        self.color
    }

    fn set_color(&mut self, color: Color) {
        self.color = Some(color);
    }

    fn apply_update(&mut self, update: &ItemUpdate) -> bool {
        let mut applied = false;
        if let Some(name) = &update.name {
            self.name = name.clone();
            applied = true;
        }
        if let Some(color) = update.color {
            self.color = Some(color);
            applied = true;
        }
        match &mut self.shape {
            RegionShape::Circle { center, radius } => {
                if let Some(new_center) = update.center {
                    *center = new_center;
                    applied = true;
                }
                if let Some(new_radius) = update.radius {
                    *radius = new_radius;
                    applied = true;
                }
            }
            RegionShape::Quadrangle {
                anchor,
                width,
                height,
            } => {
                if let Some(new_anchor) = update.anchor {
                    *anchor = new_anchor;
                    applied = true;
                }
                if let Some(new_width) = update.width {
                    *width = new_width;
                    applied = true;
                }
                if let Some(new_height) = update.height {
                    *height = new_height;
                    applied = true;
                }
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_defaults() {
        let circle = Region::circle(SkyCoord::from_deg(10.0, 20.0), Angle::from_arcsec(5.0));
        assert_eq!(circle.name(), "Circle");
        assert_eq!(circle.color(), None);
        assert_eq!(circle.z_value(), REGION_Z_VALUE);

        let square = Region::quadrangle(SkyCoord::from_deg(10.0, 20.0), Angle::from_arcsec(16.0), None);
        assert_eq!(square.name(), "Quadrangle");
        let RegionShape::Quadrangle { width, height, .. } = *square.shape() else {
            panic!("expected a quadrangle");
        };
        assert_eq!(width, height);
    }

    #[test]
    fn test_update_ignores_fields_of_other_shapes() {
        let mut circle = Region::circle(SkyCoord::from_deg(10.0, 20.0), Angle::from_arcsec(5.0));
        let applied = circle.apply_update(&ItemUpdate::new().width(Angle::from_deg(1.0)).marker_size(3.0));
        assert!(!applied);

        let applied = circle.apply_update(
            &ItemUpdate::new()
                .radius(Angle::from_arcsec(7.0))
                .color(Color::rgb(0, 0, 255)),
        );
        assert!(applied);
        let RegionShape::Circle { radius, .. } = *circle.shape() else {
            panic!("expected a circle");
        };
        assert_abs_diff_eq!(radius.arcsec(), 7.0, epsilon = 1e-9);
        assert_eq!(circle.color(), Some(Color::rgb(0, 0, 255)));
    }

    #[test]
    fn test_quadrangle_outline_and_center() {
        let quad = Region::quadrangle(
            SkyCoord::from_deg(359.995, -5.0),
            Angle::from_deg(0.02),
            Some(Angle::from_deg(0.01)),
        );
        let outline = quad.outline(40);
        assert_eq!(outline.len(), 41);
        assert_eq!(outline.first(), outline.last());
        assert!(outline.iter().all(|p| (0.0..360.0).contains(&p.ra.deg())));

        let center = quad.center();
        assert_abs_diff_eq!(center.ra.deg(), 0.005, epsilon = 1e-9);
        assert_abs_diff_eq!(center.dec.deg(), -4.995, epsilon = 1e-9);
    }

    #[test]
    fn test_clone_is_same_item() {
        let region = Region::circle(SkyCoord::from_deg(0.0, 0.0), Angle::from_arcsec(1.0));
        let copy = region.clone();
        let other = Region::circle(SkyCoord::from_deg(0.0, 0.0), Angle::from_arcsec(1.0));
        assert_eq!(copy.id(), region.id());
        assert_ne!(other.id(), region.id());
    }
}
