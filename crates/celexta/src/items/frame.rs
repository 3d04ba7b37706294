use std::path::Path;
use std::sync::Arc;

use glam::DVec2;

use crate::astro::{Angle, Interval, SkyCoord, Wcs};
use crate::error::{CelextaError, Result};
use crate::file;

use super::{CollectionItem, ItemId, ItemKind, ItemUpdate};

/// Row-major single-channel pixel data.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    width: usize,
    height: usize,
    pixels: Arc<[f32]>,
}

impl ImageData {
    /// Wraps `pixels`, which must hold `width * height` values.
    pub fn new(width: usize, height: usize, pixels: Vec<f32>) -> Result<Self> {
        if width.checked_mul(height) != Some(pixels.len()) {
            return Err(CelextaError::InvalidInput(format!(
                "{} pixels do not fill a {width}x{height} image",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// All pixels, row by row.
    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    /// The value at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    /// Writes the pixels as gzip-compressed little-endian `f32`.
    pub fn write_gz(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes: Vec<u8> = self.pixels.iter().flat_map(|v| v.to_le_bytes()).collect();
        file::write_gzip(path, &bytes)
    }

    /// Reads pixels written by [`write_gz`](Self::write_gz).
    pub fn read_gz(path: impl AsRef<Path>, width: usize, height: usize) -> Result<Self> {
        let path = path.as_ref();
        let bytes = file::read_gzip(path)?;
        if bytes.len() % 4 != 0 {
            return Err(CelextaError::InvalidDescriptor(format!(
                "{} is not a whole number of f32 values",
                path.display()
            )));
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Self::new(width, height, pixels)
    }
}

/// An image with its projection and display settings.
///
/// A frame without a WCS can still be shown, but no sky item can be drawn
/// on it.
#[derive(Debug, Clone)]
pub struct ImageFrame {
    id: ItemId,
    name: String,
    image: Option<ImageData>,
    wcs: Option<Wcs>,
    interval: Interval,
    levels: Option<(f64, f64)>,
    colormap: Option<String>,
    rotation_deg: f64,
}

impl Default for ImageFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFrame {
    /// An empty frame named "Image Frame".
    pub fn new() -> Self {
        Self {
            id: ItemId::next(),
            name: "Image Frame".to_string(),
            image: None,
            wcs: None,
            interval: Interval::default(),
            levels: None,
            colormap: None,
            rotation_deg: 0.0,
        }
    }

    /// Replaces the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the image and recomputes display levels.
    pub fn with_image(mut self, image: ImageData) -> Self {
        self.image = Some(image);
        self.recompute_levels();
        self
    }

    /// Sets the projection.
    pub fn with_wcs(mut self, wcs: Wcs) -> Self {
        self.wcs = Some(wcs);
        self
    }

    /// Sets the display interval and recomputes levels.
    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.set_interval(interval);
        self
    }

    /// Sets the colormap name.
    pub fn with_colormap(mut self, colormap: impl Into<String>) -> Self {
        self.colormap = Some(colormap.into());
        self
    }

    /// Pixel data, if any.
    pub fn image(&self) -> Option<&ImageData> {
        self.image.as_ref()
    }

    /// Projection, if any.
    pub fn wcs(&self) -> Option<&Wcs> {
        self.wcs.as_ref()
    }

    /// Display interval.
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Changes the interval and recomputes levels from it.
    pub fn set_interval(&mut self, interval: Interval) {
        self.interval = interval;
        self.recompute_levels();
    }

    /// `(black, white)` display levels.
    pub fn levels(&self) -> Option<(f64, f64)> {
        self.levels
    }

    /// Overrides the display levels.
    pub fn set_levels(&mut self, levels: (f64, f64)) {
        self.levels = Some(levels);
    }

    /// Colormap name.
    pub fn colormap(&self) -> Option<&str> {
        self.colormap.as_deref()
    }

    /// Display rotation in degrees, counter-clockwise.
    pub fn rotation_deg(&self) -> f64 {
        self.rotation_deg
    }

    /// Sets the display rotation. Rotations do not accumulate.
    pub fn set_rotation(&mut self, degrees: f64) {
        self.rotation_deg = degrees;
    }

    /// Pixel coordinates of the image center.
    pub fn center_pixel(&self) -> Option<DVec2> {
        self.image
            .as_ref()
            .map(|image| DVec2::new(image.width as f64 / 2.0, image.height as f64 / 2.0))
    }

    /// Sky position of the image center.
    pub fn world_center(&self) -> Option<SkyCoord> {
        let wcs = self.wcs.as_ref()?;
        Some(wcs.pixel_to_world(self.center_pixel()?))
    }

    /// Angular size of the image diagonal.
    pub fn world_fov(&self) -> Option<Angle> {
        let wcs = self.wcs.as_ref()?;
        let image = self.image.as_ref()?;
        let bottom_left = wcs.pixel_to_world(DVec2::ZERO);
        let top_right = wcs.pixel_to_world(DVec2::new(image.width as f64, image.height as f64));
        Some(bottom_left.separation(&top_right))
    }

    /// Whether `coord` projects inside the image.
    pub fn contains(&self, coord: &SkyCoord) -> bool {
        let (Some(wcs), Some(image)) = (self.wcs.as_ref(), self.image.as_ref()) else {
            return false;
        };
        wcs.world_to_pixel(coord).is_some_and(|p| {
            (0.0..image.width as f64).contains(&p.x) && (0.0..image.height as f64).contains(&p.y)
        })
    }

    fn recompute_levels(&mut self) {
        self.levels = self
            .image
            .as_ref()
            .and_then(|image| self.interval.levels(image.pixels()));
    }

    pub(crate) fn restore_display(
        &mut self,
        rotation_deg: f64,
        levels: Option<(f64, f64)>,
        colormap: Option<String>,
    ) {
        self.rotation_deg = rotation_deg;
        if levels.is_some() {
            self.levels = levels;
        }
        self.colormap = colormap;
    }
}

impl CollectionItem for ImageFrame {
    const KIND: ItemKind = ItemKind::Frame;
    const COLORED: bool = false;

    fn id(&self) -> ItemId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn apply_update(&mut self, update: &ItemUpdate) -> bool {
        let mut applied = false;
        if let Some(name) = &update.name {
            self.name = name.clone();
            applied = true;
        }
        if let Some(degrees) = update.rotation_deg {
            self.rotation_deg = degrees;
            applied = true;
        }
        if let Some(interval) = update.interval {
            self.set_interval(interval);
            applied = true;
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn frame() -> ImageFrame {
        let pixels = (0..64 * 32).map(|i| (i % 7) as f32).collect();
        ImageFrame::new()
            .with_image(ImageData::new(64, 32, pixels).unwrap())
            .with_wcs(Wcs::simple(
                SkyCoord::from_deg(150.0, 2.0),
                Angle::from_arcsec(1.0),
                (64, 32),
            ))
            .with_interval(Interval::MinMax)
    }

    #[test]
    fn test_image_data_shape_is_checked() {
        assert!(ImageData::new(3, 3, vec![0.0; 8]).is_err());
        let image = ImageData::new(3, 2, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(image.get(2, 1), Some(5.0));
        assert_eq!(image.get(3, 0), None);
    }

    #[test]
    fn test_levels_follow_interval() {
        let mut frame = frame();
        assert_eq!(frame.levels(), Some((0.0, 6.0)));
        frame.set_interval(Interval::Percentile(50.0));
        let (low, high) = frame.levels().unwrap();
        assert!(low > 0.0 && high < 6.0);
        assert!(ImageFrame::new().levels().is_none());
    }

    #[test]
    fn test_world_center_and_fov() {
        let frame = frame();
        let center = frame.world_center().unwrap();
        assert!(center.separation(&SkyCoord::from_deg(150.0, 2.0)).arcsec() < 1.0);
        let diagonal = (64.0_f64.powi(2) + 32.0_f64.powi(2)).sqrt();
        assert_abs_diff_eq!(frame.world_fov().unwrap().arcsec(), diagonal, epsilon = 1e-3);
        assert!(ImageFrame::new().world_center().is_none());
    }

    #[test]
    fn test_contains() {
        let frame = frame();
        assert!(frame.contains(&SkyCoord::from_deg(150.0, 2.0)));
        assert!(!frame.contains(&SkyCoord::from_deg(150.0, 3.0)));
    }

    #[test]
    fn test_pixels_side_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.f32.gz");
        let image = ImageData::new(2, 2, vec![1.5, -2.0, f32::NAN, 4.0]).unwrap();
        image.write_gz(&path).unwrap();
        let back = ImageData::read_gz(&path, 2, 2).unwrap();
        assert_eq!(back.get(0, 0), Some(1.5));
        assert!(back.get(0, 1).unwrap().is_nan());
        assert!(ImageData::read_gz(&path, 3, 3).is_err());
    }

    #[test]
    fn test_update_applies_frame_fields() {
        let mut frame = frame();
        assert!(!frame.apply_update(&ItemUpdate::new().marker_size(2.0)));
        assert!(frame.apply_update(&ItemUpdate::new().rotation_deg(30.0)));
        assert_eq!(frame.rotation_deg(), 30.0);
        assert!(frame.color().is_none());
    }
}
