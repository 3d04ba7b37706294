//! Deterministic demo data: synthetic images and items placed on them.
//!
//! Every generator takes a seed so that the same call always produces the
//! same item (apart from its id).

use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, TimeZone, Utc};
use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::astro::{Angle, SkyCoord, Wcs};
use crate::error::{CelextaError, Result};
use crate::items::{Candidate, CatalogTable, Color, ImageData, ImageFrame, PhotometricPoint, Region, TableRow};

/// Side of the generated images, in pixels.
pub const EXAMPLE_IMAGE_SIZE: usize = 256;

const FILTERS: [(&str, f64); 6] = [
    ("LSST_u", 2.6),
    ("LSST_g", 0.8),
    ("LSST_r", 0.1),
    ("LSST_i", 1.2),
    ("LSST_y", 1.8),
    ("LSST_z", 2.0),
];

const PLASMA: [Color; 5] = [
    Color::rgb(0x0d, 0x08, 0x87),
    Color::rgb(0x7e, 0x03, 0xa8),
    Color::rgb(0xcc, 0x47, 0x78),
    Color::rgb(0xf8, 0x95, 0x40),
    Color::rgb(0xf0, 0xf9, 0x21),
];

const VIRIDIS: [Color; 5] = [
    Color::rgb(0x44, 0x01, 0x54),
    Color::rgb(0x3b, 0x52, 0x8b),
    Color::rgb(0x21, 0x91, 0x8c),
    Color::rgb(0x5e, 0xc9, 0x62),
    Color::rgb(0xfd, 0xe7, 0x25),
];

/// Synthetic fields to choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleImage {
    /// Sparse stars on a flat sky.
    Starfield,
    /// Stars over a bright extended cloud.
    Nebula,
    /// Dense field at the Galactic center.
    Galactic,
}

impl ExampleImage {
    /// Every example image.
    pub const ALL: [ExampleImage; 3] = [Self::Starfield, Self::Nebula, Self::Galactic];

    /// Lowercase name, also used as the frame name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Starfield => "starfield",
            Self::Nebula => "nebula",
            Self::Galactic => "galactic",
        }
    }

    fn center(self) -> SkyCoord {
        match self {
            Self::Starfield => SkyCoord::from_deg(150.1, 2.2),
            Self::Nebula => SkyCoord::from_deg(85.2458, -2.4583),
            Self::Galactic => SkyCoord::from_deg(266.4168, -29.0078),
        }
    }

    fn star_count(self) -> usize {
        match self {
            Self::Starfield => 40,
            Self::Nebula => 60,
            Self::Galactic => 300,
        }
    }

    fn seed(self) -> u64 {
        match self {
            Self::Starfield => 1,
            Self::Nebula => 2,
            Self::Galactic => 3,
        }
    }
}

impl fmt::Display for ExampleImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExampleImage {
    type Err = CelextaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CelextaError::InvalidInput(format!("unknown example image '{s}'")))
    }
}

/// A 256×256 frame with a 1 arcsec/pixel north-up projection.
pub fn example_image(kind: ExampleImage) -> Result<ImageFrame> {
    tracing::debug!(kind = kind.name(), "generating example image");
    let size = EXAMPLE_IMAGE_SIZE;
    let mut rng = StdRng::seed_from_u64(kind.seed());
    let mut pixels = vec![0.0_f32; size * size];

    for pixel in &mut pixels {
        *pixel = (100.0 + 5.0 * normal(&mut rng)) as f32;
    }

    if kind == ExampleImage::Nebula {
        let center = DVec2::new(size as f64 * 0.6, size as f64 * 0.45);
        add_gaussian(&mut pixels, size, center, 40.0, 300.0);
    }

    for _ in 0..kind.star_count() {
        let position = DVec2::new(
            rng.gen_range(0.0..size as f64),
            rng.gen_range(0.0..size as f64),
        );
        let flux = 50.0 * 40.0_f64.powf(rng.gen_range(0.0..1.0));
        add_gaussian(&mut pixels, size, position, 1.3, flux);
    }

    let image = ImageData::new(size, size, pixels)?;
    let wcs = Wcs::simple(kind.center(), Angle::from_arcsec(1.0), (size, size));
    Ok(ImageFrame::new()
        .with_name(kind.name())
        .with_image(image)
        .with_wcs(wcs))
}

/// A circle inside `frame`, or `None` if the frame has no image or WCS.
pub fn example_region(frame: &ImageFrame, seed: u64) -> Option<Region> {
    let footprint = Footprint::of(frame)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let num: f64 = rng.gen_range(0.0..1.0);

    let center = footprint.offset_center(num / 10.0);
    let radius = Angle::from_deg(footprint.fov.deg() * (num / 4.0 + 0.05));
    Some(
        Region::circle(center, radius)
            .with_name(format!("Region {:.1}", 10.0 * num))
            .with_color(sample_colormap(&PLASMA, num)),
    )
}

/// Ten sources scattered around the middle of `frame`, with a
/// `Magnitude` column.
pub fn example_table(frame: &ImageFrame, seed: u64) -> Option<CatalogTable> {
    let footprint = Footprint::of(frame)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let num: f64 = rng.gen_range(0.0..1.0);

    let middle = footprint.size * (0.5 + num / 8.0);
    let sigma = footprint.size / 10.0;
    let rows = (0..10)
        .map(|_| {
            let offset = DVec2::new(normal(&mut rng), normal(&mut rng)) * sigma;
            let pixel = footprint.clamp(middle + offset);
            TableRow {
                position: footprint.wcs.pixel_to_world(pixel),
                values: vec![format!("{:.3}", 20.0 + normal(&mut rng))],
            }
        })
        .collect();

    Some(
        CatalogTable::with_columns(vec!["Magnitude".to_string()], rows)
            .with_name(format!("Tab {:.1}", 10.0 * num))
            .with_color(sample_colormap(&VIRIDIS, num)),
    )
}

/// A green candidate near the middle of `frame` with `nobs` epochs in six
/// filters followed by two upper limits.
pub fn example_candidate(frame: &ImageFrame, seed: u64, nobs: usize) -> Option<Candidate> {
    let footprint = Footprint::of(frame)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let num: f64 = rng.gen_range(0.0..1.0);

    let t0 = example_epoch();
    let mut observations = Vec::with_capacity(nobs * FILTERS.len() + 2);
    for i in 0..nobs {
        for (filter, color_offset) in FILTERS {
            let jitter = 0.1 * color_offset * rng.gen_range(0.0..1.0) + 0.2 * rng.gen_range(0.0..1.0);
            observations.push(PhotometricPoint {
                mag: 16.0 + i as f64 + jitter,
                unc: 0.2,
                phot_filter: filter.to_string(),
                obs_time: t0 + Duration::seconds(300 + 3600 * i as i64),
                obs_duration_s: 300.0,
                limit: false,
            });
        }
    }
    for filter in ["VT_R", "VT_B"] {
        observations.push(PhotometricPoint {
            mag: 20.5,
            unc: 0.0,
            phot_filter: filter.to_string(),
            obs_time: t0 + Duration::seconds(3600 * (nobs as i64 + 1)),
            obs_duration_s: 300.0,
            limit: true,
        });
    }

    let uncertainty = Angle::from_deg(footprint.fov.deg() * (num / 20.0 + 0.01));
    Some(
        Candidate::new(footprint.offset_center(num / 10.0))
            .with_name("Test Candidate")
            .with_uncertainty(uncertainty)
            .with_t0(t0)
            .with_meta("PROB_GRB", serde_json::json!(0.99))
            .with_observations(observations)
            .with_color(Color::rgb(0, 255, 0)),
    )
}

/// Reference time of generated candidates.
pub fn example_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

struct Footprint<'a> {
    wcs: &'a Wcs,
    size: DVec2,
    fov: Angle,
}

impl<'a> Footprint<'a> {
    fn of(frame: &'a ImageFrame) -> Option<Self> {
        let wcs = frame.wcs()?;
        let (width, height) = frame.image()?.shape();
        Some(Self {
            wcs,
            size: DVec2::new(width as f64, height as f64),
            fov: frame.world_fov()?,
        })
    }

    /// The sky position `fraction` of the image size up and right of the
    /// middle.
    fn offset_center(&self, fraction: f64) -> SkyCoord {
        let pixel = self.size * (0.5 + fraction);
        self.wcs.pixel_to_world(self.clamp(pixel))
    }

    fn clamp(&self, pixel: DVec2) -> DVec2 {
        pixel.clamp(DVec2::splat(1.0), self.size - 2.0)
    }
}

fn sample_colormap(stops: &[Color], t: f64) -> Color {
    let scaled = t.clamp(0.0, 1.0) * (stops.len() - 1) as f64;
    let lower = (scaled.floor() as usize).min(stops.len() - 2);
    let frac = scaled - lower as f64;
    let (r0, g0, b0) = stops[lower].components();
    let (r1, g1, b1) = stops[lower + 1].components();
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    Color::rgb(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}

/// Standard normal deviate (Box-Muller).
fn normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

fn add_gaussian(pixels: &mut [f32], size: usize, center: DVec2, sigma: f64, peak: f64) {
    let reach = (4.0 * sigma).ceil();
    let x0 = (center.x - reach).max(0.0) as usize;
    let y0 = (center.y - reach).max(0.0) as usize;
    let x1 = ((center.x + reach) as usize).min(size - 1);
    let y1 = ((center.y + reach) as usize).min(size - 1);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let d2 = (x as f64 - center.x).powi(2) + (y as f64 - center.y).powi(2);
            pixels[y * size + x] += (peak * (-d2 / (2.0 * sigma * sigma)).exp()) as f32;
        }
    }
}
