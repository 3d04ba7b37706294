//! Saving items to descriptors and loading them back.
//!
//! Every item kind converts to a small serde descriptor. Large payloads
//! (table rows, observation logs, pixels) are written as side files under
//! the directory passed to [`Persist::to_descriptor`]; the descriptor only
//! records their absolute path.
//!
//! Visibility is not part of any descriptor: loaded items are always
//! visible. Loaded items are new items with fresh ids.
//!
//! # Example
//!
//! ```
//! use celexta::astro::{Angle, SkyCoord};
//! use celexta::items::Region;
//! use celexta::persist::Persist;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let circle = Region::circle(SkyCoord::from_deg(10.0, 20.0), Angle::from_arcsec(5.0));
//! let descriptor = circle.to_descriptor(dir.path()).unwrap();
//! let restored = Region::from_descriptor(&descriptor).unwrap();
//! assert_eq!(restored.center(), circle.center());
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use celexta_core::logging::targets;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::astro::{Angle, CoordFrame, Interval, SkyCoord, Wcs};
use crate::error::{CelextaError, Result};
use crate::file;
use crate::items::{
    file_stem, Candidate, CatalogTable, CollectionItem, Color, ImageData, ImageFrame, Region,
    RegionShape, DEFAULT_MARKER_SIZE,
};

/// Conversion of an item to and from its saved form.
pub trait Persist: Sized {
    /// The serializable form.
    type Descriptor: Serialize + DeserializeOwned;

    /// Writes side files under `dir` (created if needed) and returns the
    /// descriptor referencing them.
    fn to_descriptor(&self, dir: &Path) -> Result<Self::Descriptor>;

    /// Rebuilds an item, reading any side files the descriptor names.
    fn from_descriptor(descriptor: &Self::Descriptor) -> Result<Self>;
}

/// A sky position as saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyPosition {
    /// Right ascension.
    pub ra: f64,
    /// Declination.
    pub dec: f64,
    /// Unit of `ra` and `dec`; always written as `"deg"`.
    pub unit: String,
    /// Reference frame name.
    #[serde(default)]
    pub frame: CoordFrame,
}

impl SkyPosition {
    fn from_coord(coord: &SkyCoord) -> Self {
        Self {
            ra: coord.ra.deg(),
            dec: coord.dec.deg(),
            unit: "deg".to_string(),
            frame: coord.frame,
        }
    }

    fn to_coord(&self) -> Result<SkyCoord> {
        let ra = angle_in(self.ra, &self.unit)?;
        let dec = angle_in(self.dec, &self.unit)?;
        Ok(SkyCoord::from_deg(ra.deg(), dec.deg()).with_frame(self.frame))
    }
}

/// An angle as saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    /// Magnitude.
    pub value: f64,
    /// Unit; always written as `"deg"`.
    pub unit: String,
}

impl Quantity {
    fn from_angle(angle: Angle) -> Self {
        Self {
            value: angle.deg(),
            unit: "deg".to_string(),
        }
    }

    fn to_angle(&self) -> Result<Angle> {
        angle_in(self.value, &self.unit)
    }
}

fn angle_in(value: f64, unit: &str) -> Result<Angle> {
    match unit {
        "deg" => Ok(Angle::from_deg(value)),
        "arcmin" => Ok(Angle::from_arcmin(value)),
        "arcsec" => Ok(Angle::from_arcsec(value)),
        "rad" => Ok(Angle::from_rad(value)),
        other => Err(CelextaError::InvalidDescriptor(format!(
            "unsupported angle unit '{other}'"
        ))),
    }
}

/// A saved region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RegionDescriptor {
    /// A circle.
    Circle {
        /// Display name.
        name: String,
        /// Center.
        center: SkyPosition,
        /// Radius.
        radius: Quantity,
        /// Outline color.
        color: Option<Color>,
    },
    /// A quadrangle with constant-RA and constant-Dec edges.
    Quadrangle {
        /// Display name.
        name: String,
        /// Lower-left corner.
        anchor: SkyPosition,
        /// Extent along RA.
        width: Quantity,
        /// Extent along Dec.
        height: Quantity,
        /// Outline color.
        color: Option<Color>,
    },
}

impl Persist for Region {
    type Descriptor = RegionDescriptor;

    fn to_descriptor(&self, _dir: &Path) -> Result<RegionDescriptor> {
        let name = self.name().to_string();
        let color = self.color();
        Ok(match *self.shape() {
            RegionShape::Circle { center, radius } => RegionDescriptor::Circle {
                name,
                center: SkyPosition::from_coord(&center),
                radius: Quantity::from_angle(radius),
                color,
            },
            RegionShape::Quadrangle {
                anchor,
                width,
                height,
            } => RegionDescriptor::Quadrangle {
                name,
                anchor: SkyPosition::from_coord(&anchor),
                width: Quantity::from_angle(width),
                height: Quantity::from_angle(height),
                color,
            },
        })
    }

    fn from_descriptor(descriptor: &RegionDescriptor) -> Result<Self> {
        let (region, name, color) = match descriptor {
            RegionDescriptor::Circle {
                name,
                center,
                radius,
                color,
            } => (
                Region::circle(center.to_coord()?, radius.to_angle()?),
                name,
                color,
            ),
            RegionDescriptor::Quadrangle {
                name,
                anchor,
                width,
                height,
                color,
            } => (
                Region::quadrangle(anchor.to_coord()?, width.to_angle()?, Some(height.to_angle()?)),
                name,
                color,
            ),
        };
        let region = region.with_name(name.clone());
        Ok(match color {
            Some(color) => region.with_color(*color),
            None => region,
        })
    }
}

/// A saved catalog table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Display name.
    pub name: String,
    /// Marker color.
    pub color: Option<Color>,
    /// Marker size in screen pixels.
    #[serde(default = "default_marker_size")]
    pub marker_size: f64,
    /// CSV file with the rows.
    pub data: PathBuf,
}

fn default_marker_size() -> f64 {
    DEFAULT_MARKER_SIZE
}

impl Persist for CatalogTable {
    type Descriptor = TableDescriptor;

    fn to_descriptor(&self, dir: &Path) -> Result<TableDescriptor> {
        let path = side_file(dir, self.name(), "csv");
        self.write_csv(&path)?;
        Ok(TableDescriptor {
            name: self.name().to_string(),
            color: self.color(),
            marker_size: self.marker_size(),
            data: path,
        })
    }

    fn from_descriptor(descriptor: &TableDescriptor) -> Result<Self> {
        let table = CatalogTable::read_csv(&descriptor.data)?
            .with_name(descriptor.name.clone())
            .with_marker_size(descriptor.marker_size);
        Ok(match descriptor.color {
            Some(color) => table.with_color(color),
            None => table,
        })
    }
}

/// A saved candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDescriptor {
    /// Display name.
    pub name: String,
    /// Position.
    pub pos: SkyPosition,
    /// Positional uncertainty.
    pub pos_unc: Quantity,
    /// Marker color.
    pub color: Option<Color>,
    /// Reference time of the light curve.
    pub t0: Option<DateTime<Utc>>,
    /// Free-form metadata.
    #[serde(default)]
    pub meta: BTreeMap<String, serde_json::Value>,
    /// CSV file with the observations.
    pub observations: PathBuf,
}

impl Persist for Candidate {
    type Descriptor = CandidateDescriptor;

    fn to_descriptor(&self, dir: &Path) -> Result<CandidateDescriptor> {
        let path = side_file(dir, self.name(), "obs.csv");
        self.write_observations(&path)?;
        Ok(CandidateDescriptor {
            name: self.name().to_string(),
            pos: SkyPosition::from_coord(&self.position()),
            pos_unc: Quantity::from_angle(self.uncertainty()),
            color: self.color(),
            t0: self.t0(),
            meta: self.meta().clone(),
            observations: path,
        })
    }

    fn from_descriptor(descriptor: &CandidateDescriptor) -> Result<Self> {
        let observations = Candidate::read_observations(&descriptor.observations)?;
        let mut candidate = Candidate::new(descriptor.pos.to_coord()?)
            .with_name(descriptor.name.clone())
            .with_uncertainty(descriptor.pos_unc.to_angle()?)
            .with_observations(observations);
        if let Some(t0) = descriptor.t0 {
            candidate = candidate.with_t0(t0);
        }
        if let Some(color) = descriptor.color {
            candidate = candidate.with_color(color);
        }
        candidate.set_meta(descriptor.meta.clone());
        Ok(candidate)
    }
}

/// A saved image frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDescriptor {
    /// Display name.
    pub name: String,
    /// Display rotation in degrees.
    #[serde(default)]
    pub rotation_angle: f64,
    /// Gzip-compressed little-endian `f32` pixels.
    pub image: Option<PathBuf>,
    /// `[width, height]` of the image.
    pub shape: Option<[usize; 2]>,
    /// Projection.
    pub wcs: Option<Wcs>,
    /// `[black, white]` display levels.
    pub levels: Option<[f64; 2]>,
    /// Display interval.
    #[serde(default)]
    pub interval: Interval,
    /// Colormap name.
    #[serde(default)]
    pub cmap: Option<String>,
}

impl Persist for ImageFrame {
    type Descriptor = FrameDescriptor;

    fn to_descriptor(&self, dir: &Path) -> Result<FrameDescriptor> {
        let (image, shape) = match self.image() {
            Some(data) => {
                let path = side_file(dir, &format!("{}_frame_img", self.name()), "f32.gz");
                data.write_gz(&path)?;
                (Some(path), Some([data.width(), data.height()]))
            }
            None => (None, None),
        };
        Ok(FrameDescriptor {
            name: self.name().to_string(),
            rotation_angle: self.rotation_deg(),
            image,
            shape,
            wcs: self.wcs().cloned(),
            levels: self.levels().map(|(lo, hi)| [lo, hi]),
            interval: self.interval(),
            cmap: self.colormap().map(str::to_string),
        })
    }

    fn from_descriptor(descriptor: &FrameDescriptor) -> Result<Self> {
        let mut frame = ImageFrame::new()
            .with_name(descriptor.name.clone())
            .with_interval(descriptor.interval);
        match (&descriptor.image, descriptor.shape) {
            (Some(path), Some([width, height])) => {
                frame = frame.with_image(ImageData::read_gz(path, width, height)?);
            }
            (Some(path), None) => {
                return Err(CelextaError::InvalidDescriptor(format!(
                    "frame '{}' has image {} but no shape",
                    descriptor.name,
                    path.display()
                )));
            }
            (None, _) => {}
        }
        if let Some(wcs) = descriptor.wcs.clone() {
            frame = frame.with_wcs(wcs);
        }
        frame.restore_display(
            descriptor.rotation_angle,
            descriptor.levels.map(|[lo, hi]| (lo, hi)),
            descriptor.cmap.clone(),
        );
        Ok(frame)
    }
}

/// Everything saved for one tab, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabState {
    /// Frames, in tab order.
    #[serde(default)]
    pub frame: Vec<FrameDescriptor>,
    /// Regions.
    #[serde(default)]
    pub region: Vec<RegionDescriptor>,
    /// Tables.
    #[serde(default)]
    pub table: Vec<TableDescriptor>,
    /// Candidates.
    #[serde(default)]
    pub candidate: Vec<CandidateDescriptor>,
}

impl TabState {
    /// Total number of saved items.
    pub fn len(&self) -> usize {
        self.frame.len() + self.region.len() + self.table.len() + self.candidate.len()
    }

    /// Returns true if nothing was saved.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fresh absolute path `<dir>/<stem>.<extension>` for an item's side file.
///
/// Items sharing a name get `_2`, `_3`, ... suffixes instead of
/// overwriting each other.
fn side_file(dir: &Path, name: &str, extension: &str) -> PathBuf {
    let stem = file_stem(name);
    let mut path = dir.join(format!("{stem}.{extension}"));
    let mut counter = 2;
    while path.exists() {
        path = dir.join(format!("{stem}_{counter}.{extension}"));
        counter += 1;
    }
    tracing::trace!(target: targets::PERSIST, path = %path.display(), "side file");
    file::absolute(&path)
}
