//! Angles, sky coordinates and projections.
//!
//! This is the small amount of spherical astronomy the item types and
//! presentation surfaces need:
//!
//! - [`Angle`]: an angle stored in degrees, with unit-aware parsing
//! - [`SkyCoord`]: an equatorial position with separation and offsets
//! - [`spherical_circle`]: outline of a small circle on the sky
//! - [`Wcs`]: gnomonic world/pixel transform
//! - [`Interval`]: display levels for pixel data

mod interval;
mod wcs;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CelextaError, Result};

pub use interval::Interval;
pub use wcs::Wcs;

/// An angle, stored in degrees.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Angle(f64);

impl Angle {
    /// Zero degrees.
    pub const ZERO: Angle = Angle(0.0);

    /// Creates an angle from degrees.
    pub const fn from_deg(deg: f64) -> Self {
        Self(deg)
    }

    /// Creates an angle from arcminutes.
    pub fn from_arcmin(arcmin: f64) -> Self {
        Self(arcmin / 60.0)
    }

    /// Creates an angle from arcseconds.
    pub fn from_arcsec(arcsec: f64) -> Self {
        Self(arcsec / 3600.0)
    }

    /// Creates an angle from radians.
    pub fn from_rad(rad: f64) -> Self {
        Self(rad.to_degrees())
    }

    /// The angle in degrees.
    pub const fn deg(self) -> f64 {
        self.0
    }

    /// The angle in arcminutes.
    pub fn arcmin(self) -> f64 {
        self.0 * 60.0
    }

    /// The angle in arcseconds.
    pub fn arcsec(self) -> f64 {
        self.0 * 3600.0
    }

    /// The angle in radians.
    pub fn rad(self) -> f64 {
        self.0.to_radians()
    }

    /// Wraps the angle into `[0, 360)` degrees.
    pub fn wrap_360(self) -> Self {
        Self(self.0.rem_euclid(360.0))
    }

    /// Parses a value followed by an optional unit, e.g. `"5 arcsec"`,
    /// `"1.5arcmin"`, `"0.01 deg"`, `"2e-5 rad"`. A bare number is degrees.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let split = text
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E')))
            .unwrap_or(text.len());
        let (number, unit) = text.split_at(split);
        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| CelextaError::InvalidInput(format!("'{text}' is not an angle")))?;
        if !value.is_finite() {
            return Err(CelextaError::InvalidInput(format!("'{text}' is not finite")));
        }
        match unit.trim().to_ascii_lowercase().as_str() {
            "" | "d" | "deg" | "degree" | "degrees" => Ok(Self::from_deg(value)),
            "'" | "arcmin" | "amin" => Ok(Self::from_arcmin(value)),
            "\"" | "arcsec" | "asec" => Ok(Self::from_arcsec(value)),
            "rad" | "radian" | "radians" => Ok(Self::from_rad(value)),
            other => Err(CelextaError::InvalidInput(format!(
                "unknown angle unit '{other}' in '{text}'"
            ))),
        }
    }
}

impl FromStr for Angle {
    type Err = CelextaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.abs() < 1.0 / 60.0 {
            write!(f, "{:.3} arcsec", self.arcsec())
        } else if self.0.abs() < 1.0 {
            write!(f, "{:.3} arcmin", self.arcmin())
        } else {
            write!(f, "{:.6} deg", self.0)
        }
    }
}

/// Reference frame of a coordinate.
///
/// Only the name is tracked; no transformations between frames are done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordFrame {
    /// International Celestial Reference System.
    #[default]
    Icrs,
    /// FK5 (J2000).
    Fk5,
    /// Galactic.
    Galactic,
}

impl CoordFrame {
    /// Lowercase frame name as written to descriptors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Icrs => "icrs",
            Self::Fk5 => "fk5",
            Self::Galactic => "galactic",
        }
    }
}

impl FromStr for CoordFrame {
    type Err = CelextaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "icrs" => Ok(Self::Icrs),
            "fk5" => Ok(Self::Fk5),
            "galactic" => Ok(Self::Galactic),
            other => Err(CelextaError::InvalidInput(format!("unknown frame '{other}'"))),
        }
    }
}

/// A position on the celestial sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyCoord {
    /// Right ascension.
    pub ra: Angle,
    /// Declination.
    pub dec: Angle,
    /// Reference frame name.
    #[serde(default)]
    pub frame: CoordFrame,
}

impl SkyCoord {
    /// Creates an ICRS coordinate from degrees.
    pub fn from_deg(ra: f64, dec: f64) -> Self {
        Self {
            ra: Angle::from_deg(ra),
            dec: Angle::from_deg(dec),
            frame: CoordFrame::Icrs,
        }
    }

    /// Returns the same position labelled with another frame.
    pub fn with_frame(mut self, frame: CoordFrame) -> Self {
        self.frame = frame;
        self
    }

    /// Parses `"<ra> <dec>"` in decimal degrees, separated by whitespace
    /// and/or a comma.
    pub fn parse(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|p| !p.is_empty())
            .collect();
        let [ra, dec] = parts.as_slice() else {
            return Err(CelextaError::InvalidInput(format!(
                "expected '<ra> <dec>' in degrees, got '{text}'"
            )));
        };
        let ra: f64 = ra
            .parse()
            .map_err(|_| CelextaError::InvalidInput(format!("invalid right ascension '{ra}'")))?;
        let dec: f64 = dec
            .parse()
            .map_err(|_| CelextaError::InvalidInput(format!("invalid declination '{dec}'")))?;
        if !(0.0..360.0).contains(&ra) {
            return Err(CelextaError::InvalidInput(format!(
                "right ascension {ra} outside [0, 360)"
            )));
        }
        if !(-90.0..=90.0).contains(&dec) {
            return Err(CelextaError::InvalidInput(format!(
                "declination {dec} outside [-90, 90]"
            )));
        }
        Ok(Self::from_deg(ra, dec))
    }

    /// Angular separation to another coordinate (Vincenty formula, stable
    /// at all distances).
    pub fn separation(&self, other: &SkyCoord) -> Angle {
        let (ra1, dec1) = (self.ra.rad(), self.dec.rad());
        let (ra2, dec2) = (other.ra.rad(), other.dec.rad());
        let dra = ra2 - ra1;
        let (sin_dra, cos_dra) = dra.sin_cos();
        let (sin_d1, cos_d1) = dec1.sin_cos();
        let (sin_d2, cos_d2) = dec2.sin_cos();

        let num1 = cos_d2 * sin_dra;
        let num2 = cos_d1 * sin_d2 - sin_d1 * cos_d2 * cos_dra;
        let denominator = sin_d1 * sin_d2 + cos_d1 * cos_d2 * cos_dra;
        Angle::from_rad(num1.hypot(num2).atan2(denominator))
    }

    /// The point reached by moving `distance` along the great circle that
    /// leaves this point with position angle `bearing` (east of north).
    pub fn offset_by(&self, bearing: Angle, distance: Angle) -> SkyCoord {
        let (ra1, dec1) = (self.ra.rad(), self.dec.rad());
        let (sin_pa, cos_pa) = bearing.rad().sin_cos();
        let (sin_r, cos_r) = distance.rad().sin_cos();
        let (sin_d1, cos_d1) = dec1.sin_cos();

        let sin_d2 = (sin_d1 * cos_r + cos_d1 * sin_r * cos_pa).clamp(-1.0, 1.0);
        let dec2 = sin_d2.asin();
        let ra2 = ra1 + (sin_pa * sin_r * cos_d1).atan2(cos_r - sin_d1 * sin_d2);

        SkyCoord {
            ra: Angle::from_rad(ra2).wrap_360(),
            dec: Angle::from_rad(dec2),
            frame: self.frame,
        }
    }
}

impl fmt::Display for SkyCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.6}, {:+.6}) {}",
            self.ra.deg(),
            self.dec.deg(),
            self.frame.name()
        )
    }
}

/// Vertices of the small circle of angular `radius` around `center`.
///
/// Returns `vertices + 1` points; the last repeats the first so the outline
/// is closed.
pub fn spherical_circle(center: &SkyCoord, radius: Angle, vertices: usize) -> Vec<SkyCoord> {
    let vertices = vertices.max(3);
    (0..=vertices)
        .map(|i| {
            let bearing = Angle::from_deg(360.0 * (i % vertices) as f64 / vertices as f64);
            center.offset_by(bearing, radius)
        })
        .collect()
}
