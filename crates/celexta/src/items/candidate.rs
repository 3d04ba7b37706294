use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use celexta_core::logging::targets;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::astro::{Angle, SkyCoord};
use crate::error::Result;
use crate::file;

use super::{CollectionItem, Color, ItemId, ItemKind, ItemUpdate};

/// Columns an observation file must have.
pub const REQUIRED_OBSERVATION_COLUMNS: [&str; 5] =
    ["mag", "unc", "phot_filter", "obs_time", "obs_duration"];

/// One photometric measurement of a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotometricPoint {
    /// AB magnitude, or the limiting magnitude when `limit` is set.
    pub mag: f64,
    /// Magnitude uncertainty.
    pub unc: f64,
    /// Filter name.
    pub phot_filter: String,
    /// Start of the exposure.
    pub obs_time: DateTime<Utc>,
    /// Exposure length in seconds.
    #[serde(rename = "obs_duration")]
    pub obs_duration_s: f64,
    /// Whether `mag` is an upper limit (non-detection).
    #[serde(default)]
    pub limit: bool,
}

impl PhotometricPoint {
    /// Mid-exposure time, or `None` if the exposure length puts it outside
    /// the representable range.
    pub fn mid_time(&self) -> Option<DateTime<Utc>> {
        let half = chrono::TimeDelta::try_milliseconds((self.obs_duration_s * 500.0).round() as i64)?;
        self.obs_time.checked_add_signed(half)
    }
}

/// A transient candidate: a position with an uncertainty and a light curve.
#[derive(Debug, Clone)]
pub struct Candidate {
    id: ItemId,
    name: String,
    position: SkyCoord,
    uncertainty: Angle,
    t0: Option<DateTime<Utc>>,
    observations: Arc<[PhotometricPoint]>,
    meta: BTreeMap<String, serde_json::Value>,
    color: Option<Color>,
}

impl Candidate {
    /// A candidate named "Candidate" with a 1 arcsec uncertainty.
    pub fn new(position: SkyCoord) -> Self {
        Self {
            id: ItemId::next(),
            name: "Candidate".to_string(),
            position,
            uncertainty: Angle::from_arcsec(1.0),
            t0: None,
            observations: Arc::from([]),
            meta: BTreeMap::new(),
            color: None,
        }
    }

    /// Replaces the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the positional uncertainty.
    pub fn with_uncertainty(mut self, uncertainty: Angle) -> Self {
        self.uncertainty = uncertainty;
        self
    }

    /// Sets the reference time.
    pub fn with_t0(mut self, t0: DateTime<Utc>) -> Self {
        self.t0 = Some(t0);
        self
    }

    /// Sets the observations.
    pub fn with_observations(mut self, observations: Vec<PhotometricPoint>) -> Self {
        self.observations = observations.into();
        self
    }

    /// Sets the color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Adds a metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// Sky position.
    pub fn position(&self) -> SkyCoord {
        self.position
    }

    /// Positional uncertainty.
    pub fn uncertainty(&self) -> Angle {
        self.uncertainty
    }

    /// Reference time of the light curve.
    pub fn t0(&self) -> Option<DateTime<Utc>> {
        self.t0
    }

    /// Photometric observations.
    pub fn observations(&self) -> &[PhotometricPoint] {
        &self.observations
    }

    /// Free-form metadata.
    pub fn meta(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.meta
    }

    /// `t0`, or the earliest observation when `t0` is unset.
    pub fn reference_time(&self) -> Option<DateTime<Utc>> {
        self.t0
            .or_else(|| self.observations.iter().map(|o| o.obs_time).min())
    }

    /// Writes the observations as CSV.
    pub fn write_observations(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        if self.observations.is_empty() {
            writer.write_record(
                REQUIRED_OBSERVATION_COLUMNS
                    .iter()
                    .copied()
                    .chain(std::iter::once("limit")),
            )?;
        }
        for point in self.observations.iter() {
            writer.serialize(point)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| crate::error::CelextaError::io(path.as_ref(), e.into_error()))?;
        file::atomic_write(path, &bytes)
    }

    /// Reads observations written by [`write_observations`](Self::write_observations)
    /// or by hand.
    ///
    /// A file lacking one of the [`REQUIRED_OBSERVATION_COLUMNS`] is logged
    /// and yields no observations. Unreadable files and malformed rows are
    /// errors.
    pub fn read_observations(path: impl AsRef<Path>) -> Result<Vec<PhotometricPoint>> {
        let path = path.as_ref();
        let bytes = file::read_bytes(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(bytes.as_slice());

        let headers = reader.headers()?.clone();
        let missing: Vec<&str> = REQUIRED_OBSERVATION_COLUMNS
            .iter()
            .copied()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .collect();
        if !missing.is_empty() {
            tracing::warn!(
                target: targets::PERSIST,
                path = %path.display(),
                ?missing,
                "observation file is missing required columns, ignoring it"
            );
            return Ok(Vec::new());
        }

        let mut points = Vec::new();
        for point in reader.deserialize() {
            points.push(point?);
        }
        Ok(points)
    }

    pub(crate) fn set_meta(&mut self, meta: BTreeMap<String, serde_json::Value>) {
        self.meta = meta;
    }
}

impl CollectionItem for Candidate {
    const KIND: ItemKind = ItemKind::Candidate;

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
        if let Some(position) = update.position {
            self.position = position;
            applied = true;
        }
        if let Some(uncertainty) = update.uncertainty {
            self.uncertainty = uncertainty;
            applied = true;
        }
        if let Some(t0) = update.t0 {
            self.t0 = Some(t0);
            applied = true;
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;

    fn point(mag: f64, minutes: i64, limit: bool) -> PhotometricPoint {
        PhotometricPoint {
            mag,
            unc: 0.1,
            phot_filter: "r".to_string(),
            obs_time: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::minutes(minutes),
            obs_duration_s: 60.0,
            limit,
        }
    }

    #[test]
    fn test_defaults() {
        let candidate = Candidate::new(SkyCoord::from_deg(150.0, 2.0));
        assert_eq!(candidate.name(), "Candidate");
        assert_eq!(candidate.uncertainty(), Angle::from_arcsec(1.0));
        assert!(candidate.observations().is_empty());
        assert!(candidate.reference_time().is_none());
    }

    #[test]
    fn test_observations_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.csv");
        let candidate = Candidate::new(SkyCoord::from_deg(150.0, 2.0))
            .with_observations(vec![point(19.2, 10, false), point(21.0, 70, true)]);

        candidate.write_observations(&path).unwrap();
        let back = Candidate::read_observations(&path).unwrap();
        assert_eq!(back, candidate.observations());
    }

    #[test]
    fn test_empty_observations_still_have_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.csv");
        Candidate::new(SkyCoord::from_deg(1.0, 1.0))
            .write_observations(&path)
            .unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("mag,unc,phot_filter,obs_time,obs_duration,limit"));
        assert!(Candidate::read_observations(&path).unwrap().is_empty());
    }

    #[test]
    fn test_missing_required_column_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.csv");
        fs::write(&path, "mag,unc,phot_filter,obs_time\n19.0,0.1,r,2025-01-01T00:00:00Z\n").unwrap();
        assert!(Candidate::read_observations(&path).unwrap().is_empty());
    }

    #[test]
    fn test_limit_defaults_to_false() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.csv");
        fs::write(
            &path,
            "mag,unc,phot_filter,obs_time,obs_duration\n19.0,0.1,g,2025-01-01T00:00:00Z,30\n",
        )
        .unwrap();
        let points = Candidate::read_observations(&path).unwrap();
        assert_eq!(points.len(), 1);
        assert!(!points[0].limit);
        assert_eq!(points[0].phot_filter, "g");
    }

    #[test]
    fn test_reference_time_falls_back_to_first_observation() {
        let candidate = Candidate::new(SkyCoord::from_deg(1.0, 1.0))
            .with_observations(vec![point(19.0, 30, false), point(19.5, 5, false)]);
        assert_eq!(candidate.reference_time(), Some(point(0.0, 5, false).obs_time));
        assert_eq!(
            point(0.0, 0, false).mid_time(),
            Some(point(0.0, 0, false).obs_time + chrono::Duration::seconds(30))
        );
    }

    #[test]
    fn test_mid_time_out_of_range() {
        let mut huge = point(19.0, 0, false);
        huge.obs_duration_s = 1e300;
        assert_eq!(huge.mid_time(), None);
        huge.obs_duration_s = -1e300;
        assert_eq!(huge.mid_time(), None);
    }
}
