//! Light-curve plot of every candidate in a tab.

use std::sync::Arc;

use celexta_core::logging::targets;

use crate::items::{Candidate, CollectionItem, Color, ItemId};

use super::{HandleMap, PresentationAdapter, VisualHandle};

/// One plotted observation.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvePoint {
    /// Mid-exposure time, seconds after the candidate's reference time.
    pub dt_s: f64,
    /// Magnitude, or limiting magnitude.
    pub mag: f64,
    /// Magnitude uncertainty.
    pub unc: f64,
    /// Filter name.
    pub filter: String,
    /// Non-detection; drawn as an upper limit.
    pub limit: bool,
}

/// The markers of one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct LightCurve {
    /// Observations in file order.
    pub points: Vec<CurvePoint>,
    /// Marker color.
    pub color: Option<Color>,
    visible: bool,
}

impl LightCurve {
    fn from_candidate(candidate: &Candidate) -> Self {
        let points = match candidate.reference_time() {
            Some(reference) => candidate
                .observations()
                .iter()
                .filter_map(|obs| {
                    let Some(mid) = obs.mid_time() else {
                        tracing::warn!(
                            target: targets::VIEW,
                            candidate = candidate.name(),
                            obs_time = %obs.obs_time,
                            duration_s = obs.obs_duration_s,
                            "observation time out of range, skipping point"
                        );
                        return None;
                    };
                    Some(CurvePoint {
                        dt_s: (mid - reference).num_milliseconds() as f64 / 1000.0,
                        mag: obs.mag,
                        unc: obs.unc,
                        filter: obs.phot_filter.clone(),
                        limit: obs.limit,
                    })
                })
                .collect(),
            None => Vec::new(),
        };
        Self {
            points,
            color: candidate.color(),
            visible: true,
        }
    }

    /// Detections only.
    pub fn detections(&self) -> impl Iterator<Item = &CurvePoint> {
        self.points.iter().filter(|p| !p.limit)
    }

    /// Upper limits only.
    pub fn limits(&self) -> impl Iterator<Item = &CurvePoint> {
        self.points.iter().filter(|p| p.limit)
    }
}

impl VisualHandle for LightCurve {
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}

/// Scatter plot of candidate observations over time.
///
/// Mirrors the whole candidate collection. The plot as a whole can be
/// hidden without touching the curves.
#[derive(Debug)]
pub struct LightCurveView {
    curves: HandleMap<LightCurve>,
    visible: bool,
}

impl Default for LightCurveView {
    fn default() -> Self {
        Self::new()
    }
}

impl LightCurveView {
    /// An empty, visible plot.
    pub fn new() -> Self {
        Self {
            curves: HandleMap::new(),
            visible: true,
        }
    }

    /// The curve of candidate `id`.
    pub fn curve(&self, id: ItemId) -> Option<&LightCurve> {
        self.curves.get(id)
    }

    /// Number of curves.
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    /// Returns true if no candidate is plotted.
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Whether the plot is shown.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Shows or hides the plot.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Flips the plot's visibility and returns the new state.
    pub fn toggle(&mut self) -> bool {
        self.visible = !self.visible;
        tracing::debug!(target: targets::VIEW, visible = self.visible, "light curve toggled");
        self.visible
    }
}

impl PresentationAdapter<Candidate> for LightCurveView {
    fn on_inserted(&mut self, item: &Arc<Candidate>, _position: usize) {
        self.curves
            .insert_with(item.id(), || Some(LightCurve::from_candidate(item)));
    }

    fn on_removed(&mut self, item: &Arc<Candidate>) {
        self.curves.remove(item.id());
    }

    fn on_updated(&mut self, item: &Arc<Candidate>) {
        self.curves
            .recreate_with(item.id(), || Some(LightCurve::from_candidate(item)));
    }

    fn on_visibility_changed(&mut self, item: &Arc<Candidate>, visible: bool) {
        self.curves.set_visible(item.id(), visible);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astro::SkyCoord;
    use crate::items::{ItemUpdate, PhotometricPoint};
    use crate::model::ItemCollection;
    use crate::view::attach;
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;

    fn point(minutes: i64, limit: bool) -> PhotometricPoint {
        PhotometricPoint {
            mag: 20.0,
            unc: 0.1,
            phot_filter: "r".to_string(),
            obs_time: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::minutes(minutes),
            obs_duration_s: 60.0,
            limit,
        }
    }

    #[test]
    fn test_curve_times_are_relative_to_t0() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let candidate = Candidate::new(SkyCoord::from_deg(10.0, 10.0))
            .with_t0(t0)
            .with_observations(vec![point(10, false), point(20, true)]);
        let curve = LightCurve::from_candidate(&candidate);
        assert_eq!(curve.points[0].dt_s, 630.0);
        assert_eq!(curve.detections().count(), 1);
        assert_eq!(curve.limits().next().map(|p| p.dt_s), Some(1230.0));
    }

    #[test]
    fn test_out_of_range_point_is_skipped() {
        let mut broken = point(5, false);
        broken.obs_duration_s = 1e300;
        let candidate = Candidate::new(SkyCoord::from_deg(10.0, 10.0))
            .with_t0(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
            .with_observations(vec![point(0, false), broken, point(10, true)]);
        let curve = LightCurve::from_candidate(&candidate);
        assert_eq!(curve.points.len(), 2);
        assert_eq!(curve.points[1].dt_s, 630.0);
    }

    #[test]
    fn test_view_mirrors_candidates() {
        let candidates = ItemCollection::<Candidate>::new();
        let view = Arc::new(Mutex::new(LightCurveView::new()));
        attach(&view, &candidates);

        let candidate = Candidate::new(SkyCoord::from_deg(10.0, 10.0))
            .with_observations(vec![point(0, false)]);
        let id = candidate.id();
        candidates.add(candidate);
        assert_eq!(view.lock().curve(id).map(|c| c.points[0].dt_s), Some(30.0));

        candidates.set_visibility(id, false);
        candidates.update(id, &ItemUpdate::new().t0(Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 0).unwrap()));
        {
            let view = view.lock();
            let curve = view.curve(id).unwrap();
            assert!(!curve.is_visible());
            assert_eq!(curve.points[0].dt_s, 90.0);
        }

        candidates.remove(id);
        assert!(view.lock().is_empty());
    }

    #[test]
    fn test_toggle() {
        let mut view = LightCurveView::new();
        assert!(!view.toggle());
        assert!(view.toggle());
        view.set_visible(false);
        assert!(!view.is_visible());
    }
}
