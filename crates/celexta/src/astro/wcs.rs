//! Gnomonic (TAN) world coordinate system.

use glam::{DMat2, DVec2};
use serde::{Deserialize, Serialize};

use super::{Angle, SkyCoord};

/// A gnomonic projection between sky coordinates and 0-based pixel
/// coordinates.
///
/// `cd` maps pixel offsets from `crpix` to intermediate world coordinates in
/// degrees, as the FITS `CDi_j` keywords do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WcsParams", into = "WcsParams")]
pub struct Wcs {
    crval: SkyCoord,
    crpix: DVec2,
    cd: DMat2,
}

impl Wcs {
    /// Creates a projection from its reference point, reference pixel and
    /// CD matrix.
    pub fn new(crval: SkyCoord, crpix: DVec2, cd: DMat2) -> Self {
        Self { crval, crpix, cd }
    }

    /// North-up, east-left projection centered on an image of
    /// `shape = (width, height)` pixels, each `scale` wide.
    pub fn simple(center: SkyCoord, scale: Angle, shape: (usize, usize)) -> Self {
        let s = scale.deg();
        Self {
            crval: center,
            crpix: DVec2::new(
                (shape.0 as f64 - 1.0) / 2.0,
                (shape.1 as f64 - 1.0) / 2.0,
            ),
            cd: DMat2::from_cols(DVec2::new(-s, 0.0), DVec2::new(0.0, s)),
        }
    }

    /// Reference sky position.
    pub fn crval(&self) -> SkyCoord {
        self.crval
    }

    /// Reference pixel (0-based).
    pub fn crpix(&self) -> DVec2 {
        self.crpix
    }

    /// CD matrix, degrees per pixel.
    pub fn cd(&self) -> DMat2 {
        self.cd
    }

    /// Mean size of a pixel on the sky.
    pub fn pixel_scale(&self) -> Angle {
        Angle::from_deg(self.cd.determinant().abs().sqrt())
    }

    /// The pixel scales along the two image axes.
    pub fn axis_scales(&self) -> (Angle, Angle) {
        (
            Angle::from_deg(self.cd.x_axis.length()),
            Angle::from_deg(self.cd.y_axis.length()),
        )
    }

    /// The same projection with the sky rotated by `angle` about the
    /// reference pixel.
    pub fn rotated(&self, angle: Angle) -> Self {
        let rotation = DMat2::from_angle(angle.rad());
        Self {
            crval: self.crval,
            crpix: self.crpix,
            cd: self.cd * rotation,
        }
    }

    /// Projects a sky position to pixel coordinates.
    ///
    /// Returns `None` for positions on the far hemisphere, which have no
    /// gnomonic projection, or when the CD matrix is singular.
    pub fn world_to_pixel(&self, coord: &SkyCoord) -> Option<DVec2> {
        let (ra0, dec0) = (self.crval.ra.rad(), self.crval.dec.rad());
        let (ra, dec) = (coord.ra.rad(), coord.dec.rad());
        let (sin_d0, cos_d0) = dec0.sin_cos();
        let (sin_d, cos_d) = dec.sin_cos();
        let (sin_dra, cos_dra) = (ra - ra0).sin_cos();

        let cos_c = sin_d0 * sin_d + cos_d0 * cos_d * cos_dra;
        if cos_c <= 0.0 {
            return None;
        }
        let xi = (cos_d * sin_dra / cos_c).to_degrees();
        let eta = ((cos_d0 * sin_d - sin_d0 * cos_d * cos_dra) / cos_c).to_degrees();

        if self.cd.determinant() == 0.0 {
            return None;
        }
        Some(self.crpix + self.cd.inverse() * DVec2::new(xi, eta))
    }

    /// Deprojects pixel coordinates to a sky position.
    pub fn pixel_to_world(&self, pixel: DVec2) -> SkyCoord {
        let intermediate = self.cd * (pixel - self.crpix);
        let (xi, eta) = (intermediate.x.to_radians(), intermediate.y.to_radians());
        let (ra0, dec0) = (self.crval.ra.rad(), self.crval.dec.rad());
        let (sin_d0, cos_d0) = dec0.sin_cos();

        let denominator = cos_d0 - eta * sin_d0;
        let ra = ra0 + xi.atan2(denominator);
        let dec = (sin_d0 + eta * cos_d0).atan2(xi.hypot(denominator));

        SkyCoord {
            ra: Angle::from_rad(ra).wrap_360(),
            dec: Angle::from_rad(dec),
            frame: self.crval.frame,
        }
    }
}

/// Serialized form, FITS-like keywords.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WcsParams {
    crval: SkyCoord,
    crpix: [f64; 2],
    /// Row-major `[[CD1_1, CD1_2], [CD2_1, CD2_2]]`.
    cd: [[f64; 2]; 2],
}

impl From<WcsParams> for Wcs {
    fn from(params: WcsParams) -> Self {
        let [[cd11, cd12], [cd21, cd22]] = params.cd;
        Self {
            crval: params.crval,
            crpix: DVec2::from_array(params.crpix),
            cd: DMat2::from_cols(DVec2::new(cd11, cd21), DVec2::new(cd12, cd22)),
        }
    }
}

impl From<Wcs> for WcsParams {
    fn from(wcs: Wcs) -> Self {
        Self {
            crval: wcs.crval,
            crpix: wcs.crpix.to_array(),
            cd: [
                [wcs.cd.x_axis.x, wcs.cd.y_axis.x],
                [wcs.cd.x_axis.y, wcs.cd.y_axis.y],
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn wcs() -> Wcs {
        Wcs::simple(
            SkyCoord::from_deg(150.0, 2.2),
            Angle::from_arcsec(0.5),
            (201, 101),
        )
    }

    #[test]
    fn test_reference_point_maps_to_reference_pixel() {
        let wcs = wcs();
        let pixel = wcs.world_to_pixel(&wcs.crval()).unwrap();
        assert_abs_diff_eq!(pixel.x, 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pixel.y, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_east_is_left_north_is_up() {
        let wcs = wcs();
        let center = wcs.crval();
        let east = center.offset_by(Angle::from_deg(90.0), Angle::from_arcsec(5.0));
        let north = center.offset_by(Angle::ZERO, Angle::from_arcsec(5.0));

        let east_px = wcs.world_to_pixel(&east).unwrap();
        let north_px = wcs.world_to_pixel(&north).unwrap();
        assert_abs_diff_eq!(east_px.x, 90.0, epsilon = 1e-6);
        assert_abs_diff_eq!(north_px.y, 60.0, epsilon = 1e-6);
    }

    #[test]
    fn test_pixel_world_round_trip() {
        let wcs = wcs().rotated(Angle::from_deg(30.0));
        for pixel in [DVec2::new(0.0, 0.0), DVec2::new(200.0, 100.0), DVec2::new(17.5, 88.25)] {
            let sky = wcs.pixel_to_world(pixel);
            let back = wcs.world_to_pixel(&sky).unwrap();
            assert_abs_diff_eq!(back.x, pixel.x, epsilon = 1e-6);
            assert_abs_diff_eq!(back.y, pixel.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_far_side_has_no_projection() {
        let wcs = wcs();
        let antipode = SkyCoord::from_deg(330.0, -2.2);
        assert!(wcs.world_to_pixel(&antipode).is_none());
    }

    #[test]
    fn test_pixel_scale_survives_rotation() {
        let wcs = wcs();
        let rotated = wcs.rotated(Angle::from_deg(45.0));
        assert_abs_diff_eq!(wcs.pixel_scale().arcsec(), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(rotated.pixel_scale().arcsec(), 0.5, epsilon = 1e-12);
        let (sx, sy) = rotated.axis_scales();
        assert_abs_diff_eq!(sx.arcsec(), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(sy.arcsec(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_serde_uses_fits_layout() {
        let wcs = wcs();
        let json = serde_json::to_value(&wcs).unwrap();
        assert_eq!(json["crpix"], serde_json::json!([100.0, 50.0]));
        let cd11 = json["cd"][0][0].as_f64().unwrap();
        assert!(cd11 < 0.0);
        let back: Wcs = serde_json::from_value(json).unwrap();
        assert_eq!(back, wcs);
    }
}
