//! Great-circle geodesy on a spherical Earth.

use serde::{Deserialize, Serialize};

use crate::error::{AstralError, AstralResult};

/// IUGG mean Earth radius in meters.
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// A point in decimal degrees (WGS84 axis order: latitude, longitude).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Check coordinate ranges. `field` names the offending field in errors.
    pub fn validate(&self, field: &'static str) -> AstralResult<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(AstralError::InvalidClaim {
                field,
                reason: format!("latitude {} outside [-90, 90]", self.lat),
            });
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(AstralError::InvalidClaim {
                field,
                reason: format!("longitude {} outside [-180, 180]", self.lon),
            });
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate("point").is_ok()
    }
}

/// Haversine distance between two points in meters.
pub fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points
    let c = 2.0 * h.min(1.0).sqrt().asin();
    EARTH_MEAN_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPIRE_STATE: GeoPoint = GeoPoint {
        lat: 40.7484,
        lon: -73.9857,
    };

    #[test]
    fn identical_points_are_zero_apart() {
        assert_eq!(haversine_m(&EMPIRE_STATE, &EMPIRE_STATE), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let other = GeoPoint::new(51.5007, -0.1246);
        let ab = haversine_m(&EMPIRE_STATE, &other);
        let ba = haversine_m(&other, &EMPIRE_STATE);
        assert!((ab - ba).abs() < 1e-6);
        // New York to London, roughly 5570 km
        assert!((ab / 1000.0 - 5570.0).abs() < 15.0);
    }

    #[test]
    fn meridian_offset_matches_arc_length() {
        let meters_per_degree = EARTH_MEAN_RADIUS_M * std::f64::consts::PI / 180.0;
        let north = GeoPoint::new(EMPIRE_STATE.lat + 5000.0 / meters_per_degree, EMPIRE_STATE.lon);
        let d = haversine_m(&EMPIRE_STATE, &north);
        assert!((d - 5000.0).abs() < 0.01);
    }

    #[test]
    fn antipodes_do_not_produce_nan() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 180.0);
        let d = haversine_m(&a, &b);
        assert!(d.is_finite());
        assert!((d - EARTH_MEAN_RADIUS_M * std::f64::consts::PI).abs() < 1.0);
    }

    #[test]
    fn validation_rejects_out_of_range() {
        assert!(EMPIRE_STATE.is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -180.5).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());

        let err = GeoPoint::new(0.0, 200.0).validate("location").unwrap_err();
        assert!(err.to_string().contains("location"));
    }
}
