//! # Geo Points and Haversine Distance
//!
//! Coordinates captured at voucher validation time. The distance between
//! the artisan's and the supplier's reported positions is a fraud signal
//! recorded on every validation audit row — it never feeds money
//! arithmetic, so `f64` is fine here.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (IUGG).
const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// A WGS84 coordinate with optional reported accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, [-90, 90].
    pub lat: f64,
    /// Longitude in degrees, [-180, 180].
    pub lon: f64,
    /// Device-reported accuracy radius in meters, if available.
    pub accuracy_meters: Option<f64>,
}

impl GeoPoint {
    /// A point with no accuracy estimate.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            accuracy_meters: None,
        }
    }

    /// Whether the coordinates are within valid WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Great-circle distance between two points in meters (haversine).
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        let p = GeoPoint::new(4.0511, 9.7679); // Douala
        assert!(haversine_meters(p, p) < 1e-6);
    }

    #[test]
    fn test_known_distance_douala_yaounde() {
        let douala = GeoPoint::new(4.0511, 9.7679);
        let yaounde = GeoPoint::new(3.8480, 11.5021);
        let d = haversine_meters(douala, yaounde);
        // Roughly 194 km as the crow flies.
        assert!((190_000.0..200_000.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_symmetry() {
        let a = GeoPoint::new(4.0511, 9.7679);
        let b = GeoPoint::new(4.0600, 9.7800);
        let ab = haversine_meters(a, b);
        let ba = haversine_meters(b, a);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn test_short_distance_plausible() {
        // ~0.01 degrees latitude is ~1.1 km.
        let a = GeoPoint::new(4.0500, 9.7679);
        let b = GeoPoint::new(4.0600, 9.7679);
        let d = haversine_meters(a, b);
        assert!((1_000.0..1_250.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_validity_bounds() {
        assert!(GeoPoint::new(4.0, 9.7).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -181.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_serde_roundtrip() {
        let p = GeoPoint {
            lat: 4.0511,
            lon: 9.7679,
            accuracy_meters: Some(12.5),
        };
        let json = serde_json::to_string(&p).unwrap();
        let parsed: GeoPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, p);
    }
}
