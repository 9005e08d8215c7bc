//! # Geographic helpers
//!
//! Great-circle distance between two coordinates and the map-search URL
//! encoded into invoice QR codes.

use serde::{Deserialize, Serialize};

use crate::error::InvalidOrderError;

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Build a point, rejecting coordinates outside `[-90, 90] x [-180, 180]`.
    pub fn new(lat: f64, lng: f64) -> Result<Self, InvalidOrderError> {
        let point = Self { lat, lng };
        if point.is_valid() {
            Ok(point)
        } else {
            Err(InvalidOrderError::CoordinateOutOfRange { lat, lng })
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Map-search URL for this point.
    ///
    /// The format is consumed by map applications scanning the QR code, so
    /// it must stay byte-identical: `query={lat},{lng}` with each coordinate
    /// in shortest round-trip decimal form.
    pub fn maps_url(&self) -> String {
        format!(
            "https://www.google.com/maps/search/?api=1&query={},{}",
            format_coordinate(self.lat),
            format_coordinate(self.lng)
        )
    }
}

/// Haversine great-circle distance in meters.
///
/// Total and symmetric; `distance(a, a) == 0`.
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1] for antipodal points.
    let h = h.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Shortest round-trip decimal, written the way existing QR codes were:
/// integral values keep a trailing `.0` and tiny magnitudes use a
/// two-digit exponent (`1e-05`).
fn format_coordinate(v: f64) -> String {
    if v != 0.0 && v.abs() < 1e-4 {
        let sci = format!("{:e}", v);
        return match sci.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(d) => ('-', d),
                    None => ('+', exp),
                };
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => sci,
        };
    }

    let s = v.to_string();
    if s.contains('.') || s.contains("inf") || s.contains("NaN") {
        s
    } else {
        format!("{s}.0")
    }
}
