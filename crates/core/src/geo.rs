//! Great-circle distance and bounding boxes for radius search.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres per degree of latitude.
const KM_PER_DEGREE: f64 = 111.32;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Haversine distance between two points, in kilometres.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// A search circle: centre and radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoRadius {
    pub center: GeoPoint,
    pub radius_km: f64,
}

impl GeoRadius {
    pub fn contains(&self, point: GeoPoint) -> bool {
        haversine_km(self.center, point) <= self.radius_km
    }

    /// Axis-aligned box enclosing the circle, used as a storage pre-filter.
    pub fn bounding_box(&self) -> BoundingBox {
        let lat_delta = self.radius_km / KM_PER_DEGREE;
        let min_lat = (self.center.lat - lat_delta).max(-90.0);
        let max_lat = (self.center.lat + lat_delta).min(90.0);

        // Longitude degrees shrink towards the poles; near them the box spans
        // every meridian.
        let cos_lat = self.center.lat.to_radians().cos();
        let (min_lng, max_lng) = if cos_lat <= f64::EPSILON || max_lat >= 90.0 || min_lat <= -90.0 {
            (-180.0, 180.0)
        } else {
            let lng_delta = self.radius_km / (KM_PER_DEGREE * cos_lat);
            if lng_delta >= 180.0 {
                (-180.0, 180.0)
            } else {
                (self.center.lng - lng_delta, self.center.lng + lng_delta)
            }
        };

        BoundingBox {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }
}

/// Latitude/longitude rectangle. `min_lng` may be below -180 or `max_lng`
/// above 180 when the box crosses the antimeridian; [`BoundingBox::contains`]
/// and the SQL adapter both account for that.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Longitude ranges the box covers once wrapped into `[-180, 180]`.
    pub fn lng_ranges(&self) -> Vec<(f64, f64)> {
        if self.min_lng < -180.0 {
            vec![(self.min_lng + 360.0, 180.0), (-180.0, self.max_lng)]
        } else if self.max_lng > 180.0 {
            vec![(self.min_lng, 180.0), (-180.0, self.max_lng - 360.0)]
        } else {
            vec![(self.min_lng, self.max_lng)]
        }
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && self
                .lng_ranges()
                .iter()
                .any(|(lo, hi)| (*lo..=*hi).contains(&point.lng))
    }
}
