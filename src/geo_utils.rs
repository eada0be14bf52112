//! # Geographic Utilities
//!
//! Small geographic helpers used by the map adapter to annotate trails
//! and fit the viewport to a route.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`polyline_length`] | Total length of a trail in meters |
//! | [`compute_bounds`] | Bounding box of a set of points |
//!
//! ## Example
//!
//! ```rust
//! use trip_tracker::{GpsPoint, geo_utils};
//!
//! let trail = vec![
//!     GpsPoint::new(-7.6079, 110.2038), // Borobudur
//!     GpsPoint::new(-7.7929, 110.3668), // Malioboro
//!     GpsPoint::new(-7.7520, 110.4914), // Prambanan
//! ];
//!
//! let length = geo_utils::polyline_length(&trail);
//! println!("Trail length: {:.1}km", length / 1000.0);
//! ```
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees).

use geo::{Distance, Haversine, Point};

use crate::{Bounds, GpsPoint};

/// Calculate the great-circle distance between two GPS points using the Haversine formula.
///
/// Returns the distance in meters along the Earth's surface.
///
/// # Example
///
/// ```rust
/// use trip_tracker::{GpsPoint, geo_utils};
///
/// let borobudur = GpsPoint::new(-7.6079, 110.2038);
/// let prambanan = GpsPoint::new(-7.7520, 110.4914);
///
/// let distance = geo_utils::haversine_distance(&borobudur, &prambanan);
/// assert!((distance - 35_400.0).abs() < 1500.0); // ~35 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Calculate the total length of a polyline in meters.
///
/// Sums the haversine distance between consecutive points. Empty or single-point
/// trails return 0.0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Compute the bounding box of a set of points.
///
/// For empty input, returns a bounds with MIN/MAX values; use
/// [`Bounds::from_points`] when the input may be empty.
///
/// # Example
///
/// ```rust
/// use trip_tracker::{GpsPoint, geo_utils};
///
/// let points = vec![
///     GpsPoint::new(-7.8100, 110.3594),
///     GpsPoint::new(-7.6079, 110.2038),
///     GpsPoint::new(-7.7520, 110.4914),
/// ];
///
/// let bounds = geo_utils::compute_bounds(&points);
/// assert_eq!(bounds.min_lat, -7.8100);
/// assert_eq!(bounds.max_lat, -7.6079);
/// assert_eq!(bounds.min_lng, 110.2038);
/// assert_eq!(bounds.max_lng, 110.4914);
/// ```
pub fn compute_bounds(points: &[GpsPoint]) -> Bounds {
    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for p in points {
        min_lat = min_lat.min(p.latitude);
        max_lat = max_lat.max(p.latitude);
        min_lng = min_lng.min(p.longitude);
        max_lng = max_lng.max(p.longitude);
    }

    Bounds { min_lat, max_lat, min_lng, max_lng }
}
