//! Route segmentation.
//!
//! Splits a route into the stops already visited (including the current
//! one), the current stop and the stops still scheduled, and derives the
//! three trails drawn on the map:
//!
//! - visited trail: every visited stop in order
//! - bridge: current stop to the first scheduled stop
//! - remaining trail: every scheduled stop in order
//!
//! [`segment_route`] is pure. It is re-run after every store transition
//! instead of caching the split, so a re-optimization can never leave a
//! stale partition behind.

use serde::Serialize;

use crate::catalog::PlaceCatalog;
use crate::{GpsPoint, Place, PlaceId};

/// One stop of the route together with its catalog entry.
///
/// `place` is `None` when the id does not resolve (catalog still loading or
/// an unknown id); such stops keep their slot so numbering stays continuous,
/// but contribute no trail vertex.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStop {
    /// 0-based position in the route
    pub index: usize,
    pub place_id: PlaceId,
    pub place: Option<Place>,
}

impl RouteStop {
    fn new(index: usize, place_id: PlaceId, catalog: &PlaceCatalog) -> Self {
        Self {
            index,
            place_id,
            place: catalog.get(place_id).cloned(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.place.is_some()
    }

    pub fn position(&self) -> Option<GpsPoint> {
        self.place.as_ref().map(Place::position)
    }

    pub fn name(&self) -> Option<&str> {
        self.place.as_ref().map(|p| p.name.as_str())
    }
}

/// Visited / current / scheduled partition of a route plus its three trails.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteSegmentation {
    /// `route[0..=cursor]`, including the current stop
    pub visited_places: Vec<RouteStop>,
    /// `route[cursor]`, `None` once the cursor is past the end
    pub current_place: Option<RouteStop>,
    /// `route[cursor + 1..]`
    pub remaining_places: Vec<RouteStop>,
    pub visited_trail: Vec<GpsPoint>,
    /// Two vertices when both endpoints exist and resolve, otherwise empty
    pub bridge_segment: Vec<GpsPoint>,
    pub remaining_trail: Vec<GpsPoint>,
}

impl RouteSegmentation {
    pub fn visited_ids(&self) -> Vec<PlaceId> {
        self.visited_places.iter().map(|s| s.place_id).collect()
    }

    pub fn remaining_ids(&self) -> Vec<PlaceId> {
        self.remaining_places.iter().map(|s| s.place_id).collect()
    }

    /// Most recent visited stop; equal to the current stop while one exists.
    pub fn last_visited(&self) -> Option<&RouteStop> {
        self.visited_places.last()
    }

    /// The stop an "advance" would move to.
    pub fn next_place(&self) -> Option<&RouteStop> {
        self.remaining_places.first()
    }

    /// Whether there is a next destination to advance to.
    pub fn can_advance(&self) -> bool {
        self.current_place.is_some() && !self.remaining_places.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.visited_places.is_empty() && self.remaining_places.is_empty()
    }

    pub fn route_len(&self) -> usize {
        self.visited_places.len() + self.remaining_places.len()
    }
}

/// Segment `route` at `cursor`.
///
/// A cursor at or beyond the end of the route marks the trip complete:
/// every stop is visited, there is no current stop and the bridge is empty.
/// An empty route yields an empty segmentation.
///
/// # Example
/// ```
/// use trip_tracker::{Place, PlaceCatalog, segment_route};
///
/// let catalog = PlaceCatalog::load(vec![
///     Place::new(1, "Taman Sari", -7.8100, 110.3594, "Budaya"),
///     Place::new(2, "Malioboro", -7.7929, 110.3668, "Belanja"),
/// ]).unwrap();
///
/// let done = segment_route(&[1, 2], 2, &catalog);
/// assert!(done.current_place.is_none());
/// assert!(done.bridge_segment.is_empty());
/// assert_eq!(done.visited_trail.len(), 2);
/// ```
pub fn segment_route(route: &[PlaceId], cursor: usize, catalog: &PlaceCatalog) -> RouteSegmentation {
    if route.is_empty() {
        return RouteSegmentation::default();
    }

    let split = cursor.saturating_add(1).min(route.len());

    let stops: Vec<RouteStop> = route
        .iter()
        .enumerate()
        .map(|(index, &id)| RouteStop::new(index, id, catalog))
        .collect();

    let visited_places = stops[..split].to_vec();
    let remaining_places = stops[split..].to_vec();
    let current_place = stops.get(cursor).cloned();

    let visited_trail = trail(&visited_places);
    let remaining_trail = trail(&remaining_places);

    let bridge_segment = match (
        current_place.as_ref().and_then(RouteStop::position),
        remaining_places.first().and_then(RouteStop::position),
    ) {
        (Some(from), Some(to)) => vec![from, to],
        _ => Vec::new(),
    };

    RouteSegmentation {
        visited_places,
        current_place,
        remaining_places,
        visited_trail,
        bridge_segment,
        remaining_trail,
    }
}

fn trail(stops: &[RouteStop]) -> Vec<GpsPoint> {
    stops.iter().filter_map(RouteStop::position).collect()
}
