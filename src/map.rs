//! # Map Rendering Adapter
//!
//! Turns a [`RouteSegmentation`] into renderer-agnostic primitives: markers,
//! the three trail polylines and a viewport.
//!
//! ## Markers
//! - visited stops get [`MarkerStyle::Past`], except the most recent visited
//!   stop which gets [`MarkerStyle::Current`]
//! - remaining stops get [`MarkerStyle::Scheduled`]
//! - ordinals run continuously over the whole route, 1-based
//!
//! ## Polylines
//! Always three, in draw order: visited trail, bridge, remaining trail. Each
//! has its own colour and weight so "done", "in transit" and "planned" stay
//! distinguishable.
//!
//! ## Viewport
//! The renderer remembers its centre. It flies to the most recent visited
//! stop when that changes, and keeps the previous centre when the stop
//! cannot be resolved.

use serde::Serialize;

use crate::catalog::PlaceCatalog;
use crate::geo_utils::polyline_length;
use crate::segmentation::{RouteSegmentation, RouteStop};
use crate::{Bounds, GpsPoint, Place, PlaceId};

// ============================================================================
// Style
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStyle {
    Past,
    Current,
    Scheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailKind {
    Visited,
    Bridge,
    Remaining,
}

/// Visual configuration of the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapStyle {
    pub past_icon: String,
    pub current_icon: String,
    pub scheduled_icon: String,
    pub visited_color: String,
    pub bridge_color: String,
    pub remaining_color: String,
    pub visited_weight: f64,
    pub bridge_weight: f64,
    pub remaining_weight: f64,
    /// Zoom used before any centre is known
    pub initial_zoom: u8,
    /// Zoom used when flying to a stop
    pub focus_zoom: u8,
    pub fly_duration_ms: u64,
}

impl Default for MapStyle {
    fn default() -> Self {
        Self {
            past_icon: "grey".to_string(),
            current_icon: "blue".to_string(),
            scheduled_icon: "orange".to_string(),
            visited_color: "#88a".to_string(),
            bridge_color: "#155dfc".to_string(),
            remaining_color: "#51a2ff".to_string(),
            visited_weight: 3.0,
            bridge_weight: 5.0,
            remaining_weight: 4.0,
            initial_zoom: 4,
            focus_zoom: 8,
            fly_duration_ms: 1000,
        }
    }
}

impl MapStyle {
    pub fn icon(&self, style: MarkerStyle) -> &str {
        match style {
            MarkerStyle::Past => &self.past_icon,
            MarkerStyle::Current => &self.current_icon,
            MarkerStyle::Scheduled => &self.scheduled_icon,
        }
    }

    fn stroke(&self, kind: TrailKind) -> (&str, f64) {
        match kind {
            TrailKind::Visited => (&self.visited_color, self.visited_weight),
            TrailKind::Bridge => (&self.bridge_color, self.bridge_weight),
            TrailKind::Remaining => (&self.remaining_color, self.remaining_weight),
        }
    }
}

// ============================================================================
// Scene primitives
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub place_id: PlaceId,
    pub position: GpsPoint,
    pub style: MarkerStyle,
    pub icon: String,
    /// 1-based position in the whole route
    pub ordinal: usize,
    /// Popup heading, "Destination N"
    pub label: String,
    /// Place name
    pub title: String,
    pub subtitle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polyline {
    pub kind: TrailKind,
    pub points: Vec<GpsPoint>,
    pub color: String,
    pub weight: f64,
    pub length_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewportTransition {
    /// No movement, or first placement
    Instant,
    /// Animated pan/zoom to the new centre
    Fly { duration_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    /// `None` until a centre could be determined
    pub center: Option<GpsPoint>,
    pub zoom: u8,
    pub transition: ViewportTransition,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapScene {
    pub markers: Vec<Marker>,
    /// Visited trail, bridge, remaining trail
    pub polylines: Vec<Polyline>,
    pub viewport: Viewport,
    /// Bounds over every marker, for fit-to-route
    pub bounds: Option<Bounds>,
}

impl MapScene {
    pub fn polyline(&self, kind: TrailKind) -> Option<&Polyline> {
        self.polylines.iter().find(|p| p.kind == kind)
    }

    pub fn marker(&self, place_id: PlaceId) -> Option<&Marker> {
        self.markers.iter().find(|m| m.place_id == place_id)
    }
}

// ============================================================================
// Renderer
// ============================================================================

/// Stateful renderer. Only the viewport carries state between frames.
#[derive(Debug, Clone, Default)]
pub struct MapRenderer {
    style: MapStyle,
    center: Option<GpsPoint>,
    focus: Option<PlaceId>,
    user_location: Option<GpsPoint>,
}

impl MapRenderer {
    pub fn new(style: MapStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    pub fn style(&self) -> &MapStyle {
        &self.style
    }

    /// Host-supplied device location, used as a centre when nothing else is
    /// available. Invalid coordinates are ignored.
    pub fn set_user_location(&mut self, location: Option<GpsPoint>) {
        self.user_location = location.filter(GpsPoint::is_valid);
    }

    /// Place the viewport is currently focused on.
    pub fn focus(&self) -> Option<PlaceId> {
        self.focus
    }

    /// Build a scene for `segmentation`, updating the remembered centre.
    pub fn render(&mut self, segmentation: &RouteSegmentation, catalog: &PlaceCatalog) -> MapScene {
        let mut markers = Vec::with_capacity(segmentation.route_len());
        let last_visited = segmentation.visited_places.len().checked_sub(1);

        for (idx, stop) in segmentation.visited_places.iter().enumerate() {
            let style = if Some(idx) == last_visited {
                MarkerStyle::Current
            } else {
                MarkerStyle::Past
            };
            markers.extend(self.marker(stop, style, idx + 1));
        }

        let offset = segmentation.visited_places.len();
        for (idx, stop) in segmentation.remaining_places.iter().enumerate() {
            markers.extend(self.marker(stop, MarkerStyle::Scheduled, idx + offset + 1));
        }

        let polylines = vec![
            self.polyline(TrailKind::Visited, &segmentation.visited_trail),
            self.polyline(TrailKind::Bridge, &segmentation.bridge_segment),
            self.polyline(TrailKind::Remaining, &segmentation.remaining_trail),
        ];

        let positions: Vec<GpsPoint> = markers.iter().map(|m| m.position).collect();
        let bounds = Bounds::from_points(&positions);
        let viewport = self.update_viewport(segmentation, catalog);

        MapScene {
            markers,
            polylines,
            viewport,
            bounds,
        }
    }

    fn marker(&self, stop: &RouteStop, style: MarkerStyle, ordinal: usize) -> Option<Marker> {
        let place = stop.place.as_ref()?;
        Some(Marker {
            place_id: stop.place_id,
            position: place.position(),
            style,
            icon: self.style.icon(style).to_string(),
            ordinal,
            label: format!("Destination {}", ordinal),
            title: place.name.clone(),
            subtitle: (style == MarkerStyle::Scheduled).then(|| "Scheduled".to_string()),
        })
    }

    fn polyline(&self, kind: TrailKind, points: &[GpsPoint]) -> Polyline {
        let (color, weight) = self.style.stroke(kind);
        Polyline {
            kind,
            points: points.to_vec(),
            color: color.to_string(),
            weight,
            length_m: polyline_length(points),
        }
    }

    fn update_viewport(&mut self, segmentation: &RouteSegmentation, catalog: &PlaceCatalog) -> Viewport {
        let target = match segmentation.last_visited() {
            // Unresolved focus: hold the previous centre
            Some(stop) => stop
                .position()
                .filter(GpsPoint::is_valid)
                .map(|p| (p, Some(stop.place_id))),
            None => catalog
                .first()
                .map(Place::position)
                .filter(GpsPoint::is_valid)
                .or(self.user_location)
                .map(|p| (p, None)),
        };

        let Some((center, focus)) = target else {
            return self.hold();
        };

        let previous = self.center.replace(center);
        self.focus = focus;

        let transition = match previous {
            Some(prev) if prev == center => ViewportTransition::Instant,
            _ => ViewportTransition::Fly {
                duration_ms: self.style.fly_duration_ms,
            },
        };

        Viewport {
            center: Some(center),
            zoom: self.style.focus_zoom,
            transition,
        }
    }

    fn hold(&self) -> Viewport {
        let zoom = if self.center.is_some() {
            self.style.focus_zoom
        } else {
            self.style.initial_zoom
        };
        Viewport {
            center: self.center,
            zoom,
            transition: ViewportTransition::Instant,
        }
    }
}
