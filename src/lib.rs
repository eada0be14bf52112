//! # Trip Tracker
//!
//! Client-side runtime for a guided multi-stop trip.
//!
//! This library provides:
//! - A place catalog keyed by stable 1-based place ids
//! - Pure segmentation of a route into visited / current / scheduled stops
//!   plus the three connecting trails used for map rendering
//! - A trip progress store that reconciles server re-optimizations atomically
//! - A map rendering adapter producing markers, polylines and a viewport
//!
//! ## Features
//!
//! - **`http`** - Enable the reqwest client for the optimizer API (default)
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use trip_tracker::{Place, PlaceCatalog, segment_route};
//!
//! let catalog = PlaceCatalog::load(vec![
//!     Place::new(1, "Candi Borobudur", -7.6079, 110.2038, "Budaya"),
//!     Place::new(2, "Candi Prambanan", -7.7520, 110.4914, "Budaya"),
//!     Place::new(3, "Kraton Yogyakarta", -7.8050, 110.3644, "Budaya"),
//! ]).unwrap();
//!
//! let segmentation = segment_route(&[3, 1, 2], 0, &catalog);
//! assert_eq!(segmentation.visited_ids(), vec![3]);
//! assert_eq!(segmentation.remaining_ids(), vec![1, 2]);
//! assert_eq!(segmentation.bridge_segment.len(), 2);
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{OptionExt, Result, TripError};

pub mod geo_utils;

pub mod catalog;
pub use catalog::PlaceCatalog;

pub mod segmentation;
pub use segmentation::{segment_route, RouteSegmentation, RouteStop};

pub mod config;
pub use config::{Algorithm, ClientConfig, CrossoverMethod, StartLocation, TripConfig};

pub mod protocol;
pub use protocol::{
    sanitize_non_finite, BudgetSummary, DistanceSummary, OptimizeResponse, ReoptimizePayload,
    ReoptimizeResponse, ScheduleEntry, ScheduleKind,
};

pub mod store;
pub use store::{OptimizationPayload, TripEvent, TripListener, TripProgress, TripStatus, TripStore, TripUpdate};

pub mod reconcile;
pub use reconcile::{initial_update, reoptimization_update};

pub mod status;
pub use status::{JourneySummary, StopStatus, TripStatusPanel};

pub mod map;
pub use map::{
    MapRenderer, MapScene, MapStyle, Marker, MarkerStyle, Polyline, TrailKind, Viewport, ViewportTransition,
};

pub mod session;
pub use session::{TripApi, TripSession};

// HTTP module for the optimizer API
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::TripClient;

#[cfg(feature = "ffi")]
mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("TripTrackerRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// Stable 1-based place identifier. Only [`PlaceCatalog`] converts it to an index.
pub type PlaceId = u32;

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use trip_tracker::GpsPoint;
/// let point = GpsPoint::new(-7.7929, 110.3668); // Malioboro
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box over a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(geo_utils::compute_bounds(points))
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// A point of interest in the trip catalog.
///
/// Immutable for the session. The optional attributes are carried through
/// from the catalog endpoint when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// 1-based id, stable across the session
    pub id: PlaceId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrance_fee: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_duration_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<f64>,
}

impl Place {
    /// Create a place with only the required attributes.
    pub fn new(id: PlaceId, name: &str, latitude: f64, longitude: f64, category: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            latitude,
            longitude,
            category: category.to_string(),
            open_time: None,
            close_time: None,
            entrance_fee: None,
            visit_duration_min: None,
            popularity: None,
        }
    }

    /// Map position of this place.
    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

// ============================================================================
// Tests
// ============================================================================
