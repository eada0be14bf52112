//! FFI surface for mobile hosts.
//!
//! The host app owns networking and hands raw optimizer response bodies to
//! these functions. State lives in a process-wide [`TripEngine`]; reads come
//! back as JSON so the host can render without mirroring every type.

use std::sync::{Mutex, PoisonError};

use log::{info, warn};
use once_cell::sync::Lazy;

use crate::catalog::PlaceCatalog;
use crate::config::TripConfig;
use crate::error::{Result, TripError};
use crate::map::MapRenderer;
use crate::protocol::{decode_envelope, OptimizeRequest, OptimizeResponse, PlacesResponse, ReoptimizeRequest, ReoptimizeResponse};
use crate::reconcile::{initial_update, reoptimization_update};
use crate::status::{JourneySummary, TripStatusPanel};
use crate::store::{TripEvent, TripStatus, TripStore};
use crate::GpsPoint;

// ============================================================================
// Global Singleton
// ============================================================================

#[derive(Default)]
struct TripEngine {
    catalog: PlaceCatalog,
    store: TripStore,
    renderer: MapRenderer,
}

static ENGINE: Lazy<Mutex<TripEngine>> = Lazy::new(|| Mutex::new(TripEngine::default()));

fn with_engine<F, R>(f: F) -> R
where
    F: FnOnce(&mut TripEngine) -> R,
{
    let mut engine = ENGINE.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut engine)
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        warn!("[TripEngine] Serialization failed: {}", e);
        "{}".to_string()
    })
}

fn parse_config(config_json: &str) -> Result<TripConfig> {
    let config: TripConfig = serde_json::from_str(config_json)
        .map_err(|e| TripError::invalid_config(format!("invalid preferences JSON: {}", e)))?;
    config.validate()?;
    Ok(config)
}

// ============================================================================
// FFI Exports
// ============================================================================

/// Initialize logging (call once at app startup).
#[uniffi::export]
pub fn trip_init() {
    crate::init_logging();
    info!("[TripEngine] Initialized");
}

/// Load the catalog from a `GET places` response body. Returns the place count.
#[uniffi::export]
pub fn trip_load_catalog_json(body: String) -> std::result::Result<u32, TripError> {
    let response: PlacesResponse = decode_envelope(&body)?;
    let catalog = PlaceCatalog::load(response.places)?;
    let count = catalog.len() as u32;
    with_engine(|e| e.catalog = catalog);
    info!("[TripEngine] Catalog loaded: {} places", count);
    Ok(count)
}

/// Build the `POST optimize` body from preferences JSON.
#[uniffi::export]
pub fn trip_optimize_request_json(config_json: String) -> std::result::Result<String, TripError> {
    let config = parse_config(&config_json)?;
    with_engine(|e| config.validate_against(&e.catalog))?;
    Ok(to_json(&OptimizeRequest::from(&config)))
}

/// Build the `POST next-and-reoptimize` body from preferences JSON.
#[uniffi::export]
pub fn trip_reoptimize_request_json(config_json: String) -> std::result::Result<String, TripError> {
    let config = parse_config(&config_json)?;
    Ok(to_json(&ReoptimizeRequest::from(&config)))
}

// The engine lock covers a single call only. Hosts must not have two trip
// transitions in flight: read `trip_get_revision` before posting
// `next-and-reoptimize` and pass it back when applying the response.

/// Initialize the trip from a `POST optimize` response body.
#[uniffi::export]
pub fn trip_apply_optimize_json(body: String) -> std::result::Result<TripEvent, TripError> {
    let response: OptimizeResponse = decode_envelope(&body)?;
    let update = initial_update(response)?;
    with_engine(|e| e.store.initialize(update))
}

/// Apply a `POST next-and-reoptimize` response body.
///
/// `expected_revision` is the [`trip_get_revision`] value read before the
/// request was sent. Fails with [`TripError::StaleRevision`] when another
/// transition landed in between.
#[uniffi::export]
pub fn trip_apply_reoptimize_json(body: String, expected_revision: u64) -> std::result::Result<TripEvent, TripError> {
    let response: ReoptimizeResponse = decode_envelope(&body)?;
    let update = reoptimization_update(response)?;
    with_engine(|e| e.store.apply_reoptimization_at(update, expected_revision))
}

/// Summarize the journey and reset the store. Call after `end-journey`
/// has been acknowledged.
#[uniffi::export]
pub fn trip_end_json() -> String {
    with_engine(|e| {
        let summary = JourneySummary::build(&e.store.snapshot(), &e.catalog);
        e.store.reset();
        to_json(&summary)
    })
}

/// Discard trip state. Returns false when there was nothing to discard.
#[uniffi::export]
pub fn trip_reset() -> bool {
    with_engine(|e| e.store.reset().is_some())
}

#[uniffi::export]
pub fn trip_get_status() -> TripStatus {
    with_engine(|e| e.store.status())
}

/// Store revision; bumps on every committed transition.
#[uniffi::export]
pub fn trip_get_revision() -> u64 {
    with_engine(|e| e.store.snapshot().revision())
}

#[uniffi::export]
pub fn trip_can_advance() -> bool {
    with_engine(|e| e.store.snapshot().can_advance())
}

/// Visited / current / remaining stops and trails as JSON.
#[uniffi::export]
pub fn trip_get_segmentation_json() -> String {
    with_engine(|e| to_json(&e.store.snapshot().segment(&e.catalog)))
}

/// Current / next destination panel as JSON.
#[uniffi::export]
pub fn trip_get_status_panel_json() -> String {
    with_engine(|e| to_json(&TripStatusPanel::build(&e.store.snapshot(), &e.catalog)))
}

/// Markers, polylines and viewport as JSON.
#[uniffi::export]
pub fn trip_get_map_scene_json() -> String {
    with_engine(|e| {
        let segmentation = e.store.snapshot().segment(&e.catalog);
        to_json(&e.renderer.render(&segmentation, &e.catalog))
    })
}

/// Device location used as the map's last-resort centre.
#[uniffi::export]
pub fn trip_set_user_location(location: Option<GpsPoint>) {
    with_engine(|e| e.renderer.set_user_location(location));
}
