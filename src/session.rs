//! # Trip Session
//!
//! Drives a trip against the optimizer API:
//!
//! 1. `load_catalog` fetches the place catalog
//! 2. `start_trip` clears any server-side journey, optimizes and initializes
//!    the store
//! 3. `advance` moves to the next destination and folds the re-optimized
//!    route into the store
//! 4. `end_trip` closes the journey and returns its summary
//!
//! At most one trip transition is in flight at a time. A second request
//! while one is outstanding fails fast with [`TripError::Busy`]. The flag is
//! released when the request finishes, fails, times out or its future is
//! dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use log::{debug, info, warn};

use crate::catalog::PlaceCatalog;
use crate::config::{ClientConfig, TripConfig};
use crate::error::{Result, TripError};
use crate::map::{MapRenderer, MapScene};
use crate::protocol::{EndJourneyAck, OptimizeRequest, OptimizeResponse, ReoptimizeRequest, ReoptimizeResponse};
use crate::reconcile::{initial_update, reoptimization_update};
use crate::segmentation::RouteSegmentation;
use crate::status::{JourneySummary, TripStatusPanel};
use crate::store::{TripEvent, TripListener, TripProgress, TripStatus, TripStore};
use crate::Place;

/// The optimizer API as seen by the session.
///
/// [`crate::TripClient`] is the HTTP implementation; tests substitute an
/// in-memory one.
pub trait TripApi: Send + Sync {
    /// `GET places`
    fn fetch_places(&self) -> BoxFuture<'_, Result<Vec<Place>>>;

    /// `POST optimize`
    fn optimize(&self, request: OptimizeRequest) -> BoxFuture<'_, Result<OptimizeResponse>>;

    /// `POST next-and-reoptimize`
    fn next_and_reoptimize(&self, request: ReoptimizeRequest) -> BoxFuture<'_, Result<ReoptimizeResponse>>;

    /// `POST end-journey`
    fn end_journey(&self) -> BoxFuture<'_, Result<EndJourneyAck>>;
}

/// Clears the busy flag on drop.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| TripError::Busy)?;
        Ok(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One traveler's trip: catalog, progress store, preferences and the busy
/// flag.
pub struct TripSession<A: TripApi> {
    api: A,
    client_config: ClientConfig,
    catalog: RwLock<Arc<PlaceCatalog>>,
    store: Mutex<TripStore>,
    trip_config: Mutex<TripConfig>,
    busy: AtomicBool,
}

impl<A: TripApi> TripSession<A> {
    pub fn new(api: A, client_config: ClientConfig) -> Self {
        Self {
            api,
            client_config,
            catalog: RwLock::new(Arc::new(PlaceCatalog::unloaded())),
            store: Mutex::new(TripStore::new()),
            trip_config: Mutex::new(TripConfig::default()),
            busy: AtomicBool::new(false),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Fetch the place catalog. On failure the previous catalog is kept.
    pub async fn load_catalog(&self) -> Result<usize> {
        let start = Instant::now();
        let places = bounded(
            "fetch places",
            self.client_config.request_timeout,
            self.api.fetch_places(),
        )
        .await?;

        let catalog = PlaceCatalog::load(places)?;
        let count = catalog.len();
        *self.catalog.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(catalog);

        info!("[TripSession] Catalog loaded: {} places in {:?}", count, start.elapsed());
        Ok(count)
    }

    /// Start a new trip with `config`.
    ///
    /// Any journey the server still holds is ended first; a failure there is
    /// logged and does not stop the optimization.
    pub async fn start_trip(&self, config: TripConfig) -> Result<TripEvent> {
        let _busy = BusyGuard::acquire(&self.busy)?;
        config.validate_against(&self.catalog())?;

        let start = Instant::now();
        if let Err(e) = bounded("end journey", self.client_config.request_timeout, self.api.end_journey()).await {
            warn!("[TripSession] Could not clear previous journey: {}", e);
        }

        let response = bounded(
            "optimize",
            self.client_config.advance_timeout,
            self.api.optimize(OptimizeRequest::from(&config)),
        )
        .await?;

        let update = initial_update(response)?;
        let event = self.lock_store().initialize(update)?;
        *self.lock_trip_config() = config;

        info!(
            "[TripSession] Trip started in {:?}: {:?}",
            start.elapsed(),
            self.progress().route()
        );
        Ok(event)
    }

    /// Advance to the next destination and apply the re-optimized route.
    ///
    /// Fails without a network call with [`TripError::Busy`] while another
    /// transition is outstanding, [`TripError::NoActiveTrip`] before a trip
    /// starts and [`TripError::TripComplete`] at the last stop.
    pub async fn advance(&self) -> Result<TripEvent> {
        let _busy = BusyGuard::acquire(&self.busy)?;

        let progress = self.progress();
        match progress.status() {
            TripStatus::Empty => return Err(TripError::NoActiveTrip),
            TripStatus::Completed => return Err(TripError::TripComplete),
            TripStatus::Active if !progress.can_advance() => return Err(TripError::TripComplete),
            TripStatus::Active => {}
        }

        let request = ReoptimizeRequest::from(&*self.lock_trip_config());
        debug!(
            "[TripSession] Advancing from cursor {} ({:?}, {:?})",
            progress.cursor(),
            request.crossover_method,
            request.algorithm
        );

        let start = Instant::now();
        let response = bounded(
            "next-and-reoptimize",
            self.client_config.advance_timeout,
            self.api.next_and_reoptimize(request),
        )
        .await?;
        let request_elapsed = start.elapsed();

        let update = reoptimization_update(response)?;
        let event = self.lock_store().apply_reoptimization(update)?;

        info!(
            "[TripSession] Advanced: request={:?} total={:?} event={:?}",
            request_elapsed,
            start.elapsed(),
            event
        );
        Ok(event)
    }

    /// End the journey and return its summary. The store is reset only after
    /// the server acknowledges.
    pub async fn end_trip(&self) -> Result<JourneySummary> {
        let _busy = BusyGuard::acquire(&self.busy)?;

        let ack = bounded("end journey", self.client_config.request_timeout, self.api.end_journey()).await?;
        if let Some(message) = &ack.message {
            debug!("[TripSession] Server: {}", message);
        }

        let catalog = self.catalog();
        let mut store = self.lock_store();
        let summary = JourneySummary::build(&store.snapshot(), &catalog);
        store.reset();

        info!(
            "[TripSession] Trip ended: {}/{} places visited",
            summary.total_places_visited, summary.total_places_planned
        );
        Ok(summary)
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    pub fn catalog(&self) -> Arc<PlaceCatalog> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn progress(&self) -> Arc<TripProgress> {
        self.lock_store().snapshot()
    }

    /// Preferences of the current (or last started) trip.
    pub fn trip_config(&self) -> TripConfig {
        self.lock_trip_config().clone()
    }

    pub fn segmentation(&self) -> RouteSegmentation {
        self.progress().segment(&self.catalog())
    }

    pub fn status_panel(&self) -> TripStatusPanel {
        TripStatusPanel::build(&self.progress(), &self.catalog())
    }

    pub fn map_scene(&self, renderer: &mut MapRenderer) -> MapScene {
        let catalog = self.catalog();
        let segmentation = self.progress().segment(&catalog);
        renderer.render(&segmentation, &catalog)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Register a store listener.
    ///
    /// Listeners run while the store is locked and receive the committed
    /// snapshot; they must not call back into the session.
    pub fn subscribe(&self, listener: TripListener) {
        self.lock_store().subscribe(listener);
    }

    fn lock_store(&self) -> MutexGuard<'_, TripStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_trip_config(&self) -> MutexGuard<'_, TripConfig> {
        self.trip_config.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Await `request`, failing with [`TripError::Timeout`] after `limit`.
async fn bounded<T>(what: &str, limit: Duration, request: BoxFuture<'_, Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, request).await {
        Ok(result) => result,
        Err(_) => {
            warn!("[TripSession] {} timed out after {:?}", what, limit);
            Err(TripError::Timeout {
                after_ms: limit.as_millis() as u64,
            })
        }
    }
}
