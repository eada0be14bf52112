//! End-to-end session tests against an in-memory optimizer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::Notify;

use trip_tracker::protocol::{EndJourneyAck, OptimizeRequest, ReoptimizeRequest, ReoptimizeSummary};
use trip_tracker::{
    Algorithm, ClientConfig, CrossoverMethod, MapRenderer, MarkerStyle, OptimizeResponse, Place, PlaceId,
    ReoptimizePayload, ReoptimizeResponse, Result, TripApi, TripConfig, TripError, TripEvent, TripProgress,
    TripSession, TripStatus,
};

// ============================================================================
// Fake optimizer
// ============================================================================

#[derive(Default)]
struct FakeApi {
    places: Mutex<Option<Result<Vec<Place>>>>,
    optimize: Mutex<VecDeque<Result<OptimizeResponse>>>,
    reoptimize: Mutex<VecDeque<Result<ReoptimizeResponse>>>,
    /// When set, `next_and_reoptimize` waits for a notification before answering
    gate: Option<Arc<Notify>>,
    fail_end_journey: AtomicBool,
    optimize_calls: AtomicUsize,
    next_calls: AtomicUsize,
    end_calls: AtomicUsize,
    last_optimize: Mutex<Option<OptimizeRequest>>,
    last_reoptimize: Mutex<Option<ReoptimizeRequest>>,
}

impl FakeApi {
    fn new() -> Self {
        Self {
            places: Mutex::new(Some(Ok(yogyakarta()))),
            ..Self::default()
        }
    }

    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    fn push_optimize(&self, route: Vec<PlaceId>) {
        self.optimize.lock().unwrap().push_back(Ok(OptimizeResponse {
            route: Some(route),
            ..OptimizeResponse::default()
        }));
    }

    fn push_reoptimize(&self, response: Result<ReoptimizeResponse>) {
        self.reoptimize.lock().unwrap().push_back(response);
    }

    fn next_calls(&self) -> usize {
        self.next_calls.load(Ordering::SeqCst)
    }
}

impl TripApi for FakeApi {
    fn fetch_places(&self) -> BoxFuture<'_, Result<Vec<Place>>> {
        async move {
            let places = self.places.lock().unwrap().clone();
            places.unwrap_or_else(|| Ok(Vec::new()))
        }
        .boxed()
    }

    fn optimize(&self, request: OptimizeRequest) -> BoxFuture<'_, Result<OptimizeResponse>> {
        async move {
            self.optimize_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_optimize.lock().unwrap() = Some(request);
            let next = self.optimize.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Err(rejected("no route")))
        }
        .boxed()
    }

    fn next_and_reoptimize(&self, request: ReoptimizeRequest) -> BoxFuture<'_, Result<ReoptimizeResponse>> {
        async move {
            self.next_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_reoptimize.lock().unwrap() = Some(request);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let next = self.reoptimize.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Err(rejected("no next place")))
        }
        .boxed()
    }

    fn end_journey(&self) -> BoxFuture<'_, Result<EndJourneyAck>> {
        async move {
            self.end_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_end_journey.load(Ordering::SeqCst) {
                return Err(TripError::Transport {
                    message: "connection reset".to_string(),
                    status_code: None,
                });
            }
            Ok(EndJourneyAck {
                message: Some("Journey ended".to_string()),
                ..EndJourneyAck::default()
            })
        }
        .boxed()
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn yogyakarta() -> Vec<Place> {
    let mut places = vec![
        Place::new(1, "Candi Borobudur", -7.6079, 110.2038, "Budaya"),
        Place::new(2, "Candi Prambanan", -7.7520, 110.4914, "Budaya"),
        Place::new(3, "Kraton Yogyakarta", -7.8050, 110.3644, "Budaya"),
        Place::new(4, "Malioboro", -7.7929, 110.3668, "Belanja"),
        Place::new(5, "Pantai Parangtritis", -8.0255, 110.3329, "Alam"),
    ];
    for place in &mut places {
        place.entrance_fee = Some(10000.0);
    }
    places
}

fn rejected(message: &str) -> TripError {
    TripError::Rejected {
        message: message.to_string(),
    }
}

fn reoptimized(route: Option<Vec<PlaceId>>, new_position: i64) -> ReoptimizeResponse {
    ReoptimizeResponse {
        step2_reoptimize: Some(ReoptimizePayload {
            route_ids: route,
            ..ReoptimizePayload::default()
        }),
        summary: Some(ReoptimizeSummary {
            new_position: Some(new_position),
            ..ReoptimizeSummary::default()
        }),
        ..ReoptimizeResponse::default()
    }
}

fn trip_config() -> TripConfig {
    TripConfig {
        max_places: 3,
        crossover_method: CrossoverMethod::Order,
        algorithm: Algorithm::MuPlusLambda,
        ..TripConfig::default()
    }
}

async fn started(api: FakeApi, route: Vec<PlaceId>) -> TripSession<FakeApi> {
    started_with(api, route, ClientConfig::default()).await
}

async fn started_with(api: FakeApi, route: Vec<PlaceId>, client: ClientConfig) -> TripSession<FakeApi> {
    api.push_optimize(route);
    let session = TripSession::new(api, client);
    session.load_catalog().await.unwrap();
    session.start_trip(trip_config()).await.unwrap();
    session
}

fn ids(progress: &TripProgress) -> (Vec<PlaceId>, usize) {
    (progress.route().to_vec(), progress.cursor())
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_start_trip_segments_first_stop() {
    let session = started(FakeApi::new(), vec![3, 1, 4]).await;

    let seg = session.segmentation();
    assert_eq!(seg.visited_ids(), vec![3]);
    assert_eq!(seg.current_place.as_ref().map(|s| s.place_id), Some(3));
    assert_eq!(seg.remaining_ids(), vec![1, 4]);
    assert_eq!(seg.bridge_segment.len(), 2);

    let api = session.api();
    assert_eq!(api.end_calls.load(Ordering::SeqCst), 1);
    let request = api.last_optimize.lock().unwrap().clone().unwrap();
    assert_eq!(request.preferences.max_places, 3);
    assert_eq!(request.crossover_method, CrossoverMethod::Order);
}

#[tokio::test]
async fn test_last_stop_disables_advance() {
    let api = FakeApi::new();
    api.push_reoptimize(Ok(reoptimized(Some(vec![3, 1, 4]), 1)));
    api.push_reoptimize(Ok(reoptimized(Some(vec![3, 1, 4]), 2)));
    let session = started(api, vec![3, 1, 4]).await;

    session.advance().await.unwrap();
    session.advance().await.unwrap();

    let seg = session.segmentation();
    assert!(seg.remaining_places.is_empty());
    assert!(seg.bridge_segment.is_empty());
    assert!(!seg.can_advance());
    assert!(!session.status_panel().can_advance);

    assert_eq!(session.advance().await, Err(TripError::TripComplete));
    assert_eq!(session.api().next_calls(), 2);
}

#[tokio::test]
async fn test_reoptimization_replaces_remaining_route() {
    let api = FakeApi::new();
    api.push_reoptimize(Ok(reoptimized(Some(vec![2, 4, 1]), 1)));
    let session = started(api, vec![2, 4, 5]).await;

    assert_eq!(session.advance().await, Ok(TripEvent::Reoptimized));

    let seg = session.segmentation();
    assert_eq!(seg.visited_ids(), vec![2, 4]);
    assert_eq!(seg.remaining_ids(), vec![1]);

    let request = session.api().last_reoptimize.lock().unwrap().unwrap();
    assert_eq!(request.crossover_method, CrossoverMethod::Order);
    assert_eq!(request.algorithm, Algorithm::MuPlusLambda);
}

#[tokio::test]
async fn test_malformed_reoptimization_keeps_state() {
    let api = FakeApi::new();
    api.push_reoptimize(Ok(reoptimized(None, 1)));
    api.push_reoptimize(Ok(reoptimized(Some(vec![2, 4, 1]), 7)));
    let session = started(api, vec![2, 4, 5]).await;
    let before = session.progress();

    for _ in 0..2 {
        let result = session.advance().await;
        assert!(matches!(result, Err(TripError::MalformedResponse { .. })), "{:?}", result);
        assert_eq!(ids(&session.progress()), (vec![2, 4, 5], 0));
        assert!(!session.is_busy());
    }
    assert!(Arc::ptr_eq(&before, &session.progress()));
}

// ============================================================================
// Busy flag, timeouts, failures
// ============================================================================

#[tokio::test]
async fn test_concurrent_advance_is_rejected() {
    let gate = Arc::new(Notify::new());
    let api = FakeApi::gated(Arc::clone(&gate));
    api.push_reoptimize(Ok(reoptimized(Some(vec![2, 4, 5]), 1)));
    let session = Arc::new(started(api, vec![2, 4, 5]).await);

    let first = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.advance().await })
    };
    while session.api().next_calls() == 0 {
        tokio::task::yield_now().await;
    }

    assert!(session.is_busy());
    assert_eq!(session.advance().await, Err(TripError::Busy));
    assert!(matches!(session.end_trip().await, Err(TripError::Busy)));
    assert_eq!(session.api().next_calls(), 1);

    gate.notify_one();
    assert_eq!(first.await.unwrap(), Ok(TripEvent::Reoptimized));
    assert!(!session.is_busy());
    assert_eq!(session.progress().cursor(), 1);
}

#[tokio::test]
async fn test_hung_advance_times_out() {
    let gate = Arc::new(Notify::new());
    let client = ClientConfig {
        advance_timeout: Duration::from_millis(50),
        ..ClientConfig::default()
    };
    let session = started_with(FakeApi::gated(gate), vec![2, 4, 5], client).await;

    assert_eq!(session.advance().await, Err(TripError::Timeout { after_ms: 50 }));
    assert!(!session.is_busy());
    assert_eq!(ids(&session.progress()), (vec![2, 4, 5], 0));
}

#[tokio::test]
async fn test_dropped_advance_clears_busy() {
    let gate = Arc::new(Notify::new());
    let session = started(FakeApi::gated(gate), vec![2, 4, 5]).await;

    {
        let pending = session.advance();
        futures::pin_mut!(pending);
        assert!(futures::poll!(pending.as_mut()).is_pending());
        assert!(session.is_busy());
    }
    assert!(!session.is_busy());
}

#[tokio::test]
async fn test_transport_failure_then_retry() {
    let api = FakeApi::new();
    api.push_reoptimize(Err(TripError::Transport {
        message: "connection refused".to_string(),
        status_code: None,
    }));
    api.push_reoptimize(Ok(reoptimized(Some(vec![2, 4, 5]), 1)));
    let session = started(api, vec![2, 4, 5]).await;

    let err = session.advance().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(ids(&session.progress()), (vec![2, 4, 5], 0));

    assert_eq!(session.advance().await, Ok(TripEvent::Reoptimized));
    assert_eq!(session.progress().cursor(), 1);
}

#[tokio::test]
async fn test_server_rejection_surfaces() {
    let api = FakeApi::new();
    api.push_reoptimize(Err(rejected("Sudah di tempat terakhir")));
    let session = started(api, vec![2, 4, 5]).await;
    assert_eq!(session.advance().await, Err(rejected("Sudah di tempat terakhir")));
    assert_eq!(session.progress().status(), TripStatus::Active);
}

#[tokio::test]
async fn test_advance_without_trip() {
    let session = TripSession::new(FakeApi::new(), ClientConfig::default());
    assert_eq!(session.advance().await, Err(TripError::NoActiveTrip));
    assert_eq!(session.api().next_calls(), 0);
}

#[tokio::test]
async fn test_invalid_config_makes_no_calls() {
    let session = TripSession::new(FakeApi::new(), ClientConfig::default());
    session.load_catalog().await.unwrap();

    let config = TripConfig {
        must_visit: vec![42],
        ..TripConfig::default()
    };
    assert!(matches!(session.start_trip(config).await, Err(TripError::InvalidConfig { .. })));
    assert_eq!(session.api().optimize_calls.load(Ordering::SeqCst), 0);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn test_start_survives_failed_journey_cleanup() {
    let api = FakeApi::new();
    api.fail_end_journey.store(true, Ordering::SeqCst);
    let session = started(api, vec![1, 2]).await;
    assert_eq!(session.progress().status(), TripStatus::Active);
}

#[tokio::test]
async fn test_catalog_failure_renders_nothing() {
    let api = FakeApi::new();
    *api.places.lock().unwrap() = Some(Err(TripError::Transport {
        message: "timeout".to_string(),
        status_code: Some(504),
    }));
    api.push_optimize(vec![3, 1, 4]);
    let session = TripSession::new(api, ClientConfig::default());

    assert!(session.load_catalog().await.is_err());
    assert!(!session.catalog().is_loaded());

    session.start_trip(TripConfig::default()).await.unwrap();
    let scene = session.map_scene(&mut MapRenderer::default());
    assert!(scene.markers.is_empty());
    assert!(scene.polylines.iter().all(|p| p.points.is_empty()));
    assert_eq!(session.segmentation().visited_ids(), vec![3]);
}

// ============================================================================
// End of trip and listeners
// ============================================================================

#[tokio::test]
async fn test_end_trip_returns_summary_and_resets() {
    let api = FakeApi::new();
    api.push_reoptimize(Ok(reoptimized(Some(vec![2, 4, 5]), 1)));
    let session = started(api, vec![2, 4, 5]).await;
    session.advance().await.unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    session.subscribe(Arc::new(move |event: TripEvent, _: &TripProgress| {
        sink.lock().unwrap().push(event);
    }));

    let summary = session.end_trip().await.unwrap();
    assert_eq!(summary.total_places_planned, 3);
    assert_eq!(summary.total_places_visited, 2);
    assert_eq!(summary.total_entrance_fees, 20000.0);
    assert_eq!(summary.categories_visited.get("Budaya"), Some(&1));
    assert_eq!(summary.categories_visited.get("Belanja"), Some(&1));

    assert_eq!(session.progress().status(), TripStatus::Empty);
    assert_eq!(*events.lock().unwrap(), vec![TripEvent::Reset]);
}

#[tokio::test]
async fn test_failed_end_trip_keeps_state() {
    let session = started(FakeApi::new(), vec![2, 4, 5]).await;
    session.api().fail_end_journey.store(true, Ordering::SeqCst);

    assert!(matches!(session.end_trip().await, Err(TripError::Transport { .. })));
    assert_eq!(ids(&session.progress()), (vec![2, 4, 5], 0));
}

#[tokio::test]
async fn test_map_follows_advance() {
    let api = FakeApi::new();
    api.push_reoptimize(Ok(reoptimized(Some(vec![2, 4, 1]), 1)));
    let session = started(api, vec![2, 4, 5]).await;
    let mut renderer = MapRenderer::default();

    let before = session.map_scene(&mut renderer);
    assert_eq!(before.marker(2).map(|m| m.style), Some(MarkerStyle::Current));

    session.advance().await.unwrap();
    let after = session.map_scene(&mut renderer);
    assert_eq!(after.marker(2).map(|m| m.style), Some(MarkerStyle::Past));
    assert_eq!(after.marker(4).map(|m| m.style), Some(MarkerStyle::Current));
    assert_eq!(after.marker(1).map(|m| m.ordinal), Some(3));
    assert_eq!(renderer.focus(), Some(4));
    assert_ne!(before.viewport.center, after.viewport.center);
}
