//! # Trip Progress Store
//!
//! Owns the mutable trip state: route, cursor, schedule, budget and distance
//! summaries and the most recent optimizer payload.
//!
//! ## State machine
//!
//! | Status | Condition |
//! |--------|-----------|
//! | `Empty` | no route |
//! | `Active` | route non-empty, `cursor < len` |
//! | `Completed` | `cursor == len` |
//!
//! The state is held as an immutable [`TripProgress`] snapshot behind an
//! `Arc`. A transition validates first, then swaps in a whole new snapshot,
//! so readers never observe a new route paired with an old cursor. Every
//! successful transition notifies the registered listeners.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;

use crate::catalog::PlaceCatalog;
use crate::error::{Result, TripError};
use crate::protocol::{BudgetSummary, DistanceSummary, OptimizeResponse, ReoptimizeResponse, ScheduleEntry};
use crate::segmentation::{segment_route, RouteSegmentation};
use crate::PlaceId;

/// Lifecycle status derived from route and cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum TripStatus {
    Empty,
    Active,
    Completed,
}

/// Store change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum TripEvent {
    Initialized,
    Reoptimized,
    Completed,
    Reset,
}

/// Raw optimizer payload that produced the current state.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizationPayload {
    Initial(OptimizeResponse),
    Reoptimized(ReoptimizeResponse),
}

/// Listener invoked after every successful transition.
pub type TripListener = Arc<dyn Fn(TripEvent, &TripProgress) + Send + Sync>;

/// Candidate state handed to the store. `cursor` is kept signed so a bad
/// server value is rejected by validation instead of wrapping.
#[derive(Debug, Clone, PartialEq)]
pub struct TripUpdate {
    pub route: Vec<PlaceId>,
    pub cursor: i64,
    pub schedule: Vec<ScheduleEntry>,
    pub budget: Option<BudgetSummary>,
    pub distance: Option<DistanceSummary>,
    pub payload: Option<OptimizationPayload>,
}

impl TripUpdate {
    /// Update with only a route and cursor.
    pub fn new(route: Vec<PlaceId>, cursor: i64) -> Self {
        Self {
            route,
            cursor,
            schedule: Vec::new(),
            budget: None,
            distance: None,
            payload: None,
        }
    }
}

/// Immutable snapshot of the trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripProgress {
    route: Vec<PlaceId>,
    cursor: usize,
    schedule: Vec<ScheduleEntry>,
    budget: Option<BudgetSummary>,
    distance: Option<DistanceSummary>,
    payload: Option<OptimizationPayload>,
    revision: u64,
}

impl TripProgress {
    pub fn route(&self) -> &[PlaceId] {
        &self.route
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn schedule(&self) -> &[ScheduleEntry] {
        &self.schedule
    }

    pub fn budget(&self) -> Option<&BudgetSummary> {
        self.budget.as_ref()
    }

    pub fn distance(&self) -> Option<&DistanceSummary> {
        self.distance.as_ref()
    }

    pub fn payload(&self) -> Option<&OptimizationPayload> {
        self.payload.as_ref()
    }

    /// Bumped on every committed transition.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn status(&self) -> TripStatus {
        if self.route.is_empty() {
            TripStatus::Empty
        } else if self.cursor >= self.route.len() {
            TripStatus::Completed
        } else {
            TripStatus::Active
        }
    }

    /// Whether a next destination exists to advance to.
    pub fn can_advance(&self) -> bool {
        self.status() == TripStatus::Active && self.cursor + 1 < self.route.len()
    }

    /// Place id at the cursor.
    pub fn current_place_id(&self) -> Option<PlaceId> {
        self.route.get(self.cursor).copied()
    }

    fn is_blank(&self) -> bool {
        self.route.is_empty()
            && self.schedule.is_empty()
            && self.budget.is_none()
            && self.distance.is_none()
            && self.payload.is_none()
    }

    /// Derive a fresh segmentation of this snapshot.
    pub fn segment(&self, catalog: &PlaceCatalog) -> RouteSegmentation {
        segment_route(&self.route, self.cursor, catalog)
    }
}

/// Holder of the current trip snapshot and its listeners.
pub struct TripStore {
    progress: Arc<TripProgress>,
    listeners: Vec<TripListener>,
}

impl Default for TripStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TripStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(TripProgress::default()),
            listeners: Vec::new(),
        }
    }

    /// Current snapshot. Cheap to clone and safe to hold across transitions.
    pub fn snapshot(&self) -> Arc<TripProgress> {
        Arc::clone(&self.progress)
    }

    pub fn status(&self) -> TripStatus {
        self.progress.status()
    }

    /// Register a listener for every subsequent transition.
    pub fn subscribe(&mut self, listener: TripListener) {
        self.listeners.push(listener);
    }

    /// Replace all state from a first optimization.
    ///
    /// Fails with [`TripError::InvalidInit`] when the cursor is negative,
    /// nonzero on an empty route, past the end of the route, or when the
    /// route contains id 0.
    pub fn initialize(&mut self, update: TripUpdate) -> Result<TripEvent> {
        let cursor = validate(&update, TripError::invalid_init)?;
        if update.route.is_empty() && cursor != 0 {
            return Err(TripError::invalid_init(format!(
                "cursor {} on an empty route",
                cursor
            )));
        }

        info!(
            "[TripStore] Initialized route of {} stops at cursor {}",
            update.route.len(),
            cursor
        );
        Ok(self.commit(update, cursor, TripEvent::Initialized))
    }

    /// Fold a re-optimization into the store.
    ///
    /// Route and cursor are replaced as one pair and the summaries are
    /// replaced wholesale. On any error the store is left untouched.
    pub fn apply_reoptimization(&mut self, update: TripUpdate) -> Result<TripEvent> {
        if self.status() == TripStatus::Empty {
            return Err(TripError::NoActiveTrip);
        }
        if update.route.is_empty() {
            return Err(TripError::malformed("re-optimized route is empty"));
        }
        let cursor = validate(&update, TripError::malformed)?;

        self.warn_on_regression(&update.route, cursor);

        let event = if cursor == update.route.len() {
            TripEvent::Completed
        } else {
            TripEvent::Reoptimized
        };

        info!(
            "[TripStore] Re-optimized: {} stops, cursor {} -> {}",
            update.route.len(),
            self.progress.cursor,
            cursor
        );
        Ok(self.commit(update, cursor, event))
    }

    /// [`Self::apply_reoptimization`], but only if the store is still at
    /// `expected_revision`. Lets a caller that cannot hold the store across
    /// the request reject an update that raced another transition.
    pub fn apply_reoptimization_at(&mut self, update: TripUpdate, expected_revision: u64) -> Result<TripEvent> {
        let actual = self.progress.revision;
        if actual != expected_revision {
            warn!(
                "[TripStore] Stale re-optimization for revision {} (store at {})",
                expected_revision, actual
            );
            return Err(TripError::StaleRevision {
                expected: expected_revision,
                actual,
            });
        }
        self.apply_reoptimization(update)
    }

    /// Discard all trip state.
    ///
    /// Returns `None` without notifying when the store is already empty.
    pub fn reset(&mut self) -> Option<TripEvent> {
        if self.progress.is_blank() {
            debug!("[TripStore] Reset on empty store ignored");
            return None;
        }
        info!("[TripStore] Reset");
        let revision = self.progress.revision + 1;
        self.progress = Arc::new(TripProgress {
            revision,
            ..TripProgress::default()
        });
        self.notify(TripEvent::Reset);
        Some(TripEvent::Reset)
    }

    fn commit(&mut self, update: TripUpdate, cursor: usize, event: TripEvent) -> TripEvent {
        let progress = TripProgress {
            route: update.route,
            cursor,
            schedule: update.schedule,
            budget: update.budget,
            distance: update.distance,
            payload: update.payload,
            revision: self.progress.revision + 1,
        };
        self.progress = Arc::new(progress);
        self.notify(event);
        event
    }

    fn notify(&self, event: TripEvent) {
        debug!(
            "[TripStore] {:?} (revision {}) -> {} listeners",
            event,
            self.progress.revision,
            self.listeners.len()
        );
        for listener in &self.listeners {
            listener(event, &self.progress);
        }
    }

    /// The optimizer is authoritative, but a shrinking visited prefix is
    /// worth flagging.
    fn warn_on_regression(&self, route: &[PlaceId], cursor: usize) {
        let old = &self.progress;
        if cursor < old.cursor {
            warn!(
                "[TripStore] Cursor moved backwards ({} -> {})",
                old.cursor, cursor
            );
        }
        let kept = (old.cursor + 1).min(old.route.len()).min(route.len());
        if old.route[..kept] != route[..kept] {
            warn!(
                "[TripStore] Visited prefix changed: {:?} -> {:?}",
                &old.route[..kept],
                &route[..kept]
            );
        }
    }
}

/// Shared checks: cursor in `[0, len]` and no id 0. Returns the cursor as usize.
fn validate(update: &TripUpdate, error: fn(String) -> TripError) -> Result<usize> {
    if update.cursor < 0 {
        return Err(error(format!("negative cursor {}", update.cursor)));
    }
    let cursor = usize::try_from(update.cursor)
        .map_err(|_| error(format!("cursor {} does not fit this platform", update.cursor)))?;
    if cursor > update.route.len() {
        return Err(error(format!(
            "cursor {} outside route of {} stops",
            cursor,
            update.route.len()
        )));
    }
    if update.route.contains(&0) {
        return Err(error("route contains place id 0".to_string()));
    }
    Ok(cursor)
}
