//! Optimizer response reconciliation.
//!
//! Turns decoded optimizer payloads into [`TripUpdate`]s for the store. Only
//! presence of the required fields is checked here; range checks on the
//! cursor belong to the store, which owns the route it is checked against.

use crate::error::{OptionExt, Result};
use crate::protocol::{OptimizeResponse, ReoptimizeResponse};
use crate::store::{OptimizationPayload, TripUpdate};

/// Build the store update for a first optimization. The cursor starts at 0.
pub fn initial_update(response: OptimizeResponse) -> Result<TripUpdate> {
    let route = response.route.clone().ok_or_malformed("route")?;

    Ok(TripUpdate {
        route,
        cursor: 0,
        schedule: response.schedule.clone().unwrap_or_default(),
        budget: response.budget_info.clone(),
        distance: response.distance_info.clone(),
        payload: Some(OptimizationPayload::Initial(response)),
    })
}

/// Build the store update for an advance + re-optimization.
///
/// Requires `step2_reoptimize.route_ids` and `summary.new_position`. The new
/// route replaces the old one whole and `new_position` becomes the cursor;
/// nothing is derived from the previous state.
pub fn reoptimization_update(response: ReoptimizeResponse) -> Result<TripUpdate> {
    let payload = response.step2_reoptimize.as_ref().ok_or_malformed("step2_reoptimize")?;
    let route = payload.route_ids.clone().ok_or_malformed("step2_reoptimize.route_ids")?;
    let cursor = response
        .summary
        .as_ref()
        .and_then(|s| s.new_position)
        .ok_or_malformed("summary.new_position")?;

    let schedule = payload.schedule.clone().unwrap_or_default();
    let budget = payload.budget_info.clone();
    let distance = payload.distance_info.clone();

    Ok(TripUpdate {
        route,
        cursor,
        schedule,
        budget,
        distance,
        payload: Some(OptimizationPayload::Reoptimized(response)),
    })
}
