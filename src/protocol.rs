//! Wire types for the trip optimizer API.
//!
//! Every response is wrapped in `{ status, data, message }`. The server
//! serializes missing numeric values as the bare token `NaN` (and
//! occasionally `Infinity`), which is not valid JSON, so bodies go through
//! [`sanitize_non_finite`] before parsing.
//!
//! Response fields the engine does not interpret are retained in `extra`
//! maps so the stored optimization payload stays complete.

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{Algorithm, CrossoverMethod, StartLocation, TripConfig};
use crate::error::{Result, TripError};
use crate::{Place, PlaceId};

// Longest first so "-Infinity" wins over "Infinity"
const NON_FINITE_TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

/// Rewrite bare `NaN` / `Infinity` / `-Infinity` tokens to `null`.
///
/// Tokens inside string literals or embedded in longer identifiers are left
/// untouched. Returns the input unchanged (borrowed) when nothing matches.
///
/// # Example
/// ```
/// use trip_tracker::sanitize_non_finite;
///
/// let body = r#"{"fee": NaN, "name": "NaN Cafe"}"#;
/// assert_eq!(sanitize_non_finite(body), r#"{"fee": null, "name": "NaN Cafe"}"#);
/// ```
pub fn sanitize_non_finite(body: &str) -> Cow<'_, str> {
    if !NON_FINITE_TOKENS.iter().any(|t| body.contains(t)) {
        return Cow::Borrowed(body);
    }

    let bytes = body.as_bytes();
    let mut out = String::with_capacity(body.len());
    let mut copied_to = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        if b == b'"' {
            in_string = true;
            i += 1;
            continue;
        }

        let token = NON_FINITE_TOKENS
            .iter()
            .find(|t| bytes[i..].starts_with(t.as_bytes()));
        if let Some(token) = token {
            let end = i + token.len();
            let starts_clean = i == 0 || !is_ident_byte(bytes[i - 1]);
            let ends_clean = end == bytes.len() || !is_ident_byte(bytes[end]);
            if starts_clean && ends_clean {
                out.push_str(&body[copied_to..i]);
                out.push_str("null");
                copied_to = end;
                i = end;
                continue;
            }
        }

        i += 1;
    }

    if copied_to == 0 {
        return Cow::Borrowed(body);
    }
    out.push_str(&body[copied_to..]);
    Cow::Owned(out)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Sanitize, parse and unwrap an API response body.
///
/// - invalid JSON or a `data` shape that does not fit `T` → [`TripError::Transport`]
/// - `status: "error"` → [`TripError::Rejected`]
/// - success without `data` → [`TripError::MalformedResponse`]
pub fn decode_envelope<T: DeserializeOwned>(body: &str) -> Result<T> {
    let clean = sanitize_non_finite(body);
    let envelope: ApiEnvelope = serde_json::from_str(&clean)
        .map_err(|e| TripError::transport(format!("JSON parse error: {}", e), None))?;

    if envelope.status.as_deref() == Some("error") {
        return Err(TripError::Rejected {
            message: envelope
                .message
                .unwrap_or_else(|| "unspecified server error".to_string()),
        });
    }

    let data = match envelope.data {
        Some(Value::Null) | None => return Err(TripError::malformed("missing `data`")),
        Some(data) => data,
    };

    serde_json::from_value(data)
        .map_err(|e| TripError::transport(format!("Unexpected response shape: {}", e), None))
}

// ============================================================================
// Shared payload pieces
// ============================================================================

/// Kind of a schedule row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Departure,
    Travel,
    Lunch,
    Visit,
    Return,
    #[serde(other)]
    Other,
}

/// One row of the optimizer's day schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub location: String,
    pub activity: String,
    /// `HH:MM`
    pub time: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ScheduleKind>,
    /// Arrives as a float (or null) because the schedule is a mixed table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrance_fee: Option<f64>,
}

impl ScheduleEntry {
    /// Place this row visits, if it is a visit row with a usable id.
    pub fn visited_place(&self) -> Option<PlaceId> {
        if self.kind != Some(ScheduleKind::Visit) {
            return None;
        }
        self.place_id
            .filter(|id| id.is_finite() && *id >= 1.0 && id.fract() == 0.0 && *id <= PlaceId::MAX as f64)
            .map(|id| id as PlaceId)
    }
}

/// Budget figures, replaced wholesale on every optimizer response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    #[serde(default)]
    pub remaining_budget: Option<f64>,
    #[serde(default)]
    pub total_budget: Option<f64>,
    #[serde(default)]
    pub used_budget: Option<f64>,
}

/// Distance figures, replaced wholesale on every optimizer response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistanceSummary {
    #[serde(default)]
    pub total_distance_km: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Catalog
// ============================================================================

/// `GET places` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacesResponse {
    pub places: Vec<Place>,
    #[serde(default)]
    pub total: Option<u32>,
}

// ============================================================================
// Initial optimization
// ============================================================================

/// Preferences block of the optimize request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preferences {
    pub start_time: String,
    pub end_time: String,
    pub lunch_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_location: Option<StartLocation>,
    pub max_places: u32,
    pub budget: f64,
    pub must_visit: Vec<PlaceId>,
    pub preferred_categories: Vec<String>,
}

/// `POST optimize` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizeRequest {
    pub preferences: Preferences,
    pub crossover_method: CrossoverMethod,
    pub algorithm: Algorithm,
}

impl From<&TripConfig> for OptimizeRequest {
    fn from(config: &TripConfig) -> Self {
        Self {
            preferences: Preferences {
                start_time: config.start_time.clone(),
                end_time: config.end_time.clone(),
                lunch_time: config.lunch_time.clone(),
                start_location: config.start_location.clone(),
                max_places: config.max_places,
                budget: config.budget,
                must_visit: config.must_visit.clone(),
                preferred_categories: config.categories(),
            },
            crossover_method: config.crossover_method,
            algorithm: config.algorithm,
        }
    }
}

/// `POST optimize` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizeResponse {
    #[serde(default)]
    pub route: Option<Vec<PlaceId>>,
    #[serde(default)]
    pub schedule: Option<Vec<ScheduleEntry>>,
    #[serde(default)]
    pub distance_info: Option<DistanceSummary>,
    #[serde(default)]
    pub budget_info: Option<BudgetSummary>,
    #[serde(default)]
    pub used_preferences: Option<Value>,
    #[serde(default)]
    pub total_cost: Option<f64>,
    #[serde(default)]
    pub fitness: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Re-optimization
// ============================================================================

/// `POST next-and-reoptimize` body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReoptimizeRequest {
    pub crossover_method: CrossoverMethod,
    pub algorithm: Algorithm,
}

impl From<&TripConfig> for ReoptimizeRequest {
    fn from(config: &TripConfig) -> Self {
        Self {
            crossover_method: config.crossover_method,
            algorithm: config.algorithm,
        }
    }
}

/// The re-optimized remainder of the trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReoptimizePayload {
    /// Full route, visited stops included
    #[serde(default)]
    pub route_ids: Option<Vec<PlaceId>>,
    #[serde(default)]
    pub schedule: Option<Vec<ScheduleEntry>>,
    #[serde(default)]
    pub distance_info: Option<DistanceSummary>,
    #[serde(default)]
    pub budget_info: Option<BudgetSummary>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Progress summary of an advance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReoptimizeSummary {
    /// Cursor after moving; kept signed so a bad value can be rejected
    #[serde(default)]
    pub new_position: Option<i64>,
    #[serde(default)]
    pub moved_to: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `POST next-and-reoptimize` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReoptimizeResponse {
    #[serde(default)]
    pub step2_reoptimize: Option<ReoptimizePayload>,
    #[serde(default)]
    pub summary: Option<ReoptimizeSummary>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// End of journey
// ============================================================================

/// `POST end-journey` acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EndJourneyAck {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
