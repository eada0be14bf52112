//! Unified error handling for the trip-tracker library.
//!
//! Every fallible operation returns [`TripError`]. Errors are local to the
//! operation that produced them: a failed call never leaves the trip store
//! partially updated.

use thiserror::Error;

use crate::PlaceId;

/// Unified error type for trip-tracker operations.
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error), uniffi(flat_error))]
pub enum TripError {
    /// Place id is outside `[1, catalog size]`
    #[error("Place {id} not found in catalog")]
    NotFound { id: PlaceId },

    /// Catalog has not been fetched yet
    #[error("Place catalog not loaded")]
    CatalogNotLoaded,

    /// Catalog rows do not form a contiguous 1-based id sequence
    #[error("Invalid place catalog: {message}")]
    InvalidCatalog { message: String },

    /// Store initialization rejected
    #[error("Invalid trip initialization: {message}")]
    InvalidInit { message: String },

    /// Optimizer response missing fields or carrying an out-of-range cursor
    #[error("Malformed optimizer response: {message}")]
    MalformedResponse { message: String },

    /// Network or body parse failure
    #[error("{}", transport_message(message, *status_code))]
    Transport {
        message: String,
        status_code: Option<u16>,
    },

    /// Server answered with `status: "error"`
    #[error("Request rejected by server: {message}")]
    Rejected { message: String },

    /// Request did not complete within the configured timeout
    #[error("Request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// Another reconciliation request is still outstanding
    #[error("A trip update is already in progress")]
    Busy,

    /// No next destination remains
    #[error("Trip is complete, no next destination")]
    TripComplete,

    /// Update was computed against an older store revision
    #[error("Stale trip update: expected revision {expected}, store is at {actual}")]
    StaleRevision { expected: u64, actual: u64 },

    /// Operation requires an active trip
    #[error("No trip in progress")]
    NoActiveTrip,

    /// Trip preferences failed validation
    #[error("Invalid trip configuration: {message}")]
    InvalidConfig { message: String },
}

fn transport_message(message: &str, status_code: Option<u16>) -> String {
    match status_code {
        Some(code) => format!("HTTP error ({}): {}", code, message),
        None => format!("HTTP error: {}", message),
    }
}

impl TripError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        TripError::MalformedResponse {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_init(message: impl Into<String>) -> Self {
        TripError::InvalidInit {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        TripError::InvalidConfig {
            message: message.into(),
        }
    }

    pub(crate) fn transport(message: impl Into<String>, status_code: Option<u16>) -> Self {
        TripError::Transport {
            message: message.into(),
            status_code,
        }
    }

    /// Whether the user can reasonably re-invoke the failed action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TripError::Transport { .. }
                | TripError::Timeout { .. }
                | TripError::Rejected { .. }
                | TripError::Busy
        )
    }
}

/// Result type alias for trip-tracker operations.
pub type Result<T> = std::result::Result<T, TripError>;

/// Extension trait for converting Option to TripError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a malformed response error naming the field.
    fn ok_or_malformed(self, field: &str) -> Result<T>;

    /// Convert Option to Result with a catalog miss for `id`.
    fn ok_or_not_found(self, id: PlaceId) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_malformed(self, field: &str) -> Result<T> {
        self.ok_or_else(|| TripError::malformed(format!("missing `{}`", field)))
    }

    fn ok_or_not_found(self, id: PlaceId) -> Result<T> {
        self.ok_or(TripError::NotFound { id })
    }
}
