//! HTTP client for the trip optimizer API.
//!
//! - Connection pooling through a single reqwest [`Client`]
//! - Per-request timeouts from [`ClientConfig`]: `advance_timeout` for the
//!   optimizer calls, `request_timeout` for the rest
//! - Bodies sanitized for `NaN` before parsing
//! - No automatic retries; the traveler re-invokes the action

use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, info, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::{Result, TripError};
use crate::protocol::{
    decode_envelope, EndJourneyAck, OptimizeRequest, OptimizeResponse, PlacesResponse, ReoptimizeRequest,
    ReoptimizeResponse,
};
use crate::session::TripApi;
use crate::Place;

const PLACES_PATH: &str = "places";
const OPTIMIZE_PATH: &str = "optimize";
const NEXT_AND_REOPTIMIZE_PATH: &str = "next-and-reoptimize";
const END_JOURNEY_PATH: &str = "end-journey";

/// reqwest implementation of [`TripApi`].
pub struct TripClient {
    client: Client,
    config: ClientConfig,
}

impl TripClient {
    /// Create a client for `config.base_url`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(config.pool_idle_timeout)
            .tcp_keepalive(config.pool_idle_timeout / 2)
            .build()
            .map_err(|e| TripError::transport(format!("Failed to create HTTP client: {}", e), None))?;

        info!("[TripClient] Using {}", config.base_url);
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `GET places`
    pub async fn places(&self) -> Result<Vec<Place>> {
        let response: PlacesResponse = self.get(PLACES_PATH, self.config.request_timeout).await?;
        Ok(response.places)
    }

    /// `POST optimize`
    pub async fn optimize_route(&self, request: &OptimizeRequest) -> Result<OptimizeResponse> {
        self.post(OPTIMIZE_PATH, Some(request), self.config.advance_timeout).await
    }

    /// `POST next-and-reoptimize`
    pub async fn next_and_reoptimize_route(&self, request: &ReoptimizeRequest) -> Result<ReoptimizeResponse> {
        self.post(NEXT_AND_REOPTIMIZE_PATH, Some(request), self.config.advance_timeout)
            .await
    }

    /// `POST end-journey`
    pub async fn end_current_journey(&self) -> Result<EndJourneyAck> {
        self.post::<(), _>(END_JOURNEY_PATH, None, self.config.request_timeout)
            .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, limit: Duration) -> Result<T> {
        let url = self.config.endpoint(path);
        let request = self.client.get(&url);
        self.execute(path, request, limit).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
        limit: Duration,
    ) -> Result<T> {
        let url = self.config.endpoint(path);
        let mut request = self.client.post(&url);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(path, request, limit).await
    }

    /// Send `request` with `limit` covering connect, headers and body.
    async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        request: reqwest::RequestBuilder,
        limit: Duration,
    ) -> Result<T> {
        let req_start = Instant::now();

        // Phase 1: send request, receive headers
        let response = request.timeout(limit).send().await.map_err(|e| {
            warn!("[TripClient {}] Request error after {:?}: {}", path, req_start.elapsed(), e);
            request_error(e, limit)
        })?;
        let headers_elapsed = req_start.elapsed();
        let status = response.status();

        // Phase 2: body download
        let body_start = Instant::now();
        let body = response.text().await.map_err(|e| {
            warn!("[TripClient {}] Body download error: {}", path, e);
            request_error(e, limit)
        })?;
        let body_elapsed = body_start.elapsed();

        if !status.is_success() {
            warn!("[TripClient {}] HTTP {} after {:?}", path, status, headers_elapsed);
            return Err(status_error(status.as_u16(), &body));
        }

        // Phase 3: sanitize + decode
        let json_start = Instant::now();
        let decoded = decode_envelope(&body);
        let json_elapsed = json_start.elapsed();

        info!(
            "[TripClient {}] headers={:?} body={:?}({:.1}KB) json={:?} total={:?}",
            path,
            headers_elapsed,
            body_elapsed,
            body.len() as f64 / 1024.0,
            json_elapsed,
            req_start.elapsed()
        );
        if let Err(e) = &decoded {
            debug!("[TripClient {}] Decode failed: {}", path, e);
        }
        decoded
    }
}

fn request_error(e: reqwest::Error, limit: Duration) -> TripError {
    if e.is_timeout() {
        return TripError::Timeout {
            after_ms: limit.as_millis() as u64,
        };
    }
    let status = e.status().map(|s| s.as_u16());
    TripError::transport(format!("Request error: {}", e), status)
}

/// Map a non-2xx response. The server's own `status: "error"` message wins
/// over the bare status code when the body carries one.
fn status_error(status: u16, body: &str) -> TripError {
    match decode_envelope::<serde_json::Value>(body) {
        Err(rejected @ TripError::Rejected { .. }) => rejected,
        _ => TripError::transport(format!("HTTP {}", status), Some(status)),
    }
}

impl TripApi for TripClient {
    fn fetch_places(&self) -> BoxFuture<'_, Result<Vec<Place>>> {
        self.places().boxed()
    }

    fn optimize(&self, request: OptimizeRequest) -> BoxFuture<'_, Result<OptimizeResponse>> {
        async move { self.optimize_route(&request).await }.boxed()
    }

    fn next_and_reoptimize(&self, request: ReoptimizeRequest) -> BoxFuture<'_, Result<ReoptimizeResponse>> {
        async move { self.next_and_reoptimize_route(&request).await }.boxed()
    }

    fn end_journey(&self) -> BoxFuture<'_, Result<EndJourneyAck>> {
        self.end_current_journey().boxed()
    }
}
