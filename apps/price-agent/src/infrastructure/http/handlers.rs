//! Query Handlers
//!
//! Request protocol shared by both endpoints:
//!
//! 1. `Content-Type` must be exactly `application/json`, else `415`
//! 2. Malformed body, `400` with the decode error. Only the first JSON value
//!    in the body is read.
//! 3. Nothing requested, `{}`
//! 4. Provider or hook failures are reported in-band with status `200`
//!
//! Requests still running when the agent is cancelled get `503`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{Marshaller, PriceHook, PriceProvider, Record, SharedWriter};
use crate::domain::pair::Pair;
use crate::infrastructure::marshal::PriceRecord;
use crate::infrastructure::metrics::{self, Endpoint, RequestOutcome};

const JSON: &str = "application/json";

pub(super) const WRONG_CONTENT_TYPE: &str = "Content-Type header is not application/json";
const EMPTY: &str = "{}";
const PROVIDER_FAILED: &str = r#"{"error":"failed to get prices"}"#;
const HOOK_FAILED: &str = r#"{"error":"failed to check prices"}"#;
const MARSHAL_FAILED: &str = r#"{"error":"failed to marshal json"}"#;
const SHUTTING_DOWN: &str = "server is shutting down";

/// Collaborators shared by every request.
#[derive(Clone)]
pub(super) struct AgentState {
    pub provider: Arc<dyn PriceProvider>,
    pub hook: Arc<dyn PriceHook>,
    pub marshaller: Arc<dyn Marshaller>,
}

#[derive(Debug, Deserialize)]
struct PricesRequest {
    #[serde(rename = "Pairs", alias = "pairs", default)]
    pairs: Option<Vec<Pair>>,
}

#[derive(Debug, Deserialize)]
struct PriceRequest {
    #[serde(rename = "Pair", alias = "pair", default)]
    pair: Pair,
}

// =============================================================================
// Handlers
// =============================================================================

/// `/`, `/prices` and unmatched paths.
pub(super) async fn handle_prices(
    State(state): State<AgentState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request: PricesRequest = match decode(Endpoint::Prices, &headers, &body) {
        Ok(request) => request,
        Err(rejection) => return rejection,
    };
    let pairs = request.pairs.unwrap_or_default();
    if pairs.is_empty() {
        metrics::record_request(Endpoint::Prices, RequestOutcome::Empty);
        return json(EMPTY);
    }

    let prices = match state.provider.prices(&pairs).await {
        Ok(prices) => prices,
        Err(e) => {
            tracing::error!(error = %e, "Failed to get prices");
            metrics::record_request(Endpoint::Prices, RequestOutcome::ProviderFailed);
            return json(PROVIDER_FAILED);
        }
    };
    if let Err(e) = state.hook.check(&prices).await {
        tracing::error!(error = %e, "Failed to check prices");
        metrics::record_request(Endpoint::Prices, RequestOutcome::HookFailed);
        return json(HOOK_FAILED);
    }

    let buffer = Arc::new(Mutex::new(Vec::new()));
    let out: SharedWriter = buffer.clone();
    let ordered: BTreeMap<_, _> = prices.iter().collect();
    for tick in ordered.into_values() {
        if let Err(e) = state.marshaller.write(&out, Record::Price(tick)) {
            let _ = state.marshaller.write(&out, Record::Error(&e));
        }
    }

    let outcome = match state.marshaller.flush() {
        Ok(()) => RequestOutcome::Served,
        Err(e) => {
            tracing::error!(error = %e, "Failed to marshal response");
            buffer.lock().extend_from_slice(MARSHAL_FAILED.as_bytes());
            RequestOutcome::MarshalFailed
        }
    };
    metrics::record_request(Endpoint::Prices, outcome);

    let body = std::mem::take(&mut *buffer.lock());
    json(body)
}

/// `/price`
pub(super) async fn handle_price(
    State(state): State<AgentState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request: PriceRequest = match decode(Endpoint::Price, &headers, &body) {
        Ok(request) => request,
        Err(rejection) => return rejection,
    };
    let pair = request.pair;
    if pair.is_empty() {
        metrics::record_request(Endpoint::Price, RequestOutcome::Empty);
        return json(EMPTY);
    }

    let prices = match state.provider.prices(std::slice::from_ref(&pair)).await {
        Ok(prices) => prices,
        Err(e) => {
            tracing::error!(pair = %pair, error = %e, "Failed to get prices");
            metrics::record_request(Endpoint::Price, RequestOutcome::ProviderFailed);
            return json(PROVIDER_FAILED);
        }
    };
    if let Err(e) = state.hook.check(&prices).await {
        tracing::error!(pair = %pair, error = %e, "Failed to check prices");
        metrics::record_request(Endpoint::Price, RequestOutcome::HookFailed);
        return json(HOOK_FAILED);
    }

    let Some(tick) = prices.get(&pair) else {
        tracing::info!(pair = %pair, returned = prices.len(), "Invalid price response");
        metrics::record_request(Endpoint::Price, RequestOutcome::NotFound);
        return json(EMPTY);
    };

    match serde_json::to_vec(&PriceRecord::from(tick)) {
        Ok(bytes) => {
            metrics::record_request(Endpoint::Price, RequestOutcome::Served);
            json(bytes)
        }
        Err(e) => {
            tracing::info!(pair = %pair, error = %e, "Failed to encode price");
            metrics::record_request(Endpoint::Price, RequestOutcome::MarshalFailed);
            json(EMPTY)
        }
    }
}

/// Drop the request's handler once the agent is cancelled.
pub(super) async fn close_on_cancel(
    State(cancel): State<CancellationToken>,
    request: Request,
    next: Next,
) -> Response {
    tokio::select! {
        response = next.run(request) => response,
        () = cancel.cancelled() => {
            tracing::debug!("Aborting in-flight request");
            (StatusCode::SERVICE_UNAVAILABLE, SHUTTING_DOWN).into_response()
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn decode<T: for<'de> Deserialize<'de>>(
    endpoint: Endpoint,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<T, Response> {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    if content_type != Some(JSON) {
        metrics::record_request(endpoint, RequestOutcome::UnsupportedMediaType);
        return Err((StatusCode::UNSUPPORTED_MEDIA_TYPE, WRONG_CONTENT_TYPE).into_response());
    }

    // Only the first value counts; anything after it is ignored.
    let decoded = serde_json::Deserializer::from_slice(body)
        .into_iter::<T>()
        .next()
        .unwrap_or_else(|| serde_json::from_slice(body));
    decoded.map_err(|e| {
        metrics::record_request(endpoint, RequestOutcome::BadRequest);
        (StatusCode::BAD_REQUEST, e.to_string()).into_response()
    })
}

fn json(body: impl Into<Body>) -> Response {
    ([(CONTENT_TYPE, JSON)], body.into()).into_response()
}

// =============================================================================
// Tests
// =============================================================================
