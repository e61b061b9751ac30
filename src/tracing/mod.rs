//! Request correlation and HTTP tracing helpers.
//!
//! Every request runs inside a `portal.request` span carrying its request id and the
//! matched route template, so log lines for `/api/v1/orders/:id` group together no
//! matter which order was touched.

use axum::{
    extract::MatchedPath,
    http::{Request, Response},
};
use metrics::{counter, histogram};
use std::{cell::RefCell, fmt, future::Future, time::Duration};
use tower_http::{
    classify::{ServerErrorsAsFailures, ServerErrorsFailureClass, SharedClassifier},
    trace::{MakeSpan, OnFailure, OnRequest, OnResponse, TraceLayer},
};
use tracing::Span;
use uuid::Uuid;

/// Correlation id attached to one API call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl Default for RequestId {
    fn default() -> Self {
        RequestId(Uuid::new_v4().to_string())
    }
}

impl RequestId {
    pub fn new(value: impl Into<String>) -> Self {
        RequestId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

tokio::task_local! {
    static CURRENT_REQUEST_ID: RefCell<Option<RequestId>>;
}

/// Runs `future` with `request_id` visible through [`current_request_id`].
pub async fn scope_request_id<Fut, R>(request_id: RequestId, future: Fut) -> R
where
    Fut: Future<Output = R>,
{
    CURRENT_REQUEST_ID
        .scope(RefCell::new(Some(request_id)), future)
        .await
}

pub fn current_request_id() -> Option<RequestId> {
    CURRENT_REQUEST_ID
        .try_with(|cell| cell.borrow().clone())
        .ok()
        .flatten()
}

/// Route template for a request, or its raw path when no route matched.
fn route_of<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

#[derive(Clone, Copy, Default)]
pub struct PortalSpan;

impl<B> MakeSpan<B> for PortalSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default();

        tracing::info_span!(
            "portal.request",
            request_id = %request_id,
            method = %request.method(),
            route = %route_of(request),
            status = tracing::field::Empty,
        )
    }
}

#[derive(Clone, Copy, Default)]
pub struct LogRequest;

impl<B> OnRequest<B> for LogRequest {
    fn on_request(&mut self, request: &Request<B>, _span: &Span) {
        tracing::debug!(uri = %request.uri(), "request started");
    }
}

#[derive(Clone, Copy, Default)]
pub struct RecordResponse;

impl<B> OnResponse<B> for RecordResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let status = response.status();
        span.record("status", status.as_u16());

        let class = match status.as_u16() {
            200..=299 => "2xx",
            300..=399 => "3xx",
            400..=499 => "4xx",
            _ => "5xx",
        };
        counter!("epack_http.responses", 1, "class" => class);
        histogram!("epack_http.latency_seconds", latency.as_secs_f64());

        if status.is_client_error() {
            tracing::info!(status = status.as_u16(), latency_ms = latency.as_millis() as u64, "request rejected");
        } else {
            tracing::info!(status = status.as_u16(), latency_ms = latency.as_millis() as u64, "request finished");
        }
    }
}

#[derive(Clone, Copy, Default)]
pub struct LogFailure;

impl OnFailure<ServerErrorsFailureClass> for LogFailure {
    fn on_failure(&mut self, failure: ServerErrorsFailureClass, latency: Duration, _span: &Span) {
        tracing::error!(
            failure = %failure,
            latency_ms = latency.as_millis() as u64,
            "request failed"
        );
    }
}

pub type HttpTraceLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    PortalSpan,
    LogRequest,
    RecordResponse,
    tower_http::trace::DefaultOnBodyChunk,
    tower_http::trace::DefaultOnEos,
    LogFailure,
>;

/// Trace layer used by the API router.
pub fn configure_http_tracing() -> HttpTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(PortalSpan)
        .on_request(LogRequest)
        .on_response(RecordResponse)
        .on_failure(LogFailure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[tokio::test]
    async fn request_id_is_visible_inside_scope_only() {
        assert!(current_request_id().is_none());

        let seen = scope_request_id(RequestId::new("abc"), async { current_request_id() }).await;
        assert_eq!(seen, Some(RequestId::new("abc")));

        assert!(current_request_id().is_none());
    }

    #[test]
    fn default_request_ids_are_unique() {
        assert_ne!(RequestId::default(), RequestId::default());
    }

    #[test]
    fn unmatched_requests_fall_back_to_the_path() {
        let request = Request::builder()
            .uri("/api/v1/orders/abc?page=2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(route_of(&request), "/api/v1/orders/abc");
    }
}
