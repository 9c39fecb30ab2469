use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, debug, error, info_span, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 64;

/// Runs each request inside a span keyed by its request id and logs the outcome.
///
/// A well-formed incoming `x-request-id` is kept so callers can correlate
/// their own logs; anything else is replaced by a fresh UUID. The id is
/// echoed on every response.
pub async fn trace_requests(request: Request<Body>, next: Next) -> Response {
    let request_id = incoming_request_id(request.headers())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = info_span!(
        "http.request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let start = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    let elapsed_ms = start.elapsed().as_millis();

    let status = response.status();
    span.in_scope(|| {
        if status.is_client_error() || status.is_server_error() {
            let report = response.extensions_mut().remove::<ErrorReport>();
            log_failure(status, report, elapsed_ms);
        } else {
            debug!(status = status.as_u16(), elapsed_ms, "request served");
        }
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn incoming_request_id(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?;
    let valid = !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LEN
        && value
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.'));
    valid.then(|| value.to_string())
}

fn log_failure(status: StatusCode, report: Option<ErrorReport>, elapsed_ms: u128) {
    let (source, messages) = report
        .map(|report| (report.source, report.messages))
        .unwrap_or(("unknown", Vec::new()));
    let detail = messages
        .first()
        .map_or("no diagnostic available", String::as_str);

    if status.is_server_error() {
        error!(
            target: "muster::http::response",
            status = status.as_u16(),
            elapsed_ms,
            source,
            detail,
            chain = ?messages,
            "request failed"
        );
    } else {
        warn!(
            target: "muster::http::response",
            status = status.as_u16(),
            elapsed_ms,
            source,
            detail,
            "request rejected"
        );
    }
}
