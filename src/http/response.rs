//! Response writers for HTML, plain text and JSON bodies
//!
//! Each writer sets `Content-Type` with a UTF-8 charset and an exact
//! `Content-Length`.

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use serde::Serialize;

fn write(body: Vec<u8>, content_type: &'static str, status: StatusCode) -> Response {
    let len = body.len();
    let mut response = Response::new(Body::from(body));

    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    response
}

/// Respond with an HTML document
pub fn html(content: impl Into<String>, status: StatusCode) -> Response {
    write(content.into().into_bytes(), "text/html; charset=utf-8", status)
}

/// Respond with plain text
pub fn text(content: impl Into<String>, status: StatusCode) -> Response {
    write(content.into().into_bytes(), "text/plain; charset=utf-8", status)
}

/// Respond with `data` encoded as JSON.
///
/// Encoding is best-effort: if `data` cannot be encoded the failure is
/// logged and the response is sent with an empty body and the given status.
pub fn json<T: Serialize + ?Sized>(data: &T, status: StatusCode) -> Response {
    let body = serde_json::to_vec(data).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to encode JSON response");
        Vec::new()
    });
    write(body, "application/json; charset=utf-8", status)
}
