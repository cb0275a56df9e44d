//! Address and path helpers

use axum::http::{HeaderMap, Request, Uri, header};

/// The scheme and host the client used to reach this server, such as
/// `https://example.com`.
///
/// `X-Forwarded-Proto` and `X-Forwarded-Host` take precedence when a proxy
/// sets them. Otherwise the scheme comes from the request URI, defaulting to
/// `http`, and the host from the `Host` header or the URI authority.
pub fn base_address<B>(req: &Request<B>) -> String {
    base_address_from_parts(req.headers(), req.uri())
}

/// [`base_address`] for callers holding the request headers and URI.
pub fn base_address_from_parts(headers: &HeaderMap, uri: &Uri) -> String {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    };

    let scheme = get("x-forwarded-proto")
        .or_else(|| uri.scheme_str())
        .unwrap_or("http");

    let host = get("x-forwarded-host")
        .or_else(|| get(header::HOST.as_str()))
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or_default();

    format!("{}://{}", scheme, host)
}

/// The last `/`-separated segment of `path`, or `/` if that is empty.
pub fn base_path(path: &str) -> &str {
    match path.rsplit('/').next() {
        Some(base) if !base.is_empty() => base,
        _ => "/",
    }
}
