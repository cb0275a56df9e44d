//! Alba-style HTTP testing utilities for Axum applications
//!
//! Drives a [`Router`] with a single request through tower's `oneshot`, so
//! form handlers can be tested without starting a server.
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{Router, routing};
//! use tideway_forms::testing;
//!
//! #[tokio::test]
//! async fn test_signup_requires_email() {
//!     let app = Router::new().route("/signup", routing::post(signup));
//!
//!     testing::post(app, "/signup")
//!         .form_body(&[("name", "Ada")])
//!         .execute()
//!         .await
//!         .assert_unprocessable()
//!         .assert_json_path("field_errors.email.0", serde_json::json!("field is required"))
//!         .await;
//! }
//! ```

use axum::{
    Router,
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request, StatusCode, header},
};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;

use super::MultipartBuilder;

/// Alba-style test scenario builder for easy endpoint testing
pub struct Scenario {
    app: Router,
    request: Request<Body>,
}

impl Scenario {
    /// Create a new test scenario with the given app
    pub fn new(app: Router) -> Self {
        let mut request = Request::new(Body::empty());
        *request.method_mut() = Method::GET;

        Self { app, request }
    }

    /// Set the HTTP method
    pub fn method(mut self, method: Method) -> Self {
        *self.request.method_mut() = method;
        self
    }

    /// Set the URI/path
    pub fn uri(mut self, uri: &str) -> Self {
        *self.request.uri_mut() = uri.parse().expect("invalid test URI");
        self
    }

    /// Add a header
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.request.headers_mut().insert(
            HeaderName::from_bytes(key.as_bytes()).expect("invalid header name"),
            HeaderValue::from_str(value).expect("invalid header value"),
        );
        self
    }

    /// Add query parameters to the request URI
    pub fn with_query(self, params: &[(&str, &str)]) -> Self {
        let uri = self.request.uri().clone();
        let mut query_parts = vec![];

        if let Some(query) = uri.query() {
            query_parts.push(query.to_string());
        }
        for (key, value) in params {
            query_parts.push(format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)));
        }

        let new_uri = if query_parts.is_empty() {
            uri.path().to_string()
        } else {
            format!("{}?{}", uri.path(), query_parts.join("&"))
        };
        self.uri(&new_uri)
    }

    /// Set JSON body from a serializable type
    pub fn json_body<T: Serialize>(self, body: &T) -> Self {
        let json = serde_json::to_vec(body).expect("failed to serialize test body");
        self.raw_body(json, "application/json")
    }

    /// Set an `application/x-www-form-urlencoded` body
    pub fn form_body(self, fields: &[(&str, &str)]) -> Self {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        self.raw_body(encoded, "application/x-www-form-urlencoded")
    }

    /// Set a `multipart/form-data` body
    pub fn multipart_body(self, form: MultipartBuilder) -> Self {
        let content_type = form.content_type();
        self.raw_body(form.build(), &content_type)
    }

    /// Set the body and its content type
    pub fn raw_body(mut self, body: impl Into<Body>, content_type: &str) -> Self {
        *self.request.body_mut() = body.into();
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Set plain text body without a content type
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        *self.request.body_mut() = Body::from(body.into());
        self
    }

    /// Execute the request and get an assertion builder
    pub async fn execute(self) -> ScenarioAssert {
        let response = self.app.oneshot(self.request).await.expect("router is infallible");
        ScenarioAssert { response }
    }
}

/// Assertion builder for test responses
pub struct ScenarioAssert {
    response: axum::response::Response,
}

impl ScenarioAssert {
    /// Assert the response status code
    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.response.status(),
            expected,
            "Expected status {}, got {}",
            expected,
            self.response.status()
        );
        self
    }

    /// Assert status is 200 OK
    pub fn assert_ok(self) -> Self {
        self.assert_status(StatusCode::OK)
    }

    /// Assert status is 400 Bad Request
    pub fn assert_bad_request(self) -> Self {
        self.assert_status(StatusCode::BAD_REQUEST)
    }

    /// Assert status is 415 Unsupported Media Type
    pub fn assert_unsupported_media_type(self) -> Self {
        self.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE)
    }

    /// Assert status is 422 Unprocessable Entity, the status for field errors
    pub fn assert_unprocessable(self) -> Self {
        self.assert_status(StatusCode::UNPROCESSABLE_ENTITY)
    }

    /// Assert status is 500 Internal Server Error
    pub fn assert_server_error(self) -> Self {
        self.assert_status(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Assert a header exists with the given value
    pub fn assert_header(self, key: &str, expected: &str) -> Self {
        let value = self
            .response
            .headers()
            .get(key)
            .unwrap_or_else(|| panic!("Header '{}' not found", key))
            .to_str()
            .unwrap();
        assert_eq!(value, expected, "Header '{}' value mismatch", key);
        self
    }

    /// Assert the response content type is JSON
    pub fn assert_json(self) -> Self {
        let content_type = self
            .response
            .headers()
            .get(header::CONTENT_TYPE)
            .expect("Content-Type header not found")
            .to_str()
            .unwrap();
        assert!(
            content_type.contains("application/json"),
            "Expected JSON content type, got: {}",
            content_type
        );
        self
    }

    /// Get the response body as bytes
    pub async fn body_bytes(self) -> Vec<u8> {
        axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    /// Get the response body as a string
    pub async fn body_string(self) -> String {
        String::from_utf8(self.body_bytes().await).unwrap()
    }

    /// Parse the JSON response body into a type
    pub async fn json<T: for<'de> Deserialize<'de>>(self) -> T {
        let bytes = self.body_bytes().await;
        serde_json::from_slice(&bytes).expect("Failed to parse JSON response")
    }

    /// Assert a JSON value by dotted path, e.g. `field_errors.title.0`
    pub async fn assert_json_path(self, path: &str, expected: serde_json::Value) -> Self {
        let (parts, body) = self.response.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        let actual =
            json_path_get(&json, path).unwrap_or_else(|| panic!("Path '{}' not found in JSON: {}", path, json));
        assert_eq!(actual, &expected, "JSON path '{}' value mismatch", path);

        Self {
            response: axum::response::Response::from_parts(parts, Body::from(bytes)),
        }
    }

    /// Assert the response body contains the given text
    pub async fn assert_contains(self, text: &str) -> Self {
        let (parts, body) = self.response.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        let body = String::from_utf8_lossy(&bytes);
        assert!(
            body.contains(text),
            "Response body does not contain '{}'. Body: {}",
            text,
            body
        );

        Self {
            response: axum::response::Response::from_parts(parts, Body::from(bytes)),
        }
    }

    /// Get the underlying response for custom assertions
    pub fn response(self) -> axum::response::Response {
        self.response
    }
}

/// Dotted path lookup; numeric segments index into arrays
fn json_path_get<'a>(json: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.').try_fold(json, |current, part| match part.parse::<usize>() {
        Ok(index) => current.get(index),
        Err(_) => current.get(part),
    })
}

/// Convenience function to create a GET request scenario
pub fn get(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::GET).uri(uri)
}

/// Convenience function to create a POST request scenario
pub fn post(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::POST).uri(uri)
}

/// Convenience function to create a PUT request scenario
pub fn put(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::PUT).uri(uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post as axum_post;

    async fn echo(headers: axum::http::HeaderMap, body: String) -> String {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        format!("{}\n{}", content_type, body)
    }

    #[tokio::test]
    async fn test_form_body_is_encoded() {
        let app = Router::new().route("/echo", axum_post(echo));

        post(app, "/echo")
            .form_body(&[("title", "a b"), ("tag", "x&y")])
            .execute()
            .await
            .assert_ok()
            .assert_contains("application/x-www-form-urlencoded\ntitle=a+b&tag=x%26y")
            .await;
    }

    #[tokio::test]
    async fn test_multipart_body_sets_boundary() {
        let app = Router::new().route("/echo", axum_post(echo));
        let form = MultipartBuilder::new().text("title", "hello");
        let boundary = form.boundary().to_string();

        post(app, "/echo")
            .multipart_body(form)
            .execute()
            .await
            .assert_ok()
            .assert_contains(&format!("multipart/form-data; boundary={}", boundary))
            .await
            .assert_contains("name=\"title\"\r\n\r\nhello")
            .await;
    }

    #[tokio::test]
    async fn test_with_query_keeps_existing_params() {
        let app = Router::new().route(
            "/echo",
            axum_post(|uri: axum::http::Uri| async move { uri.query().unwrap_or_default().to_string() }),
        );

        let body = post(app, "/echo?a=1")
            .with_query(&[("b", "two words")])
            .execute()
            .await
            .assert_ok()
            .body_string()
            .await;

        assert_eq!(body, "a=1&b=two%20words");
    }

    #[test]
    fn test_json_path_get() {
        let json = serde_json::json!({"field_errors": {"title": ["field is required"]}});

        assert_eq!(
            json_path_get(&json, "field_errors.title.0"),
            Some(&serde_json::json!("field is required"))
        );
        assert_eq!(json_path_get(&json, "field_errors.body"), None);
    }
}
