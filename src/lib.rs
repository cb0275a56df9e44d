//! Tideway Forms - form and upload handling for Axum
//!
//! Decodes forms from JSON, URL-encoded and multipart requests into typed
//! values, collecting every invalid field into [`ValidationErrors`] instead
//! of failing on the first one. Uploaded files are held in memory up to a
//! threshold and spooled to temporary files beyond it.
//!
//! # Features
//!
//! - **Unmarshalling**: [`unmarshal_form`], [`unmarshal_file`] and their
//!   combinations, driven by the request's `Content-Type`
//! - **Validation**: the [`Form`] trait, the [`Validator`] builder and the
//!   [`ValidatedForm`] extractor
//! - **Files**: [`File`] handles with content sniffing and [`FileValidation`]
//! - **Responses**: [`html`], [`text`] and [`json`] writers
//! - **Sessions**: flashing a failed form and its errors across a redirect
//! - **Testing**: Alba-style HTTP testing utilities
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use axum::{Router, extract::Request, http::StatusCode, response::Response, routing::post};
//! use serde::Deserialize;
//! use std::collections::HashMap;
//! use tideway_forms::{Form, Validator, field_required};
//!
//! #[derive(Default, Deserialize)]
//! struct Post {
//!     title: String,
//!     body: String,
//! }
//!
//! #[async_trait]
//! impl Form for Post {
//!     fn fields(&self) -> HashMap<String, String> {
//!         HashMap::from([
//!             ("title".to_string(), self.title.clone()),
//!             ("body".to_string(), self.body.clone()),
//!         ])
//!     }
//!
//!     async fn validate(&self) -> tideway_forms::Result<()> {
//!         let mut v = Validator::new();
//!         v.add("title", &self.title, field_required);
//!         v.add("body", &self.body, field_required);
//!         v.validate().into_result()
//!     }
//! }
//!
//! async fn create_post(req: Request) -> Result<Response, tideway_forms::Error> {
//!     let post: Post = tideway_forms::unmarshal_form_and_validate(req).await?;
//!     Ok(tideway_forms::text(post.title, StatusCode::CREATED))
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     tideway_forms::init_tracing();
//!
//!     let app: Router = Router::new().route("/posts", post(create_post));
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

mod config;
pub mod decode;
mod error;
pub mod http;
#[cfg(feature = "sessions")]
pub mod session;
pub mod testing;
#[cfg(feature = "sessions")]
pub mod traits;
pub mod utils;
pub mod validation;

// Re-exports for public API
pub use config::{Config, ConfigBuilder, LoggingConfig, UploadConfig};
pub use error::{Error, ErrorResponse, Result};
pub use http::{
    File, FileValidation, Form, base_address, base_address_from_parts, base_path, bind_form,
    bind_form_with_config, detect_content_type, html, human_size, json, text, unmarshal_file,
    unmarshal_file_with_config, unmarshal_files, unmarshal_files_with_config, unmarshal_form,
    unmarshal_form_and_validate, unmarshal_form_with_config, unmarshal_form_with_file,
    unmarshal_form_with_file_and_config, unmarshal_form_with_files, unmarshal_form_with_files_and_config,
};
#[cfg(feature = "sessions")]
pub use session::{InMemorySessionStore, flash_form_with_errors, form_errors, form_fields};
#[cfg(feature = "sessions")]
pub use traits::session::{SessionData, SessionStore};
pub use validation::{
    FieldCause, FieldError, ValidatedForm, ValidationErrors, Validator, field_equals, field_len,
    field_matches, field_max_len, field_min_len, field_required,
};
#[cfg(feature = "validation")]
pub use validation::{Validated, validate_value, validator};

/// Boxed error used as the cause of field errors and checks
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early in your application, typically in main().
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "tideway_forms=debug")
/// - `TIDEWAY_LOG_JSON`: Set to "true" for JSON formatted logs
///
/// # Example
///
/// ```rust,no_run
/// #[tokio::main]
/// async fn main() {
///     tideway_forms::init_tracing();
///     // ... rest of your app
/// }
/// ```
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = utils::get_env_with_prefix("LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing with a custom configuration
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::new(&config.logging.level);

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
