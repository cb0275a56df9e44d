//! Testing utilities for form handlers
//!
//! This module provides:
//! - Alba-style HTTP endpoint testing without running a server
//! - A builder for `multipart/form-data` bodies
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{Router, routing};
//! use tideway_forms::testing::{self, MultipartBuilder};
//!
//! #[tokio::test]
//! async fn test_upload_avatar() {
//!     let app = Router::new().route("/avatar", routing::post(upload_avatar));
//!
//!     let form = MultipartBuilder::new()
//!         .text("name", "Ada")
//!         .file_with_type("avatar", "ada.png", "image/png", png_bytes());
//!
//!     testing::post(app, "/avatar")
//!         .multipart_body(form)
//!         .execute()
//!         .await
//!         .assert_ok();
//! }
//! ```

mod multipart;
mod scenario;

pub use multipart::MultipartBuilder;
pub use scenario::{Scenario, ScenarioAssert, get, post, put};
