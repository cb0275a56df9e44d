//! Tests for unmarshalling and validating forms through a router

use async_trait::async_trait;
use axum::{
    Router,
    extract::Request,
    http::StatusCode,
    response::Response,
    routing::post,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tideway_forms::testing::{self, MultipartBuilder};
use tideway_forms::{Error, Form, ValidatedForm, ValidationErrors, Validator, field_max_len, field_required};

#[derive(Debug, Default, Deserialize, Serialize)]
struct Post {
    title: String,
    body: String,
}

#[async_trait]
impl Form for Post {
    fn fields(&self) -> HashMap<String, String> {
        HashMap::from([
            ("title".to_string(), self.title.clone()),
            ("body".to_string(), self.body.clone()),
        ])
    }

    async fn validate(&self) -> tideway_forms::Result<()> {
        let mut v = Validator::new();
        v.add("title", &self.title, field_required)
            .add("title", &self.title, field_max_len(20))
            .add("body", &self.body, field_required);
        v.validate().into_result()
    }
}

async fn create_post(req: Request) -> Result<Response, Error> {
    let post: Post = tideway_forms::unmarshal_form_and_validate(req).await?;
    Ok(tideway_forms::json(&post, StatusCode::CREATED))
}

async fn bind_post(req: Request) -> Result<Response, Error> {
    let (post, errs): (Post, ValidationErrors) = tideway_forms::bind_form(req).await?;
    Ok(tideway_forms::json(
        &json!({"form": post, "errors": errs}),
        StatusCode::OK,
    ))
}

async fn create_validated(ValidatedForm(post): ValidatedForm<Post>) -> Response {
    tideway_forms::text(post.title, StatusCode::CREATED)
}

fn app() -> Router {
    Router::new()
        .route("/posts", post(create_post))
        .route("/posts/bind", post(bind_post))
        .route("/posts/validated", post(create_validated))
}

#[tokio::test]
async fn test_urlencoded_post() {
    testing::post(app(), "/posts")
        .form_body(&[("title", "Hello"), ("body", "World")])
        .execute()
        .await
        .assert_status(StatusCode::CREATED)
        .assert_json()
        .assert_json_path("title", json!("Hello"))
        .await
        .assert_json_path("body", json!("World"))
        .await;
}

#[tokio::test]
async fn test_json_post() {
    testing::post(app(), "/posts")
        .json_body(&json!({"title": "Hello", "body": "World"}))
        .execute()
        .await
        .assert_status(StatusCode::CREATED)
        .assert_json_path("title", json!("Hello"))
        .await;
}

#[tokio::test]
async fn test_multipart_post() {
    let form = MultipartBuilder::new().text("title", "Hello").text("body", "World");

    testing::post(app(), "/posts")
        .multipart_body(form)
        .execute()
        .await
        .assert_status(StatusCode::CREATED)
        .assert_json_path("body", json!("World"))
        .await;
}

#[tokio::test]
async fn test_query_values_fill_form() {
    testing::post(app(), "/posts?body=From+query")
        .form_body(&[("title", "Hello")])
        .execute()
        .await
        .assert_status(StatusCode::CREATED)
        .assert_json_path("body", json!("From query"))
        .await;
}

#[tokio::test]
async fn test_empty_request_reports_every_field() {
    testing::post(app(), "/posts")
        .form_body(&[])
        .execute()
        .await
        .assert_unprocessable()
        .assert_json_path("error", json!("Validation failed"))
        .await
        .assert_json_path("field_errors.title.0", json!("field is required"))
        .await
        .assert_json_path("field_errors.title.1", json!("Title field is required"))
        .await
        .assert_json_path("field_errors.body.0", json!("Body field is required"))
        .await;
}

#[tokio::test]
async fn test_empty_json_body_validates_default() {
    testing::post(app(), "/posts")
        .raw_body("", "application/json")
        .execute()
        .await
        .assert_unprocessable()
        .assert_json_path("field_errors.title.0", json!("Title field is required"))
        .await
        .assert_json_path("field_errors.body.0", json!("Body field is required"))
        .await;
}

#[tokio::test]
async fn test_wrong_json_types_report_both_fields() {
    let body: serde_json::Value = testing::post(app(), "/posts")
        .json_body(&json!({"title": -1, "body": [1, 2, 3]}))
        .execute()
        .await
        .assert_unprocessable()
        .json()
        .await;

    let errs: ValidationErrors = serde_json::from_value(body["field_errors"].clone()).unwrap();
    assert!(errs.has("title", "cannot unmarshal integer `-1` to a string"));
    assert!(errs.has("body", "cannot unmarshal sequence to a string"));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    testing::post(app(), "/posts")
        .raw_body("{\"title\": ", "application/json")
        .execute()
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn test_validation_rules_after_decoding() {
    testing::post(app(), "/posts")
        .form_body(&[("title", "A title well over twenty characters"), ("body", "x")])
        .execute()
        .await
        .assert_unprocessable()
        .assert_json_path(
            "field_errors.title.0",
            json!("Title cannot be longer than 20 characters in length"),
        )
        .await;
}

#[tokio::test]
async fn test_bind_form_keeps_submitted_values() {
    testing::post(app(), "/posts/bind")
        .form_body(&[("title", "Draft"), ("body", "")])
        .execute()
        .await
        .assert_ok()
        .assert_json_path("form.title", json!("Draft"))
        .await
        .assert_json_path("errors.body.0", json!("Body field is required"))
        .await;
}

#[tokio::test]
async fn test_bind_form_falls_back_to_default() {
    testing::post(app(), "/posts/bind")
        .form_body(&[("title", "Draft")])
        .execute()
        .await
        .assert_ok()
        .assert_json_path("form.title", json!(""))
        .await
        .assert_json_path("errors.body.0", json!("field is required"))
        .await;
}

#[tokio::test]
async fn test_validated_form_extractor() {
    testing::post(app(), "/posts/validated")
        .json_body(&json!({"title": "Hello", "body": "World"}))
        .execute()
        .await
        .assert_status(StatusCode::CREATED)
        .assert_header("content-type", "text/plain; charset=utf-8")
        .assert_contains("Hello")
        .await;

    testing::post(app(), "/posts/validated")
        .json_body(&json!({"title": "Hello"}))
        .execute()
        .await
        .assert_unprocessable()
        .assert_json_path("field_errors.body.0", json!("field is required"))
        .await;
}

#[tokio::test]
async fn test_invalid_multipart_boundary_is_bad_request() {
    testing::post(app(), "/posts")
        .raw_body("--x\r\n", "multipart/form-data")
        .execute()
        .await
        .assert_bad_request();
}
