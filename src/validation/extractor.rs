use axum::extract::{FromRequest, Request};
#[cfg(feature = "validation")]
use serde::de::DeserializeOwned;

use crate::config::UploadConfig;
use crate::error::Error;
#[cfg(feature = "validation")]
use crate::error::Result;
use crate::http::{Form, bind_form_with_config};
#[cfg(feature = "validation")]
use crate::http::unmarshal_form_with_config;
use crate::validation::ValidationErrors;

/// Upload settings for the extractors: those stored in the request
/// extensions, e.g. by `Extension(config)`, or the defaults.
fn upload_config(req: &Request) -> UploadConfig {
    req.extensions().get::<UploadConfig>().cloned().unwrap_or_default()
}

/// Extractor for a decoded and validated [`Form`].
///
/// Rejects with [`Error::Validation`] (422) holding every decoding and
/// validation error, or with the fatal error that stopped decoding.
///
/// # Example
///
/// ```rust,ignore
/// use tideway_forms::ValidatedForm;
///
/// async fn create_post(ValidatedForm(post): ValidatedForm<Post>) -> String {
///     format!("created {}", post.title)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ValidatedForm<F>(pub F);

impl<F, S> FromRequest<S> for ValidatedForm<F>
where
    F: Form,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let config = upload_config(&req);
        let (form, errs) = bind_form_with_config::<F>(req, &config).await?;

        if !errs.is_empty() {
            tracing::debug!(fields = errs.len(), "Rejecting invalid form");
        }
        errs.into_result()?;
        Ok(ValidatedForm(form))
    }
}

/// Extractor for a form checked with `validator` derive rules.
///
/// The body is decoded like any other form, so JSON, URL-encoded and
/// multipart requests are all accepted. Decoding errors and rule violations
/// are merged into one [`Error::Validation`].
///
/// # Example
///
/// ```rust,no_run
/// use serde::Deserialize;
/// use tideway_forms::validation::{Validated, validator::Validate};
///
/// #[derive(Default, Deserialize, Validate)]
/// struct Signup {
///     #[validate(email)]
///     email: String,
///     #[validate(length(min = 8))]
///     password: String,
/// }
///
/// async fn signup(Validated(form): Validated<Signup>) -> String {
///     form.email
/// }
/// ```
#[cfg(feature = "validation")]
#[derive(Debug, Clone)]
pub struct Validated<T>(pub T);

#[cfg(feature = "validation")]
impl<T, S> FromRequest<S> for Validated<T>
where
    T: DeserializeOwned + Default + validator::Validate + Send,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let config = upload_config(&req);
        let (value, mut errs) = match unmarshal_form_with_config::<T>(req, &config).await {
            Ok(value) => (value, ValidationErrors::new()),
            Err(Error::Validation(errs)) => (T::default(), errs),
            Err(err) => return Err(err),
        };

        if let Err(rules) = value.validate() {
            errs.merge(rules.into());
        }
        errs.into_result()?;
        Ok(Validated(value))
    }
}

/// Run the `validator` rules of an already decoded value.
///
/// # Example
///
/// ```rust,no_run
/// use tideway_forms::validation::{validate_value, validator::Validate};
///
/// #[derive(Validate)]
/// struct Search {
///     #[validate(length(min = 1, max = 100))]
///     q: String,
/// }
///
/// let search = validate_value(Search { q: "rust".into() }).unwrap();
/// assert_eq!(search.q, "rust");
/// ```
#[cfg(feature = "validation")]
pub fn validate_value<T: validator::Validate>(value: T) -> Result<T> {
    value.validate().map_err(ValidationErrors::from)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::testing;
    use async_trait::async_trait;
    use axum::{Extension, Router, http::StatusCode, routing::post};
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, Default, Deserialize)]
    struct Comment {
        author: String,
        text: String,
        #[serde(default)]
        score: u8,
    }

    #[async_trait]
    impl Form for Comment {
        fn fields(&self) -> HashMap<String, String> {
            HashMap::from([
                ("author".to_string(), self.author.clone()),
                ("text".to_string(), self.text.clone()),
            ])
        }

        async fn validate(&self) -> Result<()> {
            let mut errs = ValidationErrors::new();

            if self.text.is_empty() {
                errs.add("text", "field is required");
            }
            errs.into_result()
        }
    }

    async fn create(ValidatedForm(comment): ValidatedForm<Comment>) -> String {
        format!("{}: {}", comment.author, comment.text)
    }

    fn app() -> Router {
        Router::new().route("/comments", post(create))
    }

    #[tokio::test]
    async fn test_validated_form_accepts_valid_form() {
        testing::post(app(), "/comments")
            .form_body(&[("author", "ada"), ("text", "hello")])
            .execute()
            .await
            .assert_ok()
            .assert_contains("ada: hello")
            .await;
    }

    #[tokio::test]
    async fn test_validated_form_rejects_with_field_errors() {
        testing::post(app(), "/comments")
            .form_body(&[("author", "ada"), ("score", "lots")])
            .execute()
            .await
            .assert_unprocessable()
            .assert_json_path("field_errors.text.0", serde_json::json!("field is required"))
            .await
            .assert_json_path("field_errors.score.0", serde_json::json!("cannot unmarshal string \"lots\" to u8"))
            .await;
    }

    #[tokio::test]
    async fn test_validated_form_rejects_unknown_content_type() {
        testing::post(app(), "/comments")
            .raw_body("<comment/>", "application/xml")
            .execute()
            .await
            .assert_unprocessable();
    }

    #[tokio::test]
    async fn test_validated_form_with_config_extension() {
        let config = UploadConfig {
            max_memory: 4,
            ..UploadConfig::default()
        };
        let app = app().layer(Extension(config));

        testing::post(app, "/comments")
            .json_body(&serde_json::json!({"author": "ada", "text": "hi"}))
            .execute()
            .await
            .assert_status(StatusCode::OK);
    }

    #[cfg(feature = "validation")]
    mod rules {
        use super::*;
        use validator::Validate;

        #[derive(Debug, Default, Deserialize, Validate)]
        struct Signup {
            #[validate(email)]
            email: String,
            #[validate(length(min = 8))]
            password: String,
        }

        async fn signup(Validated(form): Validated<Signup>) -> String {
            form.email
        }

        #[tokio::test]
        async fn test_validated_rules_pass() {
            let app = Router::new().route("/signup", post(signup));

            testing::post(app, "/signup")
                .json_body(&serde_json::json!({"email": "ada@example.com", "password": "hunter22"}))
                .execute()
                .await
                .assert_ok()
                .assert_contains("ada@example.com")
                .await;
        }

        #[tokio::test]
        async fn test_validated_rules_fail() {
            let app = Router::new().route("/signup", post(signup));

            testing::post(app, "/signup")
                .form_body(&[("email", "nope"), ("password", "short")])
                .execute()
                .await
                .assert_unprocessable()
                .assert_json_path("field_errors.email.0", serde_json::json!("email"))
                .await
                .assert_json_path("field_errors.password.0", serde_json::json!("length"))
                .await;
        }

        #[test]
        fn test_validate_value() {
            let err = validate_value(Signup::default()).unwrap_err();
            let errs = err.validation_errors().unwrap();

            assert!(errs.contains_field("email"));
            assert!(errs.contains_field("password"));
        }
    }
}
