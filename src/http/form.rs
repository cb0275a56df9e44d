//! Unmarshalling forms and files from requests
//!
//! The request's `Content-Type` decides how the body is read. JSON bodies are
//! decoded as JSON. URL-encoded and multipart bodies are decoded from their
//! form values, merged with the URL query. Decode failures that concern a
//! particular field are reported as [`Error::Validation`], so a single request
//! can report every invalid field at once.

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderMap, header, request::Parts};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

use crate::config::UploadConfig;
use crate::decode::{FormValues, decode_fields};
use crate::error::{Error, Result};
use crate::http::file::{File, Spool, human_size};
use crate::http::multipart::FormData;
use crate::validation::{FieldError, ValidationErrors};

/// A form submitted in a request.
///
/// `Default` supplies the value validated when the body could not be
/// decoded, and the value returned for an empty JSON body.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use serde::Deserialize;
/// use std::collections::HashMap;
/// use tideway_forms::{Form, Result, ValidationErrors};
///
/// #[derive(Default, Deserialize)]
/// struct Post {
///     title: String,
///     body: String,
/// }
///
/// #[async_trait]
/// impl Form for Post {
///     fn fields(&self) -> HashMap<String, String> {
///         HashMap::from([
///             ("title".to_string(), self.title.clone()),
///             ("body".to_string(), self.body.clone()),
///         ])
///     }
///
///     async fn validate(&self) -> Result<()> {
///         let mut errs = ValidationErrors::new();
///
///         if self.title.is_empty() {
///             errs.add("title", "field is required");
///         }
///         errs.into_result()
///     }
/// }
/// ```
#[async_trait]
pub trait Form: DeserializeOwned + Default + Send + Sync {
    /// The submitted values keyed by field name, for re-populating the form
    /// after a failed submission.
    fn fields(&self) -> HashMap<String, String>;

    /// Validate the decoded form.
    ///
    /// Return [`Error::Validation`] for field errors. Any other error is
    /// treated as fatal.
    async fn validate(&self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ContentKind {
    Json,
    UrlEncoded,
    Multipart { boundary: String },
    Other,
}

impl ContentKind {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let content_type = content_type(headers);
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        let kind = if mime.starts_with("application/json") {
            Self::Json
        } else if mime == "application/x-www-form-urlencoded" {
            Self::UrlEncoded
        } else if mime == "multipart/form-data" {
            Self::Multipart {
                boundary: multer::parse_boundary(content_type)?,
            }
        } else {
            Self::Other
        };
        Ok(kind)
    }
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Read the form values of a request: the body values for URL-encoded and
/// multipart bodies, followed by the URL query.
async fn read_form(kind: ContentKind, parts: &Parts, body: Body, config: &UploadConfig) -> Result<FormData> {
    let mut form = match kind {
        ContentKind::Multipart { boundary } => FormData::read_multipart(body, boundary, config).await?,
        ContentKind::UrlEncoded => {
            let bytes = axum::body::to_bytes(body, usize::MAX).await?;
            FormData::from(FormValues::parse(&bytes))
        }
        ContentKind::Json | ContentKind::Other => FormData::default(),
    };

    if let Some(query) = parts.uri.query() {
        form.values.extend_encoded(query.as_bytes());
    }
    Ok(form)
}

async fn decode_json_body<F>(body: Body) -> Result<F>
where
    F: DeserializeOwned + Default,
{
    let bytes = axum::body::to_bytes(body, usize::MAX).await?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(F::default());
    }
    let value: serde_json::Value = serde_json::from_slice(&bytes)?;

    if value.is_null() {
        return Ok(F::default());
    }
    Ok(decode_fields(value)?)
}

/// Decode the request into `F`.
///
/// JSON bodies are decoded as JSON, and an empty JSON body yields
/// `F::default()`, as does a JSON `null`. Otherwise `F` is decoded from the form values of a
/// URL-encoded or multipart body, merged with the URL query. Unknown keys
/// are ignored.
///
/// # Errors
///
/// Missing required fields and values that cannot be converted are returned
/// together as [`Error::Validation`]. A malformed body or any other failure is
/// returned as a fatal error.
pub async fn unmarshal_form<F>(req: Request) -> Result<F>
where
    F: DeserializeOwned + Default,
{
    unmarshal_form_with_config(req, &UploadConfig::default()).await
}

/// [`unmarshal_form`] with explicit upload settings for multipart bodies.
pub async fn unmarshal_form_with_config<F>(req: Request, config: &UploadConfig) -> Result<F>
where
    F: DeserializeOwned + Default,
{
    let (parts, body) = req.into_parts();
    let kind = ContentKind::from_headers(&parts.headers)?;
    tracing::debug!(kind = ?kind, path = %parts.uri.path(), "Unmarshalling form");

    if kind == ContentKind::Json {
        return decode_json_body(body).await;
    }

    let form = read_form(kind, &parts, body, config).await?;
    Ok(decode_fields(form.values)?)
}

async fn run_validation<F: Form>(form: &F, mut errs: ValidationErrors) -> Result<ValidationErrors> {
    match form.validate().await {
        Ok(()) => {}
        Err(Error::Validation(more)) => errs.merge(more),
        Err(err) => return Err(err),
    }
    Ok(errs)
}

/// Decode and validate the request, returning the form together with every
/// field error found.
///
/// Validation runs even when decoding produced field errors, against
/// `F::default()`, and both sets of errors are merged. Use this when the form
/// is needed after a failed submission, e.g. to flash it back to the user.
///
/// # Errors
///
/// Only fatal errors are returned as `Err`. A fatal decoding error skips
/// validation.
pub async fn bind_form<F: Form>(req: Request) -> Result<(F, ValidationErrors)> {
    bind_form_with_config(req, &UploadConfig::default()).await
}

/// [`bind_form`] with explicit upload settings for multipart bodies.
pub async fn bind_form_with_config<F: Form>(req: Request, config: &UploadConfig) -> Result<(F, ValidationErrors)> {
    let (form, errs) = match unmarshal_form_with_config::<F>(req, config).await {
        Ok(form) => (form, ValidationErrors::new()),
        Err(Error::Validation(errs)) => (F::default(), errs),
        Err(err) => return Err(err),
    };

    let errs = run_validation(&form, errs).await?;
    Ok((form, errs))
}

/// Decode and validate the request.
///
/// # Errors
///
/// Returns [`Error::Validation`] holding the decoding and validation errors
/// merged, or a fatal error.
pub async fn unmarshal_form_and_validate<F: Form>(req: Request) -> Result<F> {
    let (form, errs) = bind_form(req).await?;

    errs.into_result()?;
    Ok(form)
}

async fn read_body_file(field: &str, body: Body, config: &UploadConfig) -> Result<Option<File>> {
    let mut stream = body.into_data_stream();
    let mut spool = Spool::new(config);

    while let Some(chunk) = stream.next().await {
        spool.push(chunk?).await?;
    }
    Ok(spool.finish(field, None).await?)
}

/// Extract an uploaded file from the request.
///
/// For a multipart request this is the first file submitted under `field`.
/// For any other request the whole body is the file. The content type of the
/// file is sniffed from its first bytes.
///
/// Returns `Ok(None)` when no file was sent.
pub async fn unmarshal_file(field: &str, req: Request) -> Result<Option<File>> {
    unmarshal_file_with_config(field, req, &UploadConfig::default()).await
}

/// [`unmarshal_file`] with explicit upload settings.
pub async fn unmarshal_file_with_config(field: &str, req: Request, config: &UploadConfig) -> Result<Option<File>> {
    let (parts, body) = req.into_parts();

    match ContentKind::from_headers(&parts.headers)? {
        ContentKind::Multipart { boundary } => {
            let mut form = FormData::read_multipart(body, boundary, config).await?;
            Ok(form.take_files(field).into_iter().next())
        }
        _ => read_body_file(field, body, config).await,
    }
}

/// Extract every file submitted under `field` in a multipart request.
///
/// Returns `Ok(None)` when no file was sent.
///
/// # Errors
///
/// Fails with [`Error::InvalidRequestType`] if the request is not
/// `multipart/form-data`.
pub async fn unmarshal_files(field: &str, req: Request) -> Result<Option<Vec<File>>> {
    unmarshal_files_with_config(field, req, &UploadConfig::default()).await
}

/// [`unmarshal_files`] with explicit upload settings.
pub async fn unmarshal_files_with_config(
    field: &str,
    req: Request,
    config: &UploadConfig,
) -> Result<Option<Vec<File>>> {
    let (parts, body) = req.into_parts();

    let ContentKind::Multipart { boundary } = ContentKind::from_headers(&parts.headers)? else {
        return Err(Error::invalid_request_type(content_type(&parts.headers)));
    };
    let mut form = FormData::read_multipart(body, boundary, config).await?;

    Ok(non_empty(form.take_files(field)))
}

fn non_empty(files: Vec<File>) -> Option<Vec<File>> {
    if files.is_empty() { None } else { Some(files) }
}

/// Decode a form and extract a file from the same request.
///
/// For a multipart request the form is decoded from the text parts and the
/// URL query. For any other request the body is the file and the form is
/// decoded from the URL query alone.
pub async fn unmarshal_form_with_file<F>(field: &str, req: Request) -> Result<(F, Option<File>)>
where
    F: DeserializeOwned + Default,
{
    unmarshal_form_with_file_and_config(field, req, &UploadConfig::default()).await
}

/// [`unmarshal_form_with_file`] with explicit upload settings.
pub async fn unmarshal_form_with_file_and_config<F>(
    field: &str,
    req: Request,
    config: &UploadConfig,
) -> Result<(F, Option<File>)>
where
    F: DeserializeOwned + Default,
{
    let (parts, body) = req.into_parts();

    let (values, file) = match ContentKind::from_headers(&parts.headers)? {
        kind @ ContentKind::Multipart { .. } => {
            let mut form = read_form(kind, &parts, body, config).await?;
            let file = form.take_files(field).into_iter().next();
            (form.values, file)
        }
        _ => {
            let file = read_body_file(field, body, config).await?;
            let values = parts
                .uri
                .query()
                .map(|q| FormValues::parse(q.as_bytes()))
                .unwrap_or_default();
            (values, file)
        }
    };

    let form = decode_fields(values)?;
    Ok((form, file))
}

/// Decode a form and extract every file submitted under `field` from a
/// multipart request.
///
/// # Errors
///
/// Fails with [`Error::InvalidRequestType`] if the request is not
/// `multipart/form-data`.
pub async fn unmarshal_form_with_files<F>(field: &str, req: Request) -> Result<(F, Option<Vec<File>>)>
where
    F: DeserializeOwned + Default,
{
    unmarshal_form_with_files_and_config(field, req, &UploadConfig::default()).await
}

/// [`unmarshal_form_with_files`] with explicit upload settings.
pub async fn unmarshal_form_with_files_and_config<F>(
    field: &str,
    req: Request,
    config: &UploadConfig,
) -> Result<(F, Option<Vec<File>>)>
where
    F: DeserializeOwned + Default,
{
    let (parts, body) = req.into_parts();

    let kind @ ContentKind::Multipart { .. } = ContentKind::from_headers(&parts.headers)? else {
        return Err(Error::invalid_request_type(content_type(&parts.headers)));
    };
    let mut form = read_form(kind, &parts, body, config).await?;
    let files = non_empty(form.take_files(field));

    let decoded = decode_fields(form.values)?;
    Ok((decoded, files))
}

/// Size and content type rules for an uploaded file
///
/// # Example
///
/// ```rust
/// use tideway_forms::FileValidation;
///
/// let rules = FileValidation::new("avatar", 2 * 1024 * 1024).allow(["image/png", "image/jpeg"]);
/// let errs = rules.validate(None);
///
/// assert_eq!(errs.first("avatar"), "avatar field is required");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileValidation {
    /// Name of the field the file is reported under
    pub field: String,

    /// Maximum file size in bytes, 0 for no limit
    pub max_size: u64,

    /// MIME types to allow or deny
    pub mimes: Vec<String>,

    /// Whether `mimes` lists allowed types rather than denied ones
    pub allow: bool,
}

impl FileValidation {
    pub fn new(field: impl Into<String>, max_size: u64) -> Self {
        Self {
            field: field.into(),
            max_size,
            ..Default::default()
        }
    }

    /// Only allow the given MIME types, replacing any earlier list.
    pub fn allow<I, S>(mut self, mimes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mimes = mimes.into_iter().map(Into::into).collect();
        self.allow = true;
        self
    }

    /// Reject the given MIME types, replacing any earlier list.
    pub fn disallow<I, S>(mut self, mimes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mimes = mimes.into_iter().map(Into::into).collect();
        self.allow = false;
        self
    }

    /// Check a file against these rules.
    ///
    /// A missing file is reported as required. A type outside the allowed
    /// list is reported once per listed type.
    pub fn validate(&self, file: Option<&File>) -> ValidationErrors {
        let mut errs = ValidationErrors::new();

        let Some(file) = file else {
            errs.add(&self.field, FieldError::required(&self.field));
            return errs;
        };

        if self.max_size > 0 && file.size() > self.max_size {
            errs.add(
                &self.field,
                format!("{} cannot be bigger than {}", self.field, human_size(self.max_size)),
            );
        }

        if self.mimes.is_empty() {
            return errs;
        }

        let list = self.mimes.join(", ");
        let mime = file.mime_type();

        if self.allow {
            if !self.mimes.iter().any(|m| m.eq_ignore_ascii_case(mime)) {
                for _ in &self.mimes {
                    errs.add(&self.field, format!("{} must be one of {}", self.field, list));
                }
            }
        } else {
            for _ in self.mimes.iter().filter(|m| m.eq_ignore_ascii_case(mime)) {
                errs.add(&self.field, format!("{} cannot be one of {}", self.field, list));
            }
        }
        errs
    }
}
