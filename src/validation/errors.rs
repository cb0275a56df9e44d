//! Field-level validation errors
//!
//! [`ValidationErrors`] is the shape every validation failure takes in this
//! crate: a map from field name to the ordered list of messages recorded
//! against it. Unmarshalling and validation both produce one, and the two are
//! merged before deciding whether a request was valid.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};

/// Records the validation errors for a form, keyed by field.
///
/// A field only ever appears once it has at least one message, so an empty
/// set means success. Messages within a field keep the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: HashMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the message of `err` to the given field.
    ///
    /// Errors that render as an empty string are ignored.
    pub fn add(&mut self, field: impl Into<String>, err: impl fmt::Display) {
        let msg = err.to_string();

        if msg.is_empty() {
            return;
        }
        self.fields.entry(field.into()).or_default().push(msg);
    }

    /// Append the error held in `err`, if any.
    pub fn add_opt<E: fmt::Display>(&mut self, field: impl Into<String>, err: Option<E>) {
        if let Some(err) = err {
            self.add(field, err);
        }
    }

    /// Append the error of a failed check. `Ok(())` leaves the set untouched.
    pub fn add_result<E: fmt::Display>(&mut self, field: impl Into<String>, res: std::result::Result<(), E>) {
        self.add_opt(field, res.err());
    }

    /// Merge every message from `other` into this set, after any messages
    /// already recorded for the same field.
    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, msgs) in other.fields {
            if msgs.is_empty() {
                continue;
            }
            self.fields.entry(field).or_default().extend(msgs);
        }
    }

    /// The first message recorded for `field`, or an empty string.
    pub fn first(&self, field: &str) -> &str {
        self.fields
            .get(field)
            .and_then(|msgs| msgs.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// All messages recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Whether `msg` was recorded against `field`.
    pub fn has(&self, field: &str, msg: impl fmt::Display) -> bool {
        let msg = msg.to_string();

        self.fields
            .get(field)
            .is_some_and(|msgs| msgs.iter().any(|m| *m == msg))
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Number of fields with at least one error.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Returns `None` when no errors were recorded, otherwise the set itself.
    pub fn err(self) -> Option<Self> {
        if self.is_empty() { None } else { Some(self) }
    }

    /// Convert the set into a result: `Ok(())` if empty, otherwise
    /// [`Error::Validation`].
    ///
    /// Producers of validation errors return this, and callers inspect the
    /// result to decide success.
    pub fn into_result(self) -> Result<()> {
        match self.err() {
            None => Ok(()),
            Some(errs) => Err(Error::Validation(errs)),
        }
    }

    pub fn into_inner(self) -> HashMap<String, Vec<String>> {
        self.fields
    }
}

impl From<HashMap<String, Vec<String>>> for ValidationErrors {
    fn from(fields: HashMap<String, Vec<String>>) -> Self {
        let fields = fields.into_iter().filter(|(_, v)| !v.is_empty()).collect();
        Self { fields }
    }
}

impl<K: Into<String>, E: fmt::Display> FromIterator<(K, E)> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = (K, E)>>(iter: I) -> Self {
        let mut errs = Self::new();

        for (field, err) in iter {
            errs.add(field, err);
        }
        errs
    }
}

/// Renders each field as a block:
///
/// ```text
/// field:
///     error
///     error
/// ```
impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (field, msgs) in &self.fields {
            writeln!(f, "{}:", field)?;

            for msg in msgs {
                writeln!(f, "    {}", msg)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(feature = "validation")]
impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut errs = Self::new();

        for (field, field_errors) in errors.field_errors() {
            for error in field_errors.iter() {
                let msg = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                errs.add(field.to_string(), msg);
            }
        }
        errs
    }
}

/// An error recorded against a single field, rendered as `"<field> <cause>"`.
#[derive(Debug, thiserror::Error)]
#[error("{name} {source}")]
pub struct FieldError {
    name: String,
    #[source]
    source: crate::BoxError,
}

/// The cause behind the standard field errors.
///
/// `Required` is also what unmarshalling records for a missing field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FieldCause {
    #[error("field is required")]
    Required,
    #[error("already exists")]
    Exists,
}

impl FieldError {
    pub fn new(name: impl Into<String>, err: impl Into<crate::BoxError>) -> Self {
        Self {
            name: name.into(),
            source: err.into(),
        }
    }

    /// `"<name> field is required"`
    pub fn required(name: impl Into<String>) -> Self {
        Self::new(name, FieldCause::Required)
    }

    /// `"<name> already exists"`
    pub fn exists(name: impl Into<String>) -> Self {
        Self::new(name, FieldCause::Exists)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying cause.
    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.source.as_ref()
    }

    pub fn into_cause(self) -> crate::BoxError {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errs(pairs: &[(&str, &str)]) -> ValidationErrors {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_add_appends_in_order() {
        let mut errs = ValidationErrors::new();
        errs.add("email", "is invalid");
        errs.add("email", "already exists");

        assert_eq!(errs.get("email").unwrap(), ["is invalid", "already exists"]);
        assert_eq!(errs.first("email"), "is invalid");
    }

    #[test]
    fn test_add_none_is_noop() {
        let mut errs = ValidationErrors::new();
        errs.add_opt::<FieldError>("email", None);
        errs.add_result::<FieldError>("email", Ok(()));
        errs.add("email", "");

        assert!(errs.is_empty());
        assert!(!errs.contains_field("email"));
        assert!(errs.into_result().is_ok());
    }

    #[test]
    fn test_first_on_missing_field_is_empty() {
        let errs = errs(&[("title", "field is required")]);
        assert_eq!(errs.first("body"), "");
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let err = errs(&[("title", "field is required")]).into_result().unwrap_err();
        match err {
            Error::Validation(errs) => assert_eq!(errs.first("title"), "field is required"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_merge_creates_and_appends() {
        let mut a = errs(&[("title", "a1")]);
        a.merge(errs(&[("title", "b1"), ("body", "b2")]));

        assert_eq!(a.get("title").unwrap(), ["a1", "b1"]);
        assert_eq!(a.get("body").unwrap(), ["b2"]);
    }

    #[test]
    fn test_merge_is_associative() {
        let a = errs(&[("title", "a1"), ("body", "a2")]);
        let b = errs(&[("title", "b1")]);
        let c = errs(&[("title", "c1"), ("email", "c2")]);

        let mut left = a.clone();
        left.merge(b.clone());
        left.merge(c.clone());

        let mut bc = b;
        bc.merge(c);
        let mut right = a;
        right.merge(bc);

        assert_eq!(left, right);
        assert_eq!(left.get("title").unwrap(), ["a1", "b1", "c1"]);
    }

    #[test]
    fn test_merge_skips_empty_fields() {
        let mut a = ValidationErrors::new();
        let mut raw = HashMap::new();
        raw.insert("title".to_string(), vec![]);
        a.merge(ValidationErrors { fields: raw });

        assert!(a.is_empty());
    }

    #[test]
    fn test_display_renders_each_field() {
        let errs = errs(&[("title", "field is required"), ("title", "too short"), ("body", "field is required")]);
        let out = errs.to_string();

        assert!(out.contains("title:\n    field is required\n    too short\n"));
        assert!(out.contains("body:\n    field is required\n"));
    }

    #[test]
    fn test_has() {
        let errs = errs(&[("email", "already exists")]);

        assert!(errs.has("email", "already exists"));
        assert!(errs.has("email", FieldCause::Exists));
        assert!(!errs.has("email", "field is required"));
        assert!(!errs.has("name", "already exists"));
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let errs = errs(&[("email", "already exists")]);
        let json = serde_json::to_value(&errs).unwrap();

        assert_eq!(json, serde_json::json!({"email": ["already exists"]}));

        let back: ValidationErrors = serde_json::from_value(json).unwrap();
        assert_eq!(back, errs);
    }

    #[test]
    fn test_field_error_display() {
        assert_eq!(FieldError::required("Title").to_string(), "Title field is required");
        assert_eq!(FieldError::exists("Email").to_string(), "Email already exists");
        assert_eq!(FieldError::new("Age", "must be positive").to_string(), "Age must be positive");
    }

    #[test]
    fn test_field_error_cause() {
        let err = FieldError::required("title");
        assert_eq!(err.name(), "title");
        assert_eq!(err.cause().downcast_ref::<FieldCause>(), Some(&FieldCause::Required));
    }

    #[cfg(feature = "validation")]
    #[test]
    fn test_from_validator_errors() {
        use validator::Validate;

        #[derive(Validate)]
        struct Signup {
            #[validate(email(message = "must be a valid email"))]
            email: String,
            #[validate(length(min = 8))]
            password: String,
        }

        let errors = Signup {
            email: "nope".into(),
            password: "short".into(),
        }
        .validate()
        .unwrap_err();

        let errs = ValidationErrors::from(errors);
        assert_eq!(errs.first("email"), "must be a valid email");
        assert_eq!(errs.first("password"), "length");
    }
}
