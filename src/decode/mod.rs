//! Field-aware decoding of request payloads into typed structures.
//!
//! Form values and JSON documents are decoded through serde, using
//! deserializers that remember which field a failure came from. Decoding does
//! not stop at the first bad field: the field is recorded, dropped from the
//! input and decoding is retried, so every invalid field is reported at once.

mod error;
mod form;
mod json;

pub use error::{DecodeError, DecodeErrorKind};
pub use form::FormValues;

use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

use crate::validation::{FieldCause, ValidationErrors};

/// How decoding a payload failed.
#[derive(Debug)]
pub enum DecodeFailure {
    /// A required field was not provided.
    EmptyField(String),
    /// One or more fields could not be converted, keyed by field path.
    MultiField(BTreeMap<String, DecodeError>),
    /// Any other failure. This does not describe a particular field and is
    /// treated as fatal.
    Other(DecodeError),
}

impl DecodeFailure {
    /// Convert the failure into field errors, or give back the fatal error.
    pub fn into_validation(self) -> Result<ValidationErrors, DecodeError> {
        let mut errs = ValidationErrors::new();

        match self {
            DecodeFailure::EmptyField(field) => errs.add(field, FieldCause::Required),
            DecodeFailure::MultiField(fields) => {
                for (field, err) in fields {
                    errs.add(field, err.message());
                }
            }
            DecodeFailure::Other(err) => return Err(err),
        }
        Ok(errs)
    }
}

/// A payload that can be decoded and have top-level keys dropped from it.
pub(crate) trait FieldSource {
    fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError>;

    fn remove_key(&mut self, key: &str) -> bool;
}

impl FieldSource for FormValues {
    fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        T::deserialize(form::FormDeserializer::new(self))
    }

    fn remove_key(&mut self, key: &str) -> bool {
        self.remove(key)
    }
}

impl FieldSource for serde_json::Value {
    fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        T::deserialize(json::JsonDeserializer::new(self))
    }

    fn remove_key(&mut self, key: &str) -> bool {
        match self {
            serde_json::Value::Object(map) => map.remove(key).is_some(),
            _ => false,
        }
    }
}

/// Decode `source` into `T`, collecting every field that fails to convert.
pub(crate) fn decode_fields<T, S>(mut source: S) -> Result<T, DecodeFailure>
where
    T: DeserializeOwned,
    S: FieldSource,
{
    let mut failed: BTreeMap<String, DecodeError> = BTreeMap::new();
    let mut dropped: Vec<String> = Vec::new();

    loop {
        let err = match source.decode::<T>() {
            Ok(value) if failed.is_empty() => return Ok(value),
            Ok(_) => return Err(DecodeFailure::MultiField(failed)),
            Err(err) => err,
        };

        if let Some(key) = err.key().map(str::to_string) {
            if !source.remove_key(&key) {
                return Err(DecodeFailure::Other(err));
            }
            let field = err.field().unwrap_or_else(|| key.clone());
            tracing::trace!(field = %field, error = %err, "Field failed to decode");

            failed.insert(field, err);
            dropped.push(key);
            continue;
        }

        return match err.kind() {
            DecodeErrorKind::MissingField(name) if dropped.contains(name) => Err(DecodeFailure::MultiField(failed)),
            DecodeErrorKind::MissingField(name) if failed.is_empty() => Err(DecodeFailure::EmptyField(name.clone())),
            DecodeErrorKind::MissingField(name) => {
                failed.insert(name.clone(), err);
                Err(DecodeFailure::MultiField(failed))
            }
            _ => Err(DecodeFailure::Other(err)),
        };
    }
}
