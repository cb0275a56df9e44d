use serde::de::{Expected, Unexpected};
use std::fmt;

/// A failure to decode a value into its target type.
///
/// The error remembers the path of field names leading to the value that
/// failed, so it can be reported against that field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    path: Vec<String>,
    kind: DecodeErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// A field the target requires was not present.
    MissingField(String),
    /// The value could not be converted to the expected type.
    Mismatch { value: String, expected: String },
    Message(String),
}

impl DecodeError {
    pub(crate) fn at(mut self, key: impl Into<String>) -> Self {
        self.path.insert(0, key.into());
        self
    }

    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }

    /// The top-level key the failing value was found under.
    pub fn key(&self) -> Option<&str> {
        self.path.first().map(String::as_str)
    }

    /// The dotted path of the field that failed, if known.
    ///
    /// For a missing field this includes the name of the missing field.
    pub fn field(&self) -> Option<String> {
        let mut parts: Vec<&str> = self.path.iter().map(String::as_str).collect();

        if let DecodeErrorKind::MissingField(name) = &self.kind {
            parts.push(name);
        }
        if parts.is_empty() { None } else { Some(parts.join(".")) }
    }

    /// The message without the field path, as recorded in
    /// [`ValidationErrors`](crate::ValidationErrors).
    pub fn message(&self) -> String {
        match &self.kind {
            DecodeErrorKind::MissingField(_) => crate::validation::FieldCause::Required.to_string(),
            DecodeErrorKind::Mismatch { value, expected } => {
                format!("cannot unmarshal {} to {}", value, expected)
            }
            DecodeErrorKind::Message(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field() {
            Some(field) => write!(f, "{}: {}", field, self.message()),
            None => f.write_str(&self.message()),
        }
    }
}

impl std::error::Error for DecodeError {}

impl serde::de::Error for DecodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self {
            path: Vec::new(),
            kind: DecodeErrorKind::Message(msg.to_string()),
        }
    }

    fn invalid_type(unexp: Unexpected<'_>, exp: &dyn Expected) -> Self {
        Self {
            path: Vec::new(),
            kind: DecodeErrorKind::Mismatch {
                value: unexp.to_string(),
                expected: exp.to_string(),
            },
        }
    }

    fn invalid_value(unexp: Unexpected<'_>, exp: &dyn Expected) -> Self {
        Self::invalid_type(unexp, exp)
    }

    fn missing_field(field: &'static str) -> Self {
        Self {
            path: Vec::new(),
            kind: DecodeErrorKind::MissingField(field.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::Error as _;

    #[test]
    fn test_mismatch_message() {
        let err = DecodeError::invalid_type(Unexpected::Signed(-1), &"a string").at("title");

        assert_eq!(err.key(), Some("title"));
        assert_eq!(err.message(), "cannot unmarshal integer `-1` to a string");
        assert_eq!(err.to_string(), "title: cannot unmarshal integer `-1` to a string");
    }

    #[test]
    fn test_missing_field_path() {
        let err = DecodeError::missing_field("zip").at("address");

        assert_eq!(err.field().as_deref(), Some("address.zip"));
        assert_eq!(err.message(), "field is required");
    }

    #[test]
    fn test_nested_path_is_dotted() {
        let err = DecodeError::custom("bad").at("1").at("tags");

        assert_eq!(err.key(), Some("tags"));
        assert_eq!(err.field().as_deref(), Some("tags.1"));
    }
}
