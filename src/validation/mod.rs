//! Field errors and form validation
//!
//! [`ValidationErrors`] collects messages per field. It is what unmarshalling
//! reports for fields it could not decode, and what [`Form::validate`]
//! implementations return through [`Error::Validation`].
//!
//! Checks can be written by hand or with the [`Validator`] builder. With the
//! `validation` feature, types deriving `validator::Validate` can be
//! extracted with [`Validated`].
//!
//! # Example
//!
//! ```rust
//! use tideway_forms::validation::{Validator, field_min_len, field_required};
//!
//! let name = String::from("Al");
//!
//! let mut v = Validator::new();
//! v.add("name", &name, field_required)
//!     .add("name", &name, field_min_len(3));
//!
//! let errs = v.validate();
//! assert_eq!(errs.first("name"), "Name cannot be shorter than 3 characters in length");
//! ```
//!
//! [`Form::validate`]: crate::Form::validate
//! [`Error::Validation`]: crate::Error::Validation

mod checks;
mod errors;
mod extractor;

pub use errors::{FieldCause, FieldError, ValidationErrors};
pub use extractor::ValidatedForm;
#[cfg(feature = "validation")]
pub use extractor::{Validated, validate_value};
pub use checks::{
    CheckError, CheckResult, Validator, WrapFn, field_equals, field_len, field_matches, field_max_len,
    field_min_len, field_required, ignore_error, map_error, wrap_field_error,
};

#[cfg(feature = "validation")]
pub use validator;
