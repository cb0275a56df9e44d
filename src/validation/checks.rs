//! Declarative field checks
//!
//! A [`Validator`] holds a list of `(field, value, check)` entries. Running it
//! calls every check and records the failures in [`ValidationErrors`], after
//! passing each failure through a chain of wrap functions.

use regex::Regex;
use std::error::Error as StdError;

use crate::BoxError;
use crate::validation::{FieldCause, FieldError, ValidationErrors};

/// The outcome of a single check.
pub type CheckResult = std::result::Result<(), BoxError>;

/// Transforms the error of a failed check for a field. Returning `None`
/// drops the error.
pub type WrapFn = Box<dyn Fn(&str, BoxError) -> Option<BoxError> + Send + Sync>;

type Check<'a> = Box<dyn Fn() -> CheckResult + Send + Sync + 'a>;

/// Errors returned by the built-in checks.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CheckError {
    #[error("does not match {0}")]
    NoMatch(Regex),
    #[error("must be between {min} and {max} characters in length")]
    Length { min: usize, max: usize },
    #[error("cannot be shorter than {0} characters in length")]
    TooShort(usize),
    #[error("cannot be longer than {0} characters in length")]
    TooLong(usize),
    #[error("does not match")]
    NotEqual,
}

impl PartialEq for CheckError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NoMatch(a), Self::NoMatch(b)) => a.as_str() == b.as_str(),
            (Self::Length { min: a, max: b }, Self::Length { min: c, max: d }) => a == c && b == d,
            (Self::TooShort(a), Self::TooShort(b)) | (Self::TooLong(a), Self::TooLong(b)) => a == b,
            (Self::NotEqual, Self::NotEqual) => true,
            _ => false,
        }
    }
}

/// Runs checks against the values of a form.
///
/// # Example
///
/// ```rust
/// use regex::Regex;
/// use tideway_forms::validation::{Validator, field_matches, field_max_len, field_required};
///
/// let title = String::from("");
/// let slug = String::from("Not A Slug");
///
/// let mut v = Validator::new();
/// v.add("title", &title, field_required);
/// v.add("title", &title, field_max_len(60));
/// v.add("slug", &slug, field_matches(Regex::new("^[a-z0-9-]+$").unwrap()));
///
/// let errs = v.validate();
/// assert_eq!(errs.first("title"), "Title field is required");
/// assert_eq!(errs.first("slug"), "Slug does not match ^[a-z0-9-]+$");
/// ```
#[derive(Default)]
pub struct Validator<'a> {
    fields: Vec<(String, Check<'a>)>,
    wraps: Vec<WrapFn>,
}

impl<'a> Validator<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `check` to run against `value` for the field `name`.
    pub fn add<T, F>(&mut self, name: impl Into<String>, value: &'a T, check: F) -> &mut Self
    where
        T: Sync + ?Sized + 'a,
        F: Fn(&T) -> CheckResult + Send + Sync + 'a,
    {
        self.fields.push((name.into(), Box::new(move || check(value))));
        self
    }

    /// Set the chain of wrap functions applied to each failure, replacing
    /// the default of [`wrap_field_error`].
    pub fn wrap_error(&mut self, wraps: impl IntoIterator<Item = WrapFn>) -> &mut Self {
        self.wraps = wraps.into_iter().collect();
        self
    }

    /// Run every check, returning the failures keyed by field.
    pub fn validate(&self) -> ValidationErrors {
        let mut errs = ValidationErrors::new();

        for (name, check) in &self.fields {
            let Err(err) = check() else { continue };

            let wrapped = if self.wraps.is_empty() {
                wrap_field_error(name, err)
            } else {
                self.wraps
                    .iter()
                    .try_fold(err, |err, wrap| wrap(name, err))
            };
            errs.add_opt(name.as_str(), wrapped);
        }
        errs
    }
}

fn capitalize(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The default wrap: a [`FieldError`] naming the capitalized field.
pub fn wrap_field_error(name: &str, err: BoxError) -> Option<BoxError> {
    Some(Box::new(FieldError::new(capitalize(name), err)))
}

/// Whether `err` or any error in its source chain equals `target`.
fn is_error<E>(err: &(dyn StdError + 'static), target: &E) -> bool
where
    E: StdError + PartialEq + 'static,
{
    let mut current = Some(err);

    while let Some(e) = current {
        if e.downcast_ref::<E>() == Some(target) {
            return true;
        }
        current = e.source();
    }
    false
}

/// A wrap replacing any failure matching `from` with `to`.
pub fn map_error<E, T>(from: E, to: T) -> WrapFn
where
    E: StdError + PartialEq + Send + Sync + 'static,
    T: StdError + Clone + Send + Sync + 'static,
{
    Box::new(move |_, err| {
        if is_error(&*err, &from) {
            Some(Box::new(to.clone()))
        } else {
            Some(err)
        }
    })
}

/// A wrap dropping failures of the field `name` that match `target`.
pub fn ignore_error<E>(name: impl Into<String>, target: E) -> WrapFn
where
    E: StdError + PartialEq + Send + Sync + 'static,
{
    let name = name.into();

    Box::new(move |field, err| {
        if field == name && is_error(&*err, &target) {
            None
        } else {
            Some(err)
        }
    })
}

/// Fails with [`FieldCause::Required`] if the value is empty.
pub fn field_required<T: AsRef<str> + ?Sized>(val: &T) -> CheckResult {
    if val.as_ref().is_empty() {
        return Err(Box::new(FieldCause::Required));
    }
    Ok(())
}

/// Fails if the value does not match `re`.
pub fn field_matches<T: AsRef<str> + ?Sized>(re: Regex) -> impl Fn(&T) -> CheckResult + Send + Sync {
    move |val| {
        if re.is_match(val.as_ref()) {
            Ok(())
        } else {
            Err(Box::new(CheckError::NoMatch(re.clone())))
        }
    }
}

/// Fails unless the value is between `min` and `max` characters long.
pub fn field_len<T: AsRef<str> + ?Sized>(min: usize, max: usize) -> impl Fn(&T) -> CheckResult + Send + Sync {
    move |val| {
        let len = val.as_ref().chars().count();

        if len < min || len > max {
            return Err(Box::new(CheckError::Length { min, max }));
        }
        Ok(())
    }
}

pub fn field_min_len<T: AsRef<str> + ?Sized>(min: usize) -> impl Fn(&T) -> CheckResult + Send + Sync {
    move |val| {
        if val.as_ref().chars().count() < min {
            return Err(Box::new(CheckError::TooShort(min)));
        }
        Ok(())
    }
}

pub fn field_max_len<T: AsRef<str> + ?Sized>(max: usize) -> impl Fn(&T) -> CheckResult + Send + Sync {
    move |val| {
        if val.as_ref().chars().count() > max {
            return Err(Box::new(CheckError::TooLong(max)));
        }
        Ok(())
    }
}

/// Fails unless the value equals `expected`, e.g. for a password
/// confirmation.
pub fn field_equals<T>(expected: T) -> impl Fn(&T) -> CheckResult + Send + Sync
where
    T: PartialEq + Send + Sync,
{
    move |val| {
        if *val != expected {
            return Err(Box::new(CheckError::NotEqual));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_wrap_capitalizes_field() {
        let email = String::new();
        let mut v = Validator::new();
        v.add("email", &email, field_required);

        let errs = v.validate();
        assert_eq!(errs.get("email").unwrap(), ["Email field is required"]);
    }

    #[test]
    fn test_passing_checks_record_nothing() {
        let name = String::from("tideway");
        let mut v = Validator::new();
        v.add("name", &name, field_required)
            .add("name", &name, field_len(3, 10))
            .add("name", &name, field_matches(Regex::new("^[a-z]+$").unwrap()));

        assert!(v.validate().is_empty());
    }

    #[test]
    fn test_length_checks() {
        let short = String::from("ab");
        let long = String::from("abcdefghijk");
        let mut v = Validator::new();
        v.add("short", &short, field_min_len(3));
        v.add("long", &long, field_max_len(10));
        v.add("range", &short, field_len(3, 10));

        let errs = v.validate();
        assert_eq!(errs.first("short"), "Short cannot be shorter than 3 characters in length");
        assert_eq!(errs.first("long"), "Long cannot be longer than 10 characters in length");
        assert_eq!(errs.first("range"), "Range must be between 3 and 10 characters in length");
    }

    #[test]
    fn test_field_equals() {
        let password = String::from("secret");
        let confirm = String::from("secrte");
        let mut v = Validator::new();
        v.add("password confirmation", &confirm, field_equals(password.clone()));

        assert_eq!(
            v.validate().first("password confirmation"),
            "Password Confirmation does not match"
        );
    }

    #[test]
    fn test_map_error() {
        let title = String::new();
        let mut v = Validator::new();
        v.add("title", &title, field_required);
        v.wrap_error([map_error(FieldCause::Required, FieldCause::Exists), Box::new(wrap_field_error) as WrapFn]);

        assert_eq!(v.validate().first("title"), "Title already exists");
    }

    #[test]
    fn test_ignore_error() {
        let empty = String::new();
        let mut v = Validator::new();
        v.add("nickname", &empty, field_required);
        v.add("name", &empty, field_required);
        v.wrap_error([ignore_error("nickname", FieldCause::Required)]);

        let errs = v.validate();
        assert!(!errs.contains_field("nickname"));
        assert_eq!(errs.first("name"), "field is required");
    }

    #[test]
    fn test_is_error_walks_sources() {
        let err = FieldError::required("title");
        assert!(is_error(&err, &FieldCause::Required));
        assert!(!is_error(&err, &FieldCause::Exists));
    }
}
