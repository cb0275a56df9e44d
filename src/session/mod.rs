//! Session flash storage.
//!
//! Flashes a submitted form and its errors into a session so they survive a
//! redirect, and reads them back once on the next request.

mod flash;
mod in_memory;

pub use flash::{FORM_ERRORS_KEY, FORM_FIELDS_KEY, flash_form_with_errors, form_errors, form_fields};
pub use in_memory::InMemorySessionStore;
