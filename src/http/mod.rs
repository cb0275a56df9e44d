//! Request unmarshalling, uploaded files and response helpers.
//!
//! Provides the form and file extractors, content sniffing, response writers
//! and address helpers.

mod file;
pub mod form;
mod multipart;
pub mod path;
pub mod response;
pub mod sniff;

pub use file::{File, human_size};
pub use form::{
    FileValidation, Form, bind_form, bind_form_with_config, unmarshal_file, unmarshal_file_with_config,
    unmarshal_files, unmarshal_files_with_config, unmarshal_form, unmarshal_form_and_validate,
    unmarshal_form_with_config, unmarshal_form_with_file, unmarshal_form_with_file_and_config,
    unmarshal_form_with_files, unmarshal_form_with_files_and_config,
};
pub use path::{base_address, base_address_from_parts, base_path};
pub use response::{html, json, text};
pub use sniff::detect_content_type;
