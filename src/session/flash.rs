use serde::de::DeserializeOwned;
use std::collections::HashMap;

use crate::error::Result;
use crate::http::Form;
use crate::traits::session::SessionData;
use crate::validation::ValidationErrors;

/// Session key the submitted form fields are flashed under
pub const FORM_FIELDS_KEY: &str = "form_fields";

/// Session key the form's validation errors are flashed under
pub const FORM_ERRORS_KEY: &str = "form_errors";

/// Flash the fields of `form` and `errs` into the session, to re-render the
/// form after redirecting back to it.
pub fn flash_form_with_errors<F: Form>(session: &mut SessionData, form: &F, errs: &ValidationErrors) -> Result<()> {
    session.add_flash(FORM_FIELDS_KEY, &form.fields())?;
    session.add_flash(FORM_ERRORS_KEY, errs)?;
    Ok(())
}

fn first_flash<T: DeserializeOwned + Default>(session: &mut SessionData, key: &str) -> T {
    session
        .flashes(key)
        .into_iter()
        .next()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

/// Take the flashed form fields, or an empty map if there are none.
pub fn form_fields(session: &mut SessionData) -> HashMap<String, String> {
    first_flash(session, FORM_FIELDS_KEY)
}

/// Take the flashed form errors, or an empty set if there are none.
pub fn form_errors(session: &mut SessionData) -> ValidationErrors {
    first_flash(session, FORM_ERRORS_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Default, Deserialize)]
    struct Login {
        email: String,
    }

    #[async_trait]
    impl Form for Login {
        fn fields(&self) -> HashMap<String, String> {
            HashMap::from([("email".to_string(), self.email.clone())])
        }

        async fn validate(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_flash_round_trip() {
        let mut session = SessionData::new(Duration::from_secs(60));
        let form = Login {
            email: "me@example.com".into(),
        };
        let mut errs = ValidationErrors::new();
        errs.add("password", "field is required");

        flash_form_with_errors(&mut session, &form, &errs).unwrap();

        assert_eq!(form_fields(&mut session)["email"], "me@example.com");
        assert_eq!(form_errors(&mut session).first("password"), "field is required");

        // read once
        assert!(form_fields(&mut session).is_empty());
        assert!(form_errors(&mut session).is_empty());
    }

    #[test]
    fn test_mismatched_flash_is_empty() {
        let mut session = SessionData::new(Duration::from_secs(60));
        session.add_flash(FORM_ERRORS_KEY, &42).unwrap();

        assert!(form_errors(&mut session).is_empty());
    }
}
