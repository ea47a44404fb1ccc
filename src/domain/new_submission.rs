use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ContactMessage, SubmitterEmail, SubmitterName};

/// The raw payload posted by the contact form.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

/// A submission that passed every check and may be relayed.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub first_name: SubmitterName,
    pub last_name: SubmitterName,
    pub email: SubmitterEmail,
    pub message: ContactMessage,
}

/// Field name to message, one entry per failing field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, String>);

impl ValidationErrors {
    fn check<T>(&mut self, field: &'static str, parsed: Result<T, String>) -> Option<T> {
        parsed
            .map_err(|message| {
                self.0.insert(field, message);
            })
            .ok()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.0.keys().copied().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl TryFrom<ContactForm> for NewSubmission {
    type Error = ValidationErrors;

    fn try_from(value: ContactForm) -> Result<Self, Self::Error> {
        let mut errors = ValidationErrors::default();
        let first_name = errors.check("firstName", SubmitterName::parse_first(value.first_name));
        let last_name = errors.check("lastName", SubmitterName::parse_last(value.last_name));
        let email = errors.check("email", SubmitterEmail::parse(value.email));
        let message = errors.check("message", ContactMessage::parse(value.message));

        match (first_name, last_name, email, message) {
            (Some(first_name), Some(last_name), Some(email), Some(message)) => Ok(Self {
                first_name,
                last_name,
                email,
                message,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: ValidationErrors,
}

/// Runs every field check and reports all failures at once.
pub fn validate(form: &ContactForm) -> ValidationResult {
    match NewSubmission::try_from(form.clone()) {
        Ok(_) => ValidationResult {
            valid: true,
            errors: ValidationErrors::default(),
        },
        Err(errors) => ValidationResult {
            valid: false,
            errors,
        },
    }
}
