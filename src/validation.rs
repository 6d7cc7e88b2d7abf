// Local form checks run before anything is sent to the remote service

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

use crate::document::{is_valid_phone, validate_document};
use crate::domain::ClientInput;

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern is valid"));

pub const MIN_PASSWORD_LEN: usize = 6;

/// Per-field validation messages, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", self.summary())]
pub struct ValidationError {
    fields: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut error = Self::new();
        error.add(field, message);
        error
    }

    /// Record a message; the first message for a field wins
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Every message as `field: message`, joined by `; `
    pub fn summary(&self) -> String {
        self.fields
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub fn is_email(value: &str) -> bool {
    EMAIL_SHAPE.is_match(value.trim())
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        check_email(&mut errors, &self.email);
        if self.password.is_empty() {
            errors.add("password", "password is required");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();

        if self.username.trim().is_empty() {
            errors.add("username", "username is required");
        }
        check_email(&mut errors, &self.email);

        if self.password.is_empty() {
            errors.add("password", "password is required");
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!("password must be at least {MIN_PASSWORD_LEN} characters"),
            );
        }

        if self.confirm_password.is_empty() {
            errors.add("confirm_password", "please confirm the password");
        } else if self.password != self.confirm_password {
            errors.add("confirm_password", "passwords do not match");
        }

        errors.into_result()
    }
}

fn check_email(errors: &mut ValidationError, email: &str) {
    if email.trim().is_empty() {
        errors.add("email", "email is required");
    } else if !is_email(email) {
        errors.add("email", "email is invalid");
    }
}

/// Validate an already-normalized client input
pub fn validate_client_input(input: &ClientInput) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();

    if input.code.trim().is_empty() {
        errors.add("code", "code is required");
    }
    if input.trade_name.trim().is_empty() {
        errors.add("trade_name", "trade name is required");
    }
    if let Err(e) = validate_document(&input.document, input.document_type) {
        errors.add("document", e.to_string());
    }

    for (index, contact) in input.contacts.iter().enumerate() {
        let position = index + 1;
        if contact.name.trim().is_empty() {
            errors.add(
                &format!("contacts[{position}].name"),
                "contact name is required",
            );
        }
        if !contact.phone.is_empty() && !is_valid_phone(&contact.phone) {
            errors.add(
                &format!("contacts[{position}].phone"),
                "phone must have 10 or 11 digits including area code",
            );
        }
    }

    errors.into_result()
}
