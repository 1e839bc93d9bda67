use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::validation::validate_email_address;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Patient,
    Doctor,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Patient, Role::Doctor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.as_str() == value)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_role() -> String {
    Role::default().as_str().to_string()
}

/// Raw signup form as posted by the browser.
#[derive(Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationInput {
    #[validate(length(min = 2, message = "String must contain at least 2 character(s)"))]
    #[serde(default)]
    pub full_name: String,

    #[validate(custom(function = "validate_email_address"))]
    #[serde(default)]
    pub email: String,

    #[validate(length(min = 9, message = "String must contain at least 9 character(s)"))]
    #[serde(default)]
    pub contact: String,

    #[validate(length(min = 6, message = "String must contain at least 6 character(s)"))]
    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub confirm_password: String,

    #[serde(default = "default_role")]
    pub role: String,
}

impl fmt::Debug for RegistrationInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationInput")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("contact", &self.contact)
            .field("password", &"<redacted>")
            .field("confirm_password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// Input that passed every form rule.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedRegistration {
    pub full_name: String,
    pub email: String,
    pub contact: String,
    pub password: String,
    pub role: Role,
}

impl ValidatedRegistration {
    /// Profile key and stored email: the address lower-cased.
    pub fn normalized_email(&self) -> String {
        self.email.to_lowercase()
    }
}

impl fmt::Debug for ValidatedRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedRegistration")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("contact", &self.contact)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Field errors in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// First message reported against `field`.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|error| format!("{}: {}", error.field, error.message))
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_defaults_to_patient_when_missing() {
        let input: RegistrationInput = serde_json::from_value(serde_json::json!({
            "fullName": "Ada Obi",
            "email": "ada@example.com",
            "contact": "0803123456",
            "password": "secret1",
            "confirmPassword": "secret1"
        }))
        .unwrap();
        assert_eq!(input.role, "patient");
    }

    #[test]
    fn debug_output_hides_passwords() {
        let input = RegistrationInput {
            password: "hunter22".into(),
            confirm_password: "hunter22".into(),
            ..Default::default()
        };
        let printed = format!("{:?}", input);
        assert!(!printed.contains("hunter22"));
    }

    #[test]
    fn role_parse_accepts_only_known_values() {
        assert_eq!(Role::parse("doctor"), Some(Role::Doctor));
        assert_eq!(Role::parse("Doctor"), None);
        assert_eq!(Role::parse("nurse"), None);
    }
}
