use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;
use validator::{Validate, ValidationError};

use crate::models::registration_model::{
    FieldErrors, RegistrationInput, Role, ValidatedRegistration,
};

pub const PASSWORD_MISMATCH: &str = "Passwords don't match";
pub const INVALID_EMAIL: &str = "Invalid email";

/// Struct field name to form field name, in the order fields appear on the form.
/// `role` is checked separately, after these.
const FORM_FIELDS: [(&str, &str); 5] = [
    ("full_name", "fullName"),
    ("email", "email"),
    ("contact", "contact"),
    ("password", "password"),
    ("confirm_password", "confirmPassword"),
];

lazy_static! {
    /// Local part ends in a non-dot, domain is dotted labels with a 2+ letter TLD.
    static ref EMAIL_PATTERN: Regex = Regex::new(
        r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$"
    )
    .expect("email pattern compiles");
}

pub fn is_valid_email(email: &str) -> bool {
    !email.starts_with('.') && !email.contains("..") && EMAIL_PATTERN.is_match(email)
}

pub fn validate_email_address(email: &str) -> Result<(), ValidationError> {
    if is_valid_email(email) {
        return Ok(());
    }
    let mut error = ValidationError::new("email");
    error.message = Some(Cow::Borrowed(INVALID_EMAIL));
    Err(error)
}

pub fn parse_role(role: &str) -> Result<Role, String> {
    if let Some(parsed) = Role::parse(role) {
        return Ok(parsed);
    }
    let expected = Role::ALL
        .iter()
        .map(|role| format!("'{}'", role.as_str()))
        .collect::<Vec<_>>()
        .join(" | ");
    Err(format!(
        "Invalid enum value. Expected {expected}, received '{role}'"
    ))
}

/// Checks a submission against the form rules.
///
/// Per-field rules are reported first in form order; the password
/// confirmation check comes last and is attributed to `confirmPassword`.
/// Makes no external calls.
pub fn validate(input: &RegistrationInput) -> Result<ValidatedRegistration, FieldErrors> {
    let mut errors = FieldErrors::default();

    if let Err(found) = input.validate() {
        let by_field = found.field_errors();
        for &(field, form_field) in FORM_FIELDS.iter() {
            if let Some(field_errors) = by_field.get(field) {
                for error in field_errors.iter() {
                    let message = error
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| format!("Invalid {form_field}"));
                    errors.push(form_field, message);
                }
            }
        }
    }

    let role = parse_role(&input.role);
    if let Err(message) = &role {
        errors.push("role", message.clone());
    }

    if input.password != input.confirm_password {
        errors.push("confirmPassword", PASSWORD_MISMATCH);
    }

    match role {
        Ok(role) if errors.is_empty() => Ok(ValidatedRegistration {
            full_name: input.full_name.clone(),
            email: input.email.clone(),
            contact: input.contact.clone(),
            password: input.password.clone(),
            role,
        }),
        _ => Err(errors),
    }
}
