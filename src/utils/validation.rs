use std::{borrow::Cow, fmt};

use lazy_static::lazy_static;
use regex::Regex;
use validator::{ValidateEmail, ValidationError, ValidationErrors};

lazy_static! {
    static ref EMAIL_SHAPE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub const PASSWORD_SYMBOLS: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

pub const PASSWORD_POLICY_MESSAGE: &str = "Password must be at least 8 characters long and contain at least one uppercase letter, one lowercase letter, one number, and one special character";

/// A rejected form field and the message shown to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Cow<'static, str>,
    pub message: Cow<'static, str>,
}

impl FieldError {
    pub fn new(
        field: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn required(field: &'static str, label: &'static str) -> Self {
        Self::new(field, format!("{} is required", label))
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::from(message));
    error
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(invalid("required", "Username is required"));
    }

    Ok(())
}

pub fn validate_email_address(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(invalid("required", "Email is required"));
    }

    if !email.validate_email() || !EMAIL_SHAPE.is_match(email) {
        return Err(invalid("invalid_format", "Invalid email format"));
    }

    Ok(())
}

pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(invalid("required", "Password is required"));
    }

    let long_enough = password.chars().count() >= MIN_PASSWORD_LENGTH;
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| PASSWORD_SYMBOLS.contains(c));

    if !(long_enough && has_upper && has_lower && has_digit && has_symbol) {
        return Err(invalid("weak_password", PASSWORD_POLICY_MESSAGE));
    }

    Ok(())
}

pub fn validate_password_present(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(invalid("required", "Password is required"));
    }

    Ok(())
}

/// Form checkbox semantics: absent is false, any value is true except the
/// usual spellings of "off".
pub fn parse_flag(value: Option<&str>) -> bool {
    match value {
        None => false,
        Some(value) => !matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "false" | "off" | "no"
        ),
    }
}

/// Picks the first failing field in form order so the reported message is
/// deterministic.
pub fn first_field_error(errors: &ValidationErrors, order: &[&'static str]) -> FieldError {
    let field_errors = errors.field_errors();

    for field in order {
        let Some(error) = field_errors.get(*field).and_then(|errors| errors.first()) else {
            continue;
        };

        let message = error
            .message
            .clone()
            .unwrap_or_else(|| Cow::from("Invalid value"));

        return FieldError::new(*field, message);
    }

    FieldError::new("form", "Invalid form input")
}
