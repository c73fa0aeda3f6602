//! Form validation with per-field messages.
//!
//! Validators never fail hard: they collect every problem in form order so
//! the caller can show each message next to its field.

use chrono::DateTime;

use crate::models::{EventForm, RegisterRequest};

/// Minimum password length accepted by the backend
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum event title length
pub const MAX_TITLE_LENGTH: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    fn into_result(self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// First message for `field`, if any
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Loose email check: one `@`, non-empty local part, dotted domain
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.contains(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.trim().is_empty() {
        errors.push("email", "Email is required");
    } else if !is_valid_email(email) {
        errors.push("email", "Enter a valid email address");
    }
}

pub fn validate_login(email: &str, password: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    check_email(&mut errors, email);
    if password.is_empty() {
        errors.push("password", "Password is required");
    }
    errors.into_result()
}

pub fn validate_registration(request: &RegisterRequest, confirm_password: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();

    if request.name.trim().is_empty() {
        errors.push("name", "Name is required");
    }
    check_email(&mut errors, &request.email);

    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
        );
    }
    if request.password != confirm_password {
        errors.push("confirm_password", "Passwords do not match");
    }

    if let Some(ref phone) = request.phone {
        let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
        let allowed = phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
        if !allowed || !(9..=15).contains(&digits) {
            errors.push("phone", "Enter a valid phone number");
        }
    }

    errors.into_result()
}

pub fn validate_event(form: &EventForm) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();

    let title = form.title.trim();
    if title.is_empty() {
        errors.push("title", "Title is required");
    } else if title.chars().count() > MAX_TITLE_LENGTH {
        errors.push("title", format!("Title must be at most {} characters", MAX_TITLE_LENGTH));
    }

    if form.location.trim().is_empty() {
        errors.push("location", "Location is required");
    }

    if form.start_date.trim().is_empty() {
        errors.push("start_date", "Date is required");
    } else if DateTime::parse_from_rfc3339(form.start_date.trim()).is_err() {
        errors.push("start_date", "Date must look like 2026-11-20T21:00:00+01:00");
    }

    if !form.price.is_finite() || form.price < 0.0 {
        errors.push("price", "Price cannot be negative");
    }
    if form.capacity == 0 {
        errors.push("capacity", "Capacity must be at least 1");
    }

    errors.into_result()
}
