//! Local validation of login and registration forms.
//!
//! Requests that fail here never reach the identity backend.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::auth::{LoginRequest, RegistrationRequest};

const MIN_NAME_LENGTH: usize = 2;
const MIN_PASSWORD_LENGTH: usize = 8;

/// Field name -> first failing rule's message.
pub type ValidationErrors = BTreeMap<&'static str, &'static str>;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

/// Indonesian mobile numbers: +62 / 62 / 0, then 8x and 6-10 more digits.
fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\+62|62|0)8[1-9][0-9]{6,10}$").expect("valid phone regex"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone_regex().is_match(phone)
}

pub fn is_valid_name(name: &str) -> bool {
    name.trim().chars().count() >= MIN_NAME_LENGTH
}

/// At least 8 characters with upper, lower, digit and a special character.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password
            .chars()
            .any(|c| !c.is_alphanumeric() && c != '_' && !c.is_whitespace())
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn validate_login(request: &LoginRequest) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if is_blank(&request.email) {
        errors.insert("email", "Email is required");
    } else if !is_valid_email(&request.email) {
        errors.insert("email", "Please enter a valid email address");
    }

    if is_blank(&request.password) {
        errors.insert("password", "Password is required");
    }

    errors
}

pub fn validate_registration(request: &RegistrationRequest) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if is_blank(&request.first_name) {
        errors.insert("first_name", "First name is required");
    } else if !is_valid_name(&request.first_name) {
        errors.insert("first_name", "First name must be at least 2 characters");
    }

    if is_blank(&request.last_name) {
        errors.insert("last_name", "Last name is required");
    } else if !is_valid_name(&request.last_name) {
        errors.insert("last_name", "Last name must be at least 2 characters");
    }

    if is_blank(&request.email) {
        errors.insert("email", "Email is required");
    } else if !is_valid_email(&request.email) {
        errors.insert("email", "Please enter a valid email address");
    }

    if is_blank(&request.password) {
        errors.insert("password", "Password is required");
    } else if !is_strong_password(&request.password) {
        errors.insert(
            "password",
            "Password must be at least 8 characters and include uppercase, lowercase, number, and special character",
        );
    }

    if let Some(ref phone) = request.phone {
        if !is_blank(phone) && !is_valid_phone(phone.trim()) {
            errors.insert("phone", "Please enter a valid phone number");
        }
    }

    errors
}

/// One-line summary for an Outcome message.
pub fn summarize(errors: &ValidationErrors) -> String {
    let details: Vec<String> = errors
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect();
    format!("Periksa kembali data formulir ({})", details.join("; "))
}
