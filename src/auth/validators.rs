//! Request validation for auth endpoints

use regex::Regex;

use super::models::{LoginRequest, RegisterRequest};
use crate::common::{ValidationResult, Validator};

const MAX_EMAIL_LEN: usize = 255;
const MIN_PASSWORD_LEN: usize = 8;

fn is_valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
        .map(|re| re.is_match(email))
        .unwrap_or(false)
}

pub struct RegisterRequestValidator;

impl Validator<RegisterRequest> for RegisterRequestValidator {
    fn validate(&self, data: &RegisterRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        let name = data.name.trim();
        if name.is_empty() {
            result.add_error("name", "Name cannot be blank");
        } else if name.len() < 2 || name.len() > 100 {
            result.add_error("name", "Name must be between 2 and 100 characters");
        }

        let email = data.email.trim();
        if email.is_empty() {
            result.add_error("email", "Email cannot be blank");
        } else if email.len() > MAX_EMAIL_LEN {
            result.add_error("email", "Email cannot exceed 255 characters");
        } else if !is_valid_email(email) {
            result.add_error("email", "Please provide a valid email address");
        }

        if data.password.is_empty() {
            result.add_error("password", "Password cannot be blank");
        } else if data.password.len() < MIN_PASSWORD_LEN {
            result.add_error("password", "Password must be at least 8 characters long");
        }

        result
    }
}

pub struct LoginRequestValidator;

impl Validator<LoginRequest> for LoginRequestValidator {
    fn validate(&self, data: &LoginRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        let email = data.email.trim();
        if email.is_empty() {
            result.add_error("email", "Email cannot be blank");
        } else if !is_valid_email(email) {
            result.add_error("email", "Please provide a valid email address");
        }

        if data.password.is_empty() {
            result.add_error("password", "Password cannot be blank");
        }

        result
    }
}
