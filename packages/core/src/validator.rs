use crate::types::{ContactInput, RequestCreateInput, RequestKind};

/// Validation errors for submitted form data
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn is_plausible_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

/// Validates a request submission before any store or network call.
///
/// Returns one entry per missing or malformed field so the submitter
/// sees the specific list, not a generic failure.
pub fn validate_request_input(data: &RequestCreateInput) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if data.name.trim().is_empty() {
        errors.push(ValidationError::new("name", "Name is required"));
    }

    if data.email.trim().is_empty() {
        errors.push(ValidationError::new("email", "Email is required"));
    } else if !is_plausible_email(data.email.trim()) {
        errors.push(ValidationError::new("email", "Email address is not valid"));
    }

    match data.kind {
        RequestKind::Project => {
            if data
                .project_title
                .as_deref()
                .map(str::trim)
                .unwrap_or("")
                .is_empty()
            {
                errors.push(ValidationError::new(
                    "projectTitle",
                    "Project title is required",
                ));
            }
            if data
                .description
                .as_deref()
                .map(str::trim)
                .unwrap_or("")
                .is_empty()
            {
                errors.push(ValidationError::new(
                    "description",
                    "Project description is required",
                ));
            }
        }
        RequestKind::Presentation => {
            if data.topic.as_deref().map(str::trim).unwrap_or("").is_empty() {
                errors.push(ValidationError::new("topic", "Presentation topic is required"));
            }
        }
    }

    errors
}

/// Validates a contact-form message.
pub fn validate_contact_input(data: &ContactInput) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if data.name.trim().is_empty() {
        errors.push(ValidationError::new("name", "Name is required"));
    }

    if data.email.trim().is_empty() {
        errors.push(ValidationError::new("email", "Email is required"));
    } else if !is_plausible_email(data.email.trim()) {
        errors.push(ValidationError::new("email", "Email address is not valid"));
    }

    if data.message.trim().is_empty() {
        errors.push(ValidationError::new("message", "Message is required"));
    }

    errors
}
