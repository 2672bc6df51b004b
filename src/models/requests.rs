use serde::Deserialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUserRequest {
    pub login_name: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub occupation: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub login_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub occupation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentRequest {
    pub comment: Option<String>,
}

impl CommentRequest {
    /// Trimmed comment text, rejecting missing or blank input.
    pub fn text(&self) -> AppResult<String> {
        self.comment
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("Comment cannot be empty".to_string()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Returns the field when it is present and not blank.
pub(crate) fn required<'a>(field: &'a Option<String>) -> Option<&'a str> {
    field.as_deref().filter(|value| !value.trim().is_empty())
}
