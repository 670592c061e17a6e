// src/handlers/feedback.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    clients::email::EmailClient,
    error::AppError,
    utils::html::{clean_html, render_feedback_email},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Bug,
    Feature,
    General,
}

impl FeedbackKind {
    /// Closed set, parsed by hand so an unknown kind is our 400 rather than
    /// a deserializer rejection.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bug" => Some(FeedbackKind::Bug),
            "feature" => Some(FeedbackKind::Feature),
            "general" => Some(FeedbackKind::General),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Bug => "bug",
            FeedbackKind::Feature => "feature",
            FeedbackKind::General => "general",
        }
    }
}

/// DTO for user feedback. Deliberately unauthenticated; the rate limiter on
/// this route is the abuse control.
#[derive(Debug, Deserialize, Validate)]
pub struct FeedbackRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[validate(length(
        min = 1,
        max = 5000,
        message = "Message length must be between 1 and 5000 characters."
    ))]
    pub message: String,
    #[validate(email(message = "Contact email must be a valid address."))]
    pub email: Option<String>,
}

/// Forwards user feedback to the operator inbox.
///
/// The message is sanitized before it is embedded in email HTML; feedback is
/// the one place untrusted text ends up rendered somewhere.
pub async fn submit_feedback(
    State(email_client): State<EmailClient>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let kind = FeedbackKind::parse(&payload.kind)
        .ok_or(AppError::BadRequest("Invalid feedback type".to_string()))?;

    let safe_message = clean_html(&payload.message);
    let subject = format!("VOXAM feedback: {}", kind.as_str());
    let body = render_feedback_email(kind.as_str(), &safe_message, payload.email.as_deref());

    email_client
        .send_feedback(&subject, &body, payload.email.as_deref())
        .await?;

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parse_is_a_closed_set() {
        assert_eq!(FeedbackKind::parse("bug"), Some(FeedbackKind::Bug));
        assert_eq!(FeedbackKind::parse("feature"), Some(FeedbackKind::Feature));
        assert_eq!(FeedbackKind::parse("general"), Some(FeedbackKind::General));
        assert_eq!(FeedbackKind::parse("Bug"), None);
        assert_eq!(FeedbackKind::parse("spam"), None);
        assert_eq!(FeedbackKind::parse(""), None);
    }
}
