// src/models/question_paper.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::models::document::ProcessingStatus;

/// Represents the 'question_papers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionPaper {
    pub id: i64,
    pub user_id: i64,
    pub document_id: i64,

    pub status: ProcessingStatus,

    /// Generation parameters, echoed back to the client.
    /// Stored as JSON arrays in the database.
    pub difficulty_levels: Json<Vec<String>>,
    pub question_types: Json<Vec<String>>,
    pub bloom_levels: Json<Vec<String>>,

    pub duration_minutes: i64,
    pub question_count: i64,

    pub failure_reason: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for requesting question paper generation.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionPaperRequest {
    pub document_id: i64,
    #[validate(custom(function = validate_difficulty_levels))]
    pub difficulty_levels: Vec<String>,
    #[validate(custom(function = validate_question_types))]
    pub question_types: Vec<String>,
    #[validate(custom(function = validate_bloom_levels))]
    pub bloom_levels: Vec<String>,
    #[validate(range(
        min = 5,
        max = 240,
        message = "Duration must be between 5 and 240 minutes."
    ))]
    pub duration_minutes: i64,
    #[validate(range(
        min = 1,
        max = 100,
        message = "Question count must be between 1 and 100."
    ))]
    pub question_count: i64,
}

fn validate_subset(
    values: &[String],
    allowed: &[&str],
    empty_code: &'static str,
    unknown_code: &'static str,
) -> Result<(), validator::ValidationError> {
    if values.is_empty() {
        return Err(validator::ValidationError::new(empty_code));
    }
    for value in values {
        if !allowed.contains(&value.as_str()) {
            return Err(validator::ValidationError::new(unknown_code));
        }
    }
    Ok(())
}

fn validate_difficulty_levels(values: &[String]) -> Result<(), validator::ValidationError> {
    validate_subset(
        values,
        &["easy", "medium", "hard"],
        "difficulty_levels_cannot_be_empty",
        "unknown_difficulty_level",
    )
}

fn validate_question_types(values: &[String]) -> Result<(), validator::ValidationError> {
    validate_subset(
        values,
        &["mcq", "short_answer", "long_answer"],
        "question_types_cannot_be_empty",
        "unknown_question_type",
    )
}

fn validate_bloom_levels(values: &[String]) -> Result<(), validator::ValidationError> {
    validate_subset(
        values,
        &[
            "remember",
            "understand",
            "apply",
            "analyze",
            "evaluate",
            "create",
        ],
        "bloom_levels_cannot_be_empty",
        "unknown_bloom_level",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn valid_request() -> CreateQuestionPaperRequest {
        CreateQuestionPaperRequest {
            document_id: 1,
            difficulty_levels: vec!["easy".into(), "hard".into()],
            question_types: vec!["mcq".into()],
            bloom_levels: vec!["understand".into(), "apply".into()],
            duration_minutes: 60,
            question_count: 10,
        }
    }

    #[test]
    fn accepts_a_well_formed_request() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn rejects_unknown_closed_set_values() {
        let mut req = valid_request();
        req.difficulty_levels = vec!["impossible".into()];
        assert!(req.validate().is_err());

        let mut req = valid_request();
        req.question_types = vec!["essay".into()];
        assert!(req.validate().is_err());

        let mut req = valid_request();
        req.bloom_levels = vec!["memorize".into()];
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_empty_selections_and_out_of_range_numbers() {
        let mut req = valid_request();
        req.difficulty_levels = vec![];
        assert!(req.validate().is_err());

        let mut req = valid_request();
        req.duration_minutes = 3;
        assert!(req.validate().is_err());

        let mut req = valid_request();
        req.question_count = 500;
        assert!(req.validate().is_err());
    }
}
