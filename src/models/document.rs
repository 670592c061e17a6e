// src/models/document.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Ingestion lifecycle shared by documents and question papers. The compute
/// backend drives PENDING -> PROCESSING -> READY | FAILED via internal
/// callbacks; READY and FAILED are terminal except for an explicit retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Ready,
    Failed,
}

/// Represents the 'documents' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub user_id: i64,

    /// Display name shown to the user.
    pub file_name: String,

    /// Storage key the compute backend ingests from.
    pub file_key: String,

    pub status: ProcessingStatus,

    /// Page count reported by ingestion; None until READY.
    pub page_count: Option<i64>,

    pub failure_reason: Option<String>,

    /// Soft delete marker. Archived documents are invisible to all reads.
    pub archived_at: Option<chrono::DateTime<chrono::Utc>>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for registering an uploaded document. The file itself goes to object
/// storage out of band; this only records the reference.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "File name length must be between 1 and 255 characters."
    ))]
    pub file_name: String,
    #[validate(length(min = 1, max = 512))]
    pub file_key: String,
}
