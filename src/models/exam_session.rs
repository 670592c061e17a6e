// src/models/exam_session.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionMode {
    /// Timed oral exam against a generated question paper.
    Exam,
    /// Open-ended voice tutoring over a document; no paper required.
    Learn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

/// Represents the 'exam_sessions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamSession {
    pub id: i64,
    pub user_id: i64,
    pub document_id: i64,

    /// None for LEARN sessions.
    pub question_paper_id: Option<i64>,

    pub mode: SessionMode,
    pub status: SessionStatus,

    /// Voice room identifier handed out by the compute backend at start.
    pub room_id: Option<String>,

    /// Conversation thread identifier on the compute backend.
    pub thread_id: Option<String>,

    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'correction_reports' table: the AI examiner's verdict,
/// written once when a session completes.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CorrectionReport {
    pub id: i64,
    pub exam_session_id: i64,

    /// Overall score, 0..=100.
    pub score: f64,
    pub grade: String,

    pub strengths: Json<Vec<String>>,
    pub weaknesses: Json<Vec<String>>,
    pub recommendations: Json<Vec<String>>,

    /// Per-question breakdown as delivered by the examiner.
    pub question_feedback: Json<Vec<QuestionFeedback>>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionFeedback {
    pub question: String,
    pub score: f64,
    pub feedback: String,
}

/// DTO for scheduling a session. Ids are checked against ownership in the
/// handler; serde rejects an unknown mode on its own.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub document_id: i64,
    pub question_paper_id: Option<i64>,
    pub mode: SessionMode,
}
