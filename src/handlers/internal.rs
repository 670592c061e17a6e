// src/handlers/internal.rs
//
// Callbacks from the compute backend. These ride a shared-key header rather
// than user JWTs: the caller is our own service reporting on work it was
// handed, and it must be able to mutate rows no end user could.

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::{PgPool, types::Json as SqlJson};

use crate::{
    config::Config,
    error::AppError,
    models::{document::ProcessingStatus, exam_session::QuestionFeedback},
    utils::signature::keys_match,
};

pub const INTERNAL_KEY_HEADER: &str = "x-internal-key";

/// Axum Middleware: shared-key gate for compute backend callbacks.
pub async fn internal_middleware(
    State(config): State<Config>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let provided = req
        .headers()
        .get(INTERNAL_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if keys_match(key, &config.internal_api_key) => Ok(next.run(req).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Ingestion/generation progress report.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCallback {
    pub status: ProcessingStatus,
    pub pages: Option<i64>,
    pub error: Option<String>,
}

/// Updates a document's ingestion status.
///
/// Transitions are conditional on the current state, so a redelivered
/// callback finds zero rows and no-ops instead of double-counting pages.
pub async fn update_document_status(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<StatusCallback>,
) -> Result<Json<serde_json::Value>, AppError> {
    match payload.status {
        ProcessingStatus::Ready => {
            let pages = payload.pages.unwrap_or(0);

            let mut tx = pool.begin().await?;
            let updated = sqlx::query(
                r#"
                UPDATE documents
                SET status = 'READY', page_count = $2, failure_reason = NULL,
                    updated_at = NOW()
                WHERE id = $1 AND status IN ('PENDING', 'PROCESSING')
                "#,
            )
            .bind(id)
            .bind(pages)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if updated == 0 {
                return document_noop_or_missing(&pool, id).await;
            }

            // Ingested pages count against the owner's allowance, once.
            sqlx::query(
                r#"
                UPDATE users
                SET pages_used = pages_used + $2
                WHERE id = (SELECT user_id FROM documents WHERE id = $1)
                "#,
            )
            .bind(id)
            .bind(pages)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
        }
        ProcessingStatus::Failed => {
            let updated = sqlx::query(
                r#"
                UPDATE documents
                SET status = 'FAILED', failure_reason = $2, updated_at = NOW()
                WHERE id = $1 AND status IN ('PENDING', 'PROCESSING')
                "#,
            )
            .bind(id)
            .bind(payload.error.as_deref().unwrap_or("Ingestion failed"))
            .execute(&pool)
            .await?
            .rows_affected();

            if updated == 0 {
                return document_noop_or_missing(&pool, id).await;
            }
        }
        ProcessingStatus::Processing => {
            let updated = sqlx::query(
                r#"
                UPDATE documents
                SET status = 'PROCESSING', updated_at = NOW()
                WHERE id = $1 AND status = 'PENDING'
                "#,
            )
            .bind(id)
            .execute(&pool)
            .await?
            .rows_affected();

            if updated == 0 {
                return document_noop_or_missing(&pool, id).await;
            }
        }
        ProcessingStatus::Pending => {
            return Err(AppError::BadRequest(
                "Cannot reset a document to PENDING".to_string(),
            ));
        }
    }

    Ok(Json(json!({ "updated": true })))
}

/// Updates a question paper's generation status. Same conditional-transition
/// shape as documents, minus page accounting.
pub async fn update_paper_status(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<StatusCallback>,
) -> Result<Json<serde_json::Value>, AppError> {
    let updated = match payload.status {
        ProcessingStatus::Ready => {
            sqlx::query(
                r#"
                UPDATE question_papers
                SET status = 'READY', failure_reason = NULL, updated_at = NOW()
                WHERE id = $1 AND status IN ('PENDING', 'PROCESSING')
                "#,
            )
            .bind(id)
            .execute(&pool)
            .await?
            .rows_affected()
        }
        ProcessingStatus::Failed => {
            sqlx::query(
                r#"
                UPDATE question_papers
                SET status = 'FAILED', failure_reason = $2, updated_at = NOW()
                WHERE id = $1 AND status IN ('PENDING', 'PROCESSING')
                "#,
            )
            .bind(id)
            .bind(payload.error.as_deref().unwrap_or("Generation failed"))
            .execute(&pool)
            .await?
            .rows_affected()
        }
        ProcessingStatus::Processing => {
            sqlx::query(
                r#"
                UPDATE question_papers
                SET status = 'PROCESSING', updated_at = NOW()
                WHERE id = $1 AND status = 'PENDING'
                "#,
            )
            .bind(id)
            .execute(&pool)
            .await?
            .rows_affected()
        }
        ProcessingStatus::Pending => {
            return Err(AppError::BadRequest(
                "Cannot reset a question paper to PENDING".to_string(),
            ));
        }
    };

    if updated == 0 {
        return paper_noop_or_missing(&pool, id).await;
    }

    Ok(Json(json!({ "updated": true })))
}

/// The examiner's end-of-session report.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSessionCallback {
    pub score: f64,
    pub grade: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub question_feedback: Vec<QuestionFeedback>,
    #[serde(default)]
    pub minutes_used: i64,
    #[serde(default)]
    pub chat_messages_used: i64,
}

/// Completes a session: correction report plus usage accounting, atomically.
///
/// The IN_PROGRESS -> COMPLETED conditional update doubles as the
/// idempotency gate; a redelivered callback cannot increment usage twice.
pub async fn complete_session(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<CompleteSessionCallback>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = pool.begin().await?;

    let completed = sqlx::query(
        r#"
        UPDATE exam_sessions
        SET status = 'COMPLETED', ended_at = NOW()
        WHERE id = $1 AND status = 'IN_PROGRESS'
        "#,
    )
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if completed == 0 {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM exam_sessions WHERE id = $1)")
                .bind(id)
                .fetch_one(&pool)
                .await?;
        return if exists {
            tracing::info!(
                session_id = id,
                "Completion callback for a session not in progress; ignoring"
            );
            Ok(Json(json!({ "updated": false })))
        } else {
            Err(AppError::NotFound("Session not found".to_string()))
        };
    }

    sqlx::query(
        r#"
        INSERT INTO correction_reports
            (exam_session_id, score, grade, strengths, weaknesses,
             recommendations, question_feedback)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (exam_session_id) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(payload.score)
    .bind(&payload.grade)
    .bind(SqlJson(&payload.strengths))
    .bind(SqlJson(&payload.weaknesses))
    .bind(SqlJson(&payload.recommendations))
    .bind(SqlJson(&payload.question_feedback))
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE users
        SET voice_minutes_used = voice_minutes_used + $2,
            chat_messages_used = chat_messages_used + $3
        WHERE id = (SELECT user_id FROM exam_sessions WHERE id = $1)
        "#,
    )
    .bind(id)
    .bind(payload.minutes_used.max(0))
    .bind(payload.chat_messages_used.max(0))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(json!({ "updated": true })))
}

async fn document_noop_or_missing(
    pool: &PgPool,
    id: i64,
) -> Result<Json<serde_json::Value>, AppError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM documents WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if exists {
        tracing::info!(
            document_id = id,
            "Status callback for a document already in a terminal state; ignoring"
        );
        Ok(Json(json!({ "updated": false })))
    } else {
        Err(AppError::NotFound("Document not found".to_string()))
    }
}

async fn paper_noop_or_missing(
    pool: &PgPool,
    id: i64,
) -> Result<Json<serde_json::Value>, AppError> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM question_papers WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await?;
    if exists {
        tracing::info!(
            question_paper_id = id,
            "Status callback for a paper already in a terminal state; ignoring"
        );
        Ok(Json(json!({ "updated": false })))
    } else {
        Err(AppError::NotFound("Question paper not found".to_string()))
    }
}
