// src/handlers/question_papers.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    clients::compute::{ComputeClient, GeneratePaperRequest},
    error::AppError,
    handlers::documents::fetch_owned_document,
    models::{
        document::ProcessingStatus,
        question_paper::{CreateQuestionPaperRequest, QuestionPaper},
    },
    utils::jwt::Claims,
};

/// Requests generation of a question paper from an ingested document.
///
/// The source document must belong to the caller and be READY. The row is
/// created PENDING before the compute backend is asked to generate; if the
/// hand-off fails the row is marked FAILED and the failure surfaces to the
/// caller.
pub async fn create_question_paper(
    State(pool): State<PgPool>,
    State(compute): State<ComputeClient>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionPaperRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;

    // 1. Source document: owned and fully ingested.
    let document = fetch_owned_document(&pool, payload.document_id, user_id).await?;
    if document.status != ProcessingStatus::Ready {
        return Err(AppError::InvalidState(
            "Document must finish processing before generating a paper".to_string(),
        ));
    }

    // 2. Record the request.
    let paper = sqlx::query_as::<_, QuestionPaper>(
        r#"
        INSERT INTO question_papers
            (user_id, document_id, difficulty_levels, question_types,
             bloom_levels, duration_minutes, question_count)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, user_id, document_id, status, difficulty_levels,
                  question_types, bloom_levels, duration_minutes,
                  question_count, failure_reason, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(payload.document_id)
    .bind(SqlJson(&payload.difficulty_levels))
    .bind(SqlJson(&payload.question_types))
    .bind(SqlJson(&payload.bloom_levels))
    .bind(payload.duration_minutes)
    .bind(payload.question_count)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question paper: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    // 3. Hand off to the compute backend. Generation itself is async; the
    // outcome arrives later on the internal callback.
    let gen_req = GeneratePaperRequest {
        question_paper_id: paper.id,
        document_id: document.id,
        difficulty_levels: payload.difficulty_levels,
        question_types: payload.question_types,
        bloom_levels: payload.bloom_levels,
        duration_minutes: payload.duration_minutes,
        question_count: payload.question_count,
    };

    if let Err(e) = compute.create_question_paper(&gen_req).await {
        let marked = sqlx::query(
            r#"
            UPDATE question_papers
            SET status = 'FAILED', failure_reason = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(paper.id)
        .bind("Generation request could not be submitted")
        .execute(&pool)
        .await;
        if let Err(db_err) = marked {
            tracing::error!(
                "Failed to mark question paper {} as failed: {:?}",
                paper.id,
                db_err
            );
        }
        return Err(e);
    }

    Ok((StatusCode::CREATED, Json(paper)))
}

/// Lists the caller's question papers, newest first.
pub async fn list_question_papers(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let papers = sqlx::query_as::<_, QuestionPaper>(
        r#"
        SELECT id, user_id, document_id, status, difficulty_levels,
               question_types, bloom_levels, duration_minutes,
               question_count, failure_reason, created_at, updated_at
        FROM question_papers
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(papers))
}

/// Gets a single question paper. Owner only.
pub async fn get_question_paper(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let paper = fetch_owned_paper(&pool, id, user_id).await?;
    Ok(Json(paper))
}

/// Fetches a question paper and enforces ownership.
pub(crate) async fn fetch_owned_paper(
    pool: &PgPool,
    id: i64,
    user_id: i64,
) -> Result<QuestionPaper, AppError> {
    let paper = sqlx::query_as::<_, QuestionPaper>(
        r#"
        SELECT id, user_id, document_id, status, difficulty_levels,
               question_types, bloom_levels, duration_minutes,
               question_count, failure_reason, created_at, updated_at
        FROM question_papers
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Question paper not found".to_string()))?;

    if paper.user_id != user_id {
        return Err(AppError::Forbidden(
            "You do not own this question paper".to_string(),
        ));
    }

    Ok(paper)
}
