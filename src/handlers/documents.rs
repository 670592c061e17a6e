// src/handlers/documents.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    clients::compute::ComputeClient,
    error::AppError,
    models::document::{CreateDocumentRequest, Document, ProcessingStatus},
    utils::jwt::Claims,
};

/// Registers an uploaded document and queues it for ingestion.
///
/// The file itself was already written to object storage by the client; this
/// records the reference as PENDING. The compute backend picks it up and
/// reports progress through the internal status callback.
pub async fn create_document(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateDocumentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;

    let document = sqlx::query_as::<_, Document>(
        r#"
        INSERT INTO documents (user_id, file_name, file_key)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, file_name, file_key, status, page_count,
                  failure_reason, archived_at, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(&payload.file_name)
    .bind(&payload.file_key)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create document: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(document)))
}

/// Lists the caller's documents, newest first. Archived documents are
/// invisible here and everywhere else.
pub async fn list_documents(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let documents = sqlx::query_as::<_, Document>(
        r#"
        SELECT id, user_id, file_name, file_key, status, page_count,
               failure_reason, archived_at, created_at, updated_at
        FROM documents
        WHERE user_id = $1 AND archived_at IS NULL
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(documents))
}

/// Gets a single document. Owner only.
pub async fn get_document(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let document = fetch_owned_document(&pool, id, user_id).await?;
    Ok(Json(document))
}

/// Soft-deletes a document.
///
/// The archive is local-first; the compute backend's cleanup is best effort.
/// A failed cleanup is logged and swept later; the user's view must not stay
/// blocked on it.
pub async fn delete_document(
    State(pool): State<PgPool>,
    State(compute): State<ComputeClient>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    // Ownership is folded into the UPDATE itself so there is no window
    // between check and write.
    let archived = sqlx::query(
        r#"
        UPDATE documents
        SET archived_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND user_id = $2 AND archived_at IS NULL
        "#,
    )
    .bind(id)
    .bind(user_id)
    .execute(&pool)
    .await?
    .rows_affected();

    if archived == 0 {
        return Err(denied_document(&pool, id, user_id).await?);
    }

    if let Err(e) = compute.delete_document(id).await {
        tracing::warn!(document_id = id, "Compute cleanup failed: {}", e);
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Re-queues a FAILED document for ingestion.
///
/// The compute call is authoritative: only after it accepts the retry does
/// the local status move to PROCESSING.
pub async fn retry_document(
    State(pool): State<PgPool>,
    State(compute): State<ComputeClient>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let document = fetch_owned_document(&pool, id, user_id).await?;
    if document.status != ProcessingStatus::Failed {
        return Err(AppError::InvalidState(
            "Only failed documents can be retried".to_string(),
        ));
    }

    compute.retry_document(id).await?;

    let document = sqlx::query_as::<_, Document>(
        r#"
        UPDATE documents
        SET status = 'PROCESSING', failure_reason = NULL, updated_at = NOW()
        WHERE id = $1 AND user_id = $2 AND status = 'FAILED'
        RETURNING id, user_id, file_name, file_key, status, page_count,
                  failure_reason, archived_at, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::InvalidState(
        "Document is no longer in a failed state".to_string(),
    ))?;

    Ok(Json(document))
}

/// Returns a short-lived download URL for the original file. Owner only; the
/// URL itself comes from the compute backend.
pub async fn document_url(
    State(pool): State<PgPool>,
    State(compute): State<ComputeClient>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    fetch_owned_document(&pool, id, user_id).await?;

    let url = compute.document_url(id).await?;

    Ok(Json(json!({ "url": url })))
}

/// Fetches an unarchived document and enforces ownership. A missing row is
/// NotFound; a row owned by someone else is Forbidden.
pub(crate) async fn fetch_owned_document(
    pool: &PgPool,
    id: i64,
    user_id: i64,
) -> Result<Document, AppError> {
    let document = sqlx::query_as::<_, Document>(
        r#"
        SELECT id, user_id, file_name, file_key, status, page_count,
               failure_reason, archived_at, created_at, updated_at
        FROM documents
        WHERE id = $1 AND archived_at IS NULL
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Document not found".to_string()))?;

    if document.user_id != user_id {
        return Err(AppError::Forbidden(
            "You do not own this document".to_string(),
        ));
    }

    Ok(document)
}

/// Explains a zero-row conditional write: the document is either gone or
/// owned by someone else.
async fn denied_document(pool: &PgPool, id: i64, user_id: i64) -> Result<AppError, AppError> {
    let owner = sqlx::query_scalar::<_, i64>(
        "SELECT user_id FROM documents WHERE id = $1 AND archived_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(match owner {
        None => AppError::NotFound("Document not found".to_string()),
        Some(uid) if uid != user_id => {
            AppError::Forbidden("You do not own this document".to_string())
        }
        Some(_) => AppError::InvalidState("Document cannot be modified".to_string()),
    })
}
