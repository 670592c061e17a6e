// src/handlers/exam_sessions.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    clients::compute::{ComputeClient, StartSessionRequest},
    error::AppError,
    handlers::{documents::fetch_owned_document, question_papers::fetch_owned_paper},
    models::{
        document::ProcessingStatus,
        exam_session::{
            CorrectionReport, CreateSessionRequest, ExamSession, SessionMode, SessionStatus,
        },
    },
    utils::jwt::Claims,
};

/// Schedules a voice session over an ingested document.
///
/// EXAM mode requires a READY question paper generated from the same
/// document; LEARN mode is free-form and needs none.
pub async fn create_session(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    // 1. Source document: owned and fully ingested.
    let document = fetch_owned_document(&pool, payload.document_id, user_id).await?;
    if document.status != ProcessingStatus::Ready {
        return Err(AppError::InvalidState(
            "Document must finish processing before starting a session".to_string(),
        ));
    }

    // 2. Paper rules per mode.
    if payload.mode == SessionMode::Exam && payload.question_paper_id.is_none() {
        return Err(AppError::BadRequest(
            "An exam session requires a question paper".to_string(),
        ));
    }

    if let Some(paper_id) = payload.question_paper_id {
        let paper = fetch_owned_paper(&pool, paper_id, user_id).await?;
        if paper.document_id != payload.document_id {
            return Err(AppError::BadRequest(
                "Question paper does not belong to this document".to_string(),
            ));
        }
        if paper.status != ProcessingStatus::Ready {
            return Err(AppError::InvalidState(
                "Question paper is not ready yet".to_string(),
            ));
        }
    }

    // 3. Create as SCHEDULED; nothing talks to the compute backend until
    // start.
    let session = sqlx::query_as::<_, ExamSession>(
        r#"
        INSERT INTO exam_sessions (user_id, document_id, question_paper_id, mode)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, document_id, question_paper_id, mode, status,
                  room_id, thread_id, started_at, ended_at, created_at
        "#,
    )
    .bind(user_id)
    .bind(payload.document_id)
    .bind(payload.question_paper_id)
    .bind(payload.mode)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create exam session: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Lists the caller's sessions, newest first.
pub async fn list_sessions(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let sessions = sqlx::query_as::<_, ExamSession>(
        r#"
        SELECT id, user_id, document_id, question_paper_id, mode, status,
               room_id, thread_id, started_at, ended_at, created_at
        FROM exam_sessions
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(sessions))
}

/// Gets a single session. Owner only.
pub async fn get_session(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let session = fetch_owned_session(&pool, id, user_id).await?;
    Ok(Json(session))
}

/// Starts a scheduled session.
///
/// The compute backend is asked first and is authoritative: the local
/// SCHEDULED -> IN_PROGRESS transition only happens once a voice room
/// exists. The transition itself is a conditional update, so two racing
/// starts cannot both succeed.
pub async fn start_session(
    State(pool): State<PgPool>,
    State(compute): State<ComputeClient>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let session = fetch_owned_session(&pool, id, user_id).await?;
    if session.status != SessionStatus::Scheduled {
        return Err(AppError::InvalidState(
            "Session is not in a scheduled state".to_string(),
        ));
    }

    // Usage gate: no voice minutes left means no new session.
    let has_minutes = sqlx::query_scalar::<_, bool>(
        "SELECT voice_minutes_used < voice_minutes_limit FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    if !has_minutes {
        return Err(AppError::Forbidden(
            "Voice minute allowance exhausted; purchase a plan or topup to continue".to_string(),
        ));
    }

    let grant = compute
        .start_exam_session(&StartSessionRequest {
            session_id: session.id,
            document_id: session.document_id,
            question_paper_id: session.question_paper_id,
            mode: match session.mode {
                SessionMode::Exam => "EXAM".to_string(),
                SessionMode::Learn => "LEARN".to_string(),
            },
        })
        .await?;

    let session = sqlx::query_as::<_, ExamSession>(
        r#"
        UPDATE exam_sessions
        SET status = 'IN_PROGRESS', started_at = NOW(), room_id = $3, thread_id = $4
        WHERE id = $1 AND user_id = $2 AND status = 'SCHEDULED'
        RETURNING id, user_id, document_id, question_paper_id, mode, status,
                  room_id, thread_id, started_at, ended_at, created_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(&grant.room_id)
    .bind(&grant.thread_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::InvalidState(
        "Session is no longer scheduled".to_string(),
    ))?;

    Ok(Json(json!({
        "session": session,
        "token": grant.token,
    })))
}

/// Cancels a session that has not completed.
pub async fn cancel_session(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let session = sqlx::query_as::<_, ExamSession>(
        r#"
        UPDATE exam_sessions
        SET status = 'CANCELLED', ended_at = NOW()
        WHERE id = $1 AND user_id = $2 AND status IN ('SCHEDULED', 'IN_PROGRESS')
        RETURNING id, user_id, document_id, question_paper_id, mode, status,
                  room_id, thread_id, started_at, ended_at, created_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?;

    match session {
        Some(session) => Ok(Json(session)),
        None => Err(denied_session(&pool, id, user_id).await?),
    }
}

/// Gets the correction report for a completed session. Owner only; 404 until
/// the examiner has delivered it.
pub async fn get_report(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    fetch_owned_session(&pool, id, user_id).await?;

    let report = sqlx::query_as::<_, CorrectionReport>(
        r#"
        SELECT id, exam_session_id, score, grade, strengths, weaknesses,
               recommendations, question_feedback, created_at
        FROM correction_reports
        WHERE exam_session_id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Report not available yet".to_string()))?;

    Ok(Json(report))
}

/// Fetches a session and enforces ownership.
async fn fetch_owned_session(pool: &PgPool, id: i64, user_id: i64) -> Result<ExamSession, AppError> {
    let session = sqlx::query_as::<_, ExamSession>(
        r#"
        SELECT id, user_id, document_id, question_paper_id, mode, status,
               room_id, thread_id, started_at, ended_at, created_at
        FROM exam_sessions
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Session not found".to_string()))?;

    if session.user_id != user_id {
        return Err(AppError::Forbidden(
            "You do not own this session".to_string(),
        ));
    }

    Ok(session)
}

/// Explains a zero-row conditional write on a session.
async fn denied_session(pool: &PgPool, id: i64, user_id: i64) -> Result<AppError, AppError> {
    let owner = sqlx::query_scalar::<_, i64>("SELECT user_id FROM exam_sessions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(match owner {
        None => AppError::NotFound("Session not found".to_string()),
        Some(uid) if uid != user_id => {
            AppError::Forbidden("You do not own this session".to_string())
        }
        Some(_) => AppError::InvalidState("Session has already finished".to_string()),
    })
}
