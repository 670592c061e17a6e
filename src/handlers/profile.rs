// src/handlers/profile.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        plan::Region,
        user::{UsageResponse, User},
    },
    utils::jwt::Claims,
};

/// Returns the caller's pricing region.
///
/// Before the first purchase locks a region in, this is "global"; the client
/// may still offer region selection at checkout until then.
pub async fn get_region(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let region = sqlx::query_scalar::<_, Option<Region>>("SELECT region FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to read region: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "region": region.unwrap_or(Region::Global),
    })))
}

/// Returns the caller's usage counters and limits.
pub async fn get_usage(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password, region, subscription_tier,
               voice_minutes_used, voice_minutes_limit,
               chat_messages_used, chat_messages_limit,
               pages_used, pages_limit, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to read usage: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UsageResponse::from_user(user)))
}
