// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::plan::Region;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique email address, used as the login identifier.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// Pricing region. None until locked by the first successful purchase.
    pub region: Option<Region>,

    /// Current plan name, or 'free' before any purchase.
    pub subscription_tier: String,

    pub voice_minutes_used: i64,
    pub voice_minutes_limit: i64,
    pub chat_messages_used: i64,
    pub chat_messages_limit: i64,
    pub pages_used: i64,
    pub pages_limit: i64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Usage snapshot for the current user, in the shape the web client expects.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub id: i64,
    pub email: String,
    pub region: Region,
    pub subscription_tier: String,
    pub voice_minutes_used: i64,
    pub voice_minutes_limit: i64,
    pub chat_messages_used: i64,
    pub chat_messages_limit: i64,
    pub pages_used: i64,
    pub pages_limit: i64,
}

impl UsageResponse {
    pub fn from_user(user: User) -> Self {
        UsageResponse {
            id: user.id,
            email: user.email,
            region: user.region.unwrap_or(Region::Global),
            subscription_tier: user.subscription_tier,
            voice_minutes_used: user.voice_minutes_used,
            voice_minutes_limit: user.voice_minutes_limit,
            chat_messages_used: user.chat_messages_used,
            chat_messages_limit: user.chat_messages_limit,
            pages_used: user.pages_used,
            pages_limit: user.pages_limit,
        }
    }
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "A valid email address is required."))]
    #[validate(length(max = 255))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 255))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}
