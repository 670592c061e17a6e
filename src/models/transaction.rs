// src/models/transaction.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    PackPurchase,
    Subscription,
    Refund,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Success,
    Failed,
    Pending,
}

/// Represents the 'transactions' table: one row per gateway payment event.
/// payment_id carries a UNIQUE constraint, which is what makes webhook
/// redelivery idempotent.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,

    pub txn_type: TransactionType,
    pub status: TransactionStatus,

    /// Gateway order id this payment settles, when known.
    pub order_id: Option<String>,

    /// Gateway payment id. The idempotency key.
    pub payment_id: String,

    /// Amount in the currency's smallest unit.
    pub amount: i64,
    pub currency: String,

    pub plan_name: Option<String>,
    pub minutes_credited: i64,
    pub pages_credited: i64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}
