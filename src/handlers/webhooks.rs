// src/handlers/webhooks.rs

use axum::{Json, body::Bytes, extract::State, http::HeaderMap, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    models::{
        plan::{Plan, PlanKind, Region},
        transaction::{TransactionStatus, TransactionType},
    },
    utils::signature::verify_signature,
};

pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// The slice of the gateway's webhook envelope we act on. Anything the
/// deserializer cannot shape into this is a 400.
#[derive(Debug, Deserialize)]
struct WebhookEvent {
    event: String,
    payload: Option<WebhookPayload>,
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    payment: Option<PaymentWrapper>,
}

#[derive(Debug, Deserialize)]
struct PaymentWrapper {
    entity: Option<PaymentEntity>,
}

#[derive(Debug, Deserialize)]
struct PaymentEntity {
    id: String,
    order_id: Option<String>,
    amount: i64,
    currency: String,
    #[serde(default)]
    notes: serde_json::Value,
}

/// The order notes we wrote at order creation, echoed back by the gateway.
/// Everything is optional: the webhook also receives payments that did not
/// originate here.
#[derive(Debug, Default, PartialEq)]
struct PaymentNotes {
    user_id: Option<String>,
    plan_name: Option<String>,
    minutes: Option<String>,
    pages: Option<String>,
    region: Option<String>,
}

impl PaymentNotes {
    /// The gateway serializes empty notes as [] instead of {}; anything that
    /// is not an object counts as empty.
    fn from_value(value: &serde_json::Value) -> Self {
        let Some(map) = value.as_object() else {
            return PaymentNotes::default();
        };
        let get = |key: &str| map.get(key).and_then(|v| v.as_str()).map(str::to_string);
        PaymentNotes {
            user_id: get("userId"),
            plan_name: get("planName"),
            minutes: get("minutes"),
            pages: get("pages"),
            region: get("region"),
        }
    }
}

/// Receives payment gateway webhooks.
///
/// Order of checks is load-bearing: the HMAC gate runs against the raw bytes
/// before any parsing, a missing header is 400 while a bad signature is 401,
/// and only verified payloads reach the database. Every handled outcome
/// returns 200 so the gateway stops redelivering.
pub async fn payment_webhook(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    // 1. Signature gate.
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::BadRequest(
            "Missing signature header".to_string(),
        ))?;

    verify_signature(&body, signature, config.razorpay_webhook_secret.as_bytes())?;

    // 2. Only a verified payload is parsed.
    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Malformed webhook payload: {}", e)))?;

    // 3. Dispatch. Unhandled event kinds are acknowledged untouched.
    match event.event.as_str() {
        "payment.captured" => handle_payment_captured(&pool, event).await?,
        "payment.failed" => handle_payment_failed(&pool, event).await?,
        other => {
            tracing::info!(event = other, "Ignoring unhandled webhook event");
        }
    }

    Ok(Json(json!({ "received": true })))
}

/// Applies credit for a captured payment, exactly once per payment id.
async fn handle_payment_captured(pool: &PgPool, event: WebhookEvent) -> Result<(), AppError> {
    let entity = payment_entity(event)?;
    let notes = PaymentNotes::from_value(&entity.notes);

    let Some(user_id) = parse_user_id(&notes, &entity.id) else {
        return Ok(());
    };

    // Credits come from the notes; the catalog is the fallback when the
    // notes are missing or mangled.
    let region = notes.region.as_deref().and_then(Region::parse);
    let plan = match (region, notes.plan_name.as_deref()) {
        (Some(region), Some(name)) => Plan::resolve(region, name),
        _ => None,
    };

    let minutes = notes
        .minutes
        .as_deref()
        .and_then(|m| m.parse::<i64>().ok())
        .or(plan.map(|p| p.minutes));
    let pages = notes
        .pages
        .as_deref()
        .and_then(|p| p.parse::<i64>().ok())
        .or(plan.map(|p| p.pages));

    if minutes.is_none() && pages.is_none() {
        tracing::warn!(
            payment_id = %entity.id,
            "Captured payment has no resolvable credit amounts; acknowledging without credit"
        );
        return Ok(());
    }
    let minutes = minutes.unwrap_or(0);
    let pages = pages.unwrap_or(0);

    let txn_type = match plan.map(|p| p.kind) {
        Some(PlanKind::Subscription) => TransactionType::Subscription,
        Some(PlanKind::Pack) | None => TransactionType::PackPurchase,
    };
    // Only a recognized subscription plan moves the tier.
    let new_tier = plan.filter(|p| p.kind == PlanKind::Subscription).map(|p| p.name);

    let mut tx = pool.begin().await?;

    let user_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
    if !user_exists {
        tracing::warn!(
            payment_id = %entity.id,
            user_id,
            "Captured payment references an unknown user; acknowledging without credit"
        );
        return Ok(());
    }

    // 1. Idempotency gate: the UNIQUE(payment_id) insert either claims this
    // delivery or reports it already processed.
    let claimed = sqlx::query(
        r#"
        INSERT INTO transactions
            (user_id, txn_type, status, order_id, payment_id, amount,
             currency, plan_name, minutes_credited, pages_credited)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (payment_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(txn_type)
    .bind(TransactionStatus::Success)
    .bind(&entity.order_id)
    .bind(&entity.id)
    .bind(entity.amount)
    .bind(&entity.currency)
    .bind(&notes.plan_name)
    .bind(minutes)
    .bind(pages)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if claimed == 0 {
        tracing::info!(
            payment_id = %entity.id,
            "Duplicate webhook delivery; credit already applied"
        );
        return Ok(());
    }

    // 2. Credit, tier, and region lock, in the same transaction as the
    // ledger row. COALESCE writes the region exactly once.
    sqlx::query(
        r#"
        UPDATE users
        SET voice_minutes_limit = voice_minutes_limit + $2,
            pages_limit = pages_limit + $3,
            subscription_tier = COALESCE($4, subscription_tier),
            region = COALESCE(region, $5)
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(minutes)
    .bind(pages)
    .bind(new_tier)
    .bind(region)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        payment_id = %entity.id,
        user_id,
        minutes,
        pages,
        "Payment captured; credit applied"
    );
    Ok(())
}

/// Records a failed payment in the ledger. The user row is never touched.
async fn handle_payment_failed(pool: &PgPool, event: WebhookEvent) -> Result<(), AppError> {
    let entity = payment_entity(event)?;
    let notes = PaymentNotes::from_value(&entity.notes);

    let Some(user_id) = parse_user_id(&notes, &entity.id) else {
        return Ok(());
    };

    let user_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    if !user_exists {
        tracing::warn!(
            payment_id = %entity.id,
            user_id,
            "Failed payment references an unknown user; acknowledging"
        );
        return Ok(());
    }

    let recorded = sqlx::query(
        r#"
        INSERT INTO transactions
            (user_id, txn_type, status, order_id, payment_id, amount,
             currency, plan_name)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (payment_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(TransactionType::PackPurchase)
    .bind(TransactionStatus::Failed)
    .bind(&entity.order_id)
    .bind(&entity.id)
    .bind(entity.amount)
    .bind(&entity.currency)
    .bind(&notes.plan_name)
    .execute(pool)
    .await?
    .rows_affected();

    if recorded == 0 {
        tracing::info!(
            payment_id = %entity.id,
            "Duplicate failed-payment delivery; already recorded"
        );
    }
    Ok(())
}

fn payment_entity(event: WebhookEvent) -> Result<PaymentEntity, AppError> {
    event
        .payload
        .and_then(|p| p.payment)
        .and_then(|p| p.entity)
        .ok_or(AppError::BadRequest(
            "Malformed webhook payload: missing payment entity".to_string(),
        ))
}

/// Pulls the user id out of the notes. A payment without a usable userId is
/// acknowledged and skipped: redelivery would fail the same way forever.
fn parse_user_id(notes: &PaymentNotes, payment_id: &str) -> Option<i64> {
    match notes.user_id.as_deref() {
        None => {
            tracing::warn!(
                payment_id,
                "Webhook payment carries no userId note; acknowledging without processing"
            );
            None
        }
        Some(raw) => match raw.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!(
                    payment_id,
                    raw_user_id = raw,
                    "Webhook payment carries an unparsable userId; acknowledging without processing"
                );
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn notes_parse_from_an_object() {
        let value = json!({
            "userId": "42",
            "planName": "standard",
            "minutes": "250",
            "pages": "200",
            "region": "india"
        });
        let notes = PaymentNotes::from_value(&value);
        assert_eq!(notes.user_id.as_deref(), Some("42"));
        assert_eq!(notes.plan_name.as_deref(), Some("standard"));
        assert_eq!(notes.minutes.as_deref(), Some("250"));
        assert_eq!(notes.region.as_deref(), Some("india"));
    }

    #[test]
    fn empty_array_notes_count_as_empty() {
        // Razorpay sends [] when no notes were attached to the order.
        let notes = PaymentNotes::from_value(&json!([]));
        assert_eq!(notes, PaymentNotes::default());
        let notes = PaymentNotes::from_value(&json!(null));
        assert_eq!(notes, PaymentNotes::default());
    }

    #[test]
    fn non_string_note_values_are_ignored() {
        let notes = PaymentNotes::from_value(&json!({ "userId": 42, "minutes": 250 }));
        assert_eq!(notes.user_id, None);
        assert_eq!(notes.minutes, None);
    }

    #[test]
    fn envelope_requires_an_event_field() {
        let ok: Result<WebhookEvent, _> =
            serde_json::from_str(r#"{"event":"payment.captured","payload":{}}"#);
        assert!(ok.is_ok());

        let missing: Result<WebhookEvent, _> = serde_json::from_str(r#"{"payload":{}}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn unparsable_user_ids_are_skipped() {
        let notes = PaymentNotes {
            user_id: Some("not-a-number".to_string()),
            ..PaymentNotes::default()
        };
        assert_eq!(parse_user_id(&notes, "pay_x"), None);

        let notes = PaymentNotes {
            user_id: Some("42".to_string()),
            ..PaymentNotes::default()
        };
        assert_eq!(parse_user_id(&notes, "pay_x"), Some(42));
    }
}
