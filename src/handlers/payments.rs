// src/handlers/payments.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    clients::gateway::GatewayClient,
    config::Config,
    error::AppError,
    models::{
        plan::{Plan, Region},
        transaction::Transaction,
    },
    utils::jwt::Claims,
};

/// Longest plan name we will even look up. Anything beyond this is junk.
const PLAN_NAME_MAX_LEN: usize = 64;

/// Creates a payment gateway order for a catalog plan.
///
/// The body is parsed as raw JSON rather than a typed extractor: a
/// `planName` of the wrong JSON type must come back as a 400 from our own
/// validation, and the amount charged is always the catalog's, never the
/// client's. Region resolution order: the user's locked region, then a
/// region declared in the body, then global.
pub async fn create_order(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(gateway): State<GatewayClient>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    // 1. planName: present, a string, and within the sanity cap. Nothing
    // else is consulted before these checks pass.
    let plan_name = match body.get("planName") {
        None | Some(serde_json::Value::Null) => {
            return Err(AppError::BadRequest("planName is required".to_string()));
        }
        Some(serde_json::Value::String(s)) => s.as_str(),
        Some(_) => {
            return Err(AppError::BadRequest(
                "planName must be a string".to_string(),
            ));
        }
    };
    if plan_name.is_empty() || plan_name.len() > PLAN_NAME_MAX_LEN {
        return Err(AppError::BadRequest("Invalid plan".to_string()));
    }

    // 2. Optional client-declared region, only meaningful before the first
    // purchase locks one in.
    let declared_region = match body.get("region") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(
            Region::parse(s)
                .ok_or_else(|| AppError::BadRequest("Invalid region".to_string()))?,
        ),
        Some(_) => {
            return Err(AppError::BadRequest("region must be a string".to_string()));
        }
    };

    let stored_region =
        sqlx::query_scalar::<_, Option<Region>>("SELECT region FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::NotFound("User not found".to_string()))?;

    let region = stored_region.or(declared_region).unwrap_or(Region::Global);

    // 3. The plan must exist within that region's set; the other region's
    // names are invalid here, not discounted or substituted.
    let plan = Plan::resolve(region, plan_name)
        .ok_or_else(|| AppError::BadRequest("Invalid plan".to_string()))?;

    // 4. Order creation is not persisted locally. The webhook is the only
    // writer of payment state, so an abandoned checkout leaves nothing
    // behind.
    let order = gateway.create_order(plan, user_id, region).await?;

    Ok(Json(json!({
        "success": true,
        "orderId": order.id,
        "amount": order.amount,
        "currency": order.currency,
        "planName": plan.name,
        "minutes": plan.minutes,
        "keyId": config.razorpay_key_id,
    })))
}

/// Lists the caller's payment ledger, newest first. Rows are written only by
/// the webhook, so this is the user-facing view of captured and failed
/// payments.
pub async fn list_transactions(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let transactions = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT id, user_id, txn_type, status, order_id, payment_id, amount,
               currency, plan_name, minutes_credited, pages_credited, created_at
        FROM transactions
        WHERE user_id = $1
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(transactions))
}
