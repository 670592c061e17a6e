// src/clients/gateway.rs

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::AppError,
    models::plan::{Plan, Region},
};

/// HTTP client for the Razorpay orders API (basic auth over HTTPS).
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

/// The notes attached to an order. The gateway echoes these back verbatim in
/// webhook payloads, which is how the webhook knows who to credit. All values
/// are strings per the gateway's API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNotes {
    pub user_id: String,
    pub plan_name: String,
    pub minutes: String,
    pub pages: String,
    pub region: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: String,
    notes: &'a OrderNotes,
}

/// The subset of the gateway's order object we care about.
#[derive(Debug, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

impl GatewayClient {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");
        GatewayClient {
            http,
            base_url: config.gateway_base_url.clone(),
            key_id: config.razorpay_key_id.clone(),
            key_secret: config.razorpay_key_secret.clone(),
        }
    }

    /// POST /v1/orders with the plan's fixed server-side amount. Called after
    /// plan validation; nothing about pricing comes from the client.
    pub async fn create_order(
        &self,
        plan: &Plan,
        user_id: i64,
        region: Region,
    ) -> Result<GatewayOrder, AppError> {
        let notes = OrderNotes {
            user_id: user_id.to_string(),
            plan_name: plan.name.to_string(),
            minutes: plan.minutes.to_string(),
            pages: plan.pages.to_string(),
            region: region.as_str().to_string(),
        };

        // Gateway receipts are capped at 40 characters.
        let receipt = format!("vx_{}_{}", user_id, chrono::Utc::now().timestamp());

        let body = CreateOrderBody {
            amount: plan.amount,
            currency: plan.currency,
            receipt,
            notes: &notes,
        };

        let url = format!("{}/v1/orders", self.base_url);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Downstream(format!("gateway create order: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Downstream(format!(
                "gateway create order returned {}",
                response.status()
            )));
        }

        response
            .json::<GatewayOrder>()
            .await
            .map_err(|e| AppError::Downstream(format!("gateway create order body: {}", e)))
    }
}
