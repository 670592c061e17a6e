// src/clients/email.rs

use std::time::Duration;

use serde::Serialize;

use crate::{config::Config, error::AppError};

/// HTTP client for the transactional email API. Runs in a disabled mode when
/// no API key is configured (local dev, CI): mail is logged, not sent.
#[derive(Clone)]
pub struct EmailClient {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
    feedback_inbox: String,
}

#[derive(Debug, Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

impl EmailClient {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");
        EmailClient {
            http,
            api_url: config.email_api_url.clone(),
            api_key: config.email_api_key.clone(),
            from: config.email_from.clone(),
            feedback_inbox: config.feedback_inbox.clone(),
        }
    }

    /// Delivers a feedback notification to the operator inbox. `html` must
    /// already be sanitized.
    pub async fn send_feedback(
        &self,
        subject: &str,
        html: &str,
        reply_to: Option<&str>,
    ) -> Result<(), AppError> {
        let Some(api_key) = &self.api_key else {
            tracing::info!(subject, "Email delivery disabled; feedback logged only");
            return Ok(());
        };

        let body = SendEmailBody {
            from: &self.from,
            to: vec![self.feedback_inbox.as_str()],
            subject,
            html,
            reply_to,
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Downstream(format!("email send: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Downstream(format!(
                "email send returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
