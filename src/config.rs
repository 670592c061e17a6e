// src/config.rs

use dotenvy::dotenv;
use std::env;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,

    /// Razorpay API credentials. key_id is public (the client needs it to
    /// open checkout); key_secret and webhook_secret never leave the server.
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_webhook_secret: String,
    pub gateway_base_url: String,

    /// Base URL of the Python compute backend (ingestion, question
    /// generation, voice sessions).
    pub compute_base_url: String,

    /// Shared key the compute backend presents on /api/internal callbacks.
    pub internal_api_key: String,

    /// Transactional email API. When the key is absent (local dev, CI),
    /// outbound mail is logged instead of sent.
    pub email_api_url: String,
    pub email_api_key: Option<String>,
    pub email_from: String,
    pub feedback_inbox: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .unwrap_or_else(|_| "86400".to_string())
            .parse::<u64>()
            .expect("JWT_EXPIRATION must be a number of seconds");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let razorpay_key_id = env::var("RAZORPAY_KEY_ID").expect("RAZORPAY_KEY_ID must be set");

        let razorpay_key_secret =
            env::var("RAZORPAY_KEY_SECRET").expect("RAZORPAY_KEY_SECRET must be set");

        let razorpay_webhook_secret =
            env::var("RAZORPAY_WEBHOOK_SECRET").expect("RAZORPAY_WEBHOOK_SECRET must be set");

        let gateway_base_url = checked_base_url(
            env::var("GATEWAY_BASE_URL").unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
            "GATEWAY_BASE_URL",
        );

        let compute_base_url = checked_base_url(
            env::var("COMPUTE_BASE_URL").expect("COMPUTE_BASE_URL must be set"),
            "COMPUTE_BASE_URL",
        );

        let internal_api_key = env::var("INTERNAL_API_KEY").expect("INTERNAL_API_KEY must be set");

        let email_api_url = checked_base_url(
            env::var("EMAIL_API_URL")
                .unwrap_or_else(|_| "https://api.resend.com/emails".to_string()),
            "EMAIL_API_URL",
        );

        let email_api_key = env::var("EMAIL_API_KEY").ok();

        let email_from =
            env::var("EMAIL_FROM").unwrap_or_else(|_| "VOXAM <noreply@voxam.app>".to_string());

        let feedback_inbox =
            env::var("FEEDBACK_INBOX").unwrap_or_else(|_| "feedback@voxam.app".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            razorpay_key_id,
            razorpay_key_secret,
            razorpay_webhook_secret,
            gateway_base_url,
            compute_base_url,
            internal_api_key,
            email_api_url,
            email_api_key,
            email_from,
            feedback_inbox,
        }
    }
}

/// Parses the URL to fail fast on typos, then returns it without a trailing
/// slash so path joins stay predictable.
fn checked_base_url(value: String, var_name: &str) -> String {
    if let Err(e) = Url::parse(&value) {
        panic!("{} is not a valid URL ({}): {}", var_name, value, e);
    }
    value.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_urls_lose_their_trailing_slash() {
        assert_eq!(
            checked_base_url("https://x.test/".to_string(), "TEST_URL"),
            "https://x.test"
        );
        assert_eq!(
            checked_base_url("https://x.test".to_string(), "TEST_URL"),
            "https://x.test"
        );
        assert_eq!(
            checked_base_url("https://api.example.com/emails".to_string(), "TEST_URL"),
            "https://api.example.com/emails"
        );
    }

    #[test]
    #[should_panic(expected = "is not a valid URL")]
    fn malformed_base_urls_panic_at_startup() {
        checked_base_url("not a url".to_string(), "TEST_URL");
    }
}
