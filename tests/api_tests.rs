// tests/api_tests.rs

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use voxam::{config::Config, routes, state::AppState};

struct TestApp {
    address: String,
    pool: PgPool,
}

/// Helper function to spawn the app on a random port for testing.
/// Returns None when DATABASE_URL is unset so the suite can run without a
/// database container.
async fn spawn_app() -> Option<TestApp> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping database-backed test");
        return None;
    };

    // 1. Create a pool
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state. The upstream base URLs are
    // unroutable so an accidental outbound call fails loudly.
    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        razorpay_key_id: "rzp_test_key".to_string(),
        razorpay_key_secret: "rzp_test_secret".to_string(),
        razorpay_webhook_secret: "whsec_test".to_string(),
        gateway_base_url: "http://127.0.0.1:9".to_string(),
        compute_base_url: "http://127.0.0.1:9".to_string(),
        internal_api_key: "internal_test_key".to_string(),
        email_api_url: "http://127.0.0.1:9".to_string(),
        email_api_key: None,
        email_from: "VOXAM <noreply@voxam.test>".to_string(),
        feedback_inbox: "feedback@voxam.test".to_string(),
    };

    let state = AppState::new(pool.clone(), config);

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .await
        .unwrap();
    });

    Some(TestApp { address, pool })
}

fn unique_email(prefix: &str) -> String {
    format!(
        "{}_{}@voxam.test",
        prefix,
        &uuid::Uuid::new_v4().to_string()[..8]
    )
}

/// Registers a fresh user and logs in, returning (email, token, user id).
async fn register_and_login(address: &str, client: &reqwest::Client) -> (String, String, i64) {
    let email = unique_email("u");
    let password = "password123";

    let registered = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Register failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse register json");
    let user_id = registered["id"].as_i64().expect("id not found");

    let login = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");
    let token = login["token"].as_str().expect("Token not found").to_string();

    (email, token, user_id)
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(&format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works() {
    // Arrange
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let email = unique_email("reg");

    // Act
    let response = client
        .post(&format!("{}/api/auth/register", app.address))
        .json(&serde_json::json!({
            "email": email,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["email"], email.as_str());
    assert_eq!(body["subscription_tier"], "free");
    assert!(body["region"].is_null(), "region is unset until a purchase");
    // The password hash must never appear in a response.
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn register_fails_validation() {
    // Arrange
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    // Act: not an email address
    let response = client
        .post(&format!("{}/api/auth/register", app.address))
        .json(&serde_json::json!({
            "email": "not-an-address",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);

    // Act: password too short
    let response = client
        .post(&format!("{}/api/auth/register", app.address))
        .json(&serde_json::json!({
            "email": unique_email("short"),
            "password": "short"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn register_duplicate_email_is_conflict() {
    // Arrange
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let email = unique_email("dup");
    let payload = serde_json::json!({ "email": email, "password": "password123" });

    // Act
    let first = client
        .post(&format!("{}/api/auth/register", app.address))
        .json(&payload)
        .send()
        .await
        .expect("Failed to execute request");
    let second = client
        .post(&format!("{}/api/auth/register", app.address))
        .json(&payload)
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(first.status().as_u16(), 201);
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    // Arrange
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (email, _token, _id) = register_and_login(&app.address, &client).await;

    // Act: wrong password
    let wrong_password = client
        .post(&format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({ "email": email, "password": "wrong-password" }))
        .send()
        .await
        .expect("Failed to execute request");

    // Act: unknown email
    let unknown_email = client
        .post(&format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({
            "email": unique_email("ghost"),
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert: both fail the same way, so login cannot probe for accounts
    assert_eq!(wrong_password.status().as_u16(), 401);
    assert_eq!(unknown_email.status().as_u16(), 401);
}

#[tokio::test]
async fn usage_requires_a_token() {
    // Arrange
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    // Act: no Authorization header
    let missing = client
        .get(&format!("{}/api/user/usage", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    // Act: garbage token
    let garbage = client
        .get(&format!("{}/api/user/usage", app.address))
        .header("Authorization", "Bearer not.a.jwt")
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(missing.status().as_u16(), 401);
    assert_eq!(garbage.status().as_u16(), 401);
}

#[tokio::test]
async fn usage_reports_free_tier_defaults() {
    // Arrange
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (email, token, user_id) = register_and_login(&app.address, &client).await;

    // Act
    let usage = client
        .get(&format!("{}/api/user/usage", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse usage json");

    // Assert: the free-tier allowances from the schema defaults
    assert_eq!(usage["id"].as_i64(), Some(user_id));
    assert_eq!(usage["email"], email.as_str());
    assert_eq!(usage["subscriptionTier"], "free");
    assert_eq!(usage["voiceMinutesUsed"], 0);
    assert_eq!(usage["voiceMinutesLimit"], 10);
    assert_eq!(usage["chatMessagesUsed"], 0);
    assert_eq!(usage["chatMessagesLimit"], 50);
    assert_eq!(usage["pagesUsed"], 0);
    assert_eq!(usage["pagesLimit"], 30);
}

#[tokio::test]
async fn region_defaults_to_global_until_first_purchase() {
    // Arrange
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_email, token, user_id) = register_and_login(&app.address, &client).await;

    // Act
    let response = client
        .get(&format!("{}/api/user/region", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse region json");

    // Assert: unset in the database, reported as global
    assert_eq!(response["region"], "global");
    let stored: Option<String> = sqlx::query_scalar("SELECT region FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(stored, None);
}
