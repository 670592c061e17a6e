// tests/payment_tests.rs
//
// Order creation against the plan catalog, with the payment gateway stubbed
// by a local axum server that echoes the priced order back.

use axum::{Json, Router, http::StatusCode, routing::post};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use voxam::{config::Config, routes, state::AppState};

struct TestApp {
    address: String,
    pool: PgPool,
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

/// Answers /v1/orders the way the gateway would: an order id plus the amount
/// and currency we asked for.
async fn spawn_gateway_stub() -> String {
    let app = Router::new().route(
        "/v1/orders",
        post(|Json(body): Json<serde_json::Value>| async move {
            Json(serde_json::json!({
                "id": "order_stub_1",
                "amount": body["amount"],
                "currency": body["currency"],
                "status": "created",
            }))
        }),
    );
    serve(app).await
}

/// A gateway that is down.
async fn spawn_failing_gateway_stub() -> String {
    let app = Router::new().route(
        "/v1/orders",
        post(|| async {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "error": { "description": "unavailable" } })),
            )
        }),
    );
    serve(app).await
}

/// Spawns the app against the given gateway stub. Returns None when
/// DATABASE_URL is unset so the suite can run without a database container.
async fn spawn_app(gateway_url: &str) -> Option<TestApp> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping database-backed test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "payment_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        razorpay_key_id: "rzp_test_key".to_string(),
        razorpay_key_secret: "rzp_test_secret".to_string(),
        razorpay_webhook_secret: "whsec_test".to_string(),
        gateway_base_url: gateway_url.to_string(),
        compute_base_url: "http://127.0.0.1:9".to_string(),
        internal_api_key: "internal_test_key".to_string(),
        email_api_url: "http://127.0.0.1:9".to_string(),
        email_api_key: None,
        email_from: "VOXAM <noreply@voxam.test>".to_string(),
        feedback_inbox: "feedback@voxam.test".to_string(),
    };

    let state = AppState::new(pool.clone(), config);
    let address = serve(routes::create_router(state)).await;

    Some(TestApp { address, pool })
}

async fn register_and_login(address: &str, client: &reqwest::Client) -> (String, i64) {
    let email = format!("pay_{}@voxam.test", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123";

    let registered = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Register failed")
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let user_id = registered["id"].as_i64().unwrap();

    let login = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let token = login["token"].as_str().unwrap().to_string();

    (token, user_id)
}

async fn create_order(
    address: &str,
    client: &reqwest::Client,
    token: &str,
    body: serde_json::Value,
) -> reqwest::Response {
    client
        .post(&format!("{}/api/payment/create-order", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn order_uses_catalog_pricing() {
    // Arrange: no stored region, none declared, so the global catalog
    let gateway = spawn_gateway_stub().await;
    let Some(app) = spawn_app(&gateway).await else { return };
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&app.address, &client).await;

    // Act
    let response = create_order(
        &app.address,
        &client,
        &token,
        serde_json::json!({ "planName": "standard" }),
    )
    .await;

    // Assert: the global standard plan, priced server-side
    assert_eq!(response.status().as_u16(), 200);
    let order: serde_json::Value = response.json().await.unwrap();
    assert_eq!(order["success"], true);
    assert_eq!(order["orderId"], "order_stub_1");
    assert_eq!(order["amount"], 900);
    assert_eq!(order["currency"], "USD");
    assert_eq!(order["planName"], "standard");
    assert_eq!(order["minutes"], 250);
    assert_eq!(order["keyId"], "rzp_test_key");
}

#[tokio::test]
async fn declared_region_selects_its_catalog() {
    // Arrange
    let gateway = spawn_gateway_stub().await;
    let Some(app) = spawn_app(&gateway).await else { return };
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&app.address, &client).await;

    // Act: achiever exists only in the india catalog
    let without_region = create_order(
        &app.address,
        &client,
        &token,
        serde_json::json!({ "planName": "achiever" }),
    )
    .await;
    let with_region = create_order(
        &app.address,
        &client,
        &token,
        serde_json::json!({ "planName": "achiever", "region": "india" }),
    )
    .await;

    // Assert
    assert_eq!(without_region.status().as_u16(), 400);
    assert_eq!(with_region.status().as_u16(), 200);
    let order: serde_json::Value = with_region.json().await.unwrap();
    assert_eq!(order["amount"], 34900);
    assert_eq!(order["currency"], "INR");
}

#[tokio::test]
async fn stored_region_overrides_the_declared_one() {
    // Arrange: the user's region is already locked to india
    let gateway = spawn_gateway_stub().await;
    let Some(app) = spawn_app(&gateway).await else { return };
    let client = reqwest::Client::new();
    let (token, user_id) = register_and_login(&app.address, &client).await;
    sqlx::query("UPDATE users SET region = 'india' WHERE id = $1")
        .bind(user_id)
        .execute(&app.pool)
        .await
        .unwrap();

    // Act: the body claims global
    let response = create_order(
        &app.address,
        &client,
        &token,
        serde_json::json!({ "planName": "standard", "region": "global" }),
    )
    .await;

    // Assert: india pricing anyway
    assert_eq!(response.status().as_u16(), 200);
    let order: serde_json::Value = response.json().await.unwrap();
    assert_eq!(order["amount"], 19900);
    assert_eq!(order["currency"], "INR");
}

#[tokio::test]
async fn order_body_is_validated() {
    // Arrange
    let gateway = spawn_gateway_stub().await;
    let Some(app) = spawn_app(&gateway).await else { return };
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&app.address, &client).await;

    let bad_bodies = [
        serde_json::json!({}),
        serde_json::json!({ "planName": null }),
        serde_json::json!({ "planName": 42 }),
        serde_json::json!({ "planName": "" }),
        serde_json::json!({ "planName": "mega-ultra" }),
        serde_json::json!({ "planName": "standard", "region": "mars" }),
        serde_json::json!({ "planName": "standard", "region": 7 }),
    ];

    // Act + Assert: every one is our 400
    for body in bad_bodies {
        let response = create_order(&app.address, &client, &token, body.clone()).await;
        assert_eq!(
            response.status().as_u16(),
            400,
            "expected 400 for body {}",
            body
        );
    }
}

#[tokio::test]
async fn order_creation_requires_auth_and_writes_nothing() {
    // Arrange
    let gateway = spawn_gateway_stub().await;
    let Some(app) = spawn_app(&gateway).await else { return };
    let client = reqwest::Client::new();
    let (token, user_id) = register_and_login(&app.address, &client).await;

    // Act: no token
    let anonymous = client
        .post(&format!("{}/api/payment/create-order", app.address))
        .json(&serde_json::json!({ "planName": "standard" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(anonymous.status().as_u16(), 401);

    // Act: a successful order
    let response = create_order(
        &app.address,
        &client,
        &token,
        serde_json::json!({ "planName": "standard" }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 200);

    // Assert: no local payment state; only the webhook writes it
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(rows, 0);

    let region: Option<String> = sqlx::query_scalar("SELECT region FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(region, None, "an order alone must not lock the region");
}

#[tokio::test]
async fn gateway_failure_maps_to_a_plain_500() {
    // Arrange
    let gateway = spawn_failing_gateway_stub().await;
    let Some(app) = spawn_app(&gateway).await else { return };
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&app.address, &client).await;

    // Act
    let response = create_order(
        &app.address,
        &client,
        &token,
        serde_json::json!({ "planName": "standard" }),
    )
    .await;

    // Assert: upstream detail stays out of the response body
    assert_eq!(response.status().as_u16(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Upstream service unavailable");
}
