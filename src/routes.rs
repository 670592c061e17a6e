// src/routes.rs

use std::sync::Arc;

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{
        auth, documents, exam_sessions, feedback, internal, payments, profile, question_papers,
        webhooks,
    },
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, user, documents, papers, sessions,
///   payments, webhooks, internal, feedback).
/// * Protected groups get the JWT middleware per group; internal callbacks
///   get the shared-key gate; the unauthenticated feedback route gets the
///   rate limiter.
/// * Applies global middleware (Trace, CORS) and injects the shared state.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // SmartIpKeyExtractor reads forwarding headers before falling back to
    // the peer address, which main serves via connect-info.
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(5)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let user_routes = Router::new()
        .route("/region", get(profile::get_region))
        .route("/usage", get(profile::get_usage))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let document_routes = Router::new()
        .route(
            "/",
            get(documents::list_documents).post(documents::create_document),
        )
        .route(
            "/{id}",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route("/{id}/retry", post(documents::retry_document))
        .route("/{id}/url", get(documents::document_url))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let paper_routes = Router::new()
        .route(
            "/",
            get(question_papers::list_question_papers).post(question_papers::create_question_paper),
        )
        .route("/{id}", get(question_papers::get_question_paper))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let session_routes = Router::new()
        .route(
            "/",
            get(exam_sessions::list_sessions).post(exam_sessions::create_session),
        )
        .route("/{id}", get(exam_sessions::get_session))
        .route("/{id}/start", post(exam_sessions::start_session))
        .route("/{id}/cancel", post(exam_sessions::cancel_session))
        .route("/{id}/report", get(exam_sessions::get_report))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let payment_routes = Router::new()
        .route("/create-order", post(payments::create_order))
        .route("/transactions", get(payments::list_transactions))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Webhooks authenticate by signature, not by JWT.
    let webhook_routes = Router::new().route("/payment", post(webhooks::payment_webhook));

    let internal_routes = Router::new()
        .route("/documents/{id}", post(internal::update_document_status))
        .route("/question-papers/{id}", post(internal::update_paper_status))
        .route(
            "/exam-sessions/{id}/complete",
            post(internal::complete_session),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            internal::internal_middleware,
        ));

    let feedback_routes = Router::new()
        .route("/", post(feedback::submit_feedback))
        .layer(GovernorLayer::new(governor_conf));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/user", user_routes)
        .nest("/api/documents", document_routes)
        .nest("/api/question-papers", paper_routes)
        .nest("/api/exam-sessions", session_routes)
        .nest("/api/payment", payment_routes)
        .nest("/api/webhooks", webhook_routes)
        .nest("/api/internal", internal_routes)
        .nest("/api/feedback", feedback_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
