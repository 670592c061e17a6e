// src/clients/compute.rs

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

/// HTTP client for the Python compute backend (document ingestion, question
/// generation, voice session brokering). Same-operator service, plain JSON;
/// responses are trusted.
#[derive(Clone)]
pub struct ComputeClient {
    http: reqwest::Client,
    base_url: String,
}

/// Request to kick off question paper generation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePaperRequest {
    pub question_paper_id: i64,
    pub document_id: i64,
    pub difficulty_levels: Vec<String>,
    pub question_types: Vec<String>,
    pub bloom_levels: Vec<String>,
    pub duration_minutes: i64,
    pub question_count: i64,
}

/// Request to open a live voice session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub session_id: i64,
    pub document_id: i64,
    pub question_paper_id: Option<i64>,
    pub mode: String,
}

/// What the compute backend hands back when a session opens: a short-lived
/// voice token plus the room/thread the client should join.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
    pub token: String,
    pub room_id: String,
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
struct DocumentUrlResponse {
    url: String,
}

impl ComputeClient {
    pub fn new(config: &Config) -> Self {
        // Construction happens once at startup, alongside the config expects.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");
        ComputeClient {
            http,
            base_url: config.compute_base_url.clone(),
        }
    }

    /// POST /create-qp. Generation is asynchronous; the backend reports the
    /// outcome later through the internal status callback.
    pub async fn create_question_paper(&self, req: &GeneratePaperRequest) -> Result<(), AppError> {
        let url = format!("{}/create-qp", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(req)
            .send()
            .await
            .map_err(|e| AppError::Downstream(format!("compute create-qp: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Downstream(format!(
                "compute create-qp returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// POST /start-exam-session. Authoritative: if this fails, the session
    /// must not transition.
    pub async fn start_exam_session(
        &self,
        req: &StartSessionRequest,
    ) -> Result<SessionGrant, AppError> {
        let url = format!("{}/start-exam-session", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(req)
            .send()
            .await
            .map_err(|e| AppError::Downstream(format!("compute start-exam-session: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Downstream(format!(
                "compute start-exam-session returned {}",
                response.status()
            )));
        }

        response
            .json::<SessionGrant>()
            .await
            .map_err(|e| AppError::Downstream(format!("compute start-exam-session body: {}", e)))
    }

    /// DELETE /documents/{id}. Best effort; callers decide whether failure
    /// matters.
    pub async fn delete_document(&self, document_id: i64) -> Result<(), AppError> {
        let url = format!("{}/documents/{}", self.base_url, document_id);
        let response = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(|e| AppError::Downstream(format!("compute delete document: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Downstream(format!(
                "compute delete document returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// POST /documents/{id}/retry. Authoritative: the local FAILED ->
    /// PROCESSING transition only happens after this succeeds.
    pub async fn retry_document(&self, document_id: i64) -> Result<(), AppError> {
        let url = format!("{}/documents/{}/retry", self.base_url, document_id);
        let response = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| AppError::Downstream(format!("compute retry document: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Downstream(format!(
                "compute retry document returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// GET /documents/{id}/url. Returns a short-lived download URL.
    pub async fn document_url(&self, document_id: i64) -> Result<String, AppError> {
        let url = format!("{}/documents/{}/url", self.base_url, document_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Downstream(format!("compute document url: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Downstream(format!(
                "compute document url returned {}",
                response.status()
            )));
        }

        let body = response
            .json::<DocumentUrlResponse>()
            .await
            .map_err(|e| AppError::Downstream(format!("compute document url body: {}", e)))?;
        Ok(body.url)
    }
}
