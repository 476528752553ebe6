//! HTTP client for the intake service.
//!
//! Submission is two sequential calls: exchange the configured
//! credentials for a bearer token, then POST the document. Both calls
//! share one bounded-timeout client. No automatic retry — a failed
//! submission is the caller's to log, not to re-drive.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::config::IntakeConfig;
use crate::error::SubmissionError;

use super::document::SubmissionDocument;
use super::SubmissionSink;

/// Client for the auth + intake endpoint pair.
pub struct IntakeClient {
    http: reqwest::Client,
    config: IntakeConfig,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct IntakeResponse {
    id: Option<serde_json::Value>,
    message: Option<String>,
}

impl IntakeClient {
    /// Build the client. TLS verification follows `config.verify_tls`;
    /// disabling it is logged loudly because it is an operational hazard.
    pub fn new(config: IntakeConfig) -> Result<Self, SubmissionError> {
        if !config.verify_tls {
            tracing::warn!("TLS certificate verification is DISABLED for intake calls");
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| SubmissionError::ClientBuild(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Exchange username/password for an opaque bearer token.
    async fn authenticate(&self) -> Result<String, SubmissionError> {
        let resp = self
            .http
            .post(&self.config.auth_url)
            .json(&serde_json::json!({
                "username": self.config.username,
                "password": self.config.password.expose_secret(),
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SubmissionError::AuthFailed(format!("{status}: {body}")));
        }

        let auth: AuthResponse = resp
            .json()
            .await
            .map_err(|e| SubmissionError::AuthFailed(format!("malformed auth response: {e}")))?;
        Ok(auth.token)
    }

    /// POST the document with the bearer token. Success is HTTP 200 plus
    /// a body carrying a created-record id or a message field.
    async fn post_document(
        &self,
        token: &str,
        doc: &SubmissionDocument,
    ) -> Result<(), SubmissionError> {
        let resp = self
            .http
            .post(&self.config.submit_url)
            .bearer_auth(token)
            .json(doc)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if status != reqwest::StatusCode::OK {
            return Err(SubmissionError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: IntakeResponse = serde_json::from_str(&body)
            .map_err(|_| SubmissionError::InvalidResponse(body.clone()))?;
        match (parsed.id, parsed.message) {
            (None, None) => Err(SubmissionError::InvalidResponse(body)),
            (id, _) => {
                tracing::info!(record_id = ?id, "survey submitted to intake service");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl SubmissionSink for IntakeClient {
    async fn submit(&self, doc: &SubmissionDocument) -> Result<(), SubmissionError> {
        let token = self.authenticate().await?;
        self.post_document(&token, doc).await
    }
}
