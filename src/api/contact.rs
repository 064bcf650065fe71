//! Client for the Formspree form-submission endpoint.
//!
//! Write-only: a form-encoded POST that answers JSON with an `errors` array
//! on rejection. Form submissions bypass the offline cache worker
//! (`formspree.io` is on the bypass list).

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client};
use serde::Deserialize;
use tracing::info;

use super::ApiError;

const FORM_BASE_URL: &str = "https://formspree.io/f";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A message from the contact form.
#[derive(Debug, Clone)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Rejection body shape: `{ "errors": [{ "message": "..." }] }`.
#[derive(Debug, Deserialize)]
struct FormRejection {
    #[serde(default)]
    errors: Vec<FormFieldError>,
}

#[derive(Debug, Deserialize)]
struct FormFieldError {
    message: Option<String>,
}

impl FormRejection {
    /// First usable error message, if the body carried one.
    fn first_message(&self) -> Option<&str> {
        self.errors
            .iter()
            .filter_map(|e| e.message.as_deref())
            .find(|m| !m.is_empty())
    }
}

#[derive(Clone)]
pub struct ContactClient {
    client: Client,
}

impl ContactClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    /// Deliver one message to the form identified by `form_id`.
    pub async fn send(&self, form_id: &str, message: &ContactMessage) -> Result<()> {
        let url = format!("{}/{}", FORM_BASE_URL, form_id);

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .form(&[
                ("name", message.name.as_str()),
                ("email", message.email.as_str()),
                ("message", message.message.as_str()),
            ])
            .send()
            .await
            .context("Failed to send contact form")?;

        if response.status().is_success() {
            info!(form_id, "Contact message delivered");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<FormRejection>(&body)
            .ok()
            .and_then(|r| r.first_message().map(str::to_string))
            .unwrap_or_else(|| "Unknown error".to_string());
        Err(ApiError::FormRejected(reason).into())
    }
}

// ============================================================================
// Tests
// ============================================================================
