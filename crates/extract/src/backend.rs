use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use tally_core::Money;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Notification body is empty")]
    EmptyBody,
    #[error("AI extraction is not configured")]
    Disabled,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("AI service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed AI response: {0}")]
    Malformed(String),
    #[error("AI response has no amount")]
    NullAmount,
}

impl AiError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AiError::Http(_) => true,
            AiError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// What the extraction service is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionRequest {
    pub sender: String,
    pub subject: String,
    pub body: String,
}

/// Structured fields returned by the extraction service. Every field is
/// optional; a missing amount makes the whole response unusable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiExtraction {
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<Money>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Models answer with `999`, `999.0`, `"999.00"` or `"1,250.50"`; anything
/// that does not parse counts as "no amount".
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<Money>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => Money::parse(&n.to_string()).ok(),
        Some(serde_json::Value::String(s)) => Money::parse(&s).ok(),
        _ => None,
    })
}

/// A remote (or fake) structured-extraction capability.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest) -> Result<AiExtraction, AiError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

// ── Disabled backend ─────────────────────────────────────────────────────────

/// Used when no AI host is configured: every call fails, so the pipeline runs
/// in regex-only mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledBackend;

#[async_trait]
impl ExtractionBackend for DisabledBackend {
    async fn extract(&self, _request: &ExtractionRequest) -> Result<AiExtraction, AiError> {
        Err(AiError::Disabled)
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

#[derive(Debug, Clone)]
enum MockResponse {
    Extraction(AiExtraction),
    Failure(u16),
}

/// Returns a preset response and counts how often it was asked.
#[derive(Debug, Clone)]
pub struct MockBackend {
    response: MockResponse,
    calls: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new(extraction: AiExtraction) -> Self {
        Self {
            response: MockResponse::Extraction(extraction),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fails every call with the given HTTP status.
    pub fn failing(status: u16) -> Self {
        Self {
            response: MockResponse::Failure(status),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionBackend for MockBackend {
    async fn extract(&self, _request: &ExtractionRequest) -> Result<AiExtraction, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            MockResponse::Extraction(e) => Ok(e.clone()),
            MockResponse::Failure(status) => Err(AiError::Status {
                status: *status,
                body: "mock failure".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
