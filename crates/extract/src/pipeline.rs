use std::sync::Arc;

use tally_core::{
    CandidateExpense, Category, Channel, NewExpense, Provenance, RawNotification, TransactionKind,
    DEFAULT_CURRENCY,
};
use tracing::{info, warn};

use crate::backend::{AiError, DisabledBackend, ExtractionBackend, ExtractionRequest};
use crate::categorize::Categorizer;
use crate::fallback::RegexExtractor;
use crate::normalize::{normalize_body, normalize_line};

const UNKNOWN_MERCHANT: &str = "Unknown";
const AI_NOTES: &str = "Parsed by AI";

/// Orchestrates: normalize → AI extraction → regex fallback.
#[derive(Clone)]
pub struct ExtractionPipeline {
    backend: Arc<dyn ExtractionBackend>,
    regex: RegexExtractor,
}

impl ExtractionPipeline {
    pub fn new(backend: Arc<dyn ExtractionBackend>, categorizer: Categorizer) -> Self {
        Self {
            backend,
            regex: RegexExtractor::new(categorizer),
        }
    }

    /// No AI backend: every notification goes straight to the regex path.
    pub fn regex_only(categorizer: Categorizer) -> Self {
        Self::new(Arc::new(DisabledBackend), categorizer)
    }

    /// Extract from a stored notification.
    pub async fn extract(&self, notification: &RawNotification) -> Option<CandidateExpense> {
        self.extract_parts(
            &notification.sender,
            notification.subject.as_deref(),
            &notification.body,
        )
        .await
    }

    /// Extract from loose parts, before anything is persisted. `None` is a soft
    /// failure: logged, never an error.
    pub async fn extract_parts(
        &self,
        sender: &str,
        subject: Option<&str>,
        body: &str,
    ) -> Option<CandidateExpense> {
        let subject = subject.map(normalize_line).filter(|s| !s.is_empty());
        let body = normalize_body(body);

        let request = ExtractionRequest {
            sender: sender.to_string(),
            subject: subject.clone().unwrap_or_default(),
            body: body.clone(),
        };

        match self.try_ai(&request).await {
            Ok(candidate) => {
                info!(merchant = %candidate.merchant, amount = %candidate.amount, "Extracted with AI");
                return Some(candidate);
            }
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "AI extraction failed, using regex fallback");
            }
        }

        let headline = subject.unwrap_or_else(|| normalize_line(&body));
        let candidate = self.regex.extract(&headline, &body);
        match &candidate {
            Some(c) => info!(merchant = %c.merchant, amount = %c.amount, "Extracted with regex fallback"),
            None => warn!(sender, "No amount found in notification; no expense recorded"),
        }
        candidate
    }

    async fn try_ai(&self, request: &ExtractionRequest) -> Result<CandidateExpense, AiError> {
        if request.body.trim().is_empty() {
            return Err(AiError::EmptyBody);
        }
        let ai = self.backend.extract(request).await?;
        let amount = ai.amount.ok_or(AiError::NullAmount)?;

        let non_empty = |s: Option<String>| s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(CandidateExpense {
            amount,
            currency: non_empty(ai.currency)
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            merchant: non_empty(ai.merchant).unwrap_or_else(|| UNKNOWN_MERCHANT.to_string()),
            category: non_empty(ai.category)
                .map(|c| Category::from_label(&c))
                .unwrap_or_default(),
            kind: non_empty(ai.kind)
                .map(|k| TransactionKind::from_action(&k))
                .unwrap_or_default(),
            notes: non_empty(ai.notes).unwrap_or_else(|| AI_NOTES.to_string()),
            confidence: ai.confidence.map(|c| c.clamp(0.0, 1.0)),
            provenance: Provenance::Ai,
        })
    }

    /// Stamp a candidate with its owner, notification and source label. The
    /// occurrence date is the notification's received time, never a date the
    /// extractor read out of the text.
    pub fn to_new_expense(notification: &RawNotification, candidate: CandidateExpense) -> NewExpense {
        NewExpense {
            user_id: notification.user_id,
            amount: candidate.amount,
            currency: candidate.currency,
            merchant: candidate.merchant,
            category: candidate.category,
            kind: candidate.kind,
            notes: candidate.notes,
            confidence: candidate.confidence,
            provenance: Some(candidate.provenance),
            source: source_label(notification.channel, candidate.provenance),
            occurred_at: notification.received_at,
            notification_id: Some(notification.id),
            linked_bill_id: None,
        }
    }
}

/// `"SMS (AI)"`, `"Email (Regex Fallback)"` and so on.
pub fn source_label(channel: Channel, provenance: Provenance) -> String {
    format!("{channel} ({})", provenance.label())
}
