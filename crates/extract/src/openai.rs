use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::{AiError, AiExtraction, ExtractionBackend, ExtractionRequest};

const SYSTEM_PROMPT: &str =
    "You are a helpful financial assistant. You extract structured data from bank notifications.";

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

/// Connection settings for an OpenAI-compatible chat-completions server.
/// An empty `base_url` means "not configured".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl OpenAiConfig {
    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty()
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Extraction over `POST {base_url}/v1/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_attempts: u32,
}

impl OpenAiBackend {
    pub fn new(config: &OpenAiConfig) -> Result<Self, AiError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            max_attempts: config.max_attempts.max(1),
        })
    }

    fn prompt(request: &ExtractionRequest) -> String {
        format!(
            "Analyze the following transaction notification and extract structured data. \
             Return ONLY a clean JSON object (no markdown formatting) with these fields: \
             amount (numeric, no symbols), \
             currency (ISO code, e.g. INR, USD), \
             merchant (string, beneficiary name OR merchant name), \
             date (YYYY-MM-DD), \
             category (string, default to 'Transaction' for money transfers), \
             type (string, use 'Credited' for income/deposits, 'Debited' for expense/spends), \
             paymentMethod (string), \
             notes (string, the full transaction reference/narration e.g. 'UPI/P2A/...'), \
             confidence (0.0 to 1.0). \
             If a field is missing, use null.\
             \n\nContext:\nSender: {}\nSubject: {}\nBody: {}",
            request.sender, request.subject, request.body
        )
    }

    async fn chat_completion(&self, prompt: &str) -> Result<String, AiError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: 0.1,
        };

        let mut req = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status { status: status.as_u16(), body });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AiError::Malformed("response contained no choices".into()))
    }
}

#[async_trait]
impl ExtractionBackend for OpenAiBackend {
    async fn extract(&self, request: &ExtractionRequest) -> Result<AiExtraction, AiError> {
        if request.body.trim().is_empty() {
            return Err(AiError::EmptyBody);
        }

        let prompt = Self::prompt(request);
        let prompt = prompt.as_str();
        let max_attempts = self.max_attempts;
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_multiplier(2.0)
            .with_max_elapsed_time(None)
            .build();

        let content = retry(policy, || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            self.chat_completion(prompt).await.map_err(|e| {
                if e.is_transient() && attempt < max_attempts {
                    warn!(attempt, error = %e, "AI request failed, retrying");
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await?;

        debug!(model = %self.model, "AI response received");
        parse_content(&content)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Drop a surrounding markdown code fence (```` ``` ```` or ```` ```json ````).
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse the model's message content into an [`AiExtraction`].
pub fn parse_content(content: &str) -> Result<AiExtraction, AiError> {
    let json = strip_code_fence(content);
    serde_json::from_str(json).map_err(|e| {
        let raw: String = json.chars().take(200).collect();
        AiError::Malformed(format!("{e} | Raw: {raw}"))
    })
}
