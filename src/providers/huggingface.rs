//! Hugging Face Inference API provider.
//!
//! Uses the OpenAI-compatible chat completions endpoint at
//! `api-inference.huggingface.co/v1` with the shared wire types.

use async_trait::async_trait;

use super::wire::{ChatCompletionRequest, ChatCompletionResponse};
use super::{AiProvider, ProviderError};
use crate::models::{EmailMessage, InboxStats, PatternSummary};

const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co/v1";
const DEFAULT_MODEL: &str = "meta-llama/Llama-3.1-8B-Instruct";

/// Hugging Face Inference API provider.
pub struct HuggingFaceProvider {
    api_key: Option<String>,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl HuggingFaceProvider {
    /// Create a new Hugging Face provider. An empty key yields an
    /// unavailable provider the chain will skip.
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Create a provider with a custom base URL (dedicated inference
    /// endpoints, tests).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key: if api_key.is_empty() {
                None
            } else {
                Some(api_key)
            },
            base_url,
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn require_key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or(ProviderError::InvalidKey)
    }

    async fn complete(&self, prompt: String) -> Result<String, ProviderError> {
        let key = self.require_key()?;
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest::single_turn(&self.model, prompt);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ProviderError::InvalidKey);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimit);
        }
        // HF returns 503 while a cold model loads; that is a retryable
        // condition for the chain, not a hard key failure.
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(ProviderError::Timeout);
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Other(format!(
                "Hugging Face API error {status}: {text}"
            )));
        }

        let data: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Other(format!("JSON parse error: {e}")))?;

        let choice = data
            .choices
            .first()
            .ok_or_else(|| ProviderError::Other("No choices in Hugging Face response".into()))?;

        Ok(choice.message.content.clone().unwrap_or_default())
    }
}

#[async_trait]
impl AiProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        "Hugging Face"
    }

    fn is_available(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    async fn generate_insights(
        &self,
        stats: &InboxStats,
        patterns: &PatternSummary,
    ) -> Result<String, ProviderError> {
        self.complete(super::insights_prompt(stats, patterns)).await
    }

    async fn summarize_emails(
        &self,
        messages: &[EmailMessage],
    ) -> Result<String, ProviderError> {
        self.complete(super::summarize_prompt(messages)).await
    }

    async fn categorize_email(&self, message: &EmailMessage) -> Result<String, ProviderError> {
        let answer = self.complete(super::categorize_prompt(message)).await?;
        Ok(answer.trim().to_lowercase())
    }
}
