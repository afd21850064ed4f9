//! AI provider trait, implementations, and the fallback chain.
//!
//! Each provider module exposes a struct that implements [`AiProvider`].
//! The [`ProviderChain`] tries providers in priority order and remembers
//! the last one that worked (sticky routing). Its final provider is the
//! local rule-based fallback, which has no external dependency, so a
//! fully-populated chain never fails as a whole.

pub mod gemini;
pub mod huggingface;
pub mod local;
pub(crate) mod wire;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::AiConfig;
use crate::error::TriageError;
use crate::models::{EmailMessage, InboxStats, PatternSummary};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that any provider may return.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited")]
    RateLimit,

    #[error("Invalid API key")]
    InvalidKey,

    #[error("Timeout")]
    Timeout,

    #[error("Provider not available: {0}")]
    Unavailable(String),

    #[error("Provider error: {0}")]
    Other(String),

    /// The whole chain failed. Should be unreachable when the local
    /// fallback is included; treat an occurrence as a defect.
    #[error("All providers failed; last error: {0}")]
    Exhausted(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Unified interface for all analysis backends (remote and local).
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Human-readable display name for diagnostics.
    fn name(&self) -> &str;

    /// Cheap capability check (credentials on hand). No I/O.
    fn is_available(&self) -> bool;

    /// Compose actionable insight text from aggregate mailbox state.
    async fn generate_insights(
        &self,
        stats: &InboxStats,
        patterns: &PatternSummary,
    ) -> Result<String, ProviderError>;

    /// Summarize a batch of messages into short prose.
    async fn summarize_emails(
        &self,
        messages: &[EmailMessage],
    ) -> Result<String, ProviderError>;

    /// Name the semantic category of a single message.
    async fn categorize_email(&self, message: &EmailMessage) -> Result<String, ProviderError>;
}

/// One operation dispatched through the chain. Borrowing enum so every
/// retry reuses the same inputs without cloning.
enum Request<'a> {
    Insights(&'a InboxStats, &'a PatternSummary),
    Summarize(&'a [EmailMessage]),
    Categorize(&'a EmailMessage),
}

impl Request<'_> {
    async fn dispatch(&self, provider: &dyn AiProvider) -> Result<String, ProviderError> {
        match self {
            Request::Insights(stats, patterns) => {
                provider.generate_insights(stats, patterns).await
            }
            Request::Summarize(messages) => provider.summarize_emails(messages).await,
            Request::Categorize(message) => provider.categorize_email(message).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Ordered fallback sequence of providers with sticky routing.
///
/// One instance serves one logical request; the `current` pointer is
/// plain instance state and is not synchronized. Instantiate a chain per
/// request, or guard a shared one behind a mutex.
pub struct ProviderChain {
    providers: Vec<Box<dyn AiProvider>>,
    current: usize,
}

impl ProviderChain {
    /// Build a chain from explicit configuration: Gemini when a key is
    /// present, Hugging Face when a key is present, and the rule-based
    /// local fallback last. An empty chain is a configuration error.
    pub fn from_config(config: &AiConfig) -> Result<Self, TriageError> {
        let mut providers: Vec<Box<dyn AiProvider>> = Vec::new();

        if let Some(key) = &config.gemini_key {
            providers.push(Box::new(gemini::GeminiProvider::new(key.clone())));
        }
        if let Some(key) = &config.hugging_face_key {
            providers.push(Box::new(huggingface::HuggingFaceProvider::new(key.clone())));
        }
        if config.include_local {
            providers.push(Box::new(local::RuleBasedProvider::new()));
        }

        Self::with_providers(providers)
    }

    /// Build a chain from an explicit provider list (first = highest
    /// priority, last = terminal fallback).
    pub fn with_providers(providers: Vec<Box<dyn AiProvider>>) -> Result<Self, TriageError> {
        if providers.is_empty() {
            return Err(TriageError::ConfigError(
                "provider chain needs at least one provider; enable the local fallback or supply an API key"
                    .to_string(),
            ));
        }
        Ok(Self {
            providers,
            current: 0,
        })
    }

    /// Name of the provider that served the last successful call (or the
    /// chain head if none has).
    pub fn current_provider_name(&self) -> &str {
        self.providers[self.current].name()
    }

    pub async fn generate_insights(
        &mut self,
        stats: &InboxStats,
        patterns: &PatternSummary,
    ) -> Result<String, ProviderError> {
        self.attempt(Request::Insights(stats, patterns)).await
    }

    pub async fn summarize_emails(
        &mut self,
        messages: &[EmailMessage],
    ) -> Result<String, ProviderError> {
        self.attempt(Request::Summarize(messages)).await
    }

    pub async fn categorize_email(
        &mut self,
        message: &EmailMessage,
    ) -> Result<String, ProviderError> {
        self.attempt(Request::Categorize(message)).await
    }

    /// Fallback protocol, strictly sequential: try the current provider;
    /// on failure advance to the next available one and retry once; on a
    /// second failure jump straight to the terminal provider. A success
    /// moves `current` permanently to the provider that answered.
    async fn attempt(&mut self, request: Request<'_>) -> Result<String, ProviderError> {
        let terminal = self.providers.len() - 1;
        let mut last_error;

        let start = self.current;
        if self.providers[start].is_available() {
            match request.dispatch(self.providers[start].as_ref()).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(provider = self.providers[start].name(), error = %e, "provider call failed");
                    last_error = e;
                }
            }
        } else {
            last_error = ProviderError::Unavailable(self.providers[start].name().to_string());
        }

        let next = (start + 1..self.providers.len()).find(|i| self.providers[*i].is_available());
        if let Some(next) = next {
            match request.dispatch(self.providers[next].as_ref()).await {
                Ok(text) => {
                    debug!(provider = self.providers[next].name(), "fallback provider answered");
                    self.current = next;
                    return Ok(text);
                }
                Err(e) => {
                    warn!(provider = self.providers[next].name(), error = %e, "fallback provider failed");
                    last_error = e;
                }
            }

            // Skip anything between the failed fallback and the terminal
            // provider; it is the designated never-fail backstop.
            if next != terminal {
                match request.dispatch(self.providers[terminal].as_ref()).await {
                    Ok(text) => {
                        self.current = terminal;
                        return Ok(text);
                    }
                    Err(e) => {
                        warn!(provider = self.providers[terminal].name(), error = %e, "terminal provider failed");
                        last_error = e;
                    }
                }
            }
        }

        Err(ProviderError::Exhausted(last_error.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Prompt formatting shared by the remote providers
// ---------------------------------------------------------------------------

pub(crate) fn insights_prompt(stats: &InboxStats, patterns: &PatternSummary) -> String {
    format!(
        "You are an email management assistant. Based on these mailbox \
         statistics, produce three to five concise, actionable recommendations.\n\
         Total emails: {}\nUnread: {}\nNewsletters: {}\n\
         Unread newsletters: {}\nOlder than 30 days: {}\nOver 5 MB: {}\n\
         Duplicates: {}\nPhishing-looking: {}",
        stats.total_emails,
        stats.unread_emails,
        stats.newsletters,
        patterns.unread_newsletters,
        patterns.old_emails,
        patterns.large_emails,
        patterns.duplicates,
        patterns.suspicious,
    )
}

pub(crate) fn summarize_prompt(messages: &[EmailMessage]) -> String {
    let mut prompt = String::from(
        "Summarize the following emails in a short paragraph, noting anything urgent:\n",
    );
    for message in messages {
        prompt.push_str(&format!(
            "- From {}: {} | {}\n",
            message.sender, message.subject, message.snippet
        ));
    }
    prompt
}

pub(crate) fn categorize_prompt(message: &EmailMessage) -> String {
    format!(
        "Categorize this email as exactly one of: newsletter, promotional, \
         work, personal, social, transactional, spam, other.\n\
         Answer with the single category word only.\n\
         Subject: {}\nFrom: {}\nPreview: {}",
        message.subject, message.sender, message.snippet
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
