//! Inbox Triage Engine
//!
//! A stateless email triage core: classify mailbox messages into semantic
//! categories, detect and execute unsubscribe actions, and turn aggregate
//! mailbox statistics into ranked, actionable insights with a resilient
//! multi-provider AI fallback chain.
//!
//! # Overview
//!
//! - **Classification**: Rule-based category detection (newsletter,
//!   promotional, work, social, transactional, personal) over message
//!   metadata. Deterministic, pure, no I/O.
//! - **Unsubscribe**: Header-first detection of unsubscribe targets in
//!   message bodies with a confidence score, plus best-effort execution
//!   over HTTP.
//! - **Insights**: Pattern, sender and time analyses feeding prioritized
//!   recommendations and three inbox health scores.
//! - **Provider chain**: Gemini and Hugging Face backends with a local
//!   rule-based terminal fallback and sticky routing.
//! - **Gateway**: A rate-limited Gmail-backed mailbox gateway behind an
//!   async trait, so the core stays testable without a live mailbox.
//!
//! # Example Usage
//!
//! ```no_run
//! use inbox_triage::config::AiConfig;
//! use inbox_triage::insights;
//! use inbox_triage::models::InboxStats;
//! use inbox_triage::providers::ProviderChain;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stats = InboxStats {
//!         total_emails: 1200,
//!         unread_emails: 640,
//!         newsletters: 180,
//!     };
//!
//!     // Rule-based analysis over fetched messages.
//!     let report = insights::analyze(&[], &stats);
//!     println!("cleanliness: {}", report.score.cleanliness);
//!
//!     // Natural-language insights with provider fallback.
//!     let mut chain = ProviderChain::from_config(&AiConfig::default())?;
//!     let text = chain.generate_insights(&stats, &report.patterns).await?;
//!     println!("{text}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`classifier`] - Rule-based email classification
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result alias
//! - [`gateway`] - Mailbox gateway trait and Gmail implementation
//! - [`insights`] - Insight generation and health scoring
//! - [`models`] - Core data structures
//! - [`providers`] - AI provider trait, backends, and fallback chain
//! - [`query`] - Provider search query fragments
//! - [`unsubscribe`] - Unsubscribe detection and execution

pub mod classifier;
pub mod config;
pub mod error;
pub mod gateway;
pub mod insights;
pub mod models;
pub mod providers;
pub mod query;
pub mod unsubscribe;

// Re-export commonly used types for convenience
pub use error::{Result, TriageError};

// Core data models
pub use models::{
    AnalysisReport, BatchReport, EmailCategory, EmailMessage, HealthScore, InboxStats,
    Insight, InsightCategory, InsightKind, InsightPriority, UnsubscribeInfo,
    UnsubscribeMethod, UnsubscribeOutcome,
};

// Classifier surface
pub use classifier::{classify, is_newsletter, is_suspicious};

// Unsubscribe surface
pub use unsubscribe::{extract_unsubscribe_info, group_by_domain, UnsubscribeService};

// Insight generation
pub use insights::{analyze, generate_cleanup_insights};

// Gateway
pub use gateway::{GmailGateway, MailboxGateway};

// Provider chain
pub use providers::{AiProvider, ProviderChain, ProviderError};

// Config types
pub use config::{AiConfig, Config, GatewayConfig, UnsubscribeConfig};
