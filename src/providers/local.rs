//! Rule-based local fallback provider.
//!
//! Terminal link of the chain: no credentials, no I/O, never fails.
//! Categorization delegates to the same rule table as the classifier so
//! AI and non-AI paths give identical answers.

use async_trait::async_trait;

use super::{AiProvider, ProviderError};
use crate::classifier;
use crate::insights;
use crate::models::{EmailMessage, InboxStats, PatternSummary};

/// Local provider that phrases rule-engine output as plain text.
pub struct RuleBasedProvider;

impl RuleBasedProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RuleBasedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiProvider for RuleBasedProvider {
    fn name(&self) -> &str {
        "local-rules"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn generate_insights(
        &self,
        stats: &InboxStats,
        patterns: &PatternSummary,
    ) -> Result<String, ProviderError> {
        let findings = insights::generate_cleanup_insights(stats);

        if findings.is_empty() && patterns.duplicates == 0 && patterns.suspicious == 0 {
            return Ok(format!(
                "Inbox looks healthy: {} emails, {} unread.",
                stats.total_emails, stats.unread_emails
            ));
        }

        let mut out = String::new();
        for finding in &findings {
            out.push_str(&format!("- {}: {}\n", finding.title, finding.description));
        }
        if patterns.duplicates > 0 {
            out.push_str(&format!(
                "- Repeated mail: {} messages duplicate another's sender and subject\n",
                patterns.duplicates
            ));
        }
        if patterns.suspicious > 0 {
            out.push_str(&format!(
                "- Caution: {} messages match phishing indicators\n",
                patterns.suspicious
            ));
        }

        Ok(out.trim_end().to_string())
    }

    async fn summarize_emails(
        &self,
        messages: &[EmailMessage],
    ) -> Result<String, ProviderError> {
        if messages.is_empty() {
            return Ok("No emails to summarize.".to_string());
        }

        let unread = messages.iter().filter(|m| m.is_unread).count();
        let newsletters = messages.iter().filter(|m| classifier::is_newsletter(m)).count();
        let top = insights::sender_analysis(messages);

        let mut out = format!(
            "{} emails ({} unread, {} newsletters).",
            messages.len(),
            unread,
            newsletters
        );

        if let Some(busiest) = top.first() {
            out.push_str(&format!(
                " Most frequent sender: {} with {} messages.",
                busiest.sender, busiest.total
            ));
        }

        let subjects: Vec<&str> = messages
            .iter()
            .take(3)
            .map(|m| m.subject.as_str())
            .collect();
        if !subjects.is_empty() {
            out.push_str(&format!(" Recent subjects: {}.", subjects.join("; ")));
        }

        Ok(out)
    }

    async fn categorize_email(&self, message: &EmailMessage) -> Result<String, ProviderError> {
        Ok(classifier::classify(message).as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmailCategory;
    use chrono::Utc;

    fn message(sender: &str, subject: &str) -> EmailMessage {
        EmailMessage {
            id: "m".into(),
            thread_id: "t".into(),
            subject: subject.into(),
            sender: sender.into(),
            recipient: "me@x.com".into(),
            date: Utc::now(),
            snippet: String::new(),
            is_unread: true,
            labels: vec![],
            size_estimate: 0,
            is_newsletter: false,
            unsubscribe_link: None,
            list_unsubscribe: None,
        }
    }

    #[tokio::test]
    async fn test_always_available() {
        let provider = RuleBasedProvider::new();
        assert!(provider.is_available());
    }

    #[tokio::test]
    async fn test_categorization_matches_classifier() {
        let provider = RuleBasedProvider::new();
        let messages = [
            message("noreply@news.com", "Weekly roundup"),
            message("deals@shop.com", "Flash sale 50% off"),
            message("alice@co.com", "Project deadline"),
        ];

        for msg in &messages {
            let from_provider = provider.categorize_email(msg).await.unwrap();
            let from_classifier = classifier::classify(msg).as_str();
            assert_eq!(from_provider, from_classifier);
        }

        assert_eq!(
            provider.categorize_email(&messages[0]).await.unwrap(),
            EmailCategory::Newsletter.as_str()
        );
    }

    #[tokio::test]
    async fn test_insights_text_mentions_backlog() {
        let provider = RuleBasedProvider::new();
        let stats = InboxStats {
            total_emails: 1000,
            unread_emails: 600,
            newsletters: 200,
        };
        let text = provider
            .generate_insights(&stats, &PatternSummary::default())
            .await
            .unwrap();
        assert!(text.to_lowercase().contains("unread"));
    }

    #[tokio::test]
    async fn test_healthy_inbox_text() {
        let provider = RuleBasedProvider::new();
        let stats = InboxStats {
            total_emails: 50,
            unread_emails: 2,
            newsletters: 3,
        };
        let text = provider
            .generate_insights(&stats, &PatternSummary::default())
            .await
            .unwrap();
        assert!(text.contains("healthy"));
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let provider = RuleBasedProvider::new();
        let msgs = vec![
            message("noreply@news.com", "Digest #1"),
            message("alice@co.com", "Hello"),
        ];
        let text = provider.summarize_emails(&msgs).await.unwrap();
        assert!(text.contains("2 emails"));
        assert!(text.contains("1 newsletters"));
    }

    #[tokio::test]
    async fn test_empty_summary() {
        let provider = RuleBasedProvider::new();
        let text = provider.summarize_emails(&[]).await.unwrap();
        assert!(text.contains("No emails"));
    }
}
