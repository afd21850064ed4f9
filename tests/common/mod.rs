//! Shared helpers for integration tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Mutex;

use inbox_triage::error::{Result, TriageError};
use inbox_triage::gateway::MailboxGateway;
use inbox_triage::models::{EmailMessage, MessagePage};

/// Build a message with sensible defaults for tests.
pub fn create_test_message(id: &str, sender: &str, subject: &str) -> EmailMessage {
    EmailMessage {
        id: id.to_string(),
        thread_id: format!("thread-{}", id),
        subject: subject.to_string(),
        sender: sender.to_string(),
        recipient: "me@example.com".to_string(),
        date: Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap(),
        snippet: String::new(),
        is_unread: false,
        labels: vec!["INBOX".to_string()],
        size_estimate: 2048,
        is_newsletter: false,
        unsubscribe_link: None,
        list_unsubscribe: None,
    }
}

/// Record of one batch_modify call: (ids, added, removed).
pub type ModifyCall = (Vec<String>, Vec<String>, Vec<String>);

/// In-memory mailbox gateway for exercising batch flows without a live
/// provider.
#[derive(Default)]
pub struct InMemoryGateway {
    pub messages: Vec<EmailMessage>,
    pub bodies: HashMap<String, String>,
    pub modifications: Mutex<Vec<ModifyCall>>,
    pub sent: Mutex<Vec<String>>,
}

impl InMemoryGateway {
    pub fn new(messages: Vec<EmailMessage>, bodies: HashMap<String, String>) -> Self {
        Self {
            messages,
            bodies,
            modifications: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MailboxGateway for InMemoryGateway {
    async fn list_messages(
        &self,
        _query: &str,
        max_results: u32,
        _page_token: Option<&str>,
    ) -> Result<MessagePage> {
        let ids: Vec<String> = self
            .messages
            .iter()
            .take(max_results as usize)
            .map(|m| m.id.clone())
            .collect();
        let estimate = ids.len() as u32;
        Ok(MessagePage {
            ids,
            next_page_token: None,
            result_size_estimate: estimate,
        })
    }

    async fn get_metadata(&self, id: &str) -> Result<EmailMessage> {
        self.messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| TriageError::MessageNotFound(id.to_string()))
    }

    async fn get_body(&self, id: &str) -> Result<String> {
        self.bodies
            .get(id)
            .cloned()
            .ok_or_else(|| TriageError::MessageNotFound(id.to_string()))
    }

    async fn batch_modify(
        &self,
        ids: &[String],
        add_labels: &[String],
        remove_labels: &[String],
    ) -> Result<()> {
        if ids.is_empty() {
            return Err(TriageError::ValidationError(
                "batch_modify requires at least one message id".to_string(),
            ));
        }
        self.modifications.lock().await.push((
            ids.to_vec(),
            add_labels.to_vec(),
            remove_labels.to_vec(),
        ));
        Ok(())
    }

    async fn send_message(&self, raw_encoded: &str) -> Result<()> {
        self.sent.lock().await.push(raw_encoded.to_string());
        Ok(())
    }
}
