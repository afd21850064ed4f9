//! Mailbox gateway: search, fetch, mutate and send against the remote
//! provider, with rate limiting and retry logic.
//!
//! The trait is the capability surface the triage core consumes; the
//! production implementation wraps the Gmail API hub. Authentication is
//! the caller's concern: the hub arrives pre-authorized and its
//! credential is read-only here.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use google_gmail1::{
    api::{BatchModifyMessagesRequest, Message, MessagePart},
    hyper_rustls, hyper_util, Gmail,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::classifier;
use crate::error::{Result, TriageError};
use crate::models::{EmailMessage, MessagePage};
use crate::unsubscribe;

/// Provider label for unread messages.
pub const UNREAD_LABEL: &str = "UNREAD";
/// Provider label for the inbox.
pub const INBOX_LABEL: &str = "INBOX";
/// Provider label for trashed messages.
pub const TRASH_LABEL: &str = "TRASH";

const GMAIL_MODIFY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";

/// Capability surface of the remote mailbox consumed by the triage core.
#[async_trait]
pub trait MailboxGateway: Send + Sync {
    /// List message ids matching a provider query, one page at a time.
    async fn list_messages(
        &self,
        query: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<MessagePage>;

    /// Fetch one message's metadata (headers, snippet, labels, size).
    async fn get_metadata(&self, id: &str) -> Result<EmailMessage>;

    /// Fetch one message's decoded body, preferring the HTML part.
    async fn get_body(&self, id: &str) -> Result<String>;

    /// Mutate labels across an id list in one atomic remote call.
    /// An empty id list is a validation error and is never sent.
    async fn batch_modify(
        &self,
        ids: &[String],
        add_labels: &[String],
        remove_labels: &[String],
    ) -> Result<()>;

    /// Send a base64url-encoded RFC 822 message.
    async fn send_message(&self, raw_encoded: &str) -> Result<()>;

    /// Clear the unread flag across an id list.
    async fn mark_read(&self, ids: &[String]) -> Result<()> {
        self.batch_modify(ids, &[], &[UNREAD_LABEL.to_string()]).await
    }

    /// Remove messages from the inbox without deleting them.
    async fn archive(&self, ids: &[String]) -> Result<()> {
        self.batch_modify(ids, &[], &[INBOX_LABEL.to_string()]).await
    }

    /// Move messages to trash.
    async fn trash(&self, ids: &[String]) -> Result<()> {
        self.batch_modify(
            ids,
            &[TRASH_LABEL.to_string()],
            &[INBOX_LABEL.to_string()],
        )
        .await
    }
}

type GmailHub =
    Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>;

/// Production gateway over the Gmail API with semaphore-based rate
/// limiting and exponential backoff on transient errors.
pub struct GmailGateway {
    hub: GmailHub,
    rate_limiter: Arc<Semaphore>,
}

impl GmailGateway {
    /// Create a gateway around a pre-authorized hub.
    ///
    /// `max_concurrent` bounds in-flight requests (40-50 keeps a busy
    /// scan under the provider's per-second quota).
    pub fn new(hub: GmailHub, max_concurrent: usize) -> Self {
        Self {
            hub,
            rate_limiter: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Fetch many messages' metadata concurrently.
    pub async fn fetch_messages_batch(&self, ids: Vec<String>) -> Result<Vec<EmailMessage>> {
        stream::iter(ids)
            .map(|id| async move { self.get_metadata(&id).await })
            .buffer_unordered(40)
            .try_collect()
            .await
    }

    fn should_retry(error: &TriageError) -> bool {
        error.is_transient()
    }

    /// Execute an async operation with exponential backoff retry.
    async fn with_retry<T, F, Fut>(
        operation_name: &str,
        max_retries: u32,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut delay = Duration::from_secs(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if Self::should_retry(&e) && attempts <= max_retries => {
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name,
                        attempts,
                        max_retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, Duration::from_secs(30));
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn acquire_permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>> {
        self.rate_limiter
            .acquire()
            .await
            .map_err(|e| TriageError::Unknown(format!("Failed to acquire permit: {}", e)))
    }
}

#[async_trait]
impl MailboxGateway for GmailGateway {
    async fn list_messages(
        &self,
        query: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<MessagePage> {
        let _permit = self.acquire_permit().await?;

        Self::with_retry("list_messages", 3, || async {
            let mut call = self
                .hub
                .users()
                .messages_list("me")
                .q(query)
                .max_results(max_results);

            if let Some(token) = page_token {
                call = call.page_token(token);
            }

            // Watchdog so a wedged list call cannot hang the request.
            let timeout_duration = Duration::from_secs(30);
            let api_call = call.add_scope(GMAIL_MODIFY_SCOPE).doit();
            let (_, response) = match tokio::time::timeout(timeout_duration, api_call).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(
                        "list_messages call timed out after {:?}",
                        timeout_duration
                    );
                    return Err(TriageError::NetworkError(format!(
                        "API call timed out after {:?}",
                        timeout_duration
                    )));
                }
            };

            let ids = response
                .messages
                .unwrap_or_default()
                .into_iter()
                .filter_map(|m| m.id)
                .collect::<Vec<_>>();

            debug!(count = ids.len(), query, "listed message page");

            Ok(MessagePage {
                ids,
                next_page_token: response.next_page_token,
                result_size_estimate: response.result_size_estimate.unwrap_or(0),
            })
        })
        .await
    }

    async fn get_metadata(&self, id: &str) -> Result<EmailMessage> {
        let _permit = self.acquire_permit().await?;

        Self::with_retry("get_metadata", 3, || async {
            let (_, msg) = self
                .hub
                .users()
                .messages_get("me", id)
                .format("metadata")
                .add_metadata_headers("From")
                .add_metadata_headers("To")
                .add_metadata_headers("Subject")
                .add_metadata_headers("Date")
                .add_metadata_headers("List-Unsubscribe")
                .add_scope(GMAIL_MODIFY_SCOPE)
                .doit()
                .await?;

            parse_message(msg)
        })
        .await
    }

    async fn get_body(&self, id: &str) -> Result<String> {
        let _permit = self.acquire_permit().await?;

        Self::with_retry("get_body", 3, || async {
            let (_, msg) = self
                .hub
                .users()
                .messages_get("me", id)
                .format("full")
                .add_scope(GMAIL_MODIFY_SCOPE)
                .doit()
                .await?;

            let payload = msg.payload.ok_or_else(|| {
                TriageError::InvalidMessageFormat("Message has no payload".to_string())
            })?;

            Ok(extract_body(&payload).unwrap_or_default())
        })
        .await
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

        let _permit = self.acquire_permit().await?;

        let add = if add_labels.is_empty() {
            None
        } else {
            Some(add_labels.to_vec())
        };
        let remove = if remove_labels.is_empty() {
            None
        } else {
            Some(remove_labels.to_vec())
        };

        Self::with_retry("batch_modify", 3, || async {
            let request = BatchModifyMessagesRequest {
                ids: Some(ids.to_vec()),
                add_label_ids: add.clone(),
                remove_label_ids: remove.clone(),
            };

            self.hub
                .users()
                .messages_batch_modify(request, "me")
                .add_scope(GMAIL_MODIFY_SCOPE)
                .doit()
                .await?;

            Ok(())
        })
        .await?;

        debug!(count = ids.len(), "batch label mutation applied");
        Ok(())
    }

    async fn send_message(&self, raw_encoded: &str) -> Result<()> {
        let raw = URL_SAFE_NO_PAD.decode(raw_encoded).map_err(|e| {
            TriageError::ValidationError(format!("raw message is not valid base64url: {}", e))
        })?;

        let _permit = self.acquire_permit().await?;

        let mime_type = "message/rfc822".parse::<mime::Mime>().map_err(|e| {
            TriageError::Unknown(format!("invalid upload mime type: {}", e))
        })?;

        self.hub
            .users()
            .messages_send(Message::default(), "me")
            .add_scope("https://www.googleapis.com/auth/gmail.send")
            .upload(std::io::Cursor::new(raw), mime_type)
            .await?;

        Ok(())
    }
}

// Allow shared ownership of the production gateway.
#[async_trait]
impl MailboxGateway for Arc<GmailGateway> {
    async fn list_messages(
        &self,
        query: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<MessagePage> {
        self.as_ref().list_messages(query, max_results, page_token).await
    }

    async fn get_metadata(&self, id: &str) -> Result<EmailMessage> {
        self.as_ref().get_metadata(id).await
    }

    async fn get_body(&self, id: &str) -> Result<String> {
        self.as_ref().get_body(id).await
    }

    async fn batch_modify(
        &self,
        ids: &[String],
        add_labels: &[String],
        remove_labels: &[String],
    ) -> Result<()> {
        self.as_ref().batch_modify(ids, add_labels, remove_labels).await
    }

    async fn send_message(&self, raw_encoded: &str) -> Result<()> {
        self.as_ref().send_message(raw_encoded).await
    }
}

/// Build a base64url-encoded RFC 822 message for [`MailboxGateway::send_message`].
pub fn encode_raw_message(from: &str, to: &str, subject: &str, body: &str) -> Result<String> {
    if to.is_empty() || !to.contains('@') {
        return Err(TriageError::ValidationError(format!(
            "invalid recipient address: {:?}",
            to
        )));
    }

    let rfc822 = format!(
        "From: {}\r\nTo: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}",
        from, to, subject, body
    );
    Ok(URL_SAFE_NO_PAD.encode(rfc822.as_bytes()))
}

/// Parse a Gmail API message into an [`EmailMessage`].
fn parse_message(msg: Message) -> Result<EmailMessage> {
    let id = msg
        .id
        .ok_or_else(|| TriageError::InvalidMessageFormat("Missing message ID".to_string()))?;

    let thread_id = msg
        .thread_id
        .ok_or_else(|| TriageError::InvalidMessageFormat("Missing thread ID".to_string()))?;

    let labels = msg.label_ids.unwrap_or_default();
    let snippet = msg.snippet.unwrap_or_default();
    let size_estimate = msg.size_estimate.unwrap_or(0).max(0) as u64;

    let headers = msg
        .payload
        .as_ref()
        .and_then(|p| p.headers.as_ref())
        .cloned()
        .unwrap_or_default();

    let mut sender = String::new();
    let mut recipient = String::new();
    let mut subject = String::new();
    let mut date_str = String::new();
    let mut list_unsubscribe: Option<String> = None;

    for header in &headers {
        if let (Some(name), Some(value)) = (&header.name, &header.value) {
            match name.to_lowercase().as_str() {
                "from" => sender = value.clone(),
                "to" => recipient = value.clone(),
                "subject" => subject = value.clone(),
                "date" => date_str = value.clone(),
                "list-unsubscribe" => list_unsubscribe = Some(value.clone()),
                _ => {}
            }
        }
    }

    // Prefer the provider's internal timestamp; fall back to the Date
    // header, then to now.
    let date = msg
        .internal_date
        .and_then(DateTime::from_timestamp_millis)
        .or_else(|| parse_date(&date_str).ok())
        .unwrap_or_else(Utc::now);

    let is_unread = labels.iter().any(|l| l == UNREAD_LABEL);

    // First http(s) target from the unsubscribe header, when present.
    let unsubscribe_link = list_unsubscribe.as_deref().and_then(|header| {
        unsubscribe::extract_unsubscribe_info("", Some(header))
            .links
            .into_iter()
            .find(|l| l.starts_with("http"))
    });

    let mut message = EmailMessage {
        id,
        thread_id,
        subject,
        sender,
        recipient,
        date,
        snippet,
        is_unread,
        labels,
        size_estimate,
        is_newsletter: false,
        unsubscribe_link,
        list_unsubscribe,
    };
    message.is_newsletter = classifier::is_newsletter(&message);

    Ok(message)
}

/// Parse RFC 2822 date string, with an RFC 3339 fallback.
fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(date_str)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| DateTime::parse_from_rfc3339(date_str).map(|dt| dt.with_timezone(&Utc)))
        .map_err(|e| TriageError::InvalidMessageFormat(format!("Invalid date format: {}", e)))
}

/// Walk a message payload and return the decoded body, preferring
/// text/html over text/plain.
fn extract_body(payload: &MessagePart) -> Option<String> {
    find_part(payload, "text/html").or_else(|| find_part(payload, "text/plain"))
}

fn find_part(part: &MessagePart, mime_type: &str) -> Option<String> {
    if part.mime_type.as_deref() == Some(mime_type) {
        if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_ref()) {
            return Some(String::from_utf8_lossy(data).into_owned());
        }
    }

    for child in part.parts.as_deref().unwrap_or_default() {
        if let Some(body) = find_part(child, mime_type) {
            return Some(body);
        }
    }

    None
}
