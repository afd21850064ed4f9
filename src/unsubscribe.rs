//! Unsubscribe detection and execution
//!
//! Detection is header-first: a `List-Unsubscribe` header short-circuits
//! body parsing entirely. Body parsing is heuristic anchor/form scanning
//! with a confidence score; execution is a best-effort GET against the
//! first discovered link. Nothing here verifies that an unsubscribe
//! actually took effect.

use std::collections::HashMap;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::classifier::sender_domain;
use crate::config::UnsubscribeConfig;
use crate::gateway::MailboxGateway;
use crate::models::{
    BatchReport, EmailMessage, ItemOutcome, UnsubscribeInfo, UnsubscribeMethod,
    UnsubscribeOutcome,
};

/// Confidence assigned to header-derived unsubscribe targets.
const HEADER_CONFIDENCE: f32 = 0.9;

/// Base confidence for content-parsed targets before scoring adjustments.
const CONTENT_BASE_CONFIDENCE: f32 = 0.5;

struct BodyPatterns {
    header_token: Regex,
    anchor: Regex,
    href: Regex,
    form: Regex,
    action: Regex,
    tag: Regex,
    unsubscribe_word: Regex,
}

static BODY: Lazy<BodyPatterns> = Lazy::new(|| BodyPatterns {
    header_token: Regex::new(r"<([^<>]+)>").unwrap(),
    anchor: Regex::new(r"(?is)<a\s+([^>]*)>(.*?)</a>").unwrap(),
    href: Regex::new(r#"(?i)href\s*=\s*["']([^"']*)["']"#).unwrap(),
    form: Regex::new(r"(?is)<form\b([^>]*)>(.*?)</form>").unwrap(),
    action: Regex::new(r#"(?i)action\s*=\s*["']([^"']*)["']"#).unwrap(),
    tag: Regex::new(r"(?s)<[^>]*>").unwrap(),
    unsubscribe_word: Regex::new(r"(?i)unsubscribe").unwrap(),
});

/// href substrings that mark an anchor as an unsubscribe candidate.
static HREF_HINTS: &[&str] = &["unsubscribe", "optout", "opt-out"];

/// Anchor text phrases that mark a candidate.
static TEXT_HINTS: &[&str] = &[
    "unsubscribe",
    "opt out",
    "remove me",
    "stop emails",
    "email preferences",
];

/// id/class/data-attribute substrings that mark a candidate.
static ATTR_HINTS: &[&str] = &["unsubscribe", "optout", "opt-out"];

/// A candidate is only valid if its href or text carries one of these.
static VALIDATION_KEYWORDS: &[&str] = &[
    "unsubscribe",
    "optout",
    "opt-out",
    "remove",
    "stop",
    "email-preferences",
    "preferences",
];

/// Extract unsubscribe candidates from a message body and optional
/// `List-Unsubscribe` header value.
///
/// The header check runs first and short-circuits content parsing: header
/// targets are considered authoritative and score 0.9. Content parsing
/// never fails; a body with no usable structure yields the empty result.
pub fn extract_unsubscribe_info(
    body: &str,
    list_unsubscribe: Option<&str>,
) -> UnsubscribeInfo {
    if let Some(header) = list_unsubscribe {
        let links: Vec<String> = BODY
            .header_token
            .captures_iter(header)
            .map(|c| c[1].trim().to_string())
            .filter(|t| t.starts_with("http") || t.starts_with("mailto:"))
            .collect();

        if !links.is_empty() {
            return UnsubscribeInfo {
                found: true,
                links,
                method: Some(UnsubscribeMethod::Header),
                confidence: HEADER_CONFIDENCE,
            };
        }
    }

    let mut links: Vec<String> = Vec::new();

    for cap in BODY.anchor.captures_iter(body) {
        let attrs = &cap[1];
        let text = BODY.tag.replace_all(&cap[2], " ").to_lowercase();

        let href = match BODY.href.captures(attrs) {
            Some(h) => h[1].trim().to_string(),
            None => continue,
        };
        let href_lower = href.to_lowercase();
        let attrs_lower = attrs.to_lowercase();

        let hinted = HREF_HINTS.iter().any(|h| href_lower.contains(h))
            || TEXT_HINTS.iter().any(|h| text.contains(h))
            || ATTR_HINTS.iter().any(|h| {
                attrs_lower.contains(&format!("id=\"{}", h))
                    || attrs_lower.contains(&format!("class=\"{}", h))
                    || attrs_lower.contains("data-unsubscribe")
                    || attrs_lower.contains(&format!("\"{}\"", h))
            });
        if !hinted {
            continue;
        }

        if !is_valid_candidate(&href_lower, &text) {
            continue;
        }

        if !links.contains(&href) {
            links.push(href);
        }
    }

    let mut form_matched = false;
    for cap in BODY.form.captures_iter(body) {
        let attrs = &cap[1];
        let inner = cap[2].to_lowercase();
        if !inner.contains("unsubscribe") && !inner.contains("opt out") {
            continue;
        }
        form_matched = true;
        if let Some(action) = BODY.action.captures(attrs) {
            let action = action[1].trim().to_string();
            if !action.is_empty() && !links.contains(&action) {
                links.push(action);
            }
        }
    }

    if links.is_empty() {
        return UnsubscribeInfo::none();
    }

    let method = if form_matched {
        UnsubscribeMethod::Form
    } else if links.iter().all(|l| l.starts_with("mailto:")) {
        UnsubscribeMethod::Email
    } else {
        UnsubscribeMethod::Link
    };

    let confidence = content_confidence(body, &links);
    debug!(
        candidates = links.len(),
        confidence, "extracted unsubscribe candidates from body"
    );

    UnsubscribeInfo {
        found: true,
        links,
        method: Some(method),
        confidence,
    }
}

/// Validity check for a content-parsed candidate link.
fn is_valid_candidate(href_lower: &str, text_lower: &str) -> bool {
    if href_lower.is_empty() || href_lower == "#" {
        return false;
    }
    if href_lower.starts_with("javascript:") {
        return false;
    }
    if !href_lower.starts_with("http") && !href_lower.starts_with("mailto:") {
        return false;
    }

    VALIDATION_KEYWORDS
        .iter()
        .any(|k| href_lower.contains(k) || text_lower.contains(k))
}

/// Score content-parsed candidates: base 0.5, plus up to 0.3 for repeated
/// "unsubscribe" mentions in the body, plus up to 0.2 for an all-https
/// link set. Always lands in [0, 1].
fn content_confidence(body: &str, links: &[String]) -> f32 {
    let mentions = BODY.unsubscribe_word.find_iter(body).count() as f32;
    let mention_bonus = (mentions * 0.1).min(0.3);

    let https = links.iter().filter(|l| l.starts_with("https")).count() as f32;
    let https_bonus = (https / links.len() as f32) * 0.2;

    (CONTENT_BASE_CONFIDENCE + mention_bonus + https_bonus).clamp(0.0, 1.0)
}

/// Group messages by sender domain. Messages whose sender has no parseable
/// domain land in the `"unknown"` bucket.
pub fn group_by_domain(messages: &[EmailMessage]) -> HashMap<String, Vec<&EmailMessage>> {
    let mut groups: HashMap<String, Vec<&EmailMessage>> = HashMap::new();
    for message in messages {
        let domain =
            sender_domain(&message.sender).unwrap_or_else(|| "unknown".to_string());
        groups.entry(domain).or_default().push(message);
    }
    groups
}

/// Executes unsubscribe actions over HTTP.
///
/// The underlying client uses a fixed request timeout and an identifying
/// User-Agent, does not follow redirects, and treats every status code as
/// a response to classify rather than a transport failure.
pub struct UnsubscribeService {
    http: reqwest::Client,
}

impl UnsubscribeService {
    pub fn new() -> Self {
        Self::with_config(&UnsubscribeConfig::default())
    }

    pub fn with_config(config: &UnsubscribeConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default();

        Self { http }
    }

    /// Execute the top candidate from a detection result.
    ///
    /// Only the first link is ever used. `mailto:` targets are never
    /// auto-executed; the address is surfaced for manual action. Transport
    /// failures are reported in the outcome, never propagated.
    pub async fn perform_unsubscribe(&self, info: &UnsubscribeInfo) -> UnsubscribeOutcome {
        let link = match info.links.first() {
            Some(link) => link,
            None => {
                return UnsubscribeOutcome {
                    success: false,
                    message: "no unsubscribe link available".to_string(),
                }
            }
        };

        if let Some(address) = link.strip_prefix("mailto:") {
            return UnsubscribeOutcome {
                success: false,
                message: format!("manual unsubscribe required: send an email to {}", address),
            };
        }

        match self.http.get(link).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() || status.is_redirection() {
                    UnsubscribeOutcome {
                        success: true,
                        message: format!("unsubscribe request accepted (HTTP {})", status.as_u16()),
                    }
                } else {
                    UnsubscribeOutcome {
                        success: false,
                        message: format!("unsubscribe endpoint returned HTTP {}", status.as_u16()),
                    }
                }
            }
            Err(e) => {
                warn!(link = %link, error = %e, "unsubscribe request failed");
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    format!("request failed: {}", e)
                };
                UnsubscribeOutcome {
                    success: false,
                    message: reason,
                }
            }
        }
    }

    /// Run detection and execution for each message in a batch.
    ///
    /// Per-item isolation: one message failing to fetch, parse, or execute
    /// never aborts the remainder. The report carries one entry per input
    /// message.
    pub async fn process_batch(
        &self,
        gateway: &dyn MailboxGateway,
        messages: &[EmailMessage],
    ) -> BatchReport {
        let mut report = BatchReport::default();

        for message in messages {
            let body = match gateway.get_body(&message.id).await {
                Ok(body) => body,
                Err(e) => {
                    report.push(ItemOutcome {
                        id: message.id.clone(),
                        success: false,
                        message: format!("failed to fetch body: {}", e),
                    });
                    continue;
                }
            };

            let info = extract_unsubscribe_info(&body, message.list_unsubscribe.as_deref());
            if !info.found {
                report.push(ItemOutcome {
                    id: message.id.clone(),
                    success: false,
                    message: "no unsubscribe action found".to_string(),
                });
                continue;
            }

            let outcome = self.perform_unsubscribe(&info).await;
            report.push(ItemOutcome {
                id: message.id.clone(),
                success: outcome.success,
                message: outcome.message,
            });
        }

        debug!(
            processed = report.processed,
            succeeded = report.succeeded,
            "unsubscribe batch finished"
        );
        report
    }
}

impl Default for UnsubscribeService {
    fn default() -> Self {
        Self::new()
    }
}
