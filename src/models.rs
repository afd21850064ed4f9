use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One mailbox entry, built by the gateway from a provider fetch.
///
/// Immutable once constructed except for `is_unread`, which a label
/// mutation may clear (it is never set back to true).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub id: String,
    pub thread_id: String,
    pub subject: String,
    pub sender: String,
    pub recipient: String,
    pub date: DateTime<Utc>,
    pub snippet: String,
    pub is_unread: bool,
    pub labels: Vec<String>,
    pub size_estimate: u64,
    pub is_newsletter: bool,
    pub unsubscribe_link: Option<String>,
    pub list_unsubscribe: Option<String>,
}

/// Semantic category computed on demand from a message. Not stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EmailCategory {
    Newsletter,
    Promotional,
    Work,
    Personal,
    Social,
    Transactional,
    Spam,
    Other,
}

impl EmailCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailCategory::Newsletter => "newsletter",
            EmailCategory::Promotional => "promotional",
            EmailCategory::Work => "work",
            EmailCategory::Personal => "personal",
            EmailCategory::Social => "social",
            EmailCategory::Transactional => "transactional",
            EmailCategory::Spam => "spam",
            EmailCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for EmailCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an unsubscribe action was discovered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnsubscribeMethod {
    /// Parsed from a `List-Unsubscribe` header.
    Header,
    /// Discovered as an anchor in the message body.
    Link,
    /// Discovered as a `<form action=...>` in the message body.
    Form,
    /// A mailto: target requiring a manual email.
    Email,
}

/// Result of unsubscribe detection over one message body.
///
/// Invariant: `found` is true iff `links` is non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsubscribeInfo {
    pub found: bool,
    pub links: Vec<String>,
    pub method: Option<UnsubscribeMethod>,
    pub confidence: f32,
}

impl UnsubscribeInfo {
    /// The empty result: nothing detected, zero confidence.
    pub fn none() -> Self {
        Self {
            found: false,
            links: Vec::new(),
            method: None,
            confidence: 0.0,
        }
    }
}

/// Outcome of attempting one unsubscribe action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsubscribeOutcome {
    pub success: bool,
    pub message: String,
}

/// What kind of finding an insight is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Recommendation,
    Warning,
    Info,
    Success,
}

/// Priority of an insight. Ordering is Low < Medium < High so that
/// descending sorts put high-priority findings first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum InsightPriority {
    Low,
    Medium,
    High,
}

/// Which area of inbox hygiene an insight concerns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsightCategory {
    Cleanup,
    Organization,
    Productivity,
    Security,
}

/// Operation a suggested action maps to in the consuming application.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    MarkRead,
    Unsubscribe,
    Search,
}

/// An action a caller can take in response to an insight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub label: String,
    pub action: ActionKind,
    /// Provider search query backing the action, when one applies.
    pub query: Option<String>,
}

/// One actionable finding derived from aggregate mailbox state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub priority: InsightPriority,
    pub category: InsightCategory,
    pub action: Option<SuggestedAction>,
}

/// Caller-supplied aggregate counts for the mailbox under analysis.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct InboxStats {
    pub total_emails: usize,
    pub unread_emails: usize,
    pub newsletters: usize,
}

/// Inbox health scores, each in [0, 100].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HealthScore {
    pub cleanliness: u32,
    pub organization: u32,
    pub productivity: u32,
}

/// Counts from the pattern sub-analysis over a message collection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PatternSummary {
    pub newsletters: usize,
    pub unread_newsletters: usize,
    pub old_emails: usize,
    pub large_emails: usize,
    pub duplicates: usize,
    pub suspicious: usize,
}

/// Per-sender volume from the sender sub-analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderStats {
    pub sender: String,
    pub total: usize,
    pub unread: usize,
}

/// Message volume histograms by weekday (Mon..Sun) and hour of day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeHistogram {
    pub by_weekday: [usize; 7],
    pub by_hour: [usize; 24],
}

impl Default for TimeHistogram {
    fn default() -> Self {
        Self {
            by_weekday: [0; 7],
            by_hour: [0; 24],
        }
    }
}

/// Full result of one analysis call: ranked insights plus the aggregates
/// they were derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub insights: Vec<Insight>,
    pub stats: InboxStats,
    pub score: HealthScore,
    pub patterns: PatternSummary,
    pub top_senders: Vec<SenderStats>,
    pub time: TimeHistogram,
}

/// One page of message ids from a gateway list/search call.
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub ids: Vec<String>,
    pub next_page_token: Option<String>,
    pub result_size_estimate: u32,
}

/// Outcome of one item in a batch operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub id: String,
    pub success: bool,
    pub message: String,
}

/// Aggregate result of a batch operation. `results` always has one entry
/// per processed item so callers can distinguish partial from total
/// success.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed: usize,
    pub succeeded: usize,
    pub results: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn push(&mut self, outcome: ItemOutcome) {
        self.processed += 1;
        if outcome.success {
            self.succeeded += 1;
        }
        self.results.push(outcome);
    }
}
