//! Inbox insight generation
//!
//! Pure aggregation over a message collection plus caller-supplied
//! stats. Each sub-analysis runs once per call; every applicable rule
//! fires independently; the final list is ranked by priority and capped.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use tracing::debug;

use crate::classifier::{is_newsletter, is_suspicious};
use crate::models::{
    ActionKind, AnalysisReport, EmailMessage, HealthScore, InboxStats, Insight,
    InsightCategory, InsightKind, InsightPriority, PatternSummary, SenderStats,
    SuggestedAction, TimeHistogram,
};
use crate::query;

/// Mail older than this counts toward the "old email" pattern.
const OLD_EMAIL_CUTOFF_DAYS: i64 = 30;

/// Size threshold for the "large email" pattern, in bytes.
pub const LARGE_EMAIL_BYTES: u64 = 5_000_000;

/// Insights returned per analysis, after ranking.
const MAX_INSIGHTS: usize = 10;

/// How many senders the sender analysis reports.
const TOP_SENDER_COUNT: usize = 10;

/// Analyze a message collection against its aggregate stats.
pub fn analyze(messages: &[EmailMessage], stats: &InboxStats) -> AnalysisReport {
    analyze_at(messages, stats, Utc::now())
}

/// Analysis entry point with an explicit clock, for deterministic tests.
pub fn analyze_at(
    messages: &[EmailMessage],
    stats: &InboxStats,
    now: DateTime<Utc>,
) -> AnalysisReport {
    let patterns = pattern_summary(messages, now);
    let top_senders = sender_analysis(messages);
    let time = time_analysis(messages);

    let mut insights = Vec::new();

    // Each rule is evaluated independently; all applicable ones fire.
    if stats.unread_emails > 1000 {
        insights.push(Insight {
            kind: InsightKind::Warning,
            title: "Unread backlog".to_string(),
            description: format!(
                "{} unread emails are accumulating in this mailbox",
                stats.unread_emails
            ),
            priority: InsightPriority::High,
            category: InsightCategory::Cleanup,
            action: Some(SuggestedAction {
                label: "Mark old unread mail as read".to_string(),
                action: ActionKind::MarkRead,
                query: Some(query::and(&[
                    query::unread(),
                    query::before(now - Duration::days(OLD_EMAIL_CUTOFF_DAYS)),
                ])),
            }),
        });
    }

    if patterns.unread_newsletters > 50 {
        insights.push(Insight {
            kind: InsightKind::Recommendation,
            title: "Newsletters pile up unread".to_string(),
            description: format!(
                "{} newsletters sit unread; unsubscribing would cut future volume",
                patterns.unread_newsletters
            ),
            priority: InsightPriority::High,
            category: InsightCategory::Cleanup,
            action: Some(SuggestedAction {
                label: "Review and unsubscribe in bulk".to_string(),
                action: ActionKind::Unsubscribe,
                query: Some(query::newsletters()),
            }),
        });
    }

    if patterns.large_emails > 20 {
        insights.push(Insight {
            kind: InsightKind::Info,
            title: "Large attachments use up storage".to_string(),
            description: format!(
                "{} emails exceed {} MB",
                patterns.large_emails,
                LARGE_EMAIL_BYTES / 1_000_000
            ),
            priority: InsightPriority::Medium,
            category: InsightCategory::Cleanup,
            action: Some(SuggestedAction {
                label: "Find large emails".to_string(),
                action: ActionKind::Search,
                query: Some(query::larger(LARGE_EMAIL_BYTES)),
            }),
        });
    }

    if let Some(top) = top_senders.first() {
        if top.total > 50 && top.unread > 20 {
            insights.push(Insight {
                kind: InsightKind::Recommendation,
                title: format!("High volume from {}", top.sender),
                description: format!(
                    "{} messages ({} unread) from a single sender; a filter or label would keep them organized",
                    top.total, top.unread
                ),
                priority: InsightPriority::Medium,
                category: InsightCategory::Organization,
                action: Some(SuggestedAction {
                    label: format!("Review mail from {}", top.sender),
                    action: ActionKind::Search,
                    query: Some(query::from_sender(&top.sender)),
                }),
            });
        }
    }

    if patterns.duplicates > 10 {
        insights.push(Insight {
            kind: InsightKind::Info,
            title: "Repeated emails detected".to_string(),
            description: format!(
                "{} messages share a sender and subject with another message",
                patterns.duplicates
            ),
            priority: InsightPriority::Low,
            category: InsightCategory::Organization,
            action: None,
        });
    }

    if !messages.is_empty() {
        let peak_hour = time
            .by_hour
            .iter()
            .enumerate()
            .max_by_key(|(_, count)| **count)
            .map(|(hour, _)| hour)
            .unwrap_or(0);
        insights.push(Insight {
            kind: InsightKind::Info,
            title: "Peak email hour".to_string(),
            description: format!("Most mail arrives around {}", hour_label(peak_hour)),
            priority: InsightPriority::Low,
            category: InsightCategory::Productivity,
            action: None,
        });
    }

    if stats.total_emails > 0 {
        let unread_ratio = stats.unread_emails as f64 / stats.total_emails as f64;
        if unread_ratio > 0.3 {
            insights.push(Insight {
                kind: InsightKind::Warning,
                title: "Most mail goes unread".to_string(),
                description: format!(
                    "{:.0}% of this mailbox is unread",
                    unread_ratio * 100.0
                ),
                priority: InsightPriority::Medium,
                category: InsightCategory::Productivity,
                action: None,
            });
        }
    }

    if patterns.suspicious > 5 {
        insights.push(Insight {
            kind: InsightKind::Warning,
            title: "Possible phishing attempts".to_string(),
            description: format!(
                "{} messages match common phishing indicators; review before clicking anything",
                patterns.suspicious
            ),
            priority: InsightPriority::High,
            category: InsightCategory::Security,
            action: None,
        });
    }

    let insights = rank(insights);
    let score = health_score(stats, &patterns);

    debug!(
        insights = insights.len(),
        cleanliness = score.cleanliness,
        "analysis complete"
    );

    AnalysisReport {
        insights,
        stats: *stats,
        score,
        patterns,
        top_senders,
        time,
    }
}

/// Stats-only quick path, used when no message collection is on hand
/// (and by the local AI provider to phrase its recommendations).
pub fn generate_cleanup_insights(stats: &InboxStats) -> Vec<Insight> {
    let mut insights = Vec::new();

    if stats.unread_emails > 100 {
        insights.push(Insight {
            kind: InsightKind::Recommendation,
            title: "Tackle the unread pile".to_string(),
            description: format!(
                "{} unread emails; archiving or marking old mail read will restore signal",
                stats.unread_emails
            ),
            priority: InsightPriority::High,
            category: InsightCategory::Cleanup,
            action: Some(SuggestedAction {
                label: "Mark old unread mail as read".to_string(),
                action: ActionKind::MarkRead,
                query: Some(query::unread()),
            }),
        });
    }

    if stats.newsletters > 50 {
        insights.push(Insight {
            kind: InsightKind::Recommendation,
            title: "Heavy newsletter volume".to_string(),
            description: format!(
                "{} newsletters tracked; unsubscribe from the ones you skip",
                stats.newsletters
            ),
            priority: InsightPriority::Medium,
            category: InsightCategory::Cleanup,
            action: Some(SuggestedAction {
                label: "Sweep newsletters".to_string(),
                action: ActionKind::Unsubscribe,
                query: Some(query::newsletters()),
            }),
        });
    }

    if stats.total_emails > 0 {
        let unread_ratio = stats.unread_emails as f64 / stats.total_emails as f64;
        if unread_ratio > 0.3 {
            insights.push(Insight {
                kind: InsightKind::Warning,
                title: "Most mail goes unread".to_string(),
                description: format!(
                    "{:.0}% of this mailbox is unread",
                    unread_ratio * 100.0
                ),
                priority: InsightPriority::Medium,
                category: InsightCategory::Productivity,
                action: None,
            });
        }
    }

    rank(insights)
}

/// Pattern sub-analysis: newsletter, age, size and duplicate counts.
pub fn pattern_summary(messages: &[EmailMessage], now: DateTime<Utc>) -> PatternSummary {
    let cutoff = now - Duration::days(OLD_EMAIL_CUTOFF_DAYS);

    let mut summary = PatternSummary::default();
    let mut distinct: HashSet<String> = HashSet::new();

    for message in messages {
        if is_newsletter(message) {
            summary.newsletters += 1;
            if message.is_unread {
                summary.unread_newsletters += 1;
            }
        }
        if message.date < cutoff {
            summary.old_emails += 1;
        }
        if message.size_estimate > LARGE_EMAIL_BYTES {
            summary.large_emails += 1;
        }
        if is_suspicious(message) {
            summary.suspicious += 1;
        }

        let key = format!(
            "{}:{}",
            message.sender.to_lowercase(),
            message.subject.to_lowercase()
        );
        distinct.insert(key);
    }

    summary.duplicates = messages.len() - distinct.len();
    summary
}

/// Sender sub-analysis: top senders by total count with unread counts.
pub fn sender_analysis(messages: &[EmailMessage]) -> Vec<SenderStats> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();

    for message in messages {
        let entry = counts.entry(message.sender.to_lowercase()).or_insert((0, 0));
        entry.0 += 1;
        if message.is_unread {
            entry.1 += 1;
        }
    }

    let mut senders: Vec<SenderStats> = counts
        .into_iter()
        .map(|(sender, (total, unread))| SenderStats {
            sender,
            total,
            unread,
        })
        .collect();

    senders.sort_by(|a, b| b.total.cmp(&a.total).then(a.sender.cmp(&b.sender)));
    senders.truncate(TOP_SENDER_COUNT);
    senders
}

/// Time sub-analysis: day-of-week and hour-of-day histograms.
pub fn time_analysis(messages: &[EmailMessage]) -> TimeHistogram {
    let mut time = TimeHistogram::default();

    for message in messages {
        let weekday = message.date.weekday().num_days_from_monday() as usize;
        time.by_weekday[weekday] += 1;
        time.by_hour[message.date.hour() as usize] += 1;
    }

    time
}

/// Health scores per the documented formulas, each clamped to [0, 100].
pub fn health_score(stats: &InboxStats, patterns: &PatternSummary) -> HealthScore {
    let total = stats.total_emails.max(1) as f64;

    let unread_ratio = stats.unread_emails as f64 / total;
    let old_ratio = patterns.old_emails as f64 / total;
    let duplicate_ratio = patterns.duplicates as f64 / total;
    let unread_newsletter_ratio = if stats.newsletters > 0 {
        patterns.unread_newsletters as f64 / stats.newsletters as f64
    } else {
        0.0
    };

    let cleanliness = 100.0 - unread_ratio * 50.0 - old_ratio * 30.0;
    let organization = 100.0 - unread_newsletter_ratio * 40.0 - duplicate_ratio * 20.0;
    let productivity = 100.0 - stats.unread_emails as f64 / 100.0;

    HealthScore {
        cleanliness: cleanliness.clamp(0.0, 100.0).round() as u32,
        organization: organization.clamp(0.0, 100.0).round() as u32,
        productivity: productivity.clamp(0.0, 100.0).round() as u32,
    }
}

/// Stable descending-priority sort, capped to the insight limit.
fn rank(mut insights: Vec<Insight>) -> Vec<Insight> {
    insights.sort_by(|a, b| b.priority.cmp(&a.priority));
    insights.truncate(MAX_INSIGHTS);
    insights
}

/// 12-hour clock label for an hour-of-day bucket.
fn hour_label(hour: usize) -> String {
    match hour {
        0 => "12 AM".to_string(),
        1..=11 => format!("{} AM", hour),
        12 => "12 PM".to_string(),
        _ => format!("{} PM", hour - 12),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_message(id: &str, sender: &str, subject: &str) -> EmailMessage {
        EmailMessage {
            id: id.to_string(),
            thread_id: format!("t-{}", id),
            subject: subject.to_string(),
            sender: sender.to_string(),
            recipient: "me@example.com".to_string(),
            date: Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap(),
            snippet: String::new(),
            is_unread: false,
            labels: vec![],
            size_estimate: 2048,
            is_newsletter: false,
            unsubscribe_link: None,
            list_unsubscribe: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_duplicate_detection() {
        let messages = vec![
            base_message("1", "a@x.com", "Hi"),
            base_message("2", "a@x.com", "Hi"),
            base_message("3", "b@x.com", "Hi"),
        ];

        let patterns = pattern_summary(&messages, now());
        assert_eq!(patterns.duplicates, 1);
    }

    #[test]
    fn test_duplicate_keys_case_insensitive() {
        let messages = vec![
            base_message("1", "A@X.com", "HI"),
            base_message("2", "a@x.com", "hi"),
        ];
        let patterns = pattern_summary(&messages, now());
        assert_eq!(patterns.duplicates, 1);
    }

    #[test]
    fn test_old_and_large_counting() {
        let mut old = base_message("1", "a@x.com", "old one");
        old.date = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut large = base_message("2", "b@x.com", "big one");
        large.size_estimate = 6_000_000;
        let plain = base_message("3", "c@x.com", "normal");

        let patterns = pattern_summary(&[old, large, plain], now());
        assert_eq!(patterns.old_emails, 1);
        assert_eq!(patterns.large_emails, 1);
    }

    #[test]
    fn test_sender_analysis_top_ordering() {
        let mut messages = Vec::new();
        for i in 0..5 {
            let mut m = base_message(&format!("a{}", i), "heavy@x.com", &format!("s{}", i));
            m.is_unread = i % 2 == 0;
            messages.push(m);
        }
        messages.push(base_message("b", "light@x.com", "one off"));

        let senders = sender_analysis(&messages);
        assert_eq!(senders[0].sender, "heavy@x.com");
        assert_eq!(senders[0].total, 5);
        assert_eq!(senders[0].unread, 3);
        assert_eq!(senders[1].total, 1);
    }

    #[test]
    fn test_time_histograms() {
        let mut monday = base_message("1", "a@x.com", "s");
        monday.date = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(); // Monday
        let mut sunday = base_message("2", "b@x.com", "s2");
        sunday.date = Utc.with_ymd_and_hms(2026, 3, 8, 23, 0, 0).unwrap(); // Sunday

        let time = time_analysis(&[monday, sunday]);
        assert_eq!(time.by_weekday[0], 1);
        assert_eq!(time.by_weekday[6], 1);
        assert_eq!(time.by_hour[9], 1);
        assert_eq!(time.by_hour[23], 1);
    }

    #[test]
    fn test_insights_capped_and_sorted() {
        // Build a mailbox that trips every rule at once.
        let mut messages = Vec::new();
        for i in 0..60 {
            let mut m = base_message(&format!("n{}", i), "noreply@news.com", &format!("issue {}", i));
            m.is_unread = true;
            messages.push(m);
        }
        for i in 0..25 {
            let mut m = base_message(&format!("l{}", i), &format!("s{}@x.com", i), "attachment");
            m.size_estimate = 10_000_000;
            messages.push(m);
        }
        for i in 0..12 {
            messages.push(base_message(&format!("d{}", i), "dup@x.com", "same subject"));
        }
        for i in 0..7 {
            messages.push(base_message(
                &format!("p{}", i),
                &format!("alert@phish{}.tk", i),
                "urgent: verify account",
            ));
        }

        let stats = InboxStats {
            total_emails: 2000,
            unread_emails: 1500,
            newsletters: 80,
        };

        let report = analyze_at(&messages, &stats, now());
        assert!(report.insights.len() <= 10);
        for pair in report.insights.windows(2) {
            assert!(pair[0].priority >= pair[1].priority);
        }
        // High-priority findings present: unread backlog, newsletters, phishing.
        let high = report
            .insights
            .iter()
            .filter(|i| i.priority == InsightPriority::High)
            .count();
        assert!(high >= 3);
    }

    #[test]
    fn test_scores_within_bounds() {
        let stats = InboxStats {
            total_emails: 100,
            unread_emails: 100,
            newsletters: 10,
        };
        let patterns = PatternSummary {
            newsletters: 10,
            unread_newsletters: 10,
            old_emails: 100,
            large_emails: 0,
            duplicates: 100,
            suspicious: 0,
        };
        let score = health_score(&stats, &patterns);
        assert!(score.cleanliness <= 100);
        assert!(score.organization <= 100);
        assert!(score.productivity <= 100);
    }

    #[test]
    fn test_cleanup_scenario_scores_and_insights() {
        let stats = InboxStats {
            total_emails: 1000,
            unread_emails: 600,
            newsletters: 200,
        };

        let insights = generate_cleanup_insights(&stats);
        let has_unread_high = insights.iter().any(|i| {
            i.priority == InsightPriority::High && i.title.to_lowercase().contains("unread")
        });
        assert!(has_unread_high);
        let has_productivity_warning = insights.iter().any(|i| {
            i.category == InsightCategory::Productivity && i.kind == InsightKind::Warning
        });
        assert!(has_productivity_warning);

        // No old mail in the collection: cleanliness = 100 - 0.6*50 - 0*30.
        let patterns = PatternSummary::default();
        let score = health_score(&stats, &patterns);
        assert_eq!(score.cleanliness, 70);
        assert_eq!(score.productivity, 94);
    }

    #[test]
    fn test_empty_mailbox_analysis() {
        let report = analyze_at(&[], &InboxStats::default(), now());
        assert!(report.insights.is_empty());
        assert_eq!(report.patterns.duplicates, 0);
        assert_eq!(report.score.productivity, 100);
    }

    #[test]
    fn test_hour_labels() {
        assert_eq!(hour_label(0), "12 AM");
        assert_eq!(hour_label(9), "9 AM");
        assert_eq!(hour_label(12), "12 PM");
        assert_eq!(hour_label(15), "3 PM");
        assert_eq!(hour_label(23), "11 PM");
    }
}
