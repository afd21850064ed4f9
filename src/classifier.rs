//! Rule-based email classification
//!
//! Pure keyword/regex matching over message metadata. Categories are
//! resolved in a fixed priority order; a message matching several rule
//! sets always gets the first match, never a combination.

use crate::models::{EmailCategory, EmailMessage};
use once_cell::sync::Lazy;
use regex::Regex;

/// Indicators of bulk/subscription mail, matched against sender or subject.
/// Shared verbatim with the local AI provider and search query builders.
pub static NEWSLETTER_INDICATORS: &[&str] = &[
    "newsletter",
    "noreply",
    "no-reply",
    "donotreply",
    "marketing",
    "promo",
    "unsubscribe",
    "digest",
    "weekly",
    "monthly",
    "updates",
];

/// Phishing-looking subject/sender phrases.
static SUSPICIOUS_PHRASES: &[&str] = &[
    "urgent",
    "verify account",
    "suspended",
    "click here",
    "limited time",
    "act now",
    "confirm identity",
];

/// TLDs disproportionately used by throwaway phishing domains.
static SUSPICIOUS_TLDS: &[&str] = &[".tk", ".ml"];

struct CategoryPatterns {
    promotional: Regex,
    work: Regex,
    social: Regex,
    transactional: Regex,
    automated_sender: Regex,
    digit_run: Regex,
}

static PATTERNS: Lazy<CategoryPatterns> = Lazy::new(|| CategoryPatterns {
    promotional: Regex::new(
        r"(?i)(sale|discount|offer|deal|coupon|% off|limited time|exclusive|save now|flash sale|clearance)",
    )
    .unwrap(),

    work: Regex::new(
        r"(?i)(meeting|project|deadline|standup|sprint|review request|proposal|contract|agenda|timesheet|quarterly)",
    )
    .unwrap(),

    social: Regex::new(
        r"(?i)(friend request|followed you|mentioned you|commented on|liked your|tagged you|connection request|facebook|twitter|linkedin|instagram)",
    )
    .unwrap(),

    transactional: Regex::new(
        r"(?i)(receipt|invoice|order confirmation|payment|shipped|out for delivery|tracking number|booking|statement|verification code|password reset)",
    )
    .unwrap(),

    automated_sender: Regex::new(
        r"(?i)(noreply|no-reply|donotreply|do-not-reply|notifications?@|mailer|automated|robot|system@)",
    )
    .unwrap(),

    digit_run: Regex::new(r"\d{5,}").unwrap(),
});

/// Haystack length below which a non-automated message can still count as
/// personal correspondence.
const PERSONAL_TEXT_LIMIT: usize = 300;

/// Classify a message into its semantic category.
///
/// Deterministic and free of I/O. Rules are evaluated against the
/// lowercased subject + sender + snippet; the first category to match in
/// priority order (newsletter, promotional, work, social, transactional,
/// personal) wins, with `Other` as the terminal fallback.
pub fn classify(message: &EmailMessage) -> EmailCategory {
    if is_newsletter(message) {
        return EmailCategory::Newsletter;
    }

    let haystack = format!(
        "{} {} {}",
        message.subject.to_lowercase(),
        message.sender.to_lowercase(),
        message.snippet.to_lowercase()
    );

    if PATTERNS.promotional.is_match(&haystack) {
        return EmailCategory::Promotional;
    }
    if PATTERNS.work.is_match(&haystack) {
        return EmailCategory::Work;
    }
    if PATTERNS.social.is_match(&haystack) {
        return EmailCategory::Social;
    }
    if PATTERNS.transactional.is_match(&haystack) {
        return EmailCategory::Transactional;
    }

    // Personal only applies to short, human-looking mail with no
    // unsubscribe indicators at all.
    if haystack.len() < PERSONAL_TEXT_LIMIT
        && !PATTERNS.automated_sender.is_match(&message.sender)
        && message.list_unsubscribe.is_none()
        && message.unsubscribe_link.is_none()
    {
        return EmailCategory::Personal;
    }

    EmailCategory::Other
}

/// Dedicated newsletter predicate, independent from [`classify`].
///
/// True when the sender or subject carries any newsletter indicator, or
/// when the message advertises an unsubscribe path via header or link.
pub fn is_newsletter(message: &EmailMessage) -> bool {
    if message.list_unsubscribe.is_some() || message.unsubscribe_link.is_some() {
        return true;
    }

    let sender = message.sender.to_lowercase();
    let subject = message.subject.to_lowercase();

    NEWSLETTER_INDICATORS
        .iter()
        .any(|ind| sender.contains(ind) || subject.contains(ind))
}

/// Phishing-indicator heuristic consumed by the insight generator.
pub fn is_suspicious(message: &EmailMessage) -> bool {
    let subject = message.subject.to_lowercase();
    let sender = message.sender.to_lowercase();

    if SUSPICIOUS_PHRASES
        .iter()
        .any(|p| subject.contains(p) || sender.contains(p))
    {
        return true;
    }

    if let Some(domain) = sender_domain(&message.sender) {
        if SUSPICIOUS_TLDS.iter().any(|tld| domain.ends_with(tld)) {
            return true;
        }
        if PATTERNS.digit_run.is_match(&domain) {
            return true;
        }
    }

    false
}

/// Extract the sender domain: the substring after `@` up to the first `>`
/// or end of string, lowercased. Returns None when no `@` is present.
pub(crate) fn sender_domain(sender: &str) -> Option<String> {
    let after_at = sender.split('@').nth(1)?;
    let domain = match after_at.find('>') {
        Some(pos) => &after_at[..pos],
        None => after_at,
    };
    let domain = domain.trim();
    if domain.is_empty() {
        None
    } else {
        Some(domain.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(sender: &str, subject: &str, snippet: &str) -> EmailMessage {
        EmailMessage {
            id: "test-id".to_string(),
            thread_id: "thread-id".to_string(),
            subject: subject.to_string(),
            sender: sender.to_string(),
            recipient: "me@example.com".to_string(),
            date: Utc::now(),
            snippet: snippet.to_string(),
            is_unread: false,
            labels: vec![],
            size_estimate: 1024,
            is_newsletter: false,
            unsubscribe_link: None,
            list_unsubscribe: None,
        }
    }

    #[test]
    fn test_newsletter_indicators_in_sender() {
        let msg = message("noreply@shop.com", "Your week in review", "");
        assert!(is_newsletter(&msg));
        assert_eq!(classify(&msg), EmailCategory::Newsletter);
    }

    #[test]
    fn test_newsletter_indicators_in_subject() {
        let msg = message("team@startup.io", "Monthly digest: what changed", "");
        assert!(is_newsletter(&msg));
    }

    #[test]
    fn test_unsubscribe_header_forces_newsletter() {
        let mut msg = message("alerts@bank.com", "Security notice", "");
        assert!(!is_newsletter(&msg));
        msg.list_unsubscribe = Some("<https://bank.com/unsub>".to_string());
        assert!(is_newsletter(&msg));
        assert_eq!(classify(&msg), EmailCategory::Newsletter);
    }

    #[test]
    fn test_promotional_classification() {
        let msg = message("deals@store.com", "Flash sale: 50% off everything", "");
        assert_eq!(classify(&msg), EmailCategory::Promotional);
    }

    #[test]
    fn test_work_classification() {
        let msg = message(
            "alice@company.com",
            "Project deadline moved to Friday",
            "see updated agenda",
        );
        assert_eq!(classify(&msg), EmailCategory::Work);
    }

    #[test]
    fn test_social_classification() {
        let msg = message(
            "notify@social.example",
            "Bob commented on your photo",
            "",
        );
        assert_eq!(classify(&msg), EmailCategory::Social);
    }

    #[test]
    fn test_transactional_classification() {
        let msg = message(
            "orders@shop.example",
            "Your order confirmation #8812",
            "tracking number inside",
        );
        assert_eq!(classify(&msg), EmailCategory::Transactional);
    }

    #[test]
    fn test_priority_order_newsletter_beats_promotional() {
        // Matches both the newsletter indicator list and promotional
        // keywords; declared priority order must win.
        let msg = message("promo@store.com", "Exclusive deal inside", "");
        assert_eq!(classify(&msg), EmailCategory::Newsletter);
    }

    #[test]
    fn test_personal_fallback() {
        let msg = message("jane@gmail.com", "Lunch tomorrow?", "see you at noon");
        assert_eq!(classify(&msg), EmailCategory::Personal);
    }

    #[test]
    fn test_personal_denied_for_automated_sender() {
        let msg = message("mailer@service.example", "hi", "");
        assert_eq!(classify(&msg), EmailCategory::Other);
    }

    #[test]
    fn test_suspicious_phrases() {
        let msg = message(
            "support@somebank.example",
            "URGENT: verify account now",
            "",
        );
        assert!(is_suspicious(&msg));
    }

    #[test]
    fn test_suspicious_tld() {
        let msg = message("winner@lottery.tk", "You won", "");
        assert!(is_suspicious(&msg));
    }

    #[test]
    fn test_suspicious_digit_run_domain() {
        let msg = message("info@secure83714.example", "Notice", "");
        assert!(is_suspicious(&msg));
    }

    #[test]
    fn test_not_suspicious_plain_mail() {
        let msg = message("jane@gmail.com", "Lunch tomorrow?", "");
        assert!(!is_suspicious(&msg));
    }

    #[test]
    fn test_sender_domain_extraction() {
        assert_eq!(
            sender_domain("Jane <jane@Foo.COM>"),
            Some("foo.com".to_string())
        );
        assert_eq!(sender_domain("bob@bar.com"), Some("bar.com".to_string()));
        assert_eq!(sender_domain("not-an-address"), None);
    }
}
