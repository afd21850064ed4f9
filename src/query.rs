//! Provider search query fragments
//!
//! The core never parses provider queries; it only assembles fragments in
//! the exact substring forms the mailbox provider expects and joins them
//! for its own housekeeping searches (old-mail archiving, large-mail
//! discovery, newsletter sweeps).

use chrono::{DateTime, Utc};

use crate::classifier::NEWSLETTER_INDICATORS;

/// `before:YYYY/MM/DD` cutoff fragment.
pub fn before(date: DateTime<Utc>) -> String {
    format!("before:{}", date.format("%Y/%m/%d"))
}

/// `is:unread` fragment.
pub fn unread() -> String {
    "is:unread".to_string()
}

/// `has:list` fragment (messages carrying a List-Unsubscribe header).
pub fn has_list() -> String {
    "has:list".to_string()
}

/// `larger:NM` fragment. The provider syntax takes whole megabytes;
/// sub-megabyte thresholds round up to 1M.
pub fn larger(bytes: u64) -> String {
    let megabytes = (bytes / 1_000_000).max(1);
    format!("larger:{}M", megabytes)
}

/// `from:(sender)` fragment.
pub fn from_sender(sender: &str) -> String {
    format!("from:({})", sender)
}

/// Join fragments with the provider's implicit AND (space).
pub fn and(parts: &[String]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Newsletter sweep query: the List-Unsubscribe header check OR'd with
/// sender indicators from the classifier's shared term list.
pub fn newsletters() -> String {
    let senders = NEWSLETTER_INDICATORS
        .iter()
        .map(|ind| format!("from:({})", ind))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("{} OR {}", has_list(), senders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_before_format() {
        let date = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(before(date), "before:2026/03/09");
    }

    #[test]
    fn test_exact_fragment_forms() {
        assert_eq!(unread(), "is:unread");
        assert_eq!(has_list(), "has:list");
        assert_eq!(larger(5_000_000), "larger:5M");
        assert_eq!(larger(10_000_000), "larger:10M");
    }

    #[test]
    fn test_larger_rounds_up_small_thresholds() {
        assert_eq!(larger(100), "larger:1M");
    }

    #[test]
    fn test_and_joins_with_spaces() {
        let q = and(&[unread(), "before:2026/01/01".to_string()]);
        assert_eq!(q, "is:unread before:2026/01/01");
    }

    #[test]
    fn test_and_skips_empty_fragments() {
        let q = and(&[String::new(), unread()]);
        assert_eq!(q, "is:unread");
    }

    #[test]
    fn test_newsletter_query_includes_header_check() {
        let q = newsletters();
        assert!(q.starts_with("has:list OR "));
        assert!(q.contains("from:(noreply)"));
        assert!(q.contains("from:(digest)"));
    }
}
