//! Indicator type detection for raw query strings.
//!
//! Classification is ordered and first-match:
//!
//! | Order | Shape | Result |
//! |-------|-------|--------|
//! | 1 | 32/40/64 hex chars (MD5, SHA-1, SHA-256) | [`QueryType::Hash`] |
//! | 2 | `http://` or `https://` prefix | [`QueryType::Url`] |
//! | 3 | numeric dotted quad | [`QueryType::Ip`] |
//! | 4 | `local@domain.tld` | [`QueryType::Email`] |
//! | 5 | `label.label.tld` | [`QueryType::Domain`] |
//! | - | anything else | [`QueryType::Unknown`] |
//!
//! The order resolves overlaps: `8.8.8.8` is also domain-shaped and must
//! stay an IP, and a 40-char hex digest must never fall through to domain.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::QueryType;

static HASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[a-fA-F0-9]{32}|[a-fA-F0-9]{40}|[a-fA-F0-9]{64})$").unwrap());

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^https?://").unwrap());

static IP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[0-9]{1,3}\.){3}[0-9]{1,3}$").unwrap());

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z0-9][a-z0-9-]{0,61}[a-z0-9]$")
        .unwrap()
});

/// Classify a raw query string into an indicator type.
///
/// Surrounding whitespace is ignored. Never returns [`QueryType::Auto`].
///
/// ```rust
/// use osint_harness_core::classify::classify;
/// use osint_harness_core::models::QueryType;
///
/// assert_eq!(classify("8.8.8.8"), QueryType::Ip);
/// assert_eq!(classify("a@b.com"), QueryType::Email);
/// assert_eq!(classify("###"), QueryType::Unknown);
/// ```
pub fn classify(raw: &str) -> QueryType {
    let s = raw.trim();
    if s.is_empty() {
        return QueryType::Unknown;
    }

    if HASH_RE.is_match(s) {
        QueryType::Hash
    } else if URL_RE.is_match(s) {
        QueryType::Url
    } else if IP_RE.is_match(s) {
        QueryType::Ip
    } else if EMAIL_RE.is_match(s) {
        QueryType::Email
    } else if DOMAIN_RE.is_match(s) {
        QueryType::Domain
    } else {
        QueryType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_indicators() {
        assert_eq!(classify("8.8.8.8"), QueryType::Ip);
        assert_eq!(classify("example.com"), QueryType::Domain);
        assert_eq!(classify("a@b.com"), QueryType::Email);
        assert_eq!(classify("http://x.com"), QueryType::Url);
        assert_eq!(classify("###"), QueryType::Unknown);
    }

    #[test]
    fn test_hash_lengths() {
        assert_eq!(classify(&"a".repeat(32)), QueryType::Hash);
        assert_eq!(classify(&"B".repeat(40)), QueryType::Hash);
        assert_eq!(
            classify("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"),
            QueryType::Hash
        );
        // 33 hex chars is no digest length
        assert_eq!(classify(&"a".repeat(33)), QueryType::Unknown);
    }

    #[test]
    fn test_url_is_case_insensitive_and_needs_scheme() {
        assert_eq!(classify("HTTPS://Example.com/path?q=1"), QueryType::Url);
        assert_eq!(classify("ftp://example.com"), QueryType::Unknown);
    }

    #[test]
    fn test_ip_wins_over_domain() {
        assert_eq!(classify("192.0.2.1"), QueryType::Ip);
        // octet range is not validated, only the numeric shape
        assert_eq!(classify("999.1.1.1"), QueryType::Ip);
        // single-char TLD is neither
        assert_eq!(classify("1.2.3"), QueryType::Unknown);
    }

    #[test]
    fn test_email_before_domain() {
        assert_eq!(classify("analyst@mail.example.org"), QueryType::Email);
        assert_eq!(classify("first.last+tag@corp.io"), QueryType::Email);
    }

    #[test]
    fn test_domain_shapes() {
        assert_eq!(classify("sub.example.co.uk"), QueryType::Domain);
        assert_eq!(classify("EXAMPLE.COM"), QueryType::Domain);
        assert_eq!(classify("-bad.com"), QueryType::Unknown);
        assert_eq!(classify("localhost"), QueryType::Unknown);
    }

    #[test]
    fn test_whitespace_and_empty() {
        assert_eq!(classify("  example.com\n"), QueryType::Domain);
        assert_eq!(classify(""), QueryType::Unknown);
        assert_eq!(classify("   "), QueryType::Unknown);
    }
}
