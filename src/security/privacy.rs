//! PII redaction for text leaving the machine.
//!
//! Applied to prompts only when the router chose the cloud backend and the
//! request did not opt out. Local traffic is never scrubbed. The patterns
//! are deliberately blunt; false positives are acceptable, leaks are not.

use regex::Regex;
use std::sync::LazyLock;

/// Compiled redaction patterns, applied in declaration order.
struct RedactionPatterns {
    ssn: Regex,
    card: Regex,
    password: Regex,
    email: Regex,
}

static REDACTIONS: LazyLock<RedactionPatterns> = LazyLock::new(|| RedactionPatterns {
    ssn: Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap(),
    card: Regex::new(r"\b\d{4}[- ]?\d{4}[- ]?\d{4}[- ]?\d{4}\b").unwrap(),
    password: Regex::new(r"(?i)\b(?:pass(?:word)?|pwd)\b[:=]?\s*\S+").unwrap(),
    email: Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap(),
});

/// Replace every PII match with its category token.
pub fn scrub_text(text: &str) -> String {
    let p = &*REDACTIONS;
    let cleaned = p.ssn.replace_all(text, "[SSN]");
    let cleaned = p.card.replace_all(&cleaned, "[CARD]");
    let cleaned = p.password.replace_all(&cleaned, "[PASSWORD]");
    let cleaned = p.email.replace_all(&cleaned, "[EMAIL]");
    cleaned.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrubs_ssn() {
        assert_eq!(scrub_text("my ssn is 123-45-6789 ok"), "my ssn is [SSN] ok");
    }

    #[test]
    fn scrubs_card_number_variants() {
        assert_eq!(scrub_text("card 4111111111111111"), "card [CARD]");
        assert_eq!(scrub_text("card 4111-1111-1111-1111"), "card [CARD]");
        assert_eq!(scrub_text("card 4111 1111 1111 1111"), "card [CARD]");
    }

    #[test]
    fn scrubs_password_assignments() {
        assert_eq!(scrub_text("password: hunter2"), "[PASSWORD]");
        assert_eq!(scrub_text("PWD=s3cret rest"), "[PASSWORD] rest");
        assert_eq!(scrub_text("my pass abc123"), "my [PASSWORD]");
    }

    #[test]
    fn scrubs_email() {
        assert_eq!(
            scrub_text("mail me at someone@example.com please"),
            "mail me at [EMAIL] please"
        );
    }

    #[test]
    fn clean_text_passes_through() {
        let text = "open firefox and check the weather";
        assert_eq!(scrub_text(text), text);
    }

    #[test]
    fn multiple_categories_in_one_text() {
        let out = scrub_text("ssn 123-45-6789 email a@b.co password: x");
        assert!(out.contains("[SSN]"));
        assert!(out.contains("[EMAIL]"));
        assert!(out.contains("[PASSWORD]"));
        assert!(!out.contains("123-45-6789"));
    }
}
