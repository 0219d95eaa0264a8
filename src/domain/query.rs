//! Free-form query classification.
//!
//! The query endpoints accept either an email address or a company name;
//! this module decides which, and derives a searchable company name from an
//! email domain.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
    })
}

/// What a piece of user input turned out to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Email,
    CompanyName,
    Unknown,
}

/// Validation outcome for a query string.
#[derive(Clone, Debug, Serialize)]
pub struct ValidatedInput {
    pub input: String,
    pub is_valid: bool,
    #[serde(rename = "type")]
    pub kind: InputKind,
    pub cleaned_input: String,
}

/// Classify input as an email or a company name.
pub fn validate_input(user_input: &str) -> ValidatedInput {
    let cleaned = user_input.trim().to_string();

    let mut result = ValidatedInput {
        input: user_input.to_string(),
        is_valid: false,
        kind: InputKind::Unknown,
        cleaned_input: cleaned.clone(),
    };

    if cleaned.is_empty() {
        return result;
    }

    if email_re().is_match(&cleaned) {
        result.is_valid = true;
        result.kind = InputKind::Email;
        return result;
    }

    // Company name: at least 2 chars and not just digits
    let digits_only = cleaned
        .chars()
        .filter(|c| !c.is_whitespace())
        .all(|c| c.is_ascii_digit());
    if cleaned.chars().count() >= 2 && !digits_only {
        result.is_valid = true;
        result.kind = InputKind::CompanyName;
    }

    result
}

/// Domains that can never identify a company: mail providers, directories,
/// search engines, throwaway-mail services, free hosting.
const REJECTED_DOMAINS: [&str; 44] = [
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "aol.com",
    "icloud.com",
    "protonmail.com",
    "zoho.com",
    "yandex.com",
    "mail.com",
    "gmx.com",
    "hubspot.com",
    "allabolag.se",
    "hitta.se",
    "eniro.se",
    "merinfo.se",
    "ratsit.se",
    "birthday.se",
    "solidtango.com",
    "google.com",
    "bing.com",
    "duckduckgo.com",
    "facebook.com",
    "linkedin.com",
    "twitter.com",
    "instagram.com",
    "microsoft.com",
    "apple.com",
    "example.com",
    "test.com",
    "domain.com",
    "localhost",
    "student.lnu.se",
    "edu.se",
    "skola.se",
    "gov.se",
    "kommun.se",
    "region.se",
    "tempmail.com",
    "10minutemail.com",
    "guerrillamail.com",
    "mailinator.com",
    "throwawaymail.com",
    "wordpress.com",
];

/// Whether a domain can plausibly belong to an actual company.
pub fn valid_domain(domain: &str) -> bool {
    !REJECTED_DOMAINS
        .iter()
        .any(|rejected| domain.contains(rejected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        let result = validate_input("anna.larsson@acme.se");
        assert!(result.is_valid);
        assert_eq!(result.kind, InputKind::Email);
    }

    #[test]
    fn test_validate_company_name() {
        let result = validate_input("  Acme Industrier AB ");
        assert!(result.is_valid);
        assert_eq!(result.kind, InputKind::CompanyName);
        assert_eq!(result.cleaned_input, "Acme Industrier AB");
    }

    #[test]
    fn test_reject_digits_and_empty() {
        assert!(!validate_input("556677 8899").is_valid);
        assert!(!validate_input("").is_valid);
        assert!(!validate_input("   ").is_valid);
        assert!(!validate_input("x").is_valid);
    }

    #[test]
    fn test_valid_domain() {
        assert!(valid_domain("volvo.se"));
        assert!(!valid_domain("gmail.com"));
        assert!(!valid_domain("mail.gmail.com"));
        assert!(!valid_domain("allabolag.se"));
    }
}
