//! Contact details harvested from company websites.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An email address with the exact page it was found on and, when the page
/// names a person next to it, who it belongs to.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmailContact {
    pub email: String,
    /// Exact page URL the email was extracted from
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    /// Job title (CEO, CTO, ...) detected near the email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl EmailContact {
    pub fn new(email: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            source: source.into(),
            firstname: None,
            lastname: None,
            role: None,
        }
    }
}

/// A phone number with the exact page it was found on.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PhoneContact {
    pub phone: String,
    pub source: String,
}

impl PhoneContact {
    pub fn new(phone: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            source: source.into(),
        }
    }
}

/// Platform name -> profile URLs. Ordered so responses are stable.
pub type SocialMediaLinks = BTreeMap<String, Vec<String>>;

/// Contact block of a company profile.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScrapedContacts {
    #[serde(rename = "Emails")]
    pub emails: Vec<EmailContact>,
    #[serde(rename = "Phones")]
    pub phones: Vec<PhoneContact>,
    #[serde(rename = "SocialMedia")]
    pub social_media: SocialMediaLinks,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_contact_serializes_without_empty_person_fields() {
        let contact = EmailContact::new("info@acme.se", "https://acme.se/contact");
        let json = serde_json::to_value(&contact).unwrap();
        assert_eq!(json["email"], "info@acme.se");
        assert!(json.get("role").is_none());
    }
}
