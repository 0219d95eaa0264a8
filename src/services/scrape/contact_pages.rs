//! Contact-page discovery and contact harvesting.
//!
//! Contact details carry the exact page URL they were found on; person
//! names come from the email local part, roles from keyword proximity in
//! the surrounding markup.

use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

use crate::domain::contact::{EmailContact, PhoneContact};

/// Link keywords that mark a page as contact/about material.
const CONTACT_KEYWORDS: [&str; 19] = [
    // English
    "contact",
    "contact-us",
    "contact_us",
    "contactus",
    "about",
    "about-us",
    "about_us",
    "aboutus",
    "reach-us",
    "get-in-touch",
    // Swedish
    "kontakt",
    "kontakta-oss",
    "kontakta_oss",
    "om-oss",
    "om_oss",
    "omoss",
    "om",
    "hitta-oss",
    "kontaktaoss",
];

/// Pages that match a keyword but are almost never contact pages.
const SKIP_PATTERNS: [&str; 15] = [
    "client", "customer", "case", "story", "news", "blog", "article", "product", "service",
    "solution", "partner", "career", "job", "login", "register",
];

/// Generic mailbox prefixes that are not personal names.
const GENERIC_PREFIXES: [&str; 27] = [
    "info",
    "hello",
    "contact",
    "support",
    "sales",
    "admin",
    "help",
    "mail",
    "office",
    "team",
    "general",
    "service",
    "inquiries",
    "inquiry",
    "welcome",
    "feedback",
    "careers",
    "jobs",
    "hr",
    "press",
    "media",
    "marketing",
    "webmaster",
    "postmaster",
    "hostmaster",
    "abuse",
    "security",
];

const ROLE_KEYWORDS: [(&str, &[&str]); 10] = [
    ("ceo", &["ceo", "chief executive officer", "vd", "verkställande direktör"]),
    ("cto", &["cto", "chief technology officer", "tekniskt ansvarig", "teknisk chef"]),
    ("cfo", &["cfo", "chief financial officer", "ekonomidirektör", "finansiell chef"]),
    ("coo", &["coo", "chief operating officer", "operativ chef"]),
    ("cmo", &["cmo", "chief marketing officer", "marknadschef"]),
    ("founder", &["founder", "grundare", "co-founder", "medgrundare"]),
    ("director", &["director", "direktör", "managing director"]),
    ("manager", &["manager", "chef", "ledare"]),
    ("head", &["head of", "chef för", "ansvarig för"]),
    ("lead", &["lead", "senior lead"]),
];

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector")
}

/// Everything one page yielded.
#[derive(Clone, Debug, Default)]
pub struct ContactHarvest {
    pub emails: Vec<EmailContact>,
    pub phones: Vec<PhoneContact>,
}

impl ContactHarvest {
    pub fn merge(&mut self, other: ContactHarvest) {
        self.emails.extend(other.emails);
        self.phones.extend(other.phones);
    }

    /// Drop duplicate emails/phones, keeping the first source seen.
    pub fn dedupe(&mut self) {
        let mut seen = HashSet::new();
        self.emails.retain(|e| seen.insert(e.email.clone()));
        let mut seen = HashSet::new();
        self.phones.retain(|p| seen.insert(p.phone.clone()));
    }
}

/// Find contact/about pages linked from the homepage.
///
/// Keywords must match a full path segment or a whole word in the link text
/// so "about" does not fire on "aboutus-widget" style noise.
pub fn find_contact_pages(doc: &Html, base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };

    let mut pages = Vec::new();
    let mut seen = HashSet::new();

    for link in doc.select(&sel("a[href]")) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() {
            continue;
        }

        let Ok(full_url) = base.join(href) else {
            continue;
        };
        let url_path = full_url.path().to_lowercase();
        let url_path = url_path.trim_matches('/');
        let link_text = link.text().collect::<String>().to_lowercase();
        let href_lower = href.to_lowercase();

        let path_segments: Vec<&str> = url_path
            .split(['/', '-', '_'])
            .filter(|s| !s.is_empty())
            .collect();

        let matched_keyword = CONTACT_KEYWORDS.iter().find(|keyword| {
            path_segments.contains(&**keyword)
                || whole_word(&link_text, keyword)
                || whole_word(&href_lower, keyword)
        });

        let Some(matched_keyword) = matched_keyword else {
            continue;
        };

        let should_skip = SKIP_PATTERNS
            .iter()
            .any(|skip| url_path.contains(skip) && skip != matched_keyword);
        if should_skip {
            continue;
        }

        let url_string = full_url.to_string();
        if seen.insert(url_string.clone()) {
            pages.push(url_string);
        }
    }

    pages
}

fn whole_word(haystack: &str, needle: &str) -> bool {
    for (idx, _) in haystack.match_indices(needle) {
        let before_ok = idx == 0
            || !haystack[..idx]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
        let after = idx + needle.len();
        let after_ok = after >= haystack.len()
            || !haystack[after..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
    }
    false
}

fn is_homepage(source_url: &str) -> bool {
    let Ok(parsed) = Url::parse(source_url) else {
        return false;
    };
    matches!(
        parsed.path().to_lowercase().as_str(),
        "" | "/" | "/home" | "/index" | "/index.html" | "/index.php"
    )
}

/// Extract emails (with names and roles) and phones from one page.
pub fn harvest_page(html: &str, source_url: &str) -> ContactHarvest {
    let doc = Html::parse_document(html);

    let mut all_text: String = doc.root_element().text().collect::<Vec<_>>().join(" ");

    // mailto:/tel: hrefs count as text, but only off the homepage where they
    // tend to be genuine rather than boilerplate
    if !is_homepage(source_url) {
        for link in doc.select(&sel("a[href]")) {
            if let Some(href) = link.value().attr("href") {
                if href.starts_with("mailto:") || href.starts_with("tel:") {
                    all_text.push(' ');
                    all_text.push_str(href);
                }
            }
        }
    }

    ContactHarvest {
        emails: extract_emails(&all_text, source_url, &doc),
        phones: extract_phones(&all_text, source_url),
    }
}

fn email_patterns() -> &'static [Regex; 2] {
    static RES: OnceLock<[Regex; 2]> = OnceLock::new();
    RES.get_or_init(|| {
        [
            Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap(),
            Regex::new(r"mailto:([A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,})").unwrap(),
        ]
    })
}

fn extract_emails(text: &str, source_url: &str, doc: &Html) -> Vec<EmailContact> {
    const INVALID_MARKERS: [&str; 7] = [
        "example.com",
        "domain.com",
        "email@",
        "test@",
        "noreply@",
        "no-reply@",
        "donotreply@",
    ];

    let mut found = HashSet::new();
    let [plain_re, mailto_re] = email_patterns();
    for m in plain_re.find_iter(text) {
        found.insert(m.as_str().trim().to_lowercase());
    }
    for caps in mailto_re.captures_iter(text) {
        found.insert(caps[1].trim().to_lowercase());
    }

    let mut contacts = Vec::new();
    for email in found {
        if email.len() <= 5
            || !email.contains('.')
            || INVALID_MARKERS.iter().any(|invalid| email.contains(invalid))
        {
            continue;
        }

        let mut contact = EmailContact::new(email.clone(), source_url);

        let local = email.split('@').next().unwrap_or("");
        let parts: Vec<&str> = local.split('.').collect();
        if !GENERIC_PREFIXES.contains(&parts[0]) {
            if parts.len() >= 2 {
                contact.firstname = Some(capitalize(parts[0]));
                contact.lastname = Some(capitalize(parts[parts.len() - 1]));
            } else {
                contact.firstname = Some(capitalize(parts[0]));
            }
        }

        contact.role = detect_role_near_email(doc, &email);
        contacts.push(contact);
    }

    contacts.sort_by(|a, b| a.email.cmp(&b.email));
    contacts
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Look for a role keyword within a window around the email occurrence.
fn detect_role_near_email(doc: &Html, email: &str) -> Option<String> {
    let selector = sel("p, div, li, td, span, a, h1, h2, h3, h4, h5, h6");

    let mut holders = Vec::new();
    for element in doc.select(&selector) {
        let text = element.text().collect::<Vec<_>>().join(" ").to_lowercase();
        if text.contains(email) {
            holders.push((element, text));
        }
        if holders.len() >= 5 {
            break;
        }
    }

    for (element, text) in &holders {
        if let Some(pos) = text.find(email) {
            let start = pos.saturating_sub(100);
            let end = (pos + 100).min(text.len());
            // Stay on char boundaries for multi-byte Swedish text
            let start = (0..=start).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
            let end = (end..=text.len()).find(|i| text.is_char_boundary(*i)).unwrap_or(text.len());
            let context = &text[start..end];

            for (role, keywords) in ROLE_KEYWORDS {
                if keywords.iter().any(|k| context.contains(k)) {
                    return Some(role.to_uppercase());
                }
            }
        }

        // Parent element often carries the title when markup splits them
        if let Some(parent) = element.parent().and_then(scraper::ElementRef::wrap) {
            let parent_text = parent.text().collect::<Vec<_>>().join(" ").to_lowercase();
            for (role, keywords) in ROLE_KEYWORDS {
                if keywords.iter().any(|k| parent_text.contains(k)) {
                    return Some(role.to_uppercase());
                }
            }
        }
    }

    None
}

fn phone_patterns() -> &'static [Regex; 3] {
    static RES: OnceLock<[Regex; 3]> = OnceLock::new();
    RES.get_or_init(|| {
        [
            // International formats
            Regex::new(r"\+\d{1,4}[\s\-]?\d{1,4}[\s\-]?\d{1,4}[\s\-]?\d{1,4}[\s\-]?\d{1,4}")
                .unwrap(),
            Regex::new(r"\+\d{1,4}(?:\s?\(0\))?(?:[\s\-]?\d{1,4}){2,5}").unwrap(),
            // Swedish national format
            Regex::new(r"0(?:[\s\-]?\d){8,16}").unwrap(),
        ]
    })
}

fn extract_phones(text: &str, source_url: &str) -> Vec<PhoneContact> {
    let mut found = HashSet::new();
    for re in phone_patterns() {
        for m in re.find_iter(text) {
            found.insert(m.as_str().trim().to_string());
        }
    }

    let mut phones: Vec<PhoneContact> = found
        .into_iter()
        .filter(|phone| phone.chars().filter(|c| c.is_ascii_digit()).count() >= 7)
        .map(|phone| PhoneContact::new(phone, source_url))
        .collect();

    phones.sort_by(|a, b| a.phone.cmp(&b.phone));
    phones
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_contact_pages_matches_segments() {
        let doc = Html::parse_document(
            r#"<body>
              <a href="/kontakt">Kontakt</a>
              <a href="/about-us">About us</a>
              <a href="/blog/about-our-product">post</a>
              <a href="/pricing">Pricing</a>
            </body>"#,
        );
        let pages = find_contact_pages(&doc, "https://acme.se");
        assert!(pages.iter().any(|p| p.ends_with("/kontakt")));
        assert!(pages.iter().any(|p| p.ends_with("/about-us")));
        // "blog" skip pattern wins over the "about" keyword
        assert!(!pages.iter().any(|p| p.contains("/blog/")));
        assert!(!pages.iter().any(|p| p.contains("pricing")));
    }

    #[test]
    fn test_harvest_page_emails_with_names() {
        let html = r#"<body>
          <p>VD: Anna Larsson, anna.larsson@acme.se</p>
          <p>info@acme.se</p>
        </body>"#;
        let harvest = harvest_page(html, "https://acme.se/kontakt");

        let anna = harvest
            .emails
            .iter()
            .find(|e| e.email == "anna.larsson@acme.se")
            .unwrap();
        assert_eq!(anna.firstname.as_deref(), Some("Anna"));
        assert_eq!(anna.lastname.as_deref(), Some("Larsson"));
        assert_eq!(anna.role.as_deref(), Some("CEO"));

        let info = harvest
            .emails
            .iter()
            .find(|e| e.email == "info@acme.se")
            .unwrap();
        assert!(info.firstname.is_none());
    }

    #[test]
    fn test_harvest_page_filters_noreply() {
        let html = "<body><p>noreply@acme.se and anna@acme.se</p></body>";
        let harvest = harvest_page(html, "https://acme.se/kontakt");
        assert_eq!(harvest.emails.len(), 1);
        assert_eq!(harvest.emails[0].email, "anna@acme.se");
    }

    #[test]
    fn test_harvest_page_phones() {
        let html = "<body><p>Ring oss: +46 8 123 456 78 eller 08-123 45 67</p></body>";
        let harvest = harvest_page(html, "https://acme.se/kontakt");
        assert!(!harvest.phones.is_empty());
        assert!(harvest.phones.iter().all(|p| p.source == "https://acme.se/kontakt"));
    }

    #[test]
    fn test_harvest_mailto_only_off_homepage() {
        let html = r#"<body><a href="mailto:sales@acme.se">Mail us</a></body>"#;

        let contact_page = harvest_page(html, "https://acme.se/kontakt");
        assert_eq!(contact_page.emails.len(), 1);

        let homepage = harvest_page(html, "https://acme.se/");
        assert!(homepage.emails.is_empty());
    }

    #[test]
    fn test_dedupe_keeps_first_source() {
        let mut harvest = ContactHarvest::default();
        harvest.emails.push(EmailContact::new("a@b.se", "https://b.se/kontakt"));
        harvest.emails.push(EmailContact::new("a@b.se", "https://b.se/om"));
        harvest.dedupe();
        assert_eq!(harvest.emails.len(), 1);
        assert_eq!(harvest.emails[0].source, "https://b.se/kontakt");
    }

    #[test]
    fn test_whole_word() {
        assert!(whole_word("visit our kontakt page", "kontakt"));
        assert!(!whole_word("kontaktperson list", "kontakt"));
    }
}
