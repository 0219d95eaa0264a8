//! Contact prioritization.
//!
//! Parses location and role preferences out of a free-text criteria string
//! and reorders contacts accordingly. Prioritization never drops a contact;
//! location is a company-level filter, not a contact-level one.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::domain::company::CompanyProfile;
use crate::domain::contact::EmailContact;

const COUNTRY_KEYWORDS: [(&str, &[&str]); 4] = [
    ("sweden", &["sweden", "sverige", "swedish"]),
    ("norway", &["norway", "norge", "norwegian"]),
    ("denmark", &["denmark", "danmark", "danish"]),
    ("finland", &["finland", "suomi", "finnish"]),
];

const SWEDISH_CITIES: [&str; 19] = [
    "stockholm",
    "göteborg",
    "gothenburg",
    "malmö",
    "malmo",
    "uppsala",
    "västerås",
    "vasteras",
    "örebro",
    "orebro",
    "linköping",
    "linkoping",
    "helsingborg",
    "jönköping",
    "jonkoping",
    "norrköping",
    "norrkoping",
    "lund",
    "umeå",
];

const ROLE_KEYWORDS: [(&str, &[&str]); 9] = [
    ("ceo", &["ceo", "chief executive officer", "vd", "verkställande direktör"]),
    ("cto", &["cto", "chief technology officer", "tekniskt ansvarig", "teknisk chef"]),
    ("cfo", &["cfo", "chief financial officer", "ekonomidirektör", "finansiell chef"]),
    ("coo", &["coo", "chief operating officer", "operativ chef"]),
    ("cmo", &["cmo", "chief marketing officer", "marknadschef"]),
    ("founder", &["founder", "grundare", "co-founder", "medgrundare"]),
    ("director", &["director", "direktör", "managing director"]),
    ("manager", &["manager", "chef", "ledare"]),
    ("head", &["head of", "chef för", "ansvarig för"]),
];

fn location_pattern_res() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"\bbased\s+in\s+([a-zäöå ]+)",
            r"\blocated\s+in\s+([a-zäöå ]+)",
            r"\bfrom\s+([a-zäöå ]+)",
            r"\bin\s+([a-zäöå ]+)",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

/// Preferences parsed from one criteria string.
pub struct ContactPrioritizer {
    pub preferred_locations: BTreeSet<String>,
    pub preferred_roles: BTreeSet<String>,
}

impl ContactPrioritizer {
    pub fn new(criteria: &str) -> Self {
        Self {
            preferred_locations: extract_locations(criteria),
            preferred_roles: extract_roles(criteria),
        }
    }

    /// Stable reorder: contacts matching a preferred role first, everyone
    /// else after. Without role preferences, contacts that have any role
    /// outrank anonymous mailboxes.
    pub fn prioritize_contacts(&self, contacts: Vec<EmailContact>) -> Vec<EmailContact> {
        if contacts.is_empty() {
            return contacts;
        }

        let mut prioritized = Vec::new();
        let mut others = Vec::new();

        for contact in contacts {
            let role = contact.role.as_deref().map(str::to_uppercase);

            let preferred = if self.preferred_roles.is_empty() {
                role.is_some()
            } else {
                role.as_deref().is_some_and(|r| {
                    self.preferred_roles
                        .iter()
                        .any(|pref| r.contains(&pref.to_uppercase()))
                })
            };

            if preferred {
                prioritized.push(contact);
            } else {
                others.push(contact);
            }
        }

        prioritized.extend(others);
        prioritized
    }

    /// Company-level location check. No preference means everything passes.
    pub fn matches_location(&self, profile: &CompanyProfile) -> bool {
        if self.preferred_locations.is_empty() {
            return true;
        }

        let location_fields = [
            profile.location.municipality.to_lowercase(),
            profile.location.county.to_lowercase(),
            profile.location.country_part.to_lowercase(),
        ];
        let location_text = location_fields.join(" ");

        const CITY_NORMALIZATIONS: [(&str, &str); 8] = [
            ("gothenburg", "göteborg"),
            ("malmo", "malmö"),
            ("vasteras", "västerås"),
            ("orebro", "örebro"),
            ("linkoping", "linköping"),
            ("jonkoping", "jönköping"),
            ("norrkoping", "norrköping"),
            ("umea", "umeå"),
        ];

        const COUNTRY_INDICATORS: [(&str, &[&str]); 4] = [
            (
                "sweden",
                &[
                    "sweden",
                    "sverige",
                    "swedish",
                    "göteborg",
                    "stockholm",
                    "malmö",
                    "uppsala",
                    "västra götaland",
                    "västerås",
                    "örebro",
                    "linköping",
                    "helsingborg",
                    "jönköping",
                    "norrköping",
                    "lund",
                    "umeå",
                    "hela sverige",
                ],
            ),
            ("norway", &["norway", "norge", "norwegian", "oslo", "bergen"]),
            ("denmark", &["denmark", "danmark", "danish", "copenhagen", "köpenhamn"]),
            ("finland", &["finland", "suomi", "finnish", "helsinki", "helsingfors"]),
        ];

        for preferred in &self.preferred_locations {
            let preferred = preferred.to_lowercase();

            if let Some((_, indicators)) = COUNTRY_INDICATORS
                .iter()
                .find(|(country, _)| *country == preferred)
            {
                if indicators.iter().any(|i| location_text.contains(i)) {
                    return true;
                }
            }

            let normalized = CITY_NORMALIZATIONS
                .iter()
                .find(|(ascii, _)| *ascii == preferred)
                .map(|(_, city)| (*city).to_string())
                .unwrap_or_else(|| preferred.clone());

            if location_text.contains(&normalized) {
                return true;
            }
            if location_fields.iter().any(|f| f.contains(&normalized)) {
                return true;
            }
        }

        false
    }
}

fn extract_locations(criteria: &str) -> BTreeSet<String> {
    let mut locations = BTreeSet::new();
    if criteria.is_empty() {
        return locations;
    }

    let lower = criteria.to_lowercase();

    // Country preference trumps city extraction
    for (country, keywords) in COUNTRY_KEYWORDS {
        if keywords.iter().any(|k| lower.contains(k)) {
            locations.insert(country.to_string());
            return locations;
        }
    }

    for city in SWEDISH_CITIES {
        if lower.contains(city) {
            locations.insert(city.to_string());
        }
    }

    for re in location_pattern_res() {
        for caps in re.captures_iter(&lower) {
            let candidate = caps[1].trim().to_string();
            if !candidate.is_empty() {
                locations.insert(candidate);
            }
        }
    }

    locations
}

fn extract_roles(criteria: &str) -> BTreeSet<String> {
    let mut roles = BTreeSet::new();
    if criteria.is_empty() {
        return roles;
    }

    let lower = criteria.to_lowercase();
    for (role, keywords) in ROLE_KEYWORDS {
        if keywords.iter().any(|k| lower.contains(k)) {
            roles.insert(role.to_uppercase());
        }
    }
    roles
}

/// Reorder a profile's email contacts in place according to the criteria.
pub fn prioritize_contacts_in_profile(profile: &mut CompanyProfile, criteria: &str) {
    if criteria.is_empty() {
        return;
    }

    let prioritizer = ContactPrioritizer::new(criteria);
    let emails = std::mem::take(&mut profile.scraped_data.emails);
    let count = emails.len();
    profile.scraped_data.emails = prioritizer.prioritize_contacts(emails);

    tracing::debug!(
        emails = count,
        roles = ?prioritizer.preferred_roles,
        locations = ?prioritizer.preferred_locations,
        "Contacts prioritized"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::company::Location;

    fn contact(email: &str, role: Option<&str>) -> EmailContact {
        EmailContact {
            email: email.to_string(),
            source: "https://acme.se/kontakt".to_string(),
            firstname: None,
            lastname: None,
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn test_extract_roles_english_and_swedish() {
        let p = ContactPrioritizer::new("companies in stockholm with contacts of CEO/CTO");
        assert!(p.preferred_roles.contains("CEO"));
        assert!(p.preferred_roles.contains("CTO"));

        let p = ContactPrioritizer::new("vill nå verkställande direktör");
        assert!(p.preferred_roles.contains("CEO"));
    }

    #[test]
    fn test_extract_locations_country_wins() {
        let p = ContactPrioritizer::new("companies in sweden, preferably stockholm");
        assert!(p.preferred_locations.contains("sweden"));
        assert!(!p.preferred_locations.contains("stockholm"));
    }

    #[test]
    fn test_extract_locations_cities() {
        let p = ContactPrioritizer::new("based in göteborg or malmö");
        assert!(p.preferred_locations.contains("göteborg"));
        assert!(p.preferred_locations.contains("malmö"));
    }

    #[test]
    fn test_prioritize_by_role_keeps_everyone() {
        let p = ContactPrioritizer::new("contacts of CEO");
        let contacts = vec![
            contact("info@acme.se", None),
            contact("anna@acme.se", Some("CEO")),
            contact("ben@acme.se", Some("MANAGER")),
        ];
        let ordered = p.prioritize_contacts(contacts);
        assert_eq!(ordered.len(), 3);
        assert_eq!(ordered[0].email, "anna@acme.se");
    }

    #[test]
    fn test_prioritize_without_preference_favors_any_role() {
        let p = ContactPrioritizer::new("tech companies");
        let contacts = vec![
            contact("info@acme.se", None),
            contact("ben@acme.se", Some("CTO")),
        ];
        let ordered = p.prioritize_contacts(contacts);
        assert_eq!(ordered[0].email, "ben@acme.se");
    }

    #[test]
    fn test_matches_location_city_normalization() {
        let p = ContactPrioritizer::new("based in gothenburg");
        let profile = CompanyProfile {
            location: Location {
                municipality: "Göteborg".to_string(),
                county: "Västra Götalands län".to_string(),
                country_part: String::new(),
            },
            ..Default::default()
        };
        assert!(p.matches_location(&profile));
    }

    #[test]
    fn test_matches_location_country_level() {
        let p = ContactPrioritizer::new("companies in sweden");
        let profile = CompanyProfile {
            location: Location {
                municipality: "Stockholm".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(p.matches_location(&profile));

        let abroad = CompanyProfile::default();
        assert!(!p.matches_location(&abroad));
    }

    #[test]
    fn test_no_criteria_means_no_reorder_needed() {
        let p = ContactPrioritizer::new("");
        assert!(p.preferred_locations.is_empty());
        assert!(p.preferred_roles.is_empty());
        let profile = CompanyProfile::default();
        assert!(p.matches_location(&profile));
    }
}
