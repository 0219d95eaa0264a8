//! Company profile assembly pipeline.
//!
//! Registry record first, website scrape second, LLM enrichment last. Only
//! the registry step is load-bearing; everything after it degrades.

use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{info, warn};

use crate::domain::company::{format_date, CompanyProfile, CompanySummary};
use crate::services::scrape::{self, ScrapedWebsite};
use crate::services::{enrich, prioritizer};
use crate::state::AppState;

/// Build the full company profile for an org number.
///
/// `None` means the registry has no such company. A failed scrape or
/// enrichment never fails the pipeline.
pub async fn get_company_data(
    state: &Arc<AppState>,
    org_number: &str,
    criteria: Option<&str>,
) -> Option<CompanyProfile> {
    info!(org_number = %org_number, "Starting company data retrieval");

    let summary = match state.registry.summary(org_number).await {
        Ok(Some(summary)) => summary,
        Ok(None) => {
            info!(org_number = %org_number, "No registry record");
            return None;
        }
        Err(e) => {
            warn!(org_number = %org_number, error = %e, "Registry lookup failed");
            return None;
        }
    };

    let scraped = match &summary.name {
        Some(name) => {
            let scrape_cap = Duration::from_secs(state.config.scrape_timeout_secs);
            match timeout(
                scrape_cap,
                scrape::scrape_company_by_name(&state.fetcher, &state.llm, name),
            )
            .await
            {
                Ok(result) => {
                    if result.is_none() {
                        warn!(company = %name, "Website scraping failed, continuing without it");
                    }
                    result
                }
                Err(_) => {
                    warn!(company = %name, "Website scraping timed out, continuing without it");
                    None
                }
            }
        }
        None => None,
    };

    let mut profile = structure_response(Some(&summary), scraped.as_ref(), criteria);

    // First ten paragraphs give the LLM enough site context
    let website_content = scraped
        .as_ref()
        .map(|s| {
            s.content
                .paragraphs
                .iter()
                .take(10)
                .cloned()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    if let Some(about) = enrich::generate_company_summary(
        &state.llm,
        &profile.company_name,
        &website_content,
        Some(&summary),
    )
    .await
    {
        profile.about = about;
    }

    let business_type = enrich::determine_business_type(
        &state.llm,
        &profile.company_name,
        &website_content,
        Some(&summary),
    )
    .await;
    profile.business_type_guess = business_type;

    if !profile.scraped_data.phones.is_empty() {
        if let Some(cleaned) =
            enrich::clean_phone_numbers(&state.llm, &profile.scraped_data.phones).await
        {
            profile.scraped_data.phones = cleaned;
        }
    }

    info!(company = %profile.company_name, "Company profile assembled");
    Some(profile)
}

/// Merge registry and scraped data into the response profile.
pub fn structure_response(
    company_info: Option<&CompanySummary>,
    website_data: Option<&ScrapedWebsite>,
    criteria: Option<&str>,
) -> CompanyProfile {
    let mut profile = CompanyProfile::empty();

    if let Some(info) = company_info {
        profile.company_name = info.name.clone().unwrap_or_default();
        profile.org_number = info.org_number.clone().unwrap_or_default();
        profile.current_industry = info.industry.clone().unwrap_or_default();
        profile.industries = info.industries.clone();
        profile.nace_industries = info.nace_industries.clone();
        profile.revenue = info.turnover.map(|t| t.to_string()).unwrap_or_default();
        profile.estimated_turnover = info.turnover_range.clone().unwrap_or_default();
        profile.foundationyear = info
            .foundation_year
            .map(|y| y.to_string())
            .unwrap_or_default();
        profile.registration_date = info.registration_date.clone().unwrap_or_default();
        profile.turnover_year = info.turnover_year.clone().unwrap_or_default();
        profile.foundation_date = format_date(&profile.registration_date);
        profile.employees = info.employees.map(|e| e.to_string()).unwrap_or_default();
        profile.value_proposition = info.value_proposition.clone().unwrap_or_default();
        profile.business_type_guess = info.business_type_guess.clone();

        profile.location.country_part = info.location.region.clone().unwrap_or_default();
        profile.location.county = info.location.county.clone().unwrap_or_default();
        profile.location.municipality = info.location.municipality.clone().unwrap_or_default();

        if let Some(website) = &info.website {
            profile.websites.push(website.clone());
        }
    }

    if let Some(scraped) = website_data {
        if !scraped.website_url.is_empty() && !profile.websites.contains(&scraped.website_url) {
            profile.websites.push(scraped.website_url.clone());
        }

        profile.scraped_data.emails = scraped.contacts.emails.clone();
        profile.scraped_data.phones = scraped.contacts.phones.clone();
        profile.scraped_data.social_media = scraped.social_media.clone();
    }

    if let Some(criteria) = criteria.filter(|c| !c.is_empty()) {
        prioritizer::prioritize_contacts_in_profile(&mut profile, criteria);
    }

    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::company::SummaryLocation;
    use crate::domain::contact::{EmailContact, PhoneContact};

    fn summary() -> CompanySummary {
        CompanySummary {
            name: Some("Acme Industrier AB".to_string()),
            org_number: Some("556677-8899".to_string()),
            website: Some("https://acme.se".to_string()),
            turnover: Some(45_000),
            turnover_range: Some("20-50 MSEK".to_string()),
            registration_date: Some("2009-04-15".to_string()),
            foundation_year: Some(2009),
            employees: Some(42),
            industry: Some("Industriell automation".to_string()),
            industries: vec!["Industriell automation".to_string()],
            location: SummaryLocation {
                region: Some("Svealand".to_string()),
                county: Some("Stockholms län".to_string()),
                municipality: Some("Stockholm".to_string()),
            },
            value_proposition: Some("Styrsystem".to_string()),
            business_type_guess: "B2B".to_string(),
            ..Default::default()
        }
    }

    fn scraped() -> ScrapedWebsite {
        let mut scraped = ScrapedWebsite {
            website_url: "https://www.acme.se".to_string(),
            ..Default::default()
        };
        scraped.contacts.emails.push(EmailContact {
            email: "anna@acme.se".to_string(),
            source: "https://acme.se/kontakt".to_string(),
            firstname: Some("Anna".to_string()),
            lastname: None,
            role: Some("CEO".to_string()),
        });
        scraped.contacts.emails.push(EmailContact::new("info@acme.se", "https://acme.se/"));
        scraped.contacts.phones.push(PhoneContact::new("+46 8 123 456", "https://acme.se/kontakt"));
        scraped
    }

    #[test]
    fn test_structure_response_merges_both_sources() {
        let profile = structure_response(Some(&summary()), Some(&scraped()), None);

        assert_eq!(profile.company_name, "Acme Industrier AB");
        assert_eq!(profile.org_number, "556677-8899");
        assert_eq!(profile.revenue, "45000");
        assert_eq!(profile.foundation_date, "15.04.2009");
        assert_eq!(profile.employees, "42");
        assert_eq!(profile.location.municipality, "Stockholm");
        // Both the registry website and the scraped URL survive
        assert_eq!(profile.websites.len(), 2);
        assert_eq!(profile.scraped_data.emails.len(), 2);
        assert_eq!(profile.scraped_data.phones.len(), 1);
    }

    #[test]
    fn test_structure_response_dedupes_websites() {
        let mut site = scraped();
        site.website_url = "https://acme.se".to_string();
        let profile = structure_response(Some(&summary()), Some(&site), None);
        assert_eq!(profile.websites, vec!["https://acme.se".to_string()]);
    }

    #[test]
    fn test_structure_response_prioritizes_with_criteria() {
        let profile = structure_response(
            Some(&summary()),
            Some(&scraped()),
            Some("contacts of CEO in stockholm"),
        );
        assert_eq!(profile.scraped_data.emails[0].email, "anna@acme.se");
    }

    #[test]
    fn test_structure_response_empty_without_registry() {
        let profile = structure_response(None, None, None);
        assert_eq!(profile.company_name, "");
        assert!(profile.websites.is_empty());
    }
}
