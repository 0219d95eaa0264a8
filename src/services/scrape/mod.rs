//! Website scraping service.
//!
//! Finds a company's website, fetches it and its contact pages, and turns
//! the lot into a [`ScrapedWebsite`]. Scraping is best-effort: every failure
//! degrades to `None` and the profile pipeline carries on without it.

pub mod contact_pages;
pub mod extract;
pub mod search;

use scraper::Html;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::contact::SocialMediaLinks;
use crate::infra::LlmClient;
use crate::services::enrich;

use contact_pages::ContactHarvest;
use extract::PageContent;

/// How many contact pages to fetch beyond the homepage.
const MAX_CONTACT_PAGES: usize = 5;

/// Pause between contact-page fetches so we do not hammer small sites.
const CONTACT_PAGE_DELAY_MS: u64 = 2000;

/// Everything scraped off one company website.
#[derive(Clone, Debug, Default)]
pub struct ScrapedWebsite {
    /// URL the scrape succeeded on
    pub website_url: String,
    /// Name the caller searched for
    pub searched_company_name: String,
    /// Name as the site presents itself
    pub company_name: Option<String>,
    pub description: Option<String>,
    pub content: PageContent,
    pub contacts: ContactHarvest,
    pub social_media: SocialMediaLinks,
}

impl ScrapedWebsite {
    /// Whether the scrape produced anything usable. Error pages and consent
    /// walls yield a name but no substance.
    pub fn is_meaningful(&self) -> bool {
        if let Some(name) = &self.company_name {
            let lower = name.to_lowercase();
            if ["privacy", "certificate", "error", "blocked"]
                .iter()
                .any(|bad| lower.contains(bad))
            {
                return false;
            }
        }

        if !self.contacts.emails.is_empty() || !self.contacts.phones.is_empty() {
            return true;
        }

        self.content.paragraphs.len() >= 5 || self.content.headings.len() >= 3
    }
}

/// Page fetcher with browser-like headers.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

impl Fetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .danger_accept_invalid_certs(true)
            .user_agent(BROWSER_UA)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Fetch a page, returning `None` on any failure or a suspiciously
    /// short body.
    pub async fn get_html(&self, url: &str) -> Option<String> {
        let url = normalize_url(url)?;

        let response = self
            .client
            .get(&url)
            .header(
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header("accept-language", "en-US,en;q=0.5")
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                let body = response.text().await.ok()?;
                if body.len() > 500 {
                    Some(body)
                } else {
                    debug!(url = %url, len = body.len(), "Body too short to be a real page");
                    None
                }
            }
            Ok(response) => {
                debug!(url = %url, status = %response.status(), "Fetch rejected");
                None
            }
            Err(e) => {
                debug!(url = %url, error = %e, "Fetch failed");
                None
            }
        }
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Ensure a scheme is present.
fn normalize_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Some(url.to_string())
    } else {
        Some(format!("https://{}", url))
    }
}

/// Parsed homepage: everything extractable without another fetch, plus the
/// contact page URLs to visit next.
struct ParsedHomepage {
    company_name: Option<String>,
    description: Option<String>,
    content: PageContent,
    homepage_harvest: ContactHarvest,
    social_media: SocialMediaLinks,
    contact_urls: Vec<String>,
}

/// All DOM work happens here, synchronously, so the parsed document never
/// crosses an await point.
fn parse_homepage(html: &str, url: &str) -> ParsedHomepage {
    let doc = Html::parse_document(html);

    let homepage_url = url::Url::parse(url)
        .map(|u| format!("{}://{}/", u.scheme(), u.host_str().unwrap_or_default()))
        .unwrap_or_else(|_| url.to_string());

    ParsedHomepage {
        company_name: extract::company_name(&doc),
        description: extract::description(&doc),
        content: extract::content(&doc),
        homepage_harvest: contact_pages::harvest_page(html, &homepage_url),
        social_media: extract::social_media(&doc, url),
        contact_urls: contact_pages::find_contact_pages(&doc, url),
    }
}

/// Scrape one website: homepage plus up to [`MAX_CONTACT_PAGES`] contact
/// pages, each attributed as a source URL.
pub async fn scrape_website(fetcher: &Fetcher, url: &str, html: &str) -> ScrapedWebsite {
    let parsed = parse_homepage(html, url);

    let mut contacts = parsed.homepage_harvest;

    info!(
        url = %url,
        contact_pages = parsed.contact_urls.len(),
        "Homepage parsed, visiting contact pages"
    );

    for page_url in parsed.contact_urls.iter().take(MAX_CONTACT_PAGES) {
        match fetcher.get_html(page_url).await {
            Some(page_html) => {
                let harvest = contact_pages::harvest_page(&page_html, page_url);
                debug!(
                    url = %page_url,
                    emails = harvest.emails.len(),
                    phones = harvest.phones.len(),
                    "Contact page harvested"
                );
                contacts.merge(harvest);
            }
            None => {
                debug!(url = %page_url, "Contact page fetch failed, skipping");
            }
        }
        tokio::time::sleep(Duration::from_millis(CONTACT_PAGE_DELAY_MS)).await;
    }

    contacts.dedupe();

    ScrapedWebsite {
        website_url: url.to_string(),
        searched_company_name: String::new(),
        company_name: parsed.company_name,
        description: parsed.description,
        content: parsed.content,
        contacts,
        social_media: parsed.social_media,
    }
}

async fn attempt_url(fetcher: &Fetcher, url: &str) -> Option<ScrapedWebsite> {
    let html = fetcher.get_html(url).await?;
    let scraped = scrape_website(fetcher, url, &html).await;
    if scraped.is_meaningful() {
        Some(scraped)
    } else {
        warn!(url = %url, "Scrape looked empty or suspicious, discarding");
        None
    }
}

/// Scrape a company's website starting from its name.
///
/// Search engines produce a candidate URL; the LLM gets a chance to correct
/// it; the corrected URL is tried first with the search result as fallback.
pub async fn scrape_company_by_name(
    fetcher: &Fetcher,
    llm: &LlmClient,
    company_name: &str,
) -> Option<ScrapedWebsite> {
    let scraped_url = search::find_company_website(fetcher.client(), company_name).await?;
    info!(company = %company_name, url = %scraped_url, "Search engines proposed a website");

    let validated_url = enrich::validate_website_url(llm, company_name, &scraped_url).await;

    let scraped_url = normalize_url(&scraped_url)?;
    let validated_url = validated_url.and_then(|u| normalize_url(&u));

    if let Some(validated) = validated_url.filter(|u| *u != scraped_url) {
        info!(url = %validated, "Trying validated URL first");
        if let Some(mut result) = attempt_url(fetcher, &validated).await {
            result.searched_company_name = company_name.to_string();
            result.website_url = validated;
            return Some(result);
        }
        info!("Validated URL failed, falling back to search result");
    }

    let mut result = attempt_url(fetcher, &scraped_url).await?;
    result.searched_company_name = company_name.to_string();
    result.website_url = scraped_url;
    Some(result)
}

/// Scrape starting from a known domain, falling back to a name search when
/// the domain itself yields nothing.
pub async fn scrape_company_by_domain(
    fetcher: &Fetcher,
    llm: &LlmClient,
    domain: &str,
) -> Option<ScrapedWebsite> {
    let direct_url = normalize_url(domain)?;

    if let Some(mut result) = attempt_url(fetcher, &direct_url).await {
        result.searched_company_name = domain.to_string();
        result.website_url = direct_url;
        return Some(result);
    }

    info!(domain = %domain, "Direct domain scrape failed, searching by name");
    scrape_company_by_name(fetcher, llm, domain).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contact::EmailContact;

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("acme.se").as_deref(),
            Some("https://acme.se")
        );
        assert_eq!(
            normalize_url("  http://acme.se ").as_deref(),
            Some("http://acme.se")
        );
        assert!(normalize_url("").is_none());
    }

    #[test]
    fn test_is_meaningful_requires_signal() {
        let mut scraped = ScrapedWebsite::default();
        assert!(!scraped.is_meaningful());

        scraped
            .contacts
            .emails
            .push(EmailContact::new("a@b.se", "https://b.se"));
        assert!(scraped.is_meaningful());
    }

    #[test]
    fn test_is_meaningful_rejects_error_pages() {
        let scraped = ScrapedWebsite {
            company_name: Some("Privacy error".to_string()),
            ..Default::default()
        };
        assert!(!scraped.is_meaningful());
    }

    #[test]
    fn test_is_meaningful_accepts_rich_content() {
        let mut scraped = ScrapedWebsite::default();
        scraped.content.headings = vec!["a".into(), "b".into(), "c".into()];
        assert!(scraped.is_meaningful());
    }

    #[test]
    fn test_parse_homepage_combines_extractors() {
        let html = r#"<html><head><title>Acme AB</title>
            <meta name="description" content="Industrial control systems for Nordic factories."></head>
            <body>
              <a href="/kontakt">Kontakt</a>
              <p>Contact us at info@acme.se for quotes and support questions.</p>
            </body></html>"#;
        let parsed = parse_homepage(html, "https://acme.se");
        assert_eq!(parsed.company_name.as_deref(), Some("Acme AB"));
        assert!(parsed.description.is_some());
        assert_eq!(parsed.contact_urls.len(), 1);
        assert_eq!(parsed.homepage_harvest.emails.len(), 1);
        // Homepage emails are attributed to the site root
        assert_eq!(parsed.homepage_harvest.emails[0].source, "https://acme.se/");
    }
}
