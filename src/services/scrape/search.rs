//! Search-engine plumbing.
//!
//! Finds a company's official website from its name, a company name from an
//! email domain, and an org number from a company name. All of it runs over
//! plain HTML result pages; selectors per engine mirror what those pages
//! actually serve.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector")
}

/// Result-page domains that are never a company's own website.
const SKIP_DOMAINS: [&str; 20] = [
    "linkedin.com",
    "facebook.com",
    "twitter.com",
    "instagram.com",
    "crunchbase.com",
    "yellowpages.com",
    "whitepages.com",
    "manta.com",
    "zoominfo.com",
    "spoke.com",
    "superpages.com",
    "foursquare.com",
    "yelp.com",
    "google.com",
    "bing.com",
    "yahoo.com",
    "duckduckgo.com",
    "wikipedia.org",
    "bloomberg.com",
    "reuters.com",
];

/// One search engine: display name, query URL builder, result selectors.
struct Engine {
    name: &'static str,
    url: fn(&str) -> String,
    selectors: &'static [&'static str],
}

const ENGINES: [Engine; 3] = [
    Engine {
        name: "Google",
        url: |q| format!("https://www.google.com/search?q={}", urlencode(q)),
        selectors: &[
            "div.g a[href^='http']",
            "div.yuRUbf a[href^='http']",
            "h3 a[href^='http']",
        ],
    },
    Engine {
        name: "Bing",
        url: |q| format!("https://www.bing.com/search?q={}", urlencode(q)),
        selectors: &["li.b_algo h2 a[href^='http']", "div.b_title a[href^='http']"],
    },
    Engine {
        name: "DuckDuckGo",
        url: |q| format!("https://html.duckduckgo.com/html/?q={}", urlencode(q)),
        selectors: &["a.result__a"],
    },
];

fn urlencode(q: &str) -> String {
    Url::parse_with_params("https://x/", [("q", q)])
        .map(|u| u.query().unwrap_or_default().trim_start_matches("q=").to_string())
        .unwrap_or_else(|_| q.replace(' ', "+"))
}

/// Whether a URL looks like a company's own website rather than a
/// directory or social profile.
pub fn is_valid_website(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(domain) = parsed.host_str() else {
        return false;
    };
    let domain = domain.to_lowercase();
    !SKIP_DOMAINS.iter().any(|skip| domain.contains(skip))
}

/// DuckDuckGo's HTML endpoint wraps result links in a redirect.
pub fn extract_actual_url(href: &str) -> Option<String> {
    if let Some(rest) = href.split("uddg=").nth(1) {
        let encoded = rest.split('&').next().unwrap_or(rest);
        return urlencoding_decode(encoded);
    }
    Some(href.to_string())
}

fn urlencoding_decode(s: &str) -> Option<String> {
    let mut out = Vec::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 3 <= bytes.len() => {
                let hex = s.get(i + 1..i + 3)?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).ok()
}

/// A title/link pair pulled off a result page.
#[derive(Clone, Debug)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
}

fn parse_hits(html: &str, selectors: &[&str]) -> Vec<SearchHit> {
    let doc = Html::parse_document(html);
    let mut hits = Vec::new();

    for selector in selectors {
        for anchor in doc.select(&sel(selector)) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some(link) = extract_actual_url(href) else {
                continue;
            };
            if !link.starts_with("http") {
                continue;
            }
            let title = anchor.text().collect::<String>().trim().to_string();
            hits.push(SearchHit { title, link });
            if hits.len() >= 10 {
                return hits;
            }
        }
        if !hits.is_empty() {
            break;
        }
    }

    hits
}

async fn fetch_results(
    client: &reqwest::Client,
    engine: &Engine,
    query: &str,
) -> Option<Vec<SearchHit>> {
    let url = (engine.url)(query);
    let response = client
        .get(&url)
        .timeout(Duration::from_secs(20))
        .send()
        .await
        .ok()?;
    if !response.status().is_success() {
        debug!(engine = engine.name, status = %response.status(), "Search request rejected");
        return None;
    }
    let html = response.text().await.ok()?;
    let hits = parse_hits(&html, engine.selectors);
    if hits.is_empty() {
        None
    } else {
        Some(hits)
    }
}

/// Find the official website for a company name.
///
/// Three rounds over the engines; first hit that is not a directory/social
/// domain wins.
pub async fn find_company_website(client: &reqwest::Client, company_name: &str) -> Option<String> {
    let query = format!("{} official website", company_name);

    for round in 0..3 {
        for engine in &ENGINES {
            debug!(engine = engine.name, round = round, company = %company_name, "Searching for website");
            let Some(hits) = fetch_results(client, engine, &query).await else {
                continue;
            };
            for hit in hits.iter().take(5) {
                if is_valid_website(&hit.link) {
                    info!(engine = engine.name, url = %hit.link, "Found candidate website");
                    return Some(hit.link.clone());
                }
            }
        }
    }

    warn!(company = %company_name, "No website found on any engine");
    None
}

/// Main part of a domain: `google` from `google.com`, handling `co.uk`
/// style registries by taking the second-to-last label.
pub fn extract_domain_base(domain: &str) -> String {
    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() >= 2 {
        parts[parts.len() - 2].to_lowercase()
    } else {
        domain.to_lowercase()
    }
}

/// Relevance score for a search result against the email domain.
pub fn score_result(title: &str, link: &str, full_domain: &str, domain_base: &str) -> i32 {
    const OFFICIAL_INDICATORS: [&str; 4] =
        ["official site", "official website", "homepage", "home page"];
    const BAD_PATTERNS: [&str; 22] = [
        "wikipedia",
        "wiki",
        "linkedin",
        "facebook",
        "twitter",
        "instagram",
        "crunchbase",
        "bloomberg",
        "yahoo finance",
        "google maps",
        "yelp",
        "tripadvisor",
        "directory",
        "yellow pages",
        "search",
        "find",
        "locate",
        "list of",
        "companies like",
        "careers at",
        "jobs at",
        "reviews of",
    ];

    let mut score = 0;
    let title_lower = title.to_lowercase();

    let url_domain = Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_default();

    if url_domain.contains(domain_base) {
        score += 100;
    }
    if url_domain.contains(full_domain) {
        score += 50;
    }

    let clean_title = clean_company_name(title).to_lowercase();
    if clean_title.contains(domain_base) {
        score += 30;
    }

    if OFFICIAL_INDICATORS.iter().any(|i| title_lower.contains(i)) {
        score += 20;
    }

    if BAD_PATTERNS.iter().any(|p| title_lower.contains(p)) {
        score -= 50;
    }

    if clean_title.len() < 3 || title.split_whitespace().count() > 15 {
        score -= 20;
    }

    score
}

/// Clean a company name out of a search result title.
pub fn clean_company_name(title: &str) -> String {
    static TRAILING_RES: OnceLock<Vec<Regex>> = OnceLock::new();
    let trailing = TRAILING_RES.get_or_init(|| {
        [
            r"(?i)\s*-\s*Official Site.*$",
            r"(?i)\s*\|\s*Official.*$",
            r"(?i)\s*-\s*Wikipedia.*$",
            r"(?i)\s*-\s*LinkedIn.*$",
            r"(?i)\s*-\s*Crunchbase.*$",
            r"(?i)\s*-\s*Home.*$",
            r"(?i)\s*-\s*About.*$",
            r"\s*\(.*?\)\s*$",
            r"\s*\.{2,}$",
            r"(?i)\s*-\s*Company Profile$",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    });

    let mut title = title.to_string();

    for separator in [" - ", " – ", " — ", " | ", " : ", " :: "] {
        if title.contains(separator) {
            for part in title.split(separator) {
                let part = part.trim();
                if part.len() > 2 && !is_generic_suffix(part) {
                    title = part.to_string();
                    break;
                }
            }
            break;
        }
    }

    for re in trailing {
        title = re.replace(&title, "").to_string();
    }

    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_generic_suffix(text: &str) -> bool {
    const GENERIC: [&str; 12] = [
        "official site",
        "official website",
        "home",
        "homepage",
        "about us",
        "about",
        "wikipedia",
        "linkedin",
        "facebook",
        "overview",
        "profile",
        "company profile",
    ];
    GENERIC.contains(&text.to_lowercase().trim())
}

/// Fallback company name derived from the bare domain.
pub fn format_domain_name(domain: &str) -> String {
    static TLD_RE: OnceLock<Regex> = OnceLock::new();
    let tld_re =
        TLD_RE.get_or_init(|| Regex::new(r"(?i)\.(com|org|net|io|co|uk|us|in|se)$").unwrap());

    let domain = tld_re.replace(domain, "").to_string();

    if domain.chars().any(|c| c.is_ascii_digit()) {
        // Keep digit runs intact, title-case the rest: 87sixty -> 87Sixty
        let mut out = String::new();
        let mut word = String::new();
        for c in domain.chars() {
            if c.is_ascii_digit() {
                if !word.is_empty() {
                    out.push_str(&title_word(&word));
                    word.clear();
                }
                out.push(c);
            } else {
                word.push(c);
            }
        }
        if !word.is_empty() {
            out.push_str(&title_word(&word));
        }
        return out;
    }

    title_word(&domain)
}

fn title_word(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Resolve a company name from an email address via search engines, falling
/// back to a formatted domain name.
pub async fn search_company_from_email(client: &reqwest::Client, email: &str) -> String {
    let domain = email.split('@').next_back().unwrap_or(email).trim();
    let domain_base = extract_domain_base(domain);
    let query = format!("{} company", domain);

    for engine in &ENGINES {
        let Some(hits) = fetch_results(client, engine, &query).await else {
            continue;
        };

        let mut scored: Vec<(i32, &SearchHit)> = hits
            .iter()
            .filter(|hit| hit.title.len() > 2)
            .map(|hit| (score_result(&hit.title, &hit.link, domain, &domain_base), hit))
            .collect();
        scored.sort_by_key(|(score, _)| -score);

        if let Some((score, best)) = scored.first() {
            if *score > 0 {
                info!(engine = engine.name, score = score, title = %best.title, "Company name resolved");
                return clean_company_name(&best.title);
            }
        }
    }

    let fallback = format_domain_name(domain_base.as_str());
    info!(domain = %domain, fallback = %fallback, "All engines failed, using domain fallback");
    fallback
}

/// Extract a Swedish org number from page HTML.
pub fn extract_org_number(html: &str) -> Option<String> {
    static LABELED_RE: OnceLock<Regex> = OnceLock::new();
    static DASHED_RE: OnceLock<Regex> = OnceLock::new();
    static PLAIN_RE: OnceLock<Regex> = OnceLock::new();

    let labeled = LABELED_RE.get_or_init(|| {
        Regex::new(r"[Oo]rganisationsnummer[:\s]*([0-9]{6}[-\s]?[0-9]{4})").unwrap()
    });
    let dashed = DASHED_RE.get_or_init(|| Regex::new(r"\b([0-9]{6}-[0-9]{4})\b").unwrap());
    let plain = PLAIN_RE.get_or_init(|| Regex::new(r"\b([0-9]{10})\b").unwrap());

    if let Some(caps) = labeled.captures(html) {
        return Some(caps[1].replace(' ', "-"));
    }
    if let Some(caps) = dashed.captures(html) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = plain.captures(html) {
        let num = &caps[1];
        return Some(format!("{}-{}", &num[..6], &num[6..]));
    }
    None
}

/// Resolve an org number for a company name.
///
/// Strategies in order: direct registry URL guesses, the registry search
/// page, a DuckDuckGo `site:` query whose hits are fetched and mined.
pub async fn find_org_number(
    client: &reqwest::Client,
    registry_base: &str,
    company_name: &str,
) -> Option<String> {
    // Direct URL guesses
    let slug_variants = [
        company_name.to_lowercase().replace(' ', "-"),
        company_name.to_lowercase().replace(' ', ""),
        company_name.to_lowercase(),
    ];
    for slug in &slug_variants {
        let url = format!("{}/{}", registry_base, slug);
        if let Some(org) = fetch_and_extract(client, &url).await {
            info!(org_number = %org, "Found org number via direct registry URL");
            return Some(org);
        }
    }

    // Registry search page
    let search_url = format!("{}/what/{}", registry_base, urlencode(company_name));
    if let Some(org) = fetch_and_extract(client, &search_url).await {
        info!(org_number = %org, "Found org number via registry search");
        return Some(org);
    }

    // DuckDuckGo site: query
    let registry_host = Url::parse(registry_base)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "allabolag.se".to_string());
    let query = format!("{} organisationsnummer site:{}", company_name, registry_host);
    let ddg = &ENGINES[2];
    if let Some(hits) = fetch_results(client, ddg, &query).await {
        for hit in hits {
            if !hit.link.contains(&registry_host) || hit.link.contains("/what/") {
                continue;
            }
            if let Some(org) = fetch_and_extract(client, &hit.link).await {
                info!(org_number = %org, "Found org number via DuckDuckGo");
                return Some(org);
            }
        }
    }

    warn!(company = %company_name, "No org number found after all strategies");
    None
}

async fn fetch_and_extract(client: &reqwest::Client, url: &str) -> Option<String> {
    let response = client
        .get(url)
        .timeout(Duration::from_secs(15))
        .send()
        .await
        .ok()?;
    if !response.status().is_success() {
        return None;
    }
    let html = response.text().await.ok()?;
    extract_org_number(&html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_website() {
        assert!(is_valid_website("https://acme.se/about"));
        assert!(!is_valid_website("https://www.linkedin.com/company/acme"));
        assert!(!is_valid_website("https://sv.wikipedia.org/wiki/Acme"));
        assert!(!is_valid_website("not a url"));
    }

    #[test]
    fn test_extract_actual_url_ddg_redirect() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Facme.se%2F&rut=abc";
        assert_eq!(
            extract_actual_url(href).as_deref(),
            Some("https://acme.se/")
        );
        assert_eq!(
            extract_actual_url("https://plain.se").as_deref(),
            Some("https://plain.se")
        );
    }

    #[test]
    fn test_score_result_prefers_domain_match() {
        let good = score_result("Acme AB - Official Site", "https://acme.se", "acme.se", "acme");
        let bad = score_result("Acme AB - Wikipedia", "https://sv.wikipedia.org/wiki/Acme", "acme.se", "acme");
        assert!(good > bad);
        assert!(good > 0);
        assert!(bad < good - 100);
    }

    #[test]
    fn test_clean_company_name() {
        assert_eq!(clean_company_name("Acme AB - Official Site"), "Acme AB");
        assert_eq!(clean_company_name("Acme AB | Official homepage"), "Acme AB");
        assert_eq!(clean_company_name("Acme AB (Sweden)"), "Acme AB");
    }

    #[test]
    fn test_format_domain_name() {
        assert_eq!(format_domain_name("volvo.com"), "Volvo");
        assert_eq!(format_domain_name("87sixty"), "87Sixty");
    }

    #[test]
    fn test_extract_org_number_patterns() {
        assert_eq!(
            extract_org_number("Organisationsnummer: 556677-8899").as_deref(),
            Some("556677-8899")
        );
        assert_eq!(
            extract_org_number("orgnr 556677 8899 something").as_deref(),
            None,
            "bare six-four digits without label should not match the labeled pattern"
        );
        assert_eq!(
            extract_org_number("registered as 556677-8899 in Sweden").as_deref(),
            Some("556677-8899")
        );
        assert_eq!(
            extract_org_number("id 5566778899 end").as_deref(),
            Some("556677-8899")
        );
        assert!(extract_org_number("no numbers here").is_none());
    }

    #[test]
    fn test_parse_hits_selector_fallback() {
        let html = r#"<div class="g"><a href="https://acme.se"><h3>Acme AB</h3></a></div>"#;
        let hits = parse_hits(html, ENGINES[0].selectors);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].link, "https://acme.se");
    }

    #[test]
    fn test_urlencode() {
        assert_eq!(urlencode("acme ab official"), "acme+ab+official");
    }
}
