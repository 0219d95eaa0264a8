//! HTML extraction primitives.
//!
//! Everything in here is synchronous and works on an already-fetched
//! document; callers own fetching so these helpers never hold a parsed DOM
//! across an await point.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

use crate::domain::contact::SocialMediaLinks;

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector")
}

/// Headings and paragraphs collected for downstream LLM context.
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct PageContent {
    pub headings: Vec<String>,
    pub paragraphs: Vec<String>,
}

/// Company name from og:title, then <title> (marketing suffix stripped),
/// then the first h1.
pub fn company_name(doc: &Html) -> Option<String> {
    static TITLE_SUFFIX_RE: OnceLock<Regex> = OnceLock::new();
    let suffix_re = TITLE_SUFFIX_RE.get_or_init(|| {
        Regex::new(r"\s*[-|]\s*(?:Home|Official Website|Welcome).*$").unwrap()
    });

    if let Some(meta) = doc.select(&sel(r#"meta[property="og:title"]"#)).next() {
        if let Some(content) = meta.value().attr("content") {
            let content = content.trim();
            if !content.is_empty() {
                return Some(content.to_string());
            }
        }
    }

    if let Some(title) = doc.select(&sel("title")).next() {
        let text: String = title.text().collect();
        let text = text.trim();
        if !text.is_empty() {
            return Some(suffix_re.replace(text, "").to_string());
        }
    }

    doc.select(&sel("h1")).next().map(|h1| {
        h1.text().collect::<String>().trim().to_string()
    })
}

/// Description from meta tags, falling back to about-section paragraphs.
pub fn description(doc: &Html) -> Option<String> {
    const META_SELECTORS: [&str; 5] = [
        r#"meta[name="description"]"#,
        r#"meta[property="og:description"]"#,
        r#"meta[name="twitter:description"]"#,
        r#"meta[name="abstract"]"#,
        r#"meta[name="summary"]"#,
    ];

    for selector in META_SELECTORS {
        if let Some(meta) = doc.select(&sel(selector)).next() {
            if let Some(content) = meta.value().attr("content") {
                let desc = content.trim();
                let lower = desc.to_lowercase();
                if desc.len() > 20
                    && !["cookie", "privacy", "terms"].iter().any(|x| lower.contains(x))
                {
                    return Some(desc.to_string());
                }
            }
        }
    }

    const ABOUT_SELECTORS: [&str; 6] = [
        "section.about, div.about, article.about",
        "section.company, div.company, article.company",
        "section.overview, div.overview, article.overview",
        "section.who-we-are, div.who-we-are, article.who-we-are",
        "section.mission, div.mission, article.mission",
        "section.vision, div.vision, article.vision",
    ];

    for selector in ABOUT_SELECTORS {
        if let Some(section) = doc.select(&sel(selector)).next() {
            let texts = meaningful_texts(section, 50, 500);
            if !texts.is_empty() {
                return Some(texts[..texts.len().min(2)].join(" "));
            }
        }
    }

    None
}

fn meaningful_texts(section: ElementRef<'_>, min_len: usize, max_len: usize) -> Vec<String> {
    let mut texts = Vec::new();
    for p in section.select(&sel("p, div")) {
        let text = normalize_ws(&p.text().collect::<String>());
        let lower = text.to_lowercase();
        if text.len() > min_len
            && text.len() < max_len
            && !["cookie", "privacy", "@", "email"].iter().any(|x| lower.contains(x))
            && !text.starts_with('©')
            && !text.starts_with("All rights reserved")
            && !text.starts_with("Privacy Policy")
        {
            texts.push(text);
        }
    }
    texts
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Headings (h1-h3) and paragraph-ish blocks, deduplicated and capped.
pub fn content(doc: &Html) -> PageContent {
    const FILTER_TERMS: [&str; 3] = ["cookie", "privacy", "terms"];
    const MAX_HEADINGS: usize = 30;
    const MAX_PARAGRAPHS: usize = 50;

    let mut content = PageContent::default();

    let mut seen_headings = HashSet::new();
    for heading in doc.select(&sel("h1, h2, h3")) {
        let text = normalize_ws(&heading.text().collect::<String>());
        let lower = text.to_lowercase();
        if text.len() > 5
            && !seen_headings.contains(&text)
            && !FILTER_TERMS.iter().any(|x| lower.contains(x))
        {
            seen_headings.insert(text.clone());
            content.headings.push(text);
            if content.headings.len() >= MAX_HEADINGS {
                break;
            }
        }
    }

    let mut seen_paragraphs = HashSet::new();
    for block in doc.select(&sel("p, article, section")) {
        let text = normalize_ws(&block.text().collect::<String>());
        let lower = text.to_lowercase();
        if text.len() > 30
            && !seen_paragraphs.contains(&text)
            && !FILTER_TERMS.iter().any(|x| lower.contains(x))
            && !text.starts_with('©')
            && !text.starts_with("All rights reserved")
        {
            seen_paragraphs.insert(text.clone());
            content.paragraphs.push(text);
            if content.paragraphs.len() >= MAX_PARAGRAPHS {
                break;
            }
        }
    }

    content
}

const SOCIAL_PATTERNS: [(&str, &[&str]); 12] = [
    (
        "facebook",
        &[
            r"facebook\.com/(?:pages/)?(?:[\w\-.]+/)*[\w\-.]+/?",
            r"fb\.com/[\w\-.]+/?",
            r"fb\.me/[\w\-.]+/?",
        ],
    ),
    ("twitter", &[r"twitter\.com/\w+/?", r"x\.com/\w+/?"]),
    (
        "linkedin",
        &[r"linkedin\.com/company/[\w-]+/?", r"linkedin\.com/in/[\w-]+/?"],
    ),
    (
        "instagram",
        &[r"instagram\.com/[\w.\-]+/?", r"instagr\.am/[\w.\-]+/?"],
    ),
    (
        "youtube",
        &[
            r"youtube\.com/c/[\w-]+/?",
            r"youtube\.com/channel/[\w-]+/?",
            r"youtube\.com/user/[\w-]+/?",
            r"youtube\.com/@[\w-]+/?",
            r"youtu\.be/[\w-]+/?",
        ],
    ),
    ("tiktok", &[r"tiktok\.com/@[\w.\-]+/?"]),
    ("github", &[r"github\.com/[\w\-.]+/?"]),
    ("pinterest", &[r"pinterest\.com/[\w-]+/?"]),
    (
        "discord",
        &[r"discord\.gg/[\w-]+/?", r"discord\.com/invite/[\w-]+/?"],
    ),
    ("telegram", &[r"t\.me/[\w-]+/?"]),
    ("whatsapp", &[r"wa\.me/\d+/?"]),
    (
        "reddit",
        &[r"reddit\.com/r/[\w-]+/?", r"reddit\.com/u/[\w-]+/?"],
    ),
];

fn social_regexes() -> &'static Vec<(&'static str, Vec<Regex>)> {
    static COMPILED: OnceLock<Vec<(&'static str, Vec<Regex>)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        SOCIAL_PATTERNS
            .iter()
            .map(|(platform, patterns)| {
                let regexes = patterns
                    .iter()
                    .map(|p| Regex::new(&format!("(?i){}", p)).expect("static social pattern"))
                    .collect();
                (*platform, regexes)
            })
            .collect()
    })
}

/// Social media profile links from anchors, raw text and meta tags.
pub fn social_media(doc: &Html, base_url: &str) -> SocialMediaLinks {
    let mut links = SocialMediaLinks::new();
    let base = Url::parse(base_url).ok();

    let mut consider = |candidate: &str| {
        for (platform, regexes) in social_regexes() {
            for re in regexes {
                if re.is_match(candidate) {
                    let url = if candidate.starts_with("http://") || candidate.starts_with("https://")
                    {
                        candidate.to_string()
                    } else {
                        format!("https://{}", candidate)
                    };
                    if is_valid_social_url(&url, platform) {
                        let cleaned = clean_url(&url);
                        let entry = links.entry(platform.to_string()).or_default();
                        if !entry.contains(&cleaned) {
                            entry.push(cleaned);
                        }
                    }
                    break;
                }
            }
        }
    };

    for link in doc.select(&sel("a[href]")) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty()
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }
        let absolute = if href.starts_with('/') {
            match &base {
                Some(base) => match base.join(href) {
                    Ok(joined) => joined.to_string(),
                    Err(_) => continue,
                },
                None => continue,
            }
        } else {
            href.to_string()
        };
        consider(&absolute);
    }

    let text: String = doc.root_element().text().collect::<Vec<_>>().join(" ");
    for word in text.split_whitespace() {
        consider(word);
    }

    for meta in doc.select(&sel("meta[content]")) {
        if let Some(meta_content) = meta.value().attr("content") {
            consider(meta_content);
        }
    }

    links
}

fn is_valid_social_url(url: &str, platform: &str) -> bool {
    if url.len() < 10 {
        return false;
    }
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if parsed.host_str().is_none() {
        return false;
    }

    let path = parsed.path().to_lowercase();
    match platform {
        "facebook" => !["/login", "/signup", "/home", "/pages/create", "/help"]
            .iter()
            .any(|p| path.contains(p)),
        "twitter" => !["/login", "/signup", "/home", "/explore", "/notifications"]
            .iter()
            .any(|p| path.contains(p)),
        "linkedin" => path.contains("/company/") || path.contains("/in/"),
        _ => true,
    }
}

/// Strip tracking query parameters and trailing slashes.
pub fn clean_url(url: &str) -> String {
    const TRACKING_PARAMS: [&str; 15] = [
        "utm_source",
        "utm_medium",
        "utm_campaign",
        "utm_content",
        "utm_term",
        "fbclid",
        "gclid",
        "msclkid",
        "ref",
        "referrer",
        "source",
        "_ga",
        "_gac",
        "_gid",
        "igshid",
    ];

    let trimmed = url.trim().trim_end_matches('/');
    let Ok(mut parsed) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed
            .query_pairs_mut()
            .clear()
            .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }

    parsed.to_string().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_name_prefers_og_title() {
        let doc = Html::parse_document(
            r#"<html><head><meta property="og:title" content="Acme AB">
               <title>Acme - Official Website</title></head></html>"#,
        );
        assert_eq!(company_name(&doc).as_deref(), Some("Acme AB"));
    }

    #[test]
    fn test_company_name_strips_title_suffix() {
        let doc = Html::parse_document(
            "<html><head><title>Acme Industrier - Home of automation</title></head></html>",
        );
        assert_eq!(company_name(&doc).as_deref(), Some("Acme Industrier"));
    }

    #[test]
    fn test_description_from_meta() {
        let doc = Html::parse_document(
            r#"<head><meta name="description" content="We build industrial control systems for Nordic factories."></head>"#,
        );
        assert_eq!(
            description(&doc).as_deref(),
            Some("We build industrial control systems for Nordic factories.")
        );
    }

    #[test]
    fn test_description_skips_cookie_banners() {
        let doc = Html::parse_document(
            r#"<head><meta name="description" content="This site uses cookie consent banners everywhere"></head>"#,
        );
        assert!(description(&doc).is_none());
    }

    #[test]
    fn test_social_media_from_anchors() {
        let doc = Html::parse_document(
            r#"<body>
              <a href="https://www.linkedin.com/company/acme-ab">LinkedIn</a>
              <a href="https://facebook.com/acmeab?utm_source=footer">Facebook</a>
              <a href="https://www.linkedin.com/login">ignore</a>
            </body>"#,
        );
        let links = social_media(&doc, "https://acme.se");
        assert!(links["linkedin"][0].contains("/company/acme-ab"));
        assert!(!links["facebook"][0].contains("utm_source"));
        assert_eq!(links["linkedin"].len(), 1);
    }

    #[test]
    fn test_content_collects_and_filters() {
        let doc = Html::parse_document(
            "<body><h1>Industrial automation for the Nordics</h1>
             <h2>Cookie settings</h2>
             <p>We design, deliver and service control systems for factories across Sweden.</p>
             <p>short</p></body>",
        );
        let content = content(&doc);
        assert_eq!(content.headings.len(), 1);
        assert_eq!(content.paragraphs.len(), 1);
        assert!(content.paragraphs[0].contains("control systems"));
    }

    #[test]
    fn test_clean_url_keeps_real_params() {
        assert_eq!(
            clean_url("https://x.com/acme?utm_source=a&page=2"),
            "https://x.com/acme?page=2"
        );
        assert_eq!(clean_url("https://x.com/acme/"), "https://x.com/acme");
    }
}
