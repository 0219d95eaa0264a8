//! LLM enrichment of company profiles.
//!
//! Summary and classification calls are best-effort; a failure leaves the
//! profile field empty or on its heuristic default.

use serde_json::Value;
use tracing::{info, warn};

use crate::domain::company::CompanySummary;
use crate::domain::contact::PhoneContact;
use crate::infra::llm::{self, ChatRequest, LlmClient};

/// Shared context block describing what we know about the company.
fn build_context(company_info: Option<&CompanySummary>, website_content: &str, limit: usize) -> String {
    let mut parts = Vec::new();

    if let Some(info) = company_info {
        parts.push("Company Registration Data:".to_string());
        if let Some(name) = &info.name {
            parts.push(format!("- Official name: {}", name));
        }
        if let Some(industry) = &info.industry {
            parts.push(format!("- Industry: {}", industry));
        }
        if !info.industries.is_empty() {
            parts.push(format!("- Industries: {}", info.industries.join(", ")));
        }
        if let Some(purpose) = &info.value_proposition {
            parts.push(format!("- Business purpose: {}", purpose));
        }
        if info.location.municipality.is_some() || info.location.county.is_some() {
            parts.push(format!(
                "- Location: {}, {}",
                info.location.municipality.as_deref().unwrap_or(""),
                info.location.county.as_deref().unwrap_or("")
            ));
        }
    }

    if !website_content.is_empty() {
        parts.push("\nWebsite Content:".to_string());
        let truncated: String = website_content.chars().take(limit).collect();
        parts.push(truncated);
    }

    parts.join("\n")
}

/// Generate the 4-5 sentence "about" summary.
pub async fn generate_company_summary(
    llm: &LlmClient,
    company_name: &str,
    website_content: &str,
    company_info: Option<&CompanySummary>,
) -> Option<String> {
    let context = build_context(company_info, website_content, 1000);

    let prompt = format!(
        "You are a business analyst. Create a concise, professional summary (4-5 sentences) \
         about {company_name} based on the available information.\n\n\
         The summary should be:\n\
         - Professional and factual\n\
         - 4-5 sentences maximum\n\
         - Focus on what the company does and who they serve\n\
         - Avoid marketing language or superlatives\n\
         - Avoid including any information about employees, revenue, or financials\n\
         - Also avoid mentioning the price of products or services\n\n\
         Available Information:\n{context}\n\n\
         Generate a brief company summary:"
    );

    let result = llm
        .chat(ChatRequest {
            model: llm::MODEL_STRUCTURED,
            system: None,
            user: &prompt,
            max_tokens: 150,
            temperature: 0.3,
            json_mode: false,
        })
        .await;

    match result {
        Ok(summary) if !summary.is_empty() => {
            info!(company = %company_name, "Company summary generated");
            Some(summary)
        }
        Ok(_) => None,
        Err(e) => {
            warn!(company = %company_name, error = %e, "Summary generation failed");
            None
        }
    }
}

/// Classify the company as B2B or B2C. Unclear answers default to B2B.
pub async fn determine_business_type(
    llm: &LlmClient,
    company_name: &str,
    website_content: &str,
    company_info: Option<&CompanySummary>,
) -> String {
    let context = build_context(company_info, website_content, 800);

    let prompt = format!(
        "Analyze {company_name} and determine if it's primarily a B2B (business-to-business) \
         or B2C (business-to-consumer) company.\n\n\
         B2B indicators:\n\
         - Sells to other businesses, organizations, or professionals\n\
         - Provides business services, consulting, or enterprise solutions\n\
         - Language focused on \"clients\", \"partners\", \"enterprise\"\n\n\
         B2C indicators:\n\
         - Sells directly to individual consumers\n\
         - Provides consumer products or services\n\
         - Language focused on \"customers\", personal benefits\n\n\
         Available Information:\n{context}\n\n\
         Based on this information, respond with ONLY one word: \"B2B\" or \"B2C\""
    );

    let result = llm
        .chat(ChatRequest {
            model: llm::MODEL_CLASSIFY,
            system: None,
            user: &prompt,
            max_tokens: 10,
            temperature: 0.1,
            json_mode: false,
        })
        .await;

    match result {
        Ok(answer) => {
            let answer = answer.trim().to_uppercase();
            if answer == "B2B" || answer == "B2C" {
                info!(company = %company_name, business_type = %answer, "Business type determined");
                answer
            } else {
                "B2B".to_string()
            }
        }
        Err(e) => {
            warn!(company = %company_name, error = %e, "Business type call failed, defaulting to B2B");
            "B2B".to_string()
        }
    }
}

/// Ask the LLM to weed out strings that are not real phone numbers.
/// Numbers are never reformatted; on any failure the input list survives.
pub async fn clean_phone_numbers(
    llm: &LlmClient,
    phones: &[PhoneContact],
) -> Option<Vec<PhoneContact>> {
    if phones.is_empty() {
        return None;
    }

    let system = r#"You are an expert in validating phone numbers.

Task:
- Take a list of dictionaries of phone numbers along with their source URLs.
- Keep all numbers that look like real phone numbers (digits with optional spaces, dashes, brackets, or leading zeros).
- Do NOT reformat, normalize, or change them in any way.
- Only discard if the number is clearly invalid (e.g., letters, symbols, or unrealistically short).
- If uncertain, keep the number instead of discarding.

Output:
- Return JSON strictly in this format:
  {"cleaned_phones": [{"phone": "original_number1", "source": "source url1"}]}
- Do not include explanations or extra text."#;

    let input = serde_json::to_string(phones).ok()?;
    let prompt = format!("Clean these phone numbers: {}", input);

    let content = llm
        .chat(ChatRequest {
            model: llm::MODEL_STRUCTURED,
            system: Some(system),
            user: &prompt,
            max_tokens: 200,
            temperature: 0.3,
            json_mode: true,
        })
        .await
        .ok()?;

    let value = llm::parse_json_response(&content)?;
    let cleaned = value.get("cleaned_phones")?;
    serde_json::from_value::<Vec<PhoneContact>>(cleaned.clone()).ok()
}

/// Ask the LLM whether a scraped URL is the company's official website,
/// returning a corrected URL when it is not.
pub async fn validate_website_url(
    llm: &LlmClient,
    company_name: &str,
    scraped_url: &str,
) -> Option<String> {
    let system = format!(
        "You are a web analyst. Your task is to verify if the following URL is the official \
         website for the company {company_name}: {scraped_url}.\n\
         If it is correct, confirm it.\n\
         If it is not correct, find the official website URL.\n\
         Use the following criteria to validate:\n\
         1. Prefer the domain that matches the official company name or common patterns (.com, .se, etc.).\n\
         2. Return only the final confirmed official URL strictly in JSON format like this: {{ \"url\": \"web_url\" }}."
    );

    let prompt = format!(
        "Analyze the URL and confirm if it is official. If not, provide the correct official \
         website URL for {company_name}."
    );

    let result = llm
        .chat(ChatRequest {
            model: llm::MODEL_STRUCTURED,
            system: Some(&system),
            user: &prompt,
            max_tokens: 200,
            temperature: 0.1,
            json_mode: true,
        })
        .await;

    match result {
        Ok(content) => {
            let url = llm::parse_json_response(&content)
                .and_then(|v: Value| v.get("url").and_then(Value::as_str).map(str::to_string));
            match &url {
                Some(url) => info!(company = %company_name, url = %url, "Website URL validated"),
                None => warn!(company = %company_name, "URL validation reply had no url field"),
            }
            url
        }
        Err(e) => {
            warn!(company = %company_name, error = %e, "URL validation failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::company::SummaryLocation;

    #[test]
    fn test_build_context_with_registry_data() {
        let info = CompanySummary {
            name: Some("Acme AB".to_string()),
            industry: Some("Automation".to_string()),
            value_proposition: Some("Styrsystem".to_string()),
            location: SummaryLocation {
                municipality: Some("Stockholm".to_string()),
                county: Some("Stockholms län".to_string()),
                region: None,
            },
            ..Default::default()
        };

        let context = build_context(Some(&info), "Website text here", 1000);
        assert!(context.contains("Official name: Acme AB"));
        assert!(context.contains("Industry: Automation"));
        assert!(context.contains("Location: Stockholm, Stockholms län"));
        assert!(context.contains("Website text here"));
    }

    #[test]
    fn test_build_context_truncates_website_content() {
        let long = "x".repeat(2000);
        let context = build_context(None, &long, 1000);
        assert!(context.len() < 1100);
    }
}
