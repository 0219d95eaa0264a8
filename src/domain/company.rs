//! Company profile models.
//!
//! Two registry views exist side by side: [`CompanySummary`] is the flat
//! cleaned record used to build API responses, [`FullProfile`] is the deep
//! normalization handed to the LLM for criteria matching.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::contact::ScrapedContacts;

/// Region / county / municipality triple as exposed in responses.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Location {
    #[serde(rename = "countryPart")]
    pub country_part: String,
    pub county: String,
    pub municipality: String,
}

/// The structured company profile returned by the API.
///
/// Field names mirror the established response contract, casing included.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub about: String,
    pub scraped_data: ScrapedContacts,
    #[serde(rename = "Websites")]
    pub websites: Vec<String>,
    #[serde(rename = "CompanyName")]
    pub company_name: String,
    #[serde(rename = "OrgNumber")]
    pub org_number: String,
    #[serde(rename = "currentIndustry")]
    pub current_industry: String,
    pub industries: Vec<String>,
    #[serde(rename = "naceIndustries")]
    pub nace_industries: Vec<Value>,
    #[serde(rename = "Location")]
    pub location: Location,
    #[serde(rename = "Revenue")]
    pub revenue: String,
    #[serde(rename = "estimatedTurnover")]
    pub estimated_turnover: String,
    pub foundationyear: String,
    #[serde(rename = "registrationDate")]
    pub registration_date: String,
    #[serde(rename = "foundationDate")]
    pub foundation_date: String,
    #[serde(rename = "turnoverYear")]
    pub turnover_year: String,
    #[serde(rename = "Employees")]
    pub employees: String,
    #[serde(rename = "valueProposition")]
    pub value_proposition: String,
    pub business_type_guess: String,
}

impl CompanyProfile {
    /// The all-empty profile returned when the registry has nothing.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Flat cleaned registry record.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CompanySummary {
    pub name: Option<String>,
    pub org_number: Option<String>,
    pub website: Option<String>,
    pub turnover: Option<i64>,
    pub turnover_range: Option<String>,
    #[serde(rename = "turnoverYear")]
    pub turnover_year: Option<String>,
    pub registration_date: Option<String>,
    pub foundation_year: Option<i64>,
    pub employees: Option<i64>,
    pub industry: Option<String>,
    pub industries: Vec<String>,
    pub nace_industries: Vec<Value>,
    pub location: SummaryLocation,
    pub value_proposition: Option<String>,
    pub business_type_guess: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SummaryLocation {
    pub region: Option<String>,
    pub county: Option<String>,
    pub municipality: Option<String>,
}

impl CompanySummary {
    /// Keyword heuristic over industry names: default guess before the LLM
    /// has a say.
    pub fn guess_business_type(&self) -> &'static str {
        const B2B_KEYWORDS: [&str; 5] =
            ["företag", "business", "konsult", "utveckling", "organisation"];

        let mut text = self.industries.join(" ");
        for nace in &self.nace_industries {
            if let Some(s) = nace.as_str() {
                text.push(' ');
                text.push_str(s);
            } else if let Some(name) = nace.get("name").and_then(Value::as_str) {
                text.push(' ');
                text.push_str(name);
            }
        }
        let text = text.to_lowercase();

        if B2B_KEYWORDS.iter().any(|k| text.contains(k)) {
            "B2B"
        } else {
            "B2C"
        }
    }
}

/// One board member entry from the registry roles block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoardMember {
    pub name: Option<String>,
    pub role: Option<String>,
    #[serde(rename = "fromDate")]
    pub from_date: Option<String>,
    #[serde(rename = "birthYear")]
    pub birth_year: Option<i64>,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// Deep registry normalization handed to the LLM evaluator.
///
/// Nested blocks stay as raw JSON where the registry schema is open-ended;
/// the accounting rows in particular are preserved untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FullProfile {
    pub name: Option<String>,
    pub orgnr: Option<String>,
    pub purpose: Option<String>,
    #[serde(rename = "companyType")]
    pub company_type: Option<String>,
    pub contact: Value,
    pub location: Value,
    pub industry: Value,
    pub registration: Value,
    pub governance: Governance,
    #[serde(rename = "financialSummary")]
    pub financial_summary: Value,
    #[serde(rename = "accountingHistory")]
    pub accounting_history: Vec<Value>,
    pub risks: Value,
    pub meta: Value,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Governance {
    #[serde(rename = "boardMembers")]
    pub board_members: Vec<BoardMember>,
    pub signatories: Value,
    pub owners: Value,
}

/// Convert `YYYY-MM-DD` to `DD.MM.YYYY`; anything else passes through.
pub fn format_date(date: &str) -> String {
    let parts: Vec<&str> = date.split('-').collect();
    if parts.len() == 3 {
        format!("{}.{}.{}", parts[2], parts[1], parts[0])
    } else {
        date.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2019-03-28"), "28.03.2019");
        assert_eq!(format_date("2019"), "2019");
        assert_eq!(format_date(""), "");
    }

    #[test]
    fn test_business_type_guess_b2b() {
        let summary = CompanySummary {
            industries: vec!["Konsultverksamhet".to_string()],
            ..Default::default()
        };
        assert_eq!(summary.guess_business_type(), "B2B");
    }

    #[test]
    fn test_business_type_guess_b2c_by_default() {
        let summary = CompanySummary {
            industries: vec!["Restaurang".to_string()],
            ..Default::default()
        };
        assert_eq!(summary.guess_business_type(), "B2C");
    }

    #[test]
    fn test_business_type_guess_reads_nace_objects() {
        let summary = CompanySummary {
            nace_industries: vec![json!({"code": "62010", "name": "Systemutveckling"})],
            ..Default::default()
        };
        assert_eq!(summary.guess_business_type(), "B2B");
    }

    #[test]
    fn test_profile_serializes_with_contract_casing() {
        let profile = CompanyProfile::empty();
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("CompanyName").is_some());
        assert!(json.get("OrgNumber").is_some());
        assert!(json.get("currentIndustry").is_some());
        assert!(json["Location"].get("countryPart").is_some());
        assert!(json["scraped_data"].get("Emails").is_some());
    }
}
