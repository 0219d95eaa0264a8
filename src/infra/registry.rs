//! Company registry HTTP client.
//!
//! Fetches raw company documents by org number and normalizes them into the
//! two views the rest of the service works with: the flat
//! [`CompanySummary`] and the deep [`FullProfile`].

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::company::{
    BoardMember, CompanySummary, FullProfile, Governance, SummaryLocation,
};

/// Registry lookup errors. A missing company is not an error, it is `None`.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("registry returned status {0}")]
    Status(StatusCode),
}

/// Company registry client with a pooled connection.
#[derive(Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("prospect-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the raw company document. `None` when the registry has no such
    /// org number.
    pub async fn fetch_raw(&self, org_number: &str) -> Result<Option<Value>, RegistryError> {
        let url = format!("{}/company/{}", self.base_url, org_number);

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                info!(org_number = %org_number, "Company not found in registry");
                Ok(None)
            }
            status if status.is_success() => {
                let doc = response.json::<Value>().await?;
                Ok(Some(doc))
            }
            status => {
                warn!(org_number = %org_number, status = %status, "Registry lookup failed");
                Err(RegistryError::Status(status))
            }
        }
    }

    /// Flat cleaned view of a company.
    pub async fn summary(&self, org_number: &str) -> Result<Option<CompanySummary>, RegistryError> {
        let raw = self.fetch_raw(org_number).await?;
        Ok(raw.as_ref().and_then(normalize_summary))
    }

    /// Deep normalized view of a company, for LLM evaluation.
    pub async fn full_profile(
        &self,
        org_number: &str,
    ) -> Result<Option<FullProfile>, RegistryError> {
        let raw = self.fetch_raw(org_number).await?;
        Ok(raw.as_ref().and_then(normalize_full))
    }
}

/// Navigate a nested document with a dot path.
fn safe_get<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

fn get_str(doc: &Value, path: &str) -> Option<String> {
    safe_get(doc, path)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn get_i64(doc: &Value, path: &str) -> Option<i64> {
    safe_get(doc, path).and_then(Value::as_i64)
}

fn get_clone(doc: &Value, path: &str) -> Value {
    safe_get(doc, path).cloned().unwrap_or(Value::Null)
}

/// Build the flat summary from a raw registry document.
pub fn normalize_summary(raw: &Value) -> Option<CompanySummary> {
    let company = raw.get("company")?;
    if !company.is_object() {
        return None;
    }

    let industries = company
        .get("industries")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let nace_industries = company
        .get("naceIndustries")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut summary = CompanySummary {
        name: get_str(company, "name"),
        org_number: get_str(company, "orgnr"),
        website: get_str(company, "homePage"),
        turnover: get_i64(company, "revenue"),
        turnover_range: get_str(company, "estimatedTurnover"),
        turnover_year: get_str(company, "turnoverYear"),
        registration_date: get_str(company, "registrationDate"),
        foundation_year: get_i64(company, "foundationYear"),
        employees: get_i64(company, "numberOfEmployees"),
        industry: get_str(company, "currentIndustry.name"),
        industries,
        nace_industries,
        location: SummaryLocation {
            region: get_str(company, "location.countryPart"),
            county: get_str(company, "location.county"),
            municipality: get_str(company, "location.municipality"),
        },
        value_proposition: get_str(company, "purpose"),
        business_type_guess: String::new(),
    };
    summary.business_type_guess = summary.guess_business_type().to_string();

    Some(summary)
}

/// Build the deep profile from a raw registry document.
pub fn normalize_full(raw: &Value) -> Option<FullProfile> {
    let company = raw.get("company")?;
    if !company.is_object() {
        return None;
    }

    Some(FullProfile {
        name: get_str(company, "name"),
        orgnr: get_str(company, "orgnr"),
        purpose: get_str(company, "purpose"),
        company_type: get_str(company, "legalForm.name"),
        contact: json!({
            "phone": company.get("phone").filter(|v| !v.is_null())
                .or_else(|| company.get("legalPhone")).cloned().unwrap_or(Value::Null),
            "email": get_clone(company, "email"),
            "website": get_clone(company, "homePage"),
            "contactPersons": get_clone(company, "contactPersons"),
        }),
        location: json!({
            "visitorAddress": get_clone(company, "visitorAddress"),
            "postalAddress": get_clone(company, "postalAddress"),
            "municipality": get_clone(company, "location.municipality"),
            "county": get_clone(company, "location.county"),
            "region": get_clone(company, "location.countryPart"),
            "coordinates": get_clone(company, "location.coordinates"),
        }),
        industry: json!({
            "mainSni": get_clone(company, "currentIndustry.code"),
            "mainSniName": get_clone(company, "currentIndustry.name"),
            "naceCodes": get_clone(company, "naceIndustries"),
            "industryHierarchy": get_clone(company, "industryHierarchy"),
        }),
        registration: json!({
            "legalForm": get_clone(company, "legalForm.name"),
            "companyTypeCode": get_clone(company, "legalForm.code"),
            "foundedDate": get_clone(company, "foundedDate"),
            "shareCapital_SEK": get_clone(company, "shareCapital"),
            "status": get_clone(company, "status.status"),
            "statusDate": get_clone(company, "status.statusDate"),
            "orgnr": get_clone(company, "orgnr"),
            "vatNumber": get_clone(company, "vatNumber"),
            "registeredForVAT": get_clone(company, "registeredForVat"),
            "registeredForPrepaymentTax": get_clone(company, "registeredForPrepayment"),
            "registeredForPayrollTax": get_clone(company, "registeredForPayrollTax"),
            "registeredForFskatt": get_clone(company, "fSkatt"),
            "registeredAuthorities": get_clone(company, "registeredAuthorities"),
        }),
        governance: Governance {
            board_members: normalize_roles(company.get("roles")),
            signatories: get_clone(company, "signatoryGroups"),
            owners: get_clone(company, "owners"),
        },
        financial_summary: json!({
            "turnoverRange_SEK": get_clone(company, "estimatedTurnover"),
            "employees": get_clone(company, "numberOfEmployees"),
            "revenue_SEK": get_clone(company, "revenue"),
            "profit_SEK": get_clone(company, "profit"),
            "equity_SEK": get_clone(company, "equity"),
            "assets_SEK": get_clone(company, "totalAssets"),
            "liabilities_SEK": get_clone(company, "totalLiabilities"),
            "profitMargin": get_clone(company, "profitMargin"),
            "liquidity": get_clone(company, "liquidity"),
            "solvency": get_clone(company, "solvency"),
            "cashFlow_SEK": get_clone(company, "cashFlow"),
            "taxDebt_SEK": get_clone(company, "taxDebt"),
        }),
        accounting_history: normalize_accounts(company),
        risks: json!({
            "paymentRemarks": get_clone(company, "paymentRemarks"),
            "collectionCases": get_clone(company, "collectionCases"),
            "bankruptcies": get_clone(company, "bankruptcies"),
            "mortgages": get_clone(company, "mortgages"),
            "encumbrances": get_clone(company, "encumbrances"),
            "creditRating": get_clone(company, "creditRating"),
            "riskClass": get_clone(company, "riskClass"),
        }),
        meta: json!({
            "lastUpdated": get_clone(company, "lastUpdated"),
            "sourceSystem": get_clone(company, "system"),
            "reportCount": get_clone(company, "numberOfAnnualReports"),
        }),
    })
}

/// Flatten the board/roles structure.
fn normalize_roles(roles_block: Option<&Value>) -> Vec<BoardMember> {
    let mut members = Vec::new();
    let Some(groups) = roles_block
        .and_then(|b| b.get("roleGroups"))
        .and_then(Value::as_array)
    else {
        return members;
    };

    for group in groups {
        let Some(roles) = group.get("roles").and_then(Value::as_array) else {
            continue;
        };
        for r in roles {
            members.push(BoardMember {
                name: r.get("name").and_then(Value::as_str).map(str::to_string),
                role: r.get("role").and_then(Value::as_str).map(str::to_string),
                from_date: r
                    .get("fromDate")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                birth_year: r.get("birthYear").and_then(Value::as_i64),
                city: r.get("city").and_then(Value::as_str).map(str::to_string),
                country: r.get("country").and_then(Value::as_str).map(str::to_string),
            });
        }
    }
    members
}

/// Full accounting history with every detailed row preserved.
fn normalize_accounts(company: &Value) -> Vec<Value> {
    let Some(accounts) = company.get("companyAccounts").and_then(Value::as_array) else {
        return Vec::new();
    };

    accounts
        .iter()
        .map(|yr| {
            json!({
                "year": get_clone(yr, "year"),
                "period": get_clone(yr, "period"),
                "lengthMonths": get_clone(yr, "lengthMonths"),
                "currency": get_clone(yr, "currency"),
                "consolidated": get_clone(yr, "isConsolidated"),
                "submittedDate": get_clone(yr, "submittedDate"),
                "accounts": yr.get("accounts").cloned().unwrap_or_else(|| json!([])),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> Value {
        json!({
            "company": {
                "name": "Acme Industrier AB",
                "orgnr": "556677-8899",
                "homePage": "https://acme.se",
                "revenue": 45_000,
                "estimatedTurnover": "20-50 MSEK",
                "turnoverYear": "2023",
                "registrationDate": "2009-04-15",
                "foundationYear": 2009,
                "numberOfEmployees": 42,
                "purpose": "Utveckling av industriella styrsystem",
                "currentIndustry": { "code": "26510", "name": "Industriell automation" },
                "industries": [
                    { "name": "Industriell automation" },
                    { "name": "Konsultverksamhet" }
                ],
                "naceIndustries": [ { "code": "26.51", "name": "Instrumenttillverkning" } ],
                "location": {
                    "countryPart": "Svealand",
                    "county": "Stockholms län",
                    "municipality": "Stockholm"
                },
                "legalForm": { "code": "AB", "name": "Aktiebolag" },
                "roles": {
                    "roleGroups": [
                        { "roles": [
                            { "name": "Anna Larsson", "role": "VD", "birthYear": 1978 }
                        ] }
                    ]
                },
                "companyAccounts": [
                    { "year": 2023, "currency": "SEK", "accounts": [ { "code": "NetSales" } ] }
                ]
            }
        })
    }

    #[test]
    fn test_normalize_summary() {
        let summary = normalize_summary(&sample_doc()).unwrap();
        assert_eq!(summary.name.as_deref(), Some("Acme Industrier AB"));
        assert_eq!(summary.org_number.as_deref(), Some("556677-8899"));
        assert_eq!(summary.industry.as_deref(), Some("Industriell automation"));
        assert_eq!(summary.industries.len(), 2);
        assert_eq!(summary.employees, Some(42));
        assert_eq!(summary.location.municipality.as_deref(), Some("Stockholm"));
        // "Konsultverksamhet" trips the B2B keyword heuristic
        assert_eq!(summary.business_type_guess, "B2B");
    }

    #[test]
    fn test_normalize_full() {
        let profile = normalize_full(&sample_doc()).unwrap();
        assert_eq!(profile.company_type.as_deref(), Some("Aktiebolag"));
        assert_eq!(profile.governance.board_members.len(), 1);
        assert_eq!(
            profile.governance.board_members[0].role.as_deref(),
            Some("VD")
        );
        assert_eq!(profile.accounting_history.len(), 1);
        assert_eq!(profile.accounting_history[0]["currency"], "SEK");
        assert_eq!(profile.industry["mainSniName"], "Industriell automation");
    }

    #[test]
    fn test_normalize_rejects_missing_company_key() {
        assert!(normalize_summary(&json!({"other": {}})).is_none());
        assert!(normalize_full(&json!("not an object")).is_none());
    }

    #[test]
    fn test_safe_get_dot_paths() {
        let doc = sample_doc();
        assert_eq!(
            safe_get(&doc, "company.legalForm.name").and_then(Value::as_str),
            Some("Aktiebolag")
        );
        assert!(safe_get(&doc, "company.missing.deep").is_none());
    }
}
