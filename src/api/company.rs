//! Query resolution API.
//!
//! Turns free-form input (an email address or a company name) into an org
//! number, and optionally a full company profile.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::domain::query::{validate_input, valid_domain, InputKind};
use crate::error::{ApiError, ApiResult};
use crate::middleware::RequireApiKey;
use crate::services::profile;
use crate::services::scrape::search;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct OrgNumberResponse {
    pub query: String,
    pub company_name: String,
    pub org_number: String,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/org-number", get(resolve_org_number))
        .route("/company-data", get(company_data))
}

/// Resolve the input to a searchable company name.
async fn resolve_company_name(
    state: &Arc<AppState>,
    query: &str,
) -> ApiResult<String> {
    let validated = validate_input(query);
    if !validated.is_valid {
        return Err(ApiError::bad_request(
            "Query must be an email address or a company name",
        ));
    }

    match validated.kind {
        InputKind::Email => {
            let domain = validated
                .cleaned_input
                .split('@')
                .next_back()
                .unwrap_or_default();
            if !valid_domain(domain) {
                return Err(ApiError::bad_request(
                    "Email domain is a generic provider and cannot identify a company",
                ));
            }
            Ok(search::search_company_from_email(
                state.fetcher.client(),
                &validated.cleaned_input,
            )
            .await)
        }
        _ => Ok(validated.cleaned_input),
    }
}

/// GET /org-number?query=<company_name_or_email>
///
/// Requires API key when one is configured.
async fn resolve_org_number(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> ApiResult<impl IntoResponse> {
    let company_name = resolve_company_name(&state, &params.query).await?;

    let org_number = search::find_org_number(
        state.fetcher.client(),
        state.registry.base_url(),
        &company_name,
    )
    .await
    .ok_or_else(|| ApiError::not_found(format!("Org number for '{}'", company_name)))?;

    info!(query = %params.query, company = %company_name, org_number = %org_number, "Org number resolved");

    Ok(Json(OrgNumberResponse {
        query: params.query,
        company_name,
        org_number,
    }))
}

/// GET /company-data?query=<company_name_or_email>
///
/// Requires API key when one is configured.
async fn company_data(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> ApiResult<impl IntoResponse> {
    let company_name = resolve_company_name(&state, &params.query).await?;

    let org_number = search::find_org_number(
        state.fetcher.client(),
        state.registry.base_url(),
        &company_name,
    )
    .await
    .ok_or_else(|| ApiError::not_found(format!("Org number for '{}'", company_name)))?;

    let profile = profile::get_company_data(&state, &org_number, None)
        .await
        .ok_or_else(|| ApiError::not_found("Company data"))?;

    Ok(Json(profile))
}
