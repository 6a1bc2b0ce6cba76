//! Apollo enrichment collaborator: organization search + enrichment and
//! people search + bulk enrichment.
//!
//! The pipeline consumes these through the `CompanyDirectory` and
//! `PeopleDirectory` traits; `ApolloClient` is the production implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{CompanyPreferences, CompanyRecord, PersonRecord, SearchStrategy};

/// Seniorities worth contacting for an executive placement.
const PERSON_SENIORITIES: &[&str] = &["owner", "founder", "c_suite"];

/// Bulk person enrichment takes at most this many ids per call.
const ENRICH_CHUNK_SIZE: usize = 10;

/// One organization surfaced by search: the vendor id (absent for manual
/// domain entries) and the primary domain used for enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationHit {
    pub vendor_id: Option<String>,
    pub domain: String,
}

#[async_trait]
pub trait CompanyDirectory: Send + Sync {
    /// Find candidate organizations for the given preferences. Manual
    /// strategy bypasses the vendor search and uses the explicit domain
    /// list; smart and hybrid search by location, category and funding
    /// stage filters.
    async fn search_organizations(
        &self,
        preferences: &CompanyPreferences,
        strategy: SearchStrategy,
        manual_domains: &[String],
    ) -> Result<Vec<OrganizationHit>>;

    /// Full enrichment snapshot for one domain. `None` when the vendor has
    /// no organization for it.
    async fn enrich_organization(&self, domain: &str) -> Result<Option<CompanyRecord>>;
}

#[async_trait]
pub trait PeopleDirectory: Send + Sync {
    /// Vendor person ids for decision makers at the given organizations.
    async fn search_people(&self, organization_ids: &[String]) -> Result<Vec<String>>;

    /// Full person records for the given vendor ids.
    async fn enrich_people(&self, person_ids: &[String]) -> Result<Vec<PersonRecord>>;
}

/// Vendor funding-stage codes for the preference vocabulary. Unknown stages
/// are dropped from the filter rather than failing the search.
fn funding_stage_codes(stages: &[String]) -> Vec<i64> {
    stages
        .iter()
        .filter_map(|stage| match stage.as_str() {
            "seed" => Some(0),
            "angel" => Some(1),
            "series_a" => Some(2),
            "series_b" => Some(3),
            "series_c" => Some(4),
            "series_d" => Some(5),
            "series_e" => Some(6),
            "series_f" => Some(7),
            "venture" => Some(10),
            "private_equity" => Some(11),
            "other" => Some(12),
            "debt_financing" => Some(13),
            "equity_crowdfunding" => Some(14),
            "convertible_note" => Some(15),
            _ => None,
        })
        .collect()
}

/// A lone "remote" location is not a geography filter.
fn location_filter(locations: &[String]) -> Vec<String> {
    if locations.len() == 1 && locations[0] == "remote" {
        return Vec::new();
    }
    locations.to_vec()
}

/// Drop hits without a domain and collapse duplicate (vendor id, domain)
/// pairs, keeping first-seen order.
fn dedup_hits(hits: Vec<OrganizationHit>) -> Vec<OrganizationHit> {
    let mut seen = std::collections::HashSet::new();
    hits.into_iter()
        .filter(|hit| !hit.domain.is_empty())
        .filter(|hit| seen.insert((hit.vendor_id.clone(), hit.domain.clone())))
        .collect()
}

pub struct ApolloClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchOrganizationsResponse {
    #[serde(default)]
    organizations: Vec<OrganizationSummary>,
}

#[derive(Debug, Deserialize)]
struct OrganizationSummary {
    id: String,
    #[serde(default)]
    primary_domain: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnrichOrganizationResponse {
    #[serde(default)]
    organization: Option<CompanyRecord>,
}

#[derive(Debug, Deserialize)]
struct SearchPeopleResponse {
    #[serde(default)]
    people: Vec<PersonSummary>,
}

#[derive(Debug, Deserialize)]
struct PersonSummary {
    id: String,
}

#[derive(Debug, Deserialize)]
struct EnrichPeopleResponse {
    #[serde(default)]
    matches: Vec<PersonRecord>,
}

impl ApolloClient {
    pub fn new(api_key: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header("accept", "application/json")
            .header("Cache-Control", "no-cache")
            .header("x-api-key", &self.api_key)
    }

    async fn search_organizations_remote(
        &self,
        preferences: &CompanyPreferences,
    ) -> Result<Vec<OrganizationHit>> {
        let locations = location_filter(&preferences.locations);
        let mut query: Vec<(&str, String)> = Vec::new();
        for location in &locations {
            query.push(("organization_locations[]", location.clone()));
        }
        for category in &preferences.categories {
            query.push(("q_organization_keyword_tags[]", category.clone()));
        }
        for code in funding_stage_codes(&preferences.funding_stages) {
            query.push(("organization_latest_funding_stage_cd[]", code.to_string()));
        }
        query.push(("page", "1".to_string()));
        query.push(("per_page", "20".to_string()));

        let resp: SearchOrganizationsResponse = self
            .post("/mixed_companies/search")
            .query(&query)
            .send()
            .await
            .context("Failed to send organization search request")?
            .error_for_status()
            .context("Organization search returned error status")?
            .json()
            .await
            .context("Failed to parse organization search response")?;

        Ok(resp
            .organizations
            .into_iter()
            .filter_map(|org| {
                org.primary_domain.map(|domain| OrganizationHit {
                    vendor_id: Some(org.id),
                    domain,
                })
            })
            .collect())
    }
}

#[async_trait]
impl CompanyDirectory for ApolloClient {
    async fn search_organizations(
        &self,
        preferences: &CompanyPreferences,
        strategy: SearchStrategy,
        manual_domains: &[String],
    ) -> Result<Vec<OrganizationHit>> {
        let hits = match strategy {
            SearchStrategy::Smart | SearchStrategy::Hybrid => {
                self.search_organizations_remote(preferences).await?
            }
            SearchStrategy::Manual => manual_domains
                .iter()
                .map(|domain| OrganizationHit {
                    vendor_id: None,
                    domain: domain.clone(),
                })
                .collect(),
        };
        Ok(dedup_hits(hits))
    }

    async fn enrich_organization(&self, domain: &str) -> Result<Option<CompanyRecord>> {
        let resp: EnrichOrganizationResponse = self
            .post("/organizations/enrich")
            .query(&[("domain", domain)])
            .send()
            .await
            .context("Failed to send organization enrich request")?
            .error_for_status()
            .context("Organization enrich returned error status")?
            .json()
            .await
            .context("Failed to parse organization enrich response")?;
        Ok(resp.organization)
    }
}

#[async_trait]
impl PeopleDirectory for ApolloClient {
    async fn search_people(&self, organization_ids: &[String]) -> Result<Vec<String>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        for seniority in PERSON_SENIORITIES {
            query.push(("person_seniorities[]", seniority.to_string()));
        }
        for id in organization_ids {
            query.push(("organization_ids[]", id.clone()));
        }
        query.push(("per_page", "40".to_string()));

        let resp: SearchPeopleResponse = self
            .post("/mixed_people/api_search")
            .query(&query)
            .send()
            .await
            .context("Failed to send people search request")?
            .error_for_status()
            .context("People search returned error status")?
            .json()
            .await
            .context("Failed to parse people search response")?;

        Ok(resp.people.into_iter().map(|p| p.id).collect())
    }

    async fn enrich_people(&self, person_ids: &[String]) -> Result<Vec<PersonRecord>> {
        let mut enriched = Vec::new();
        for chunk in person_ids.chunks(ENRICH_CHUNK_SIZE) {
            let details: Vec<serde_json::Value> = chunk
                .iter()
                .map(|id| serde_json::json!({ "id": id }))
                .collect();
            let resp: EnrichPeopleResponse = self
                .post("/people/bulk_match")
                .query(&[
                    ("reveal_personal_emails", "true"),
                    ("reveal_phone_number", "false"),
                ])
                .json(&serde_json::json!({ "details": details }))
                .send()
                .await
                .context("Failed to send people enrich request")?
                .error_for_status()
                .context("People enrich returned error status")?
                .json()
                .await
                .context("Failed to parse people enrich response")?;
            enriched.extend(resp.matches);
        }
        Ok(enriched)
    }
}
