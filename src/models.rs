use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::status::ProcessingStatus;

/// Where a candidate's resume came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeSource {
    Ashby,
    Local,
}

impl ResumeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ashby => "ashby",
            Self::Local => "local",
        }
    }
}

impl FromStr for ResumeSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ashby" => Ok(Self::Ashby),
            "local" => Ok(Self::Local),
            _ => Err(format!("Invalid resume source: {}", s)),
        }
    }
}

/// Where a candidate's call transcript came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptSource {
    Fathom,
    Local,
}

impl TranscriptSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fathom => "fathom",
            Self::Local => "local",
        }
    }
}

impl FromStr for TranscriptSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fathom" => Ok(Self::Fathom),
            "local" => Ok(Self::Local),
            _ => Err(format!("Invalid transcript source: {}", s)),
        }
    }
}

/// How the company-search stage selects organizations: vendor search from the
/// extracted preferences, or an explicit operator-supplied domain list.
/// (Smart and hybrid both search the vendor; hybrid additionally keeps the
/// manual list in play for enrichment.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    Smart,
    Hybrid,
    Manual,
}

impl SearchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Smart => "smart",
            Self::Hybrid => "hybrid",
            Self::Manual => "manual",
        }
    }
}

impl FromStr for SearchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smart" => Ok(Self::Smart),
            "hybrid" => Ok(Self::Hybrid),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("Invalid search strategy: {}", s)),
        }
    }
}

/// Structured company preferences produced by the extraction collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyPreferences {
    #[serde(default)]
    pub funding_stages: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub linkedin_url: String,
    pub role: String,
    pub additional_info: String,
    pub processing_status: ProcessingStatus,
    /// Opaque profile blob from the extraction collaborator.
    pub extracted_data: Option<serde_json::Value>,
    pub company_preferences: Option<CompanyPreferences>,
    pub resume_source: ResumeSource,
    pub resume_filename: String,
    pub transcript_source: TranscriptSource,
    pub transcript_filename: String,
    /// Stored at intake so a restart reuses the same search inputs.
    pub search_strategy: SearchStrategy,
    pub company_domains: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Intake payload for a new candidate. Everything else on the row is derived
/// by the pipeline.
#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub linkedin_url: String,
    pub role: String,
    pub additional_info: String,
    pub resume_source: ResumeSource,
    pub resume_filename: String,
    pub transcript_source: TranscriptSource,
    pub transcript_filename: String,
    pub search_strategy: SearchStrategy,
    pub company_domains: Vec<String>,
}

/// Vendor enrichment snapshot of a company, keyed by the vendor-assigned
/// `apollo_id`. Deserialized straight off the enrichment response (the
/// vendor calls the key `id`); re-enrichment overwrites every field but the
/// internal row id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    #[serde(rename = "id")]
    pub apollo_id: Option<String>,
    pub name: Option<String>,
    pub primary_domain: Option<String>,
    pub short_description: Option<String>,
    pub industry: Option<String>,
    pub latest_funding_stage: Option<String>,
    pub total_funding: Option<i64>,
    pub estimated_num_employees: Option<i64>,
    pub founded_year: Option<i64>,
    pub website_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub logo_url: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

/// A persisted company row (internal id + snapshot fields).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub apollo_id: String,
    pub name: Option<String>,
    pub primary_domain: Option<String>,
    pub short_description: Option<String>,
    pub industry: Option<String>,
    pub latest_funding_stage: Option<String>,
    pub total_funding: Option<i64>,
    pub estimated_num_employees: Option<i64>,
    pub founded_year: Option<i64>,
    pub website_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub logo_url: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub updated_at: String,
}

/// Vendor enrichment snapshot of a person, keyed by `apollo_id`.
/// `organization_id` is the vendor id of the employing company and is used to
/// map the person onto a persisted company row; it is not stored itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    #[serde(rename = "id")]
    pub apollo_id: Option<String>,
    pub organization_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub seniority: Option<String>,
    pub headline: Option<String>,
    pub email: Option<String>,
    pub email_status: Option<String>,
    pub linkedin_url: Option<String>,
    pub photo_url: Option<String>,
}

/// A persisted decision maker. A null email disqualifies the person from
/// outreach but not from storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionMaker {
    pub id: i64,
    pub company_id: i64,
    pub apollo_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub seniority: Option<String>,
    pub headline: Option<String>,
    pub email: Option<String>,
    pub email_status: Option<String>,
    pub linkedin_url: Option<String>,
    pub photo_url: Option<String>,
    pub updated_at: String,
}

/// Associates a candidate with a discovered company.
/// `approved_by_candidate` is tri-state: unset until the candidate acts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanySelection {
    pub id: i64,
    pub candidate_id: i64,
    pub company_id: i64,
    pub approved_by_candidate: Option<bool>,
    pub created_at: String,
}

/// Associates a candidate with its (single) outbound vendor campaign.
/// Existence of this row is the idempotency guard against creating a second
/// campaign for the same candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignLink {
    pub id: i64,
    pub candidate_id: i64,
    pub campaign_id: String,
    pub sequence_id: String,
    pub created_at: String,
}
