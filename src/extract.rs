//! Extraction collaborator: turns raw candidate documents into a structured
//! profile blob and company preferences.
//!
//! The pipeline treats extraction as an opaque best-effort service behind a
//! narrow interface; the production client posts the documents to a
//! configured extraction endpoint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::CompanyPreferences;

/// Raw text of the candidate's source documents plus free-text notes.
/// Document-to-text conversion happens upstream of this pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSet {
    pub resume_text: String,
    pub transcript_text: String,
    pub notes: String,
}

/// Output of the extraction collaborator: an opaque profile blob plus the
/// structured preferences the company search consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedProfile {
    pub profile: serde_json::Value,
    pub preferences: CompanyPreferences,
}

#[async_trait]
pub trait CandidateExtractor: Send + Sync {
    async fn extract(&self, documents: &DocumentSet, role: &str) -> Result<ExtractedProfile>;
}

/// HTTP-backed extractor posting to a single extraction endpoint.
pub struct HttpExtractor {
    client: reqwest::Client,
    url: String,
}

impl HttpExtractor {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ExtractionRequest<'a> {
    resume: &'a str,
    transcript: &'a str,
    notes: &'a str,
    role: &'a str,
}

#[async_trait]
impl CandidateExtractor for HttpExtractor {
    async fn extract(&self, documents: &DocumentSet, role: &str) -> Result<ExtractedProfile> {
        self.client
            .post(&self.url)
            .json(&ExtractionRequest {
                resume: &documents.resume_text,
                transcript: &documents.transcript_text,
                notes: &documents.notes,
                role,
            })
            .send()
            .await
            .context("Failed to send extraction request")?
            .error_for_status()
            .context("Extraction service returned error status")?
            .json::<ExtractedProfile>()
            .await
            .context("Failed to parse extraction response")
    }
}
