//! Lemlist campaign vendor collaborator: campaign creation, lead creation,
//! sequence steps and campaign pause.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A campaign created at the vendor. The sequence id is needed to attach
/// outreach steps.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCampaign {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "sequenceId")]
    pub sequence_id: String,
}

/// A lead created inside a campaign.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteLead {
    #[serde(rename = "_id")]
    pub id: String,
}

/// Payload for creating one lead. `variables` is the fixed-field role map —
/// every role field is present, unassigned ones as empty strings.
#[derive(Debug, Clone, Serialize)]
pub struct LeadRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub job_title: String,
    pub linkedin_url: String,
    pub company_domain: String,
    pub variables: BTreeMap<String, String>,
}

/// One step of the outreach sequence. Subject and body wording come from
/// configuration; this core only carries them through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceStep {
    pub subject: String,
    pub body: String,
    #[serde(default = "default_delay")]
    pub delay_days: u32,
}

fn default_delay() -> u32 {
    1
}

#[async_trait]
pub trait CampaignVendor: Send + Sync {
    async fn create_campaign(&self, name: &str) -> Result<RemoteCampaign>;

    /// Create a lead in a campaign, idempotent by email per campaign.
    /// Returns `Ok(None)` when the vendor reports the person already exists
    /// in another active campaign — a non-fatal empty result.
    async fn create_lead(&self, campaign_id: &str, lead: &LeadRequest)
    -> Result<Option<RemoteLead>>;

    async fn create_sequence_step(&self, sequence_id: &str, step: &SequenceStep) -> Result<()>;

    /// Halt outbound sending for a campaign (used before candidate deletion).
    async fn pause_campaign(&self, campaign_id: &str) -> Result<()>;
}

pub struct LemlistClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl LemlistClient {
    pub fn new(api_key: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Basic {}", self.api_key))
    }
}

#[async_trait]
impl CampaignVendor for LemlistClient {
    async fn create_campaign(&self, name: &str) -> Result<RemoteCampaign> {
        self.auth(self.client.post(self.url("/campaigns")))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .context("Failed to send campaign create request")?
            .error_for_status()
            .context("Campaign create returned error status")?
            .json::<RemoteCampaign>()
            .await
            .context("Failed to parse campaign create response")
    }

    async fn create_lead(
        &self,
        campaign_id: &str,
        lead: &LeadRequest,
    ) -> Result<Option<RemoteLead>> {
        let mut body = serde_json::json!({
            "firstName": lead.first_name,
            "lastName": lead.last_name,
            "companyName": lead.company_name,
            "jobTitle": lead.job_title,
            "linkedinUrl": lead.linkedin_url,
            "companyDomain": lead.company_domain,
        });
        for (key, value) in &lead.variables {
            body[key] = serde_json::Value::String(value.clone());
        }

        let resp = self
            .auth(
                self.client
                    .post(self.url(&format!("/campaigns/{}/leads/{}", campaign_id, lead.email))),
            )
            .json(&body)
            .send()
            .await
            .context("Failed to send lead create request")?;

        // The vendor answers 409 when the person is already enrolled in
        // another active campaign; that lead is skipped, not an error.
        if resp.status() == reqwest::StatusCode::CONFLICT {
            return Ok(None);
        }
        let lead = resp
            .error_for_status()
            .context("Lead create returned error status")?
            .json::<RemoteLead>()
            .await
            .context("Failed to parse lead create response")?;
        Ok(Some(lead))
    }

    async fn create_sequence_step(&self, sequence_id: &str, step: &SequenceStep) -> Result<()> {
        self.auth(
            self.client
                .post(self.url(&format!("/sequences/{}/steps", sequence_id))),
        )
        .json(&serde_json::json!({
            "type": "email",
            "subject": step.subject,
            "message": step.body,
            "delay": step.delay_days,
        }))
        .send()
        .await
        .context("Failed to send sequence step request")?
        .error_for_status()
        .context("Sequence step create returned error status")?;
        Ok(())
    }

    async fn pause_campaign(&self, campaign_id: &str) -> Result<()> {
        self.auth(
            self.client
                .post(self.url(&format!("/campaigns/{}/pause", campaign_id))),
        )
        .send()
        .await
        .context("Failed to send campaign pause request")?
        .error_for_status()
        .context("Campaign pause returned error status")?;
        Ok(())
    }
}
