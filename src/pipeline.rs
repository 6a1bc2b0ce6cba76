//! Pipeline orchestrator.
//!
//! Drives the chain `extract → search-companies → (await approval) →
//! find-decision-makers → (await approval) → create-campaign`. The automatic
//! stages arrive as `StageTask`s; the approval edges are the public methods
//! invoked by external callers. Every stage opens with a compare-and-set
//! status assertion so duplicate or late deliveries are rejected without
//! side effects, and every unhandled stage error drives the candidate to
//! `failed` and stops the chain.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::apollo::{CompanyDirectory, PeopleDirectory};
use crate::assignment::{DecisionMakerDescriptor, RankingOracle, assign_roles};
use crate::db::DbHandle;
use crate::enrich;
use crate::errors::PipelineError;
use crate::extract::{CandidateExtractor, DocumentSet};
use crate::lemlist::{CampaignVendor, LeadRequest, SequenceStep};
use crate::models::{CampaignLink, Candidate, Company, NewCandidate, PersonRecord};
use crate::queue::{StageTask, TaskQueue};
use crate::status::{ProcessingStatus, StatusEvent};

/// The external collaborators a pipeline run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub extractor: Arc<dyn CandidateExtractor>,
    pub companies: Arc<dyn CompanyDirectory>,
    pub people: Arc<dyn PeopleDirectory>,
    pub campaigns: Arc<dyn CampaignVendor>,
    pub oracle: Arc<dyn RankingOracle>,
}

/// Upper bounds on outbound collaborator calls. An elapsed timeout fails the
/// stage the same way a collaborator error does.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub extractor: Duration,
    pub apollo: Duration,
    pub lemlist: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            extractor: Duration::from_secs(60),
            apollo: Duration::from_secs(30),
            lemlist: Duration::from_secs(30),
        }
    }
}

pub struct Orchestrator {
    db: DbHandle,
    collaborators: Collaborators,
    queue: TaskQueue,
    timeouts: Timeouts,
    sequence_steps: Vec<SequenceStep>,
}

impl Orchestrator {
    pub fn new(
        db: DbHandle,
        collaborators: Collaborators,
        queue: TaskQueue,
        timeouts: Timeouts,
        sequence_steps: Vec<SequenceStep>,
    ) -> Self {
        Self {
            db,
            collaborators,
            queue,
            timeouts,
            sequence_steps,
        }
    }

    // ── External entry points ─────────────────────────────────────────

    /// Intake a new candidate and kick off extraction.
    pub async fn intake(
        &self,
        new: NewCandidate,
        documents: DocumentSet,
    ) -> Result<Candidate, PipelineError> {
        let candidate = self
            .db
            .call(move |db| db.create_candidate(&new))
            .await
            .map_err(PipelineError::from_db)?;
        tracing::info!(candidate_id = candidate.id, "candidate created");
        self.queue.enqueue(StageTask::Extract {
            candidate_id: candidate.id,
            documents,
        });
        Ok(candidate)
    }

    /// Human restart after a failure: re-run extraction with fresh document
    /// text, reusing the candidate's stored search strategy and domain list.
    /// Only legal when the extract stage's pre-state holds.
    pub async fn restart(
        &self,
        candidate_id: i64,
        documents: DocumentSet,
    ) -> Result<(), PipelineError> {
        let candidate = self.candidate(candidate_id).await?;
        // Dry-run the edge so a mid-pipeline restart is rejected now rather
        // than as a dead task later.
        candidate
            .processing_status
            .apply(StatusEvent::StartExtraction)?;
        self.queue.enqueue(StageTask::Extract {
            candidate_id,
            documents,
        });
        Ok(())
    }

    /// Admin action: put the matched companies in front of the candidate.
    /// Asking again while already pending is a conflict (the approval
    /// request was already sent).
    pub async fn request_candidate_approval(
        &self,
        candidate_id: i64,
    ) -> Result<ProcessingStatus, PipelineError> {
        let status = self.advance(candidate_id, StatusEvent::ApprovalRequested).await?;
        tracing::info!(candidate_id, "candidate approval requested");
        Ok(status)
    }

    /// Candidate action: record per-company approval flags and continue the
    /// chain into decision-maker discovery.
    pub async fn approve_companies(
        &self,
        candidate_id: i64,
        approvals: Vec<(i64, bool)>,
    ) -> Result<ProcessingStatus, PipelineError> {
        let approved = approvals.iter().filter(|(_, a)| *a).count();
        let status = self
            .db
            .call(move |db| db.approve_companies(candidate_id, &approvals))
            .await
            .map_err(PipelineError::from_db)?;
        tracing::info!(candidate_id, approved, "company approvals recorded");
        self.queue.enqueue(StageTask::FindDecisionMakers { candidate_id });
        Ok(status)
    }

    /// Admin action: create the vendor campaign for a candidate.
    ///
    /// Guard order matters: an existing `CampaignLink` or a
    /// campaign_creating/campaign_created status rejects the request as a
    /// conflict before any vendor call is made, so retries and double-clicks
    /// can never produce a second campaign.
    pub async fn request_campaign(
        &self,
        candidate_id: i64,
        name: &str,
    ) -> Result<CampaignLink, PipelineError> {
        self.db
            .call(move |db| {
                if db.get_campaign_link(candidate_id)?.is_some() {
                    return Err(anyhow::Error::new(PipelineError::CampaignExists {
                        candidate_id,
                    }));
                }
                db.advance_status(candidate_id, StatusEvent::StartCampaign)?;
                Ok(())
            })
            .await
            .map_err(PipelineError::from_db)?;

        let result = self.create_vendor_campaign(candidate_id, name).await;
        match result {
            Ok(link) => {
                tracing::info!(candidate_id, campaign_id = %link.campaign_id, "campaign created");
                self.queue.enqueue(StageTask::CreateCampaign { candidate_id });
                Ok(link)
            }
            Err(e) => {
                if !e.is_conflict() {
                    tracing::error!(candidate_id, error = %e, "campaign creation failed");
                    self.fail(candidate_id).await;
                }
                Err(e)
            }
        }
    }

    async fn create_vendor_campaign(
        &self,
        candidate_id: i64,
        name: &str,
    ) -> Result<CampaignLink, PipelineError> {
        let campaign = self
            .with_timeout(
                "lemlist",
                self.timeouts.lemlist,
                self.collaborators.campaigns.create_campaign(name),
            )
            .await?;
        let (campaign_id, sequence_id) = (campaign.id, campaign.sequence_id);
        self.db
            .call(move |db| db.create_campaign_link(candidate_id, &campaign_id, &sequence_id))
            .await
            .map_err(PipelineError::from_db)
    }

    /// Administrative deletion: pause the linked vendor campaign first, then
    /// drop the candidate (selections and the link cascade).
    pub async fn delete_candidate(&self, candidate_id: i64) -> Result<bool, PipelineError> {
        let link = self
            .db
            .call(move |db| db.get_campaign_link(candidate_id))
            .await
            .map_err(PipelineError::from_db)?;
        if let Some(link) = link {
            self.with_timeout(
                "lemlist",
                self.timeouts.lemlist,
                self.collaborators.campaigns.pause_campaign(&link.campaign_id),
            )
            .await?;
            tracing::info!(candidate_id, campaign_id = %link.campaign_id, "campaign paused before deletion");
        }
        self.db
            .call(move |db| db.delete_candidate(candidate_id))
            .await
            .map_err(PipelineError::from_db)
    }

    // ── Stage dispatch ────────────────────────────────────────────────

    /// Run one delivered stage. Conflicts (duplicate/late delivery, stale
    /// client) leave the candidate untouched; any other error drives it to
    /// `failed` and stops the chain.
    pub async fn run_stage(&self, task: StageTask) -> Result<(), PipelineError> {
        let candidate_id = task.candidate_id();
        let stage = task.name();
        let result = match task {
            StageTask::Extract {
                candidate_id,
                documents,
            } => self.extract_stage(candidate_id, documents).await,
            StageTask::SearchCompanies { candidate_id } => {
                self.search_companies_stage(candidate_id).await
            }
            StageTask::FindDecisionMakers { candidate_id } => {
                self.find_decision_makers_stage(candidate_id).await
            }
            StageTask::CreateCampaign { candidate_id } => {
                self.create_campaign_stage(candidate_id).await
            }
        };
        if let Err(e) = &result {
            if e.is_conflict() {
                tracing::info!(candidate_id, stage, error = %e, "stage delivery rejected");
            } else {
                tracing::error!(candidate_id, stage, error = %e, "stage failed");
                self.fail(candidate_id).await;
            }
        }
        result
    }

    // ── Stages ────────────────────────────────────────────────────────

    async fn extract_stage(
        &self,
        candidate_id: i64,
        documents: DocumentSet,
    ) -> Result<(), PipelineError> {
        self.advance(candidate_id, StatusEvent::StartExtraction).await?;
        let candidate = self.candidate(candidate_id).await?;

        let extracted = self
            .with_timeout(
                "extractor",
                self.timeouts.extractor,
                self.collaborators.extractor.extract(&documents, &candidate.role),
            )
            .await?;

        self.db
            .call(move |db| {
                db.store_extraction(candidate_id, &extracted.profile, &extracted.preferences)?;
                db.advance_status(candidate_id, StatusEvent::ExtractionSucceeded)?;
                Ok(())
            })
            .await
            .map_err(PipelineError::from_db)?;

        tracing::info!(candidate_id, "candidate data extracted");
        self.queue.enqueue(StageTask::SearchCompanies { candidate_id });
        Ok(())
    }

    async fn search_companies_stage(&self, candidate_id: i64) -> Result<(), PipelineError> {
        self.advance(candidate_id, StatusEvent::StartCompanySearch).await?;
        let candidate = self.candidate(candidate_id).await?;
        let preferences = candidate.company_preferences.clone().ok_or_else(|| {
            PipelineError::Other(anyhow::anyhow!(
                "candidate {} has no extracted preferences",
                candidate_id
            ))
        })?;

        let hits = self
            .with_timeout(
                "apollo",
                self.timeouts.apollo,
                self.collaborators.companies.search_organizations(
                    &preferences,
                    candidate.search_strategy,
                    &candidate.company_domains,
                ),
            )
            .await?;

        let mut records = Vec::new();
        for hit in &hits {
            let record = self
                .with_timeout(
                    "apollo",
                    self.timeouts.apollo,
                    self.collaborators.companies.enrich_organization(&hit.domain),
                )
                .await?;
            match record {
                Some(record) => records.push(record),
                None => {
                    tracing::debug!(candidate_id, domain = %hit.domain, "no enrichment for domain")
                }
            }
        }

        let persisted = self
            .db
            .call(move |db| {
                let ids = enrich::reconcile(&records, |key, record| db.upsert_company(key, record))?;
                let ids = enrich::persisted_ids(&ids);
                db.link_selections(candidate_id, &ids)?;
                Ok(ids.len())
            })
            .await
            .map_err(PipelineError::from_db)?;

        if persisted > 0 {
            self.advance(candidate_id, StatusEvent::CompaniesMatched).await?;
            tracing::info!(candidate_id, companies = persisted, "companies matched");
        } else {
            self.advance(candidate_id, StatusEvent::NoCompaniesMatched).await?;
            tracing::info!(candidate_id, "no companies matched");
        }
        Ok(())
    }

    async fn find_decision_makers_stage(&self, candidate_id: i64) -> Result<(), PipelineError> {
        self.advance(candidate_id, StatusEvent::StartDecisionMakerSearch).await?;

        // Failing to read the approved list at all is non-recoverable and
        // fails the stage; everything per-person below is isolated.
        let companies = self
            .db
            .call(move |db| db.approved_companies(candidate_id))
            .await
            .map_err(PipelineError::from_db)?;
        let organization_ids: Vec<String> =
            companies.iter().map(|c| c.apollo_id.clone()).collect();

        let mut persisted = 0usize;
        if !organization_ids.is_empty() {
            let person_ids = self
                .with_timeout(
                    "apollo",
                    self.timeouts.apollo,
                    self.collaborators.people.search_people(&organization_ids),
                )
                .await?;

            if !person_ids.is_empty() {
                let people = self
                    .with_timeout(
                        "apollo",
                        self.timeouts.apollo,
                        self.collaborators.people.enrich_people(&person_ids),
                    )
                    .await?;

                let company_by_vendor: HashMap<String, i64> = companies
                    .iter()
                    .map(|c| (c.apollo_id.clone(), c.id))
                    .collect();
                let (known, unknown): (Vec<PersonRecord>, Vec<PersonRecord>) =
                    people.into_iter().partition(|person| {
                        person
                            .organization_id
                            .as_deref()
                            .is_some_and(|org| company_by_vendor.contains_key(org))
                    });
                for person in &unknown {
                    tracing::warn!(
                        candidate_id,
                        person_id = person.apollo_id.as_deref().unwrap_or("<none>"),
                        "person's organization is not an approved company; skipping"
                    );
                }

                persisted = self
                    .db
                    .call(move |db| {
                        let ids = enrich::reconcile(&known, |key, record| {
                            // Partitioning above guarantees the lookup hits.
                            let company_id = record
                                .organization_id
                                .as_deref()
                                .and_then(|org| company_by_vendor.get(org))
                                .copied()
                                .ok_or_else(|| {
                                    anyhow::anyhow!("person {} lost its company mapping", key)
                                })?;
                            db.upsert_decision_maker(key, company_id, record)
                        })?;
                        Ok(enrich::persisted_ids(&ids).len())
                    })
                    .await
                    .map_err(PipelineError::from_db)?;
            }
        }

        if persisted > 0 {
            self.advance(candidate_id, StatusEvent::DecisionMakersFound).await?;
            tracing::info!(candidate_id, decision_makers = persisted, "decision makers found");
        } else {
            self.advance(candidate_id, StatusEvent::NoDecisionMakersFound).await?;
            tracing::info!(candidate_id, "no decision makers found");
        }
        Ok(())
    }

    async fn create_campaign_stage(&self, candidate_id: i64) -> Result<(), PipelineError> {
        // The in-progress marker was already set by `request_campaign`;
        // assert it without writing so duplicate deliveries bounce here.
        let candidate = self.candidate(candidate_id).await?;
        candidate
            .processing_status
            .apply(StatusEvent::CampaignCreated)?;

        let link = self
            .db
            .call(move |db| db.get_campaign_link(candidate_id))
            .await
            .map_err(PipelineError::from_db)?
            .ok_or(PipelineError::CampaignLinkMissing {
                candidate_id,
                status: candidate.processing_status,
            })?;

        let companies = self
            .db
            .call(move |db| db.approved_companies(candidate_id))
            .await
            .map_err(PipelineError::from_db)?;

        // Per-company fan-out: one company's failure is logged and skipped,
        // the loop continues.
        for company in &companies {
            match self.create_company_lead(&link, company).await {
                Ok(Some(lead_id)) => {
                    tracing::info!(candidate_id, company_id = company.id, lead_id = %lead_id, "lead created")
                }
                Ok(None) => {
                    tracing::info!(candidate_id, company_id = company.id, "company skipped")
                }
                Err(e) => {
                    tracing::warn!(candidate_id, company_id = company.id, error = %e, "lead creation failed; continuing")
                }
            }
        }

        for step in &self.sequence_steps {
            self.with_timeout(
                "lemlist",
                self.timeouts.lemlist,
                self.collaborators
                    .campaigns
                    .create_sequence_step(&link.sequence_id, step),
            )
            .await?;
        }

        self.advance(candidate_id, StatusEvent::CampaignCreated).await?;
        tracing::info!(candidate_id, campaign_id = %link.campaign_id, "campaign launch completed");
        Ok(())
    }

    /// Rank one approved company's decision makers and create the lead for
    /// its primary. Returns `Ok(None)` when the company is skipped: nobody
    /// contactable, no usable primary, or the person already belongs to
    /// another active campaign.
    async fn create_company_lead(
        &self,
        link: &CampaignLink,
        company: &Company,
    ) -> Result<Option<String>, PipelineError> {
        let company_id = company.id;
        let decision_makers = self
            .db
            .call(move |db| db.decision_makers_for_company(company_id))
            .await
            .map_err(PipelineError::from_db)?;

        let descriptors: Vec<DecisionMakerDescriptor> = decision_makers
            .iter()
            .filter_map(DecisionMakerDescriptor::from_decision_maker)
            .collect();
        if descriptors.is_empty() {
            tracing::debug!(company_id, "no contactable decision makers");
            return Ok(None);
        }

        let ranking = self.collaborators.oracle.rank(&descriptors);
        let Some(assignment) = assign_roles(&descriptors, &ranking) else {
            tracing::debug!(company_id, "oracle produced no usable primary");
            return Ok(None);
        };

        let primary = assignment.primary();
        let lead = LeadRequest {
            email: primary.email.clone(),
            first_name: primary.first_name.clone(),
            last_name: primary.last_name.clone(),
            company_name: company.name.clone().unwrap_or_default(),
            job_title: primary.job_title.clone().unwrap_or_default(),
            linkedin_url: primary.linkedin_url.clone().unwrap_or_default(),
            company_domain: company.primary_domain.clone().unwrap_or_default(),
            variables: assignment.lead_variables(),
        };

        let created = self
            .with_timeout(
                "lemlist",
                self.timeouts.lemlist,
                self.collaborators.campaigns.create_lead(&link.campaign_id, &lead),
            )
            .await?;
        Ok(created.map(|l| l.id))
    }

    /// The one thing external callers observe about a pipeline run.
    pub async fn candidate_status(
        &self,
        candidate_id: i64,
    ) -> Result<ProcessingStatus, PipelineError> {
        self.db
            .call(move |db| db.candidate_status(candidate_id))
            .await
            .map_err(PipelineError::from_db)?
            .ok_or(PipelineError::CandidateNotFound { id: candidate_id })
    }

    // ── Helpers ───────────────────────────────────────────────────────

    async fn candidate(&self, id: i64) -> Result<Candidate, PipelineError> {
        self.db
            .call(move |db| db.get_candidate(id))
            .await
            .map_err(PipelineError::from_db)?
            .ok_or(PipelineError::CandidateNotFound { id })
    }

    async fn advance(
        &self,
        id: i64,
        event: StatusEvent,
    ) -> Result<ProcessingStatus, PipelineError> {
        self.db
            .call(move |db| db.advance_status(id, event))
            .await
            .map_err(PipelineError::from_db)
    }

    async fn fail(&self, id: i64) {
        if let Err(e) = self.db.call(move |db| db.mark_failed(id)).await {
            tracing::error!(candidate_id = id, error = %e, "failed to record failed status");
        }
    }

    async fn with_timeout<T>(
        &self,
        service: &'static str,
        duration: Duration,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T, PipelineError> {
        match tokio::time::timeout(duration, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(PipelineError::Collaborator { service, source }),
            Err(_) => Err(PipelineError::CollaboratorTimeout {
                service,
                seconds: duration.as_secs(),
            }),
        }
    }
}
