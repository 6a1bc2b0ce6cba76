//! Integration tests for the talentflow pipeline.
//!
//! These drive the orchestrator end-to-end over an in-memory database with
//! in-process collaborator fakes, verifying the status chain, the approval
//! gates, idempotency guards and fan-out isolation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use talentflow::apollo::{CompanyDirectory, OrganizationHit, PeopleDirectory};
use talentflow::assignment::SeniorityRanker;
use talentflow::db::{DbHandle, PipelineDb};
use talentflow::extract::{CandidateExtractor, DocumentSet, ExtractedProfile};
use talentflow::lemlist::{CampaignVendor, LeadRequest, RemoteCampaign, RemoteLead, SequenceStep};
use talentflow::models::{
    CompanyPreferences, CompanyRecord, NewCandidate, PersonRecord, ResumeSource, SearchStrategy,
    TranscriptSource,
};
use talentflow::pipeline::{Collaborators, Orchestrator, Timeouts};
use talentflow::queue::{self, StageTask, TaskQueue, TaskReceiver};
use talentflow::status::ProcessingStatus;

// =============================================================================
// Collaborator fakes
// =============================================================================

struct FakeExtractor {
    preferences: CompanyPreferences,
    delay: Option<Duration>,
    fail: bool,
}

impl FakeExtractor {
    fn ok() -> Self {
        Self {
            preferences: CompanyPreferences {
                funding_stages: vec!["seed".into()],
                locations: vec!["remote".into()],
                categories: vec!["fintech".into()],
            },
            delay: None,
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::ok()
        }
    }
}

#[async_trait]
impl CandidateExtractor for FakeExtractor {
    async fn extract(&self, _documents: &DocumentSet, _role: &str) -> Result<ExtractedProfile> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            anyhow::bail!("extraction model unavailable");
        }
        Ok(ExtractedProfile {
            profile: serde_json::json!({"summary": "ops leader"}),
            preferences: self.preferences.clone(),
        })
    }
}

#[derive(Default)]
struct FakeCompanyDirectory {
    hits: Vec<OrganizationHit>,
    records: HashMap<String, CompanyRecord>,
    last_search: Mutex<Option<(SearchStrategy, Vec<String>)>>,
}

impl FakeCompanyDirectory {
    fn with_companies(companies: &[(&str, &str)]) -> Self {
        let mut directory = Self::default();
        for (vendor_id, domain) in companies {
            directory.hits.push(OrganizationHit {
                vendor_id: Some(vendor_id.to_string()),
                domain: domain.to_string(),
            });
            directory.records.insert(
                domain.to_string(),
                CompanyRecord {
                    apollo_id: Some(vendor_id.to_string()),
                    name: Some(format!("{} Inc", domain)),
                    primary_domain: Some(domain.to_string()),
                    ..Default::default()
                },
            );
        }
        directory
    }
}

#[async_trait]
impl CompanyDirectory for FakeCompanyDirectory {
    async fn search_organizations(
        &self,
        _preferences: &CompanyPreferences,
        strategy: SearchStrategy,
        manual_domains: &[String],
    ) -> Result<Vec<OrganizationHit>> {
        *self.last_search.lock().unwrap() = Some((strategy, manual_domains.to_vec()));
        Ok(self.hits.clone())
    }

    async fn enrich_organization(&self, domain: &str) -> Result<Option<CompanyRecord>> {
        Ok(self.records.get(domain).cloned())
    }
}

#[derive(Default)]
struct FakePeopleDirectory {
    people: Vec<PersonRecord>,
    /// Return every person id from search regardless of the organization
    /// filter (models a vendor overshooting the requested organizations).
    search_returns_all: bool,
}

impl FakePeopleDirectory {
    fn with_people(people: Vec<PersonRecord>) -> Self {
        Self {
            people,
            search_returns_all: false,
        }
    }
}

#[async_trait]
impl PeopleDirectory for FakePeopleDirectory {
    async fn search_people(&self, organization_ids: &[String]) -> Result<Vec<String>> {
        Ok(self
            .people
            .iter()
            .filter(|p| {
                self.search_returns_all
                    || p.organization_id
                        .as_ref()
                        .is_some_and(|org| organization_ids.contains(org))
            })
            .filter_map(|p| p.apollo_id.clone())
            .collect())
    }

    async fn enrich_people(&self, person_ids: &[String]) -> Result<Vec<PersonRecord>> {
        Ok(self
            .people
            .iter()
            .filter(|p| {
                p.apollo_id
                    .as_ref()
                    .is_some_and(|id| person_ids.contains(id))
            })
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct FakeCampaignVendor {
    campaigns_created: AtomicUsize,
    leads: Mutex<Vec<(String, LeadRequest)>>,
    steps: Mutex<Vec<(String, SequenceStep)>>,
    paused: Mutex<Vec<String>>,
    /// Emails whose lead creation fails with a transient error.
    fail_emails: Vec<String>,
    /// Emails the vendor reports as already enrolled elsewhere.
    conflict_emails: Vec<String>,
}

#[async_trait]
impl CampaignVendor for FakeCampaignVendor {
    async fn create_campaign(&self, _name: &str) -> Result<RemoteCampaign> {
        let n = self.campaigns_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RemoteCampaign {
            id: format!("cam_{}", n),
            sequence_id: format!("seq_{}", n),
        })
    }

    async fn create_lead(
        &self,
        campaign_id: &str,
        lead: &LeadRequest,
    ) -> Result<Option<RemoteLead>> {
        if self.fail_emails.contains(&lead.email) {
            anyhow::bail!("vendor 500 for {}", lead.email);
        }
        if self.conflict_emails.contains(&lead.email) {
            return Ok(None);
        }
        let mut leads = self.leads.lock().unwrap();
        leads.push((campaign_id.to_string(), lead.clone()));
        Ok(Some(RemoteLead {
            id: format!("lead_{}", leads.len()),
        }))
    }

    async fn create_sequence_step(&self, sequence_id: &str, step: &SequenceStep) -> Result<()> {
        self.steps
            .lock()
            .unwrap()
            .push((sequence_id.to_string(), step.clone()));
        Ok(())
    }

    async fn pause_campaign(&self, campaign_id: &str) -> Result<()> {
        self.paused.lock().unwrap().push(campaign_id.to_string());
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    orchestrator: Arc<Orchestrator>,
    rx: TaskReceiver,
    db: DbHandle,
    vendor: Arc<FakeCampaignVendor>,
    companies: Arc<FakeCompanyDirectory>,
}

struct HarnessBuilder {
    db: Option<DbHandle>,
    extractor: Arc<dyn CandidateExtractor>,
    companies: Arc<FakeCompanyDirectory>,
    people: Arc<FakePeopleDirectory>,
    vendor: Arc<FakeCampaignVendor>,
    timeouts: Timeouts,
    sequence_steps: Vec<SequenceStep>,
}

impl HarnessBuilder {
    fn new() -> Self {
        Self {
            db: None,
            extractor: Arc::new(FakeExtractor::ok()),
            companies: Arc::new(FakeCompanyDirectory::with_companies(&[("org_a", "a.io")])),
            people: Arc::new(FakePeopleDirectory::default()),
            vendor: Arc::new(FakeCampaignVendor::default()),
            timeouts: Timeouts::default(),
            sequence_steps: Vec::new(),
        }
    }

    fn db(mut self, db: DbHandle) -> Self {
        self.db = Some(db);
        self
    }

    fn extractor(mut self, extractor: impl CandidateExtractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    fn companies(mut self, companies: FakeCompanyDirectory) -> Self {
        self.companies = Arc::new(companies);
        self
    }

    fn people(mut self, people: FakePeopleDirectory) -> Self {
        self.people = Arc::new(people);
        self
    }

    fn vendor(mut self, vendor: FakeCampaignVendor) -> Self {
        self.vendor = Arc::new(vendor);
        self
    }

    fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    fn sequence_steps(mut self, steps: Vec<SequenceStep>) -> Self {
        self.sequence_steps = steps;
        self
    }

    fn build(self) -> Harness {
        let db = self
            .db
            .unwrap_or_else(|| DbHandle::new(PipelineDb::new_in_memory().unwrap()));
        let (queue, rx) = TaskQueue::new();
        let collaborators = Collaborators {
            extractor: self.extractor,
            companies: self.companies.clone(),
            people: self.people,
            campaigns: self.vendor.clone(),
            oracle: Arc::new(SeniorityRanker),
        };
        let orchestrator = Arc::new(Orchestrator::new(
            db.clone(),
            collaborators,
            queue,
            self.timeouts,
            self.sequence_steps,
        ));
        Harness {
            orchestrator,
            rx,
            db,
            vendor: self.vendor,
            companies: self.companies,
        }
    }
}

impl Harness {
    async fn drain(&mut self) {
        queue::run_until_idle(&self.orchestrator, &mut self.rx).await;
    }

    async fn status(&self, candidate_id: i64) -> ProcessingStatus {
        self.db
            .call(move |db| db.candidate_status(candidate_id))
            .await
            .unwrap()
            .unwrap()
    }

    async fn intake_and_drain(&mut self) -> i64 {
        let candidate = self
            .orchestrator
            .intake(sample_candidate(), DocumentSet::default())
            .await
            .unwrap();
        self.drain().await;
        candidate.id
    }

    /// Walk a candidate to `decision_makers_found` by approving every
    /// selection.
    async fn walk_to_decision_makers_found(&mut self) -> i64 {
        let candidate_id = self.intake_and_drain().await;
        assert_eq!(self.status(candidate_id).await, ProcessingStatus::CompaniesMatched);
        self.orchestrator
            .request_candidate_approval(candidate_id)
            .await
            .unwrap();
        let approvals: Vec<(i64, bool)> = self
            .db
            .call(move |db| db.list_selections(candidate_id))
            .await
            .unwrap()
            .into_iter()
            .map(|s| (s.company_id, true))
            .collect();
        self.orchestrator
            .approve_companies(candidate_id, approvals)
            .await
            .unwrap();
        self.drain().await;
        candidate_id
    }
}

fn sample_candidate() -> NewCandidate {
    NewCandidate {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: "ada@example.com".into(),
        linkedin_url: "https://linkedin.com/in/ada".into(),
        role: "Chief of Staff".into(),
        additional_info: "".into(),
        resume_source: ResumeSource::Local,
        resume_filename: "ada.pdf".into(),
        transcript_source: TranscriptSource::Local,
        transcript_filename: "call.txt".into(),
        search_strategy: SearchStrategy::Smart,
        company_domains: vec![],
    }
}

fn person(
    apollo_id: &str,
    org: &str,
    seniority: &str,
    email: Option<&str>,
    headline: Option<&str>,
) -> PersonRecord {
    PersonRecord {
        apollo_id: Some(apollo_id.to_string()),
        organization_id: Some(org.to_string()),
        first_name: Some(format!("First-{}", apollo_id)),
        last_name: Some(format!("Last-{}", apollo_id)),
        title: Some("Executive".into()),
        seniority: Some(seniority.to_string()),
        headline: headline.map(str::to_string),
        email: email.map(str::to_string),
        ..Default::default()
    }
}

// =============================================================================
// Stage chain
// =============================================================================

mod stage_chain {
    use super::*;

    #[tokio::test]
    async fn test_intake_runs_to_companies_matched() {
        let mut harness = HarnessBuilder::new()
            .companies(FakeCompanyDirectory::with_companies(&[
                ("org_a", "a.io"),
                ("org_b", "b.io"),
            ]))
            .build();
        let candidate_id = harness.intake_and_drain().await;

        assert_eq!(
            harness.status(candidate_id).await,
            ProcessingStatus::CompaniesMatched
        );
        let selections = harness
            .db
            .call(move |db| db.list_selections(candidate_id))
            .await
            .unwrap();
        assert_eq!(selections.len(), 2);
        assert!(selections.iter().all(|s| s.approved_by_candidate.is_none()));

        // Extraction output persisted on the candidate row.
        let candidate = harness
            .db
            .call(move |db| db.get_candidate(candidate_id))
            .await
            .unwrap()
            .unwrap();
        assert!(candidate.extracted_data.is_some());
        assert_eq!(
            candidate.company_preferences.unwrap().categories,
            vec!["fintech"]
        );
    }

    #[tokio::test]
    async fn test_zero_search_results_ends_no_companies_matched() {
        let mut harness = HarnessBuilder::new()
            .companies(FakeCompanyDirectory::default())
            .build();
        let candidate_id = harness.intake_and_drain().await;
        // A legitimate empty result is a distinct terminal, not a failure.
        assert_eq!(
            harness.status(candidate_id).await,
            ProcessingStatus::NoCompaniesMatched
        );
    }

    #[tokio::test]
    async fn test_extraction_failure_marks_candidate_failed() {
        let mut harness = HarnessBuilder::new()
            .extractor(FakeExtractor::failing())
            .build();
        let candidate_id = harness.intake_and_drain().await;
        assert_eq!(harness.status(candidate_id).await, ProcessingStatus::Failed);
    }

    #[tokio::test]
    async fn test_collaborator_timeout_marks_candidate_failed() {
        let mut harness = HarnessBuilder::new()
            .extractor(FakeExtractor::slow(Duration::from_millis(300)))
            .timeouts(Timeouts {
                extractor: Duration::from_millis(20),
                ..Timeouts::default()
            })
            .build();
        let candidate_id = harness.intake_and_drain().await;
        assert_eq!(harness.status(candidate_id).await, ProcessingStatus::Failed);
    }

    #[tokio::test]
    async fn test_duplicate_stage_delivery_is_rejected_without_side_effects() {
        let mut harness = HarnessBuilder::new().build();
        let candidate_id = harness.intake_and_drain().await;
        assert_eq!(
            harness.status(candidate_id).await,
            ProcessingStatus::CompaniesMatched
        );

        // A duplicate delivery of the search stage arrives late.
        let err = harness
            .orchestrator
            .run_stage(StageTask::SearchCompanies { candidate_id })
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(
            harness.status(candidate_id).await,
            ProcessingStatus::CompaniesMatched
        );
        // No duplicate selections either.
        let selections = harness
            .db
            .call(move |db| db.list_selections(candidate_id))
            .await
            .unwrap();
        assert_eq!(selections.len(), 1);
    }

    #[tokio::test]
    async fn test_restart_from_failed_reuses_stored_search_inputs() {
        let db = DbHandle::new(PipelineDb::new_in_memory().unwrap());
        let mut failing = HarnessBuilder::new()
            .db(db.clone())
            .extractor(FakeExtractor::failing())
            .build();
        let mut new = sample_candidate();
        new.search_strategy = SearchStrategy::Manual;
        new.company_domains = vec!["picked.io".into()];
        let candidate = failing
            .orchestrator
            .intake(new, DocumentSet::default())
            .await
            .unwrap();
        let candidate_id = candidate.id;
        failing.drain().await;
        assert_eq!(failing.status(candidate_id).await, ProcessingStatus::Failed);

        // Human intervention: restart with a healthy extractor.
        let mut directory = FakeCompanyDirectory::with_companies(&[("org_m", "picked.io")]);
        directory.hits = vec![OrganizationHit {
            vendor_id: None,
            domain: "picked.io".into(),
        }];
        let mut healthy = HarnessBuilder::new().db(db).companies(directory).build();
        healthy
            .orchestrator
            .restart(candidate_id, DocumentSet::default())
            .await
            .unwrap();
        healthy.drain().await;

        assert_eq!(
            healthy.status(candidate_id).await,
            ProcessingStatus::CompaniesMatched
        );
        // The stored manual strategy and domain list were passed through.
        let last = healthy.companies.last_search.lock().unwrap().clone();
        assert_eq!(last, Some((SearchStrategy::Manual, vec!["picked.io".into()])));
    }

    #[tokio::test]
    async fn test_restart_mid_pipeline_is_rejected() {
        let mut harness = HarnessBuilder::new().build();
        let candidate_id = harness.intake_and_drain().await;
        assert_eq!(
            harness.status(candidate_id).await,
            ProcessingStatus::CompaniesMatched
        );

        let err = harness
            .orchestrator
            .restart(candidate_id, DocumentSet::default())
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(
            harness.status(candidate_id).await,
            ProcessingStatus::CompaniesMatched
        );
    }
}

// =============================================================================
// Approval gates
// =============================================================================

mod approval_gates {
    use super::*;

    #[tokio::test]
    async fn test_approval_flow_reaches_decision_makers_found() {
        let people = vec![
            person("p_1", "org_a", "founder", Some("f@a.io"), Some("builder")),
            person("p_2", "org_a", "c_suite", Some("c@a.io"), Some("operator")),
        ];
        let mut harness = HarnessBuilder::new()
            .people(FakePeopleDirectory::with_people(people))
            .build();
        let candidate_id = harness.walk_to_decision_makers_found().await;
        assert_eq!(
            harness.status(candidate_id).await,
            ProcessingStatus::DecisionMakersFound
        );
    }

    #[tokio::test]
    async fn test_approval_while_extracting_is_stale_client_error() {
        let mut harness = HarnessBuilder::new().build();
        let candidate = harness
            .orchestrator
            .intake(sample_candidate(), DocumentSet::default())
            .await
            .unwrap();
        // Queue not drained: candidate is still not_started.
        let err = harness
            .orchestrator
            .approve_companies(candidate.id, vec![(1, true)])
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(
            harness.status(candidate.id).await,
            ProcessingStatus::NotStarted
        );
    }

    #[tokio::test]
    async fn test_duplicate_approval_request_is_conflict() {
        let mut harness = HarnessBuilder::new().build();
        let candidate_id = harness.intake_and_drain().await;
        harness
            .orchestrator
            .request_candidate_approval(candidate_id)
            .await
            .unwrap();
        let err = harness
            .orchestrator
            .request_candidate_approval(candidate_id)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(
            harness.status(candidate_id).await,
            ProcessingStatus::CandidateApprovalPending
        );
    }

    #[tokio::test]
    async fn test_no_contactable_people_ends_no_decision_makers_found() {
        // People search finds nobody at the approved company.
        let mut harness = HarnessBuilder::new()
            .people(FakePeopleDirectory::default())
            .build();
        let candidate_id = harness.walk_to_decision_makers_found().await;
        assert_eq!(
            harness.status(candidate_id).await,
            ProcessingStatus::NoDecisionMakersFound
        );
    }
}

// =============================================================================
// Campaign launch
// =============================================================================

mod campaign_launch {
    use super::*;

    /// Two approved companies: A has two decision makers with email and
    /// headline, B's only person has no email. The campaign fan-out creates
    /// one lead for A (primary + cc_1 filled, remaining roles explicit
    /// empties) and skips B entirely.
    #[tokio::test]
    async fn test_two_company_scenario() {
        let companies =
            FakeCompanyDirectory::with_companies(&[("org_a", "a.io"), ("org_b", "b.io")]);
        let people = vec![
            person("p_1", "org_a", "c_suite", Some("ceo@a.io"), Some("ops at scale")),
            person("p_2", "org_a", "vp", Some("vp@a.io"), Some("growth")),
            person("p_3", "org_b", "founder", None, Some("visionary")),
        ];
        let mut harness = HarnessBuilder::new()
            .companies(companies)
            .people(FakePeopleDirectory::with_people(people))
            .build();

        let candidate_id = harness.walk_to_decision_makers_found().await;
        assert_eq!(
            harness.status(candidate_id).await,
            ProcessingStatus::DecisionMakersFound
        );

        harness
            .orchestrator
            .request_campaign(candidate_id, "Ada outreach")
            .await
            .unwrap();
        harness.drain().await;
        assert_eq!(
            harness.status(candidate_id).await,
            ProcessingStatus::CampaignCreated
        );

        let leads = harness.vendor.leads.lock().unwrap();
        assert_eq!(leads.len(), 1, "company B must be skipped");
        let (campaign_id, lead) = &leads[0];
        assert_eq!(campaign_id, "cam_1");
        assert_eq!(lead.email, "ceo@a.io");
        assert_eq!(lead.company_domain, "a.io");
        assert_eq!(lead.variables["primary_decision_maker"], "ceo@a.io");
        assert_eq!(lead.variables["cc_decision_maker_1"], "vp@a.io");
        // Unassigned roles are serialized as explicit empty fields.
        assert_eq!(lead.variables["cc_decision_maker_2"], "");
        assert_eq!(lead.variables["alt_decision_maker_1"], "");
        assert_eq!(lead.variables["alt_decision_maker_2"], "");
    }

    #[tokio::test]
    async fn test_double_campaign_request_creates_exactly_one_link() {
        let people = vec![person("p_1", "org_a", "founder", Some("f@a.io"), Some("x"))];
        let mut harness = HarnessBuilder::new()
            .people(FakePeopleDirectory::with_people(people))
            .build();
        let candidate_id = harness.walk_to_decision_makers_found().await;

        harness
            .orchestrator
            .request_campaign(candidate_id, "first")
            .await
            .unwrap();
        let err = harness
            .orchestrator
            .request_campaign(candidate_id, "second")
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        harness.drain().await;
        assert_eq!(
            harness.status(candidate_id).await,
            ProcessingStatus::CampaignCreated
        );
        assert_eq!(harness.vendor.campaigns_created.load(Ordering::SeqCst), 1);
        let link = harness
            .db
            .call(move |db| db.get_campaign_link(candidate_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(link.campaign_id, "cam_1");

        // Even after completion, a further request stays a conflict.
        let err = harness
            .orchestrator
            .request_campaign(candidate_id, "third")
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_campaign_request_before_decision_makers_is_conflict() {
        let mut harness = HarnessBuilder::new().build();
        let candidate_id = harness.intake_and_drain().await;
        let err = harness
            .orchestrator
            .request_campaign(candidate_id, "too early")
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(
            harness.status(candidate_id).await,
            ProcessingStatus::CompaniesMatched
        );
    }

    #[tokio::test]
    async fn test_lead_failure_for_one_company_does_not_fail_the_stage() {
        let companies =
            FakeCompanyDirectory::with_companies(&[("org_x", "x.io"), ("org_y", "y.io")]);
        let people = vec![
            person("p_x", "org_x", "founder", Some("f@x.io"), Some("a")),
            person("p_y", "org_y", "founder", Some("f@y.io"), Some("b")),
        ];
        let vendor = FakeCampaignVendor {
            fail_emails: vec!["f@x.io".into()],
            ..Default::default()
        };
        let mut harness = HarnessBuilder::new()
            .companies(companies)
            .people(FakePeopleDirectory::with_people(people))
            .vendor(vendor)
            .build();
        let candidate_id = harness.walk_to_decision_makers_found().await;

        harness
            .orchestrator
            .request_campaign(candidate_id, "resilient")
            .await
            .unwrap();
        harness.drain().await;

        // X's transient vendor failure is logged and skipped; the stage
        // still reaches its success terminal with Y's lead created.
        assert_eq!(
            harness.status(candidate_id).await,
            ProcessingStatus::CampaignCreated
        );
        let leads = harness.vendor.leads.lock().unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].1.email, "f@y.io");
    }

    #[tokio::test]
    async fn test_lead_already_in_another_campaign_is_skipped() {
        let people = vec![person("p_1", "org_a", "founder", Some("f@a.io"), Some("x"))];
        let vendor = FakeCampaignVendor {
            conflict_emails: vec!["f@a.io".into()],
            ..Default::default()
        };
        let mut harness = HarnessBuilder::new()
            .people(FakePeopleDirectory::with_people(people))
            .vendor(vendor)
            .build();
        let candidate_id = harness.walk_to_decision_makers_found().await;

        harness
            .orchestrator
            .request_campaign(candidate_id, "dedup")
            .await
            .unwrap();
        harness.drain().await;

        assert_eq!(
            harness.status(candidate_id).await,
            ProcessingStatus::CampaignCreated
        );
        assert!(harness.vendor.leads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sequence_steps_are_created_from_configuration() {
        let people = vec![person("p_1", "org_a", "founder", Some("f@a.io"), Some("x"))];
        let steps = vec![
            SequenceStep {
                subject: "Introduction".into(),
                body: "<p>first</p>".into(),
                delay_days: 1,
            },
            SequenceStep {
                subject: "Follow up".into(),
                body: "<p>second</p>".into(),
                delay_days: 3,
            },
        ];
        let mut harness = HarnessBuilder::new()
            .people(FakePeopleDirectory::with_people(people))
            .sequence_steps(steps)
            .build();
        let candidate_id = harness.walk_to_decision_makers_found().await;

        harness
            .orchestrator
            .request_campaign(candidate_id, "sequenced")
            .await
            .unwrap();
        harness.drain().await;

        let steps = harness.vendor.steps.lock().unwrap();
        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(|(sequence_id, _)| sequence_id == "seq_1"));
        assert_eq!(steps[1].1.subject, "Follow up");
    }

    #[tokio::test]
    async fn test_delete_candidate_pauses_active_campaign_first() {
        let people = vec![person("p_1", "org_a", "founder", Some("f@a.io"), Some("x"))];
        let mut harness = HarnessBuilder::new()
            .people(FakePeopleDirectory::with_people(people))
            .build();
        let candidate_id = harness.walk_to_decision_makers_found().await;
        harness
            .orchestrator
            .request_campaign(candidate_id, "short lived")
            .await
            .unwrap();
        harness.drain().await;

        assert!(harness.orchestrator.delete_candidate(candidate_id).await.unwrap());
        assert_eq!(
            harness.vendor.paused.lock().unwrap().as_slice(),
            &["cam_1".to_string()]
        );
        let gone = harness
            .db
            .call(move |db| db.get_candidate(candidate_id))
            .await
            .unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn test_delete_without_campaign_skips_vendor() {
        let mut harness = HarnessBuilder::new().build();
        let candidate_id = harness.intake_and_drain().await;
        assert!(harness.orchestrator.delete_candidate(candidate_id).await.unwrap());
        assert!(harness.vendor.paused.lock().unwrap().is_empty());
    }
}

// =============================================================================
// Re-enrichment
// =============================================================================

mod re_enrichment {
    use super::*;

    #[tokio::test]
    async fn test_unknown_organization_people_are_skipped_not_fatal() {
        // One person maps to the approved company, one to an organization
        // that was never persisted. The stray person is skipped per-item.
        let people = vec![
            person("p_1", "org_a", "founder", Some("f@a.io"), Some("x")),
            person("p_2", "org_ghost", "founder", Some("g@ghost.io"), Some("y")),
        ];
        let mut directory = FakePeopleDirectory::with_people(people);
        directory.search_returns_all = true;
        let mut harness = HarnessBuilder::new().people(directory).build();
        let candidate_id = harness.walk_to_decision_makers_found().await;
        assert_eq!(
            harness.status(candidate_id).await,
            ProcessingStatus::DecisionMakersFound
        );
    }

    #[tokio::test]
    async fn test_reapproval_after_failure_is_not_possible_without_restart() {
        // failed is terminal for every event except a human restart.
        let mut harness = HarnessBuilder::new()
            .extractor(FakeExtractor::failing())
            .build();
        let candidate_id = harness.intake_and_drain().await;
        assert_eq!(harness.status(candidate_id).await, ProcessingStatus::Failed);

        let err = harness
            .orchestrator
            .request_candidate_approval(candidate_id)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        let err = harness
            .orchestrator
            .request_campaign(candidate_id, "nope")
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }
}

// =============================================================================
// CLI basics
// =============================================================================

mod cli_basics {
    use assert_cmd::Command;
    use predicates::prelude::*;

    fn talentflow() -> Command {
        Command::cargo_bin("talentflow").unwrap()
    }

    #[test]
    fn test_help() {
        talentflow().arg("--help").assert().success();
    }

    #[test]
    fn test_version() {
        talentflow().arg("--version").assert().success();
    }

    #[test]
    fn test_init_db_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("talentflow.db");
        talentflow()
            .env("TALENTFLOW_DB", &db_path)
            .arg("init-db")
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized database"));
        assert!(db_path.exists());
    }

    #[test]
    fn test_status_unknown_candidate_fails() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("talentflow.db");
        talentflow()
            .env("TALENTFLOW_DB", &db_path)
            .args(["status", "99"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found"));
    }
}
