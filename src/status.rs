//! Candidate lifecycle status registry.
//!
//! Defines the finite set of processing states a candidate moves through and
//! the legal transitions between them. The registry only answers "is this
//! edge defined" — deduplicating a stage that is already in flight is the
//! orchestrator's job (via its pre-state assertion), not this module's.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of a candidate's pipeline run.
///
/// Stored as snake_case TEXT in the candidates table; the wire names match
/// `as_str` exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    NotStarted,
    ExtractingCandidateData,
    CandidateDataExtracted,
    SearchingCompanies,
    CompaniesMatched,
    NoCompaniesMatched,
    CandidateApprovalPending,
    CandidateApproved,
    FindingDecisionMakers,
    DecisionMakersFound,
    NoDecisionMakersFound,
    CampaignCreating,
    CampaignCreated,
    Failed,
}

/// Events that drive status transitions. Automatic stages emit the Start*/
/// *Succeeded pairs; `ApprovalRequested`, `CandidateApproved` and
/// `StartCampaign` arrive from external (human/admin) actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    StartExtraction,
    ExtractionSucceeded,
    StartCompanySearch,
    CompaniesMatched,
    NoCompaniesMatched,
    ApprovalRequested,
    CandidateApproved,
    StartDecisionMakerSearch,
    DecisionMakersFound,
    NoDecisionMakersFound,
    StartCampaign,
    CampaignCreated,
    StageFailed,
}

/// An event arrived that has no defined edge from the current status.
/// Nothing is written when this is returned; the event indicates a stale
/// client or a duplicate task delivery.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("event {event:?} is not a legal transition from status '{from}'")]
pub struct TransitionError {
    pub from: ProcessingStatus,
    pub event: StatusEvent,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::ExtractingCandidateData => "extracting_candidate_data",
            Self::CandidateDataExtracted => "candidate_data_extracted",
            Self::SearchingCompanies => "searching_companies",
            Self::CompaniesMatched => "companies_matched",
            Self::NoCompaniesMatched => "no_companies_matched",
            Self::CandidateApprovalPending => "candidate_approval_pending",
            Self::CandidateApproved => "candidate_approved",
            Self::FindingDecisionMakers => "finding_decision_makers",
            Self::DecisionMakersFound => "decision_makers_found",
            Self::NoDecisionMakersFound => "no_decision_makers_found",
            Self::CampaignCreating => "campaign_creating",
            Self::CampaignCreated => "campaign_created",
            Self::Failed => "failed",
        }
    }

    /// Terminal states: the chain never advances out of these on its own.
    /// (`Failed` requires human intervention; restarting extraction IS that
    /// intervention, see `apply`.)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::NoCompaniesMatched
                | Self::NoDecisionMakersFound
                | Self::CampaignCreated
                | Self::Failed
        )
    }

    /// Apply an event, returning the next status or rejecting the edge.
    pub fn apply(self, event: StatusEvent) -> Result<ProcessingStatus, TransitionError> {
        use ProcessingStatus as S;
        use StatusEvent as E;

        let next = match (self, event) {
            // Extraction may start fresh or as a human restart out of Failed.
            (S::NotStarted | S::Failed, E::StartExtraction) => S::ExtractingCandidateData,
            (S::ExtractingCandidateData, E::ExtractionSucceeded) => S::CandidateDataExtracted,
            (S::CandidateDataExtracted, E::StartCompanySearch) => S::SearchingCompanies,
            (S::SearchingCompanies, E::CompaniesMatched) => S::CompaniesMatched,
            (S::SearchingCompanies, E::NoCompaniesMatched) => S::NoCompaniesMatched,
            (S::CompaniesMatched, E::ApprovalRequested) => S::CandidateApprovalPending,
            (S::CandidateApprovalPending, E::CandidateApproved) => S::CandidateApproved,
            (S::CandidateApproved, E::StartDecisionMakerSearch) => S::FindingDecisionMakers,
            (S::FindingDecisionMakers, E::DecisionMakersFound) => S::DecisionMakersFound,
            (S::FindingDecisionMakers, E::NoDecisionMakersFound) => S::NoDecisionMakersFound,
            (S::DecisionMakersFound, E::StartCampaign) => S::CampaignCreating,
            (S::CampaignCreating, E::CampaignCreated) => S::CampaignCreated,
            // Any non-terminal state may fail on unrecoverable stage error.
            (from, E::StageFailed) if !from.is_terminal() => S::Failed,
            (from, event) => return Err(TransitionError { from, event }),
        };
        Ok(next)
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "extracting_candidate_data" => Ok(Self::ExtractingCandidateData),
            "candidate_data_extracted" => Ok(Self::CandidateDataExtracted),
            "searching_companies" => Ok(Self::SearchingCompanies),
            "companies_matched" => Ok(Self::CompaniesMatched),
            "no_companies_matched" => Ok(Self::NoCompaniesMatched),
            "candidate_approval_pending" => Ok(Self::CandidateApprovalPending),
            "candidate_approved" => Ok(Self::CandidateApproved),
            "finding_decision_makers" => Ok(Self::FindingDecisionMakers),
            "decision_makers_found" => Ok(Self::DecisionMakersFound),
            "no_decision_makers_found" => Ok(Self::NoDecisionMakersFound),
            "campaign_creating" => Ok(Self::CampaignCreating),
            "campaign_created" => Ok(Self::CampaignCreated),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid processing status: {}", s)),
        }
    }
}
