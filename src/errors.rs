//! Typed error hierarchy for the pipeline orchestrator.
//!
//! `PipelineError` distinguishes the failure classes the orchestrator cares
//! about: state conflicts (rejected, nothing written), collaborator failures
//! (stage fails, status goes to `failed`), database errors, and conflicts on
//! campaign creation.

use thiserror::Error;

use crate::status::{ProcessingStatus, StatusEvent, TransitionError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Candidate {id} not found")]
    CandidateNotFound { id: i64 },

    /// The event has no defined edge from the candidate's current status.
    /// Duplicate or late task deliveries surface here and are no-ops.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The status row changed between read and conditional write — another
    /// delivery of the same stage won the race.
    #[error("candidate {candidate_id}: status changed concurrently while applying {event:?}")]
    ConcurrentTransition {
        candidate_id: i64,
        event: StatusEvent,
    },

    #[error("Campaign already exists for candidate {candidate_id}")]
    CampaignExists { candidate_id: i64 },

    #[error("Candidate {candidate_id} has no campaign link (status '{status}')")]
    CampaignLinkMissing {
        candidate_id: i64,
        status: ProcessingStatus,
    },

    #[error("{service} request failed: {source:#}")]
    Collaborator {
        service: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("{service} request timed out after {seconds}s")]
    CollaboratorTimeout { service: &'static str, seconds: u64 },

    #[error("Database error: {0:#}")]
    Database(#[source] anyhow::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Conflicts are rejected events: no status change happened and the
    /// stage performed no work. Everything else is a real failure that
    /// already drove (or will drive) the candidate to `failed`.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Transition(_) | Self::ConcurrentTransition { .. } | Self::CampaignExists { .. }
        )
    }

    /// Recover the typed error from an `anyhow::Error` that crossed the
    /// database handle boundary.
    pub fn from_db(err: anyhow::Error) -> Self {
        match err.downcast::<PipelineError>() {
            Ok(typed) => typed,
            Err(err) => match err.downcast::<TransitionError>() {
                Ok(transition) => Self::Transition(transition),
                Err(err) => Self::Database(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_classification() {
        let conflict = PipelineError::Transition(TransitionError {
            from: ProcessingStatus::ExtractingCandidateData,
            event: StatusEvent::CandidateApproved,
        });
        assert!(conflict.is_conflict());

        let exists = PipelineError::CampaignExists { candidate_id: 7 };
        assert!(exists.is_conflict());

        let failure = PipelineError::CollaboratorTimeout {
            service: "apollo",
            seconds: 30,
        };
        assert!(!failure.is_conflict());
    }

    #[test]
    fn test_from_db_recovers_transition_error() {
        let original = TransitionError {
            from: ProcessingStatus::CampaignCreated,
            event: StatusEvent::StageFailed,
        };
        let err = PipelineError::from_db(anyhow::Error::new(original.clone()));
        match err {
            PipelineError::Transition(t) => assert_eq!(t, original),
            other => panic!("Expected Transition, got {:?}", other),
        }
    }

    #[test]
    fn test_from_db_recovers_pipeline_error() {
        let err = PipelineError::from_db(anyhow::Error::new(PipelineError::CandidateNotFound {
            id: 3,
        }));
        assert!(matches!(err, PipelineError::CandidateNotFound { id: 3 }));
    }

    #[test]
    fn test_from_db_wraps_unknown_as_database() {
        let err = PipelineError::from_db(anyhow::anyhow!("disk on fire"));
        assert!(matches!(err, PipelineError::Database(_)));
        assert!(err.to_string().contains("disk on fire"));
    }
}
