use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use talentflow::apollo::ApolloClient;
use talentflow::assignment::SeniorityRanker;
use talentflow::config::Settings;
use talentflow::db::{DbHandle, PipelineDb};
use talentflow::extract::{DocumentSet, HttpExtractor};
use talentflow::lemlist::LemlistClient;
use talentflow::models::{NewCandidate, ResumeSource, SearchStrategy, TranscriptSource};
use talentflow::pipeline::{Collaborators, Orchestrator};
use talentflow::queue::{self, TaskQueue, TaskReceiver};

#[derive(Parser)]
#[command(name = "talentflow")]
#[command(version, about = "Candidate enrichment and outreach pipeline")]
struct Cli {
    /// Path to the config file (defaults to ./talentflow.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and run migrations
    InitDb,
    /// Intake a candidate and run the pipeline up to the approval gate
    Intake {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        linkedin_url: String,
        #[arg(long, default_value = "")]
        role: String,
        /// Free-text notes passed to extraction
        #[arg(long, default_value = "")]
        notes: String,
        /// Plain-text resume file
        #[arg(long)]
        resume: PathBuf,
        /// Plain-text call transcript file
        #[arg(long)]
        transcript: PathBuf,
        #[arg(long, default_value = "local")]
        resume_source: ResumeSource,
        #[arg(long, default_value = "local")]
        transcript_source: TranscriptSource,
        #[arg(long, default_value = "smart")]
        strategy: SearchStrategy,
        /// Explicit company domains (manual strategy)
        #[arg(long = "domain")]
        domains: Vec<String>,
    },
    /// Put the matched companies in front of the candidate for approval
    RequestApproval { candidate_id: i64 },
    /// Record company approvals and continue to decision-maker discovery
    Approve {
        candidate_id: i64,
        /// Company ids the candidate approved
        #[arg(long = "approve")]
        approved: Vec<i64>,
        /// Company ids the candidate rejected
        #[arg(long = "reject")]
        rejected: Vec<i64>,
    },
    /// Create the outbound campaign for a candidate
    Campaign {
        candidate_id: i64,
        #[arg(long)]
        name: String,
    },
    /// Re-run a failed candidate's pipeline with fresh document text
    Restart {
        candidate_id: i64,
        #[arg(long)]
        resume: PathBuf,
        #[arg(long)]
        transcript: PathBuf,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Show one candidate's status, or all candidates
    Status { candidate_id: Option<i64> },
    /// Delete a candidate, pausing any active campaign first
    Delete { candidate_id: i64 },
}

fn build(settings: &Settings) -> Result<(Arc<Orchestrator>, TaskReceiver, DbHandle)> {
    let db = DbHandle::new(PipelineDb::new(&settings.database_path)?);
    let apollo = Arc::new(ApolloClient::new(
        &settings.apollo.api_key,
        &settings.apollo.base_url,
    ));
    let collaborators = Collaborators {
        extractor: Arc::new(HttpExtractor::new(&settings.extractor.url)),
        companies: apollo.clone(),
        people: apollo,
        campaigns: Arc::new(LemlistClient::new(
            &settings.lemlist.api_key,
            &settings.lemlist.base_url,
        )),
        oracle: Arc::new(SeniorityRanker),
    };
    let (queue, rx) = TaskQueue::new();
    let orchestrator = Arc::new(Orchestrator::new(
        db.clone(),
        collaborators,
        queue,
        settings.timeouts(),
        settings.sequence_steps.clone(),
    ));
    Ok((orchestrator, rx, db))
}

fn read_documents(resume: &PathBuf, transcript: &PathBuf, notes: &str) -> Result<DocumentSet> {
    Ok(DocumentSet {
        resume_text: std::fs::read_to_string(resume)
            .with_context(|| format!("Failed to read resume {}", resume.display()))?,
        transcript_text: std::fs::read_to_string(transcript)
            .with_context(|| format!("Failed to read transcript {}", transcript.display()))?,
        notes: notes.to_string(),
    })
}

fn filename_of(path: &PathBuf) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("talentflow=info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::InitDb => {
            PipelineDb::new(&settings.database_path)?;
            println!("Initialized database at {}", settings.database_path.display());
        }
        Commands::Intake {
            first_name,
            last_name,
            email,
            linkedin_url,
            role,
            notes,
            resume,
            transcript,
            resume_source,
            transcript_source,
            strategy,
            domains,
        } => {
            let documents = read_documents(&resume, &transcript, &notes)?;
            let new = NewCandidate {
                first_name,
                last_name,
                email,
                linkedin_url,
                role,
                additional_info: notes,
                resume_source,
                resume_filename: filename_of(&resume),
                transcript_source,
                transcript_filename: filename_of(&transcript),
                search_strategy: strategy,
                company_domains: domains,
            };
            let (orchestrator, mut rx, _db) = build(&settings)?;
            let candidate = orchestrator.intake(new, documents).await?;
            queue::run_until_idle(&orchestrator, &mut rx).await;
            report_status(&orchestrator, candidate.id).await?;
        }
        Commands::RequestApproval { candidate_id } => {
            let (orchestrator, _rx, _db) = build(&settings)?;
            let status = orchestrator.request_candidate_approval(candidate_id).await?;
            println!("Candidate {} is now '{}'", candidate_id, status);
        }
        Commands::Approve {
            candidate_id,
            approved,
            rejected,
        } => {
            let approvals: Vec<(i64, bool)> = approved
                .into_iter()
                .map(|id| (id, true))
                .chain(rejected.into_iter().map(|id| (id, false)))
                .collect();
            let (orchestrator, mut rx, _db) = build(&settings)?;
            orchestrator.approve_companies(candidate_id, approvals).await?;
            queue::run_until_idle(&orchestrator, &mut rx).await;
            report_status(&orchestrator, candidate_id).await?;
        }
        Commands::Campaign { candidate_id, name } => {
            let (orchestrator, mut rx, _db) = build(&settings)?;
            let link = orchestrator.request_campaign(candidate_id, &name).await?;
            queue::run_until_idle(&orchestrator, &mut rx).await;
            println!("Campaign {} linked to candidate {}", link.campaign_id, candidate_id);
            report_status(&orchestrator, candidate_id).await?;
        }
        Commands::Restart {
            candidate_id,
            resume,
            transcript,
            notes,
        } => {
            let documents = read_documents(&resume, &transcript, &notes)?;
            let (orchestrator, mut rx, _db) = build(&settings)?;
            orchestrator.restart(candidate_id, documents).await?;
            queue::run_until_idle(&orchestrator, &mut rx).await;
            report_status(&orchestrator, candidate_id).await?;
        }
        Commands::Status { candidate_id } => {
            let (orchestrator, _rx, db) = build(&settings)?;
            match candidate_id {
                Some(id) => report_status(&orchestrator, id).await?,
                None => {
                    let candidates = db.call(|db| db.list_candidates()).await?;
                    for c in candidates {
                        println!(
                            "{:>5}  {:<30}  {}",
                            c.id,
                            format!("{} {}", c.first_name, c.last_name),
                            c.processing_status
                        );
                    }
                }
            }
        }
        Commands::Delete { candidate_id } => {
            let (orchestrator, _rx, _db) = build(&settings)?;
            if orchestrator.delete_candidate(candidate_id).await? {
                println!("Candidate {} deleted", candidate_id);
            } else {
                println!("Candidate {} not found", candidate_id);
            }
        }
    }
    Ok(())
}

async fn report_status(orchestrator: &Orchestrator, candidate_id: i64) -> Result<()> {
    let status = orchestrator.candidate_status(candidate_id).await?;
    println!("Candidate {} is now '{}'", candidate_id, status);
    Ok(())
}
