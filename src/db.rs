use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::PipelineError;
use crate::models::*;
use crate::status::{ProcessingStatus, StatusEvent};

/// Async-safe handle to the pipeline database.
///
/// Wraps `PipelineDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, preventing synchronous SQLite
/// I/O from tying up async worker threads. The mutex also makes each closure
/// a single-writer critical section, which is what lets the compare-and-set
/// status writes act as the duplicate-delivery gate.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<PipelineDb>>,
}

impl DbHandle {
    pub fn new(db: PipelineDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&PipelineDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }
}

pub struct PipelineDb {
    conn: Connection,
}

impl PipelineDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS candidates (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    first_name TEXT NOT NULL,
                    last_name TEXT NOT NULL,
                    email TEXT NOT NULL,
                    linkedin_url TEXT NOT NULL DEFAULT '',
                    role TEXT NOT NULL DEFAULT '',
                    additional_info TEXT NOT NULL DEFAULT '',
                    processing_status TEXT NOT NULL DEFAULT 'not_started',
                    extracted_data TEXT,
                    company_preferences TEXT,
                    resume_source TEXT NOT NULL DEFAULT 'local',
                    resume_filename TEXT NOT NULL DEFAULT '',
                    transcript_source TEXT NOT NULL DEFAULT 'local',
                    transcript_filename TEXT NOT NULL DEFAULT '',
                    search_strategy TEXT NOT NULL DEFAULT 'smart',
                    company_domains TEXT NOT NULL DEFAULT '[]',
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS companies (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    apollo_id TEXT NOT NULL UNIQUE,
                    name TEXT,
                    primary_domain TEXT,
                    short_description TEXT,
                    industry TEXT,
                    latest_funding_stage TEXT,
                    total_funding INTEGER,
                    estimated_num_employees INTEGER,
                    founded_year INTEGER,
                    website_url TEXT,
                    linkedin_url TEXT,
                    logo_url TEXT,
                    city TEXT,
                    state TEXT,
                    country TEXT,
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS decision_makers (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
                    apollo_id TEXT NOT NULL UNIQUE,
                    first_name TEXT,
                    last_name TEXT,
                    title TEXT,
                    seniority TEXT,
                    headline TEXT,
                    email TEXT,
                    email_status TEXT,
                    linkedin_url TEXT,
                    photo_url TEXT,
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS company_selections (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    candidate_id INTEGER NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
                    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
                    approved_by_candidate INTEGER,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    UNIQUE(candidate_id, company_id)
                );

                CREATE TABLE IF NOT EXISTS campaign_links (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    candidate_id INTEGER NOT NULL UNIQUE REFERENCES candidates(id) ON DELETE CASCADE,
                    campaign_id TEXT NOT NULL,
                    sequence_id TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE INDEX IF NOT EXISTS idx_decision_makers_company ON decision_makers(company_id);
                CREATE INDEX IF NOT EXISTS idx_selections_candidate ON company_selections(candidate_id);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Candidates ────────────────────────────────────────────────────

    pub fn create_candidate(&self, new: &NewCandidate) -> Result<Candidate> {
        let domains =
            serde_json::to_string(&new.company_domains).context("Failed to encode domains")?;
        self.conn
            .execute(
                "INSERT INTO candidates (first_name, last_name, email, linkedin_url, role,
                    additional_info, resume_source, resume_filename, transcript_source,
                    transcript_filename, search_strategy, company_domains)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    new.first_name,
                    new.last_name,
                    new.email,
                    new.linkedin_url,
                    new.role,
                    new.additional_info,
                    new.resume_source.as_str(),
                    new.resume_filename,
                    new.transcript_source.as_str(),
                    new.transcript_filename,
                    new.search_strategy.as_str(),
                    domains,
                ],
            )
            .context("Failed to insert candidate")?;
        let id = self.conn.last_insert_rowid();
        self.get_candidate(id)?
            .context("Candidate not found after insert")
    }

    pub fn get_candidate(&self, id: i64) -> Result<Option<Candidate>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, first_name, last_name, email, linkedin_url, role, additional_info,
                        processing_status, extracted_data, company_preferences, resume_source,
                        resume_filename, transcript_source, transcript_filename, search_strategy,
                        company_domains, created_at, updated_at
                 FROM candidates WHERE id = ?1",
            )
            .context("Failed to prepare get_candidate")?;
        let row = stmt
            .query_row(params![id], CandidateRow::from_row)
            .optional()
            .context("Failed to query candidate")?;
        match row {
            Some(r) => Ok(Some(r.into_candidate()?)),
            None => Ok(None),
        }
    }

    pub fn list_candidates(&self) -> Result<Vec<Candidate>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, first_name, last_name, email, linkedin_url, role, additional_info,
                        processing_status, extracted_data, company_preferences, resume_source,
                        resume_filename, transcript_source, transcript_filename, search_strategy,
                        company_domains, created_at, updated_at
                 FROM candidates ORDER BY id",
            )
            .context("Failed to prepare list_candidates")?;
        let rows = stmt
            .query_map([], CandidateRow::from_row)
            .context("Failed to query candidates")?;
        let mut candidates = Vec::new();
        for row in rows {
            candidates.push(row.context("Failed to read candidate row")?.into_candidate()?);
        }
        Ok(candidates)
    }

    pub fn candidate_status(&self, id: i64) -> Result<Option<ProcessingStatus>> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT processing_status FROM candidates WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query candidate status")?;
        status
            .map(|s| {
                ProcessingStatus::from_str(&s)
                    .map_err(|e| anyhow::anyhow!("Corrupt status column: {}", e))
            })
            .transpose()
    }

    /// Apply a status event as a compare-and-set write.
    ///
    /// Reads the current status, validates the edge against the registry and
    /// writes the next status only if the row still holds the value that was
    /// read. Zero rows updated means another delivery of the same stage won
    /// the race; the caller treats that as a conflict, not a failure.
    pub fn advance_status(&self, id: i64, event: StatusEvent) -> Result<ProcessingStatus> {
        let current = self
            .candidate_status(id)?
            .ok_or_else(|| anyhow::Error::new(PipelineError::CandidateNotFound { id }))?;
        let next = current.apply(event).map_err(anyhow::Error::new)?;
        let changed = self
            .conn
            .execute(
                "UPDATE candidates SET processing_status = ?1, updated_at = datetime('now')
                 WHERE id = ?2 AND processing_status = ?3",
                params![next.as_str(), id, current.as_str()],
            )
            .context("Failed to update processing status")?;
        if changed == 0 {
            return Err(anyhow::Error::new(PipelineError::ConcurrentTransition {
                candidate_id: id,
                event,
            }));
        }
        Ok(next)
    }

    /// Drive a candidate to `failed` unless it already reached a terminal
    /// state. Returns the new status, or None when nothing was written.
    pub fn mark_failed(&self, id: i64) -> Result<Option<ProcessingStatus>> {
        let Some(current) = self.candidate_status(id)? else {
            return Ok(None);
        };
        if current.is_terminal() {
            return Ok(None);
        }
        let changed = self
            .conn
            .execute(
                "UPDATE candidates SET processing_status = ?1, updated_at = datetime('now')
                 WHERE id = ?2 AND processing_status = ?3",
                params![ProcessingStatus::Failed.as_str(), id, current.as_str()],
            )
            .context("Failed to mark candidate failed")?;
        Ok((changed > 0).then_some(ProcessingStatus::Failed))
    }

    /// Persist the extraction collaborator's output on the candidate row.
    pub fn store_extraction(
        &self,
        id: i64,
        profile: &serde_json::Value,
        preferences: &CompanyPreferences,
    ) -> Result<()> {
        let profile = serde_json::to_string(profile).context("Failed to encode profile")?;
        let preferences =
            serde_json::to_string(preferences).context("Failed to encode preferences")?;
        let changed = self
            .conn
            .execute(
                "UPDATE candidates SET extracted_data = ?1, company_preferences = ?2,
                    updated_at = datetime('now')
                 WHERE id = ?3",
                params![profile, preferences, id],
            )
            .context("Failed to store extraction output")?;
        if changed == 0 {
            return Err(anyhow::Error::new(PipelineError::CandidateNotFound { id }));
        }
        Ok(())
    }

    /// Delete a candidate row; selections and the campaign link cascade.
    /// Company and decision-maker snapshots are shared and stay.
    pub fn delete_candidate(&self, id: i64) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM candidates WHERE id = ?1", params![id])
            .context("Failed to delete candidate")?;
        Ok(count > 0)
    }

    // ── Companies ─────────────────────────────────────────────────────

    /// Insert-or-update a company snapshot by its vendor key. Overwrites
    /// every mutable field but keeps the internal id, so selections and
    /// decision-maker foreign keys stay valid across re-enrichment.
    pub fn upsert_company(&self, apollo_id: &str, record: &CompanyRecord) -> Result<i64> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM companies WHERE apollo_id = ?1",
                params![apollo_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up company by vendor id")?;

        match existing {
            Some(id) => {
                self.conn
                    .execute(
                        "UPDATE companies SET name = ?1, primary_domain = ?2,
                            short_description = ?3, industry = ?4, latest_funding_stage = ?5,
                            total_funding = ?6, estimated_num_employees = ?7, founded_year = ?8,
                            website_url = ?9, linkedin_url = ?10, logo_url = ?11, city = ?12,
                            state = ?13, country = ?14, updated_at = datetime('now')
                         WHERE id = ?15",
                        params![
                            record.name,
                            record.primary_domain,
                            record.short_description,
                            record.industry,
                            record.latest_funding_stage,
                            record.total_funding,
                            record.estimated_num_employees,
                            record.founded_year,
                            record.website_url,
                            record.linkedin_url,
                            record.logo_url,
                            record.city,
                            record.state,
                            record.country,
                            id,
                        ],
                    )
                    .context("Failed to update company")?;
                Ok(id)
            }
            None => {
                self.conn
                    .execute(
                        "INSERT INTO companies (apollo_id, name, primary_domain,
                            short_description, industry, latest_funding_stage, total_funding,
                            estimated_num_employees, founded_year, website_url, linkedin_url,
                            logo_url, city, state, country)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                        params![
                            apollo_id,
                            record.name,
                            record.primary_domain,
                            record.short_description,
                            record.industry,
                            record.latest_funding_stage,
                            record.total_funding,
                            record.estimated_num_employees,
                            record.founded_year,
                            record.website_url,
                            record.linkedin_url,
                            record.logo_url,
                            record.city,
                            record.state,
                            record.country,
                        ],
                    )
                    .context("Failed to insert company")?;
                Ok(self.conn.last_insert_rowid())
            }
        }
    }

    pub fn get_company(&self, id: i64) -> Result<Option<Company>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM companies WHERE id = ?1",
                COMPANY_COLUMNS
            ))
            .context("Failed to prepare get_company")?;
        stmt.query_row(params![id], company_from_row)
            .optional()
            .context("Failed to query company")
    }

    pub fn company_id_by_vendor(&self, apollo_id: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM companies WHERE apollo_id = ?1",
                params![apollo_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up company by vendor id")
    }

    // ── Decision makers ───────────────────────────────────────────────

    /// Insert-or-update a decision maker by its vendor key, re-pointing the
    /// company foreign key on update (people move between companies in
    /// vendor data).
    pub fn upsert_decision_maker(
        &self,
        apollo_id: &str,
        company_id: i64,
        record: &PersonRecord,
    ) -> Result<i64> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM decision_makers WHERE apollo_id = ?1",
                params![apollo_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up decision maker by vendor id")?;

        match existing {
            Some(id) => {
                self.conn
                    .execute(
                        "UPDATE decision_makers SET company_id = ?1, first_name = ?2,
                            last_name = ?3, title = ?4, seniority = ?5, headline = ?6,
                            email = ?7, email_status = ?8, linkedin_url = ?9, photo_url = ?10,
                            updated_at = datetime('now')
                         WHERE id = ?11",
                        params![
                            company_id,
                            record.first_name,
                            record.last_name,
                            record.title,
                            record.seniority,
                            record.headline,
                            record.email,
                            record.email_status,
                            record.linkedin_url,
                            record.photo_url,
                            id,
                        ],
                    )
                    .context("Failed to update decision maker")?;
                Ok(id)
            }
            None => {
                self.conn
                    .execute(
                        "INSERT INTO decision_makers (company_id, apollo_id, first_name,
                            last_name, title, seniority, headline, email, email_status,
                            linkedin_url, photo_url)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                        params![
                            company_id,
                            apollo_id,
                            record.first_name,
                            record.last_name,
                            record.title,
                            record.seniority,
                            record.headline,
                            record.email,
                            record.email_status,
                            record.linkedin_url,
                            record.photo_url,
                        ],
                    )
                    .context("Failed to insert decision maker")?;
                Ok(self.conn.last_insert_rowid())
            }
        }
    }

    pub fn decision_makers_for_company(&self, company_id: i64) -> Result<Vec<DecisionMaker>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, company_id, apollo_id, first_name, last_name, title, seniority,
                        headline, email, email_status, linkedin_url, photo_url, updated_at
                 FROM decision_makers WHERE company_id = ?1 ORDER BY id",
            )
            .context("Failed to prepare decision_makers_for_company")?;
        let rows = stmt
            .query_map(params![company_id], |row| {
                Ok(DecisionMaker {
                    id: row.get(0)?,
                    company_id: row.get(1)?,
                    apollo_id: row.get(2)?,
                    first_name: row.get(3)?,
                    last_name: row.get(4)?,
                    title: row.get(5)?,
                    seniority: row.get(6)?,
                    headline: row.get(7)?,
                    email: row.get(8)?,
                    email_status: row.get(9)?,
                    linkedin_url: row.get(10)?,
                    photo_url: row.get(11)?,
                    updated_at: row.get(12)?,
                })
            })
            .context("Failed to query decision makers")?;
        let mut makers = Vec::new();
        for row in rows {
            makers.push(row.context("Failed to read decision maker row")?);
        }
        Ok(makers)
    }

    // ── Company selections ────────────────────────────────────────────

    /// Create one selection row per newly-seen company for the candidate.
    /// Pairs that already exist are skipped, not duplicated. Returns the
    /// number of rows actually inserted.
    pub fn link_selections(&self, candidate_id: i64, company_ids: &[i64]) -> Result<usize> {
        let mut inserted = 0;
        for company_id in company_ids {
            inserted += self
                .conn
                .execute(
                    "INSERT OR IGNORE INTO company_selections (candidate_id, company_id)
                     VALUES (?1, ?2)",
                    params![candidate_id, company_id],
                )
                .context("Failed to insert company selection")?;
        }
        Ok(inserted)
    }

    pub fn list_selections(&self, candidate_id: i64) -> Result<Vec<CompanySelection>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, candidate_id, company_id, approved_by_candidate, created_at
                 FROM company_selections WHERE candidate_id = ?1 ORDER BY id",
            )
            .context("Failed to prepare list_selections")?;
        let rows = stmt
            .query_map(params![candidate_id], |row| {
                let approved: Option<i64> = row.get(3)?;
                Ok(CompanySelection {
                    id: row.get(0)?,
                    candidate_id: row.get(1)?,
                    company_id: row.get(2)?,
                    approved_by_candidate: approved.map(|v| v != 0),
                    created_at: row.get(4)?,
                })
            })
            .context("Failed to query selections")?;
        let mut selections = Vec::new();
        for row in rows {
            selections.push(row.context("Failed to read selection row")?);
        }
        Ok(selections)
    }

    /// Record per-company approval flags and advance the candidate to
    /// `candidate_approved` in one transaction, so a stale approval leaves
    /// no partial writes behind.
    pub fn approve_companies(
        &self,
        candidate_id: i64,
        approvals: &[(i64, bool)],
    ) -> Result<ProcessingStatus> {
        // Safety: DbHandle's Mutex already guarantees single-threaded access.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin approval transaction")?;
        let next = self.advance_status(candidate_id, StatusEvent::CandidateApproved)?;
        for (company_id, approved) in approvals {
            self.conn
                .execute(
                    "UPDATE company_selections SET approved_by_candidate = ?1
                     WHERE candidate_id = ?2 AND company_id = ?3",
                    params![*approved as i64, candidate_id, company_id],
                )
                .context("Failed to update selection approval")?;
        }
        tx.commit().context("Failed to commit approvals")?;
        Ok(next)
    }

    /// Companies the candidate approved for outreach, in selection order.
    pub fn approved_companies(&self, candidate_id: i64) -> Result<Vec<Company>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM companies c
                 JOIN company_selections s ON s.company_id = c.id
                 WHERE s.candidate_id = ?1 AND s.approved_by_candidate = 1
                 ORDER BY s.id",
                COMPANY_COLUMNS_QUALIFIED
            ))
            .context("Failed to prepare approved_companies")?;
        let rows = stmt
            .query_map(params![candidate_id], company_from_row)
            .context("Failed to query approved companies")?;
        let mut companies = Vec::new();
        for row in rows {
            companies.push(row.context("Failed to read company row")?);
        }
        Ok(companies)
    }

    // ── Campaign links ────────────────────────────────────────────────

    pub fn get_campaign_link(&self, candidate_id: i64) -> Result<Option<CampaignLink>> {
        self.conn
            .query_row(
                "SELECT id, candidate_id, campaign_id, sequence_id, created_at
                 FROM campaign_links WHERE candidate_id = ?1",
                params![candidate_id],
                |row| {
                    Ok(CampaignLink {
                        id: row.get(0)?,
                        candidate_id: row.get(1)?,
                        campaign_id: row.get(2)?,
                        sequence_id: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()
            .context("Failed to query campaign link")
    }

    /// Record the candidate's one-and-only campaign. The UNIQUE constraint on
    /// candidate_id turns a duplicate attempt into `CampaignExists`.
    pub fn create_campaign_link(
        &self,
        candidate_id: i64,
        campaign_id: &str,
        sequence_id: &str,
    ) -> Result<CampaignLink> {
        match self.conn.execute(
            "INSERT INTO campaign_links (candidate_id, campaign_id, sequence_id)
             VALUES (?1, ?2, ?3)",
            params![candidate_id, campaign_id, sequence_id],
        ) {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(anyhow::Error::new(PipelineError::CampaignExists {
                    candidate_id,
                }));
            }
            Err(e) => return Err(e).context("Failed to insert campaign link"),
        }
        self.get_campaign_link(candidate_id)?
            .context("Campaign link not found after insert")
    }
}

const COMPANY_COLUMNS: &str = "id, apollo_id, name, primary_domain, short_description, industry, \
     latest_funding_stage, total_funding, estimated_num_employees, founded_year, website_url, \
     linkedin_url, logo_url, city, state, country, updated_at";

const COMPANY_COLUMNS_QUALIFIED: &str =
    "c.id, c.apollo_id, c.name, c.primary_domain, c.short_description, c.industry, \
     c.latest_funding_stage, c.total_funding, c.estimated_num_employees, c.founded_year, \
     c.website_url, c.linkedin_url, c.logo_url, c.city, c.state, c.country, c.updated_at";

fn company_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Company> {
    Ok(Company {
        id: row.get(0)?,
        apollo_id: row.get(1)?,
        name: row.get(2)?,
        primary_domain: row.get(3)?,
        short_description: row.get(4)?,
        industry: row.get(5)?,
        latest_funding_stage: row.get(6)?,
        total_funding: row.get(7)?,
        estimated_num_employees: row.get(8)?,
        founded_year: row.get(9)?,
        website_url: row.get(10)?,
        linkedin_url: row.get(11)?,
        logo_url: row.get(12)?,
        city: row.get(13)?,
        state: row.get(14)?,
        country: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

/// Raw candidate row; string-typed columns are parsed in `into_candidate`.
struct CandidateRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    linkedin_url: String,
    role: String,
    additional_info: String,
    processing_status: String,
    extracted_data: Option<String>,
    company_preferences: Option<String>,
    resume_source: String,
    resume_filename: String,
    transcript_source: String,
    transcript_filename: String,
    search_strategy: String,
    company_domains: String,
    created_at: String,
    updated_at: String,
}

impl CandidateRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            email: row.get(3)?,
            linkedin_url: row.get(4)?,
            role: row.get(5)?,
            additional_info: row.get(6)?,
            processing_status: row.get(7)?,
            extracted_data: row.get(8)?,
            company_preferences: row.get(9)?,
            resume_source: row.get(10)?,
            resume_filename: row.get(11)?,
            transcript_source: row.get(12)?,
            transcript_filename: row.get(13)?,
            search_strategy: row.get(14)?,
            company_domains: row.get(15)?,
            created_at: row.get(16)?,
            updated_at: row.get(17)?,
        })
    }

    fn into_candidate(self) -> Result<Candidate> {
        let processing_status = ProcessingStatus::from_str(&self.processing_status)
            .map_err(|e| anyhow::anyhow!("Corrupt status column: {}", e))?;
        let resume_source = ResumeSource::from_str(&self.resume_source)
            .map_err(|e| anyhow::anyhow!("Corrupt resume_source column: {}", e))?;
        let transcript_source = TranscriptSource::from_str(&self.transcript_source)
            .map_err(|e| anyhow::anyhow!("Corrupt transcript_source column: {}", e))?;
        let search_strategy = SearchStrategy::from_str(&self.search_strategy)
            .map_err(|e| anyhow::anyhow!("Corrupt search_strategy column: {}", e))?;
        let extracted_data = self
            .extracted_data
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .context("Corrupt extracted_data column")?;
        let company_preferences = self
            .company_preferences
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .context("Corrupt company_preferences column")?;
        let company_domains = serde_json::from_str(&self.company_domains)
            .context("Corrupt company_domains column")?;
        Ok(Candidate {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            linkedin_url: self.linkedin_url,
            role: self.role,
            additional_info: self.additional_info,
            processing_status,
            extracted_data,
            company_preferences,
            resume_source,
            resume_filename: self.resume_filename,
            transcript_source,
            transcript_filename: self.transcript_filename,
            search_strategy,
            company_domains,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
