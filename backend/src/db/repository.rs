//! Database repository for job postings and decisions.
//!
//! Uses prepared statements and transactions for data integrity.

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{CreateJobRequest, Decision, JobPosting, RevisionInfo, UpdateJobRequest};
use crate::triage::{DecisionSink, JobSource};

const JOB_COLUMNS: &str = "id, title, company, location, description, job_type, salary, contact_email, skills, created_at, updated_at";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(timestamp(Utc::now()))
            .execute(&self.pool)
            .await?;
        self.get_revision_id().await
    }

    // ==================== JOB OPERATIONS ====================

    /// List all jobs, newest first.
    pub async fn list_jobs(&self) -> Result<Vec<JobPosting>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM jobs ORDER BY created_at DESC, rowid DESC",
            JOB_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(job_from_row).collect())
    }

    /// Get a job by ID.
    pub async fn get_job(&self, id: &str) -> Result<Option<JobPosting>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM jobs WHERE id = ?", JOB_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(job_from_row))
    }

    /// Get several jobs by ID, newest first. Unknown IDs are skipped.
    pub async fn get_jobs_by_ids(&self, ids: &[String]) -> Result<Vec<JobPosting>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM jobs WHERE id IN ({}) ORDER BY created_at DESC, rowid DESC",
            JOB_COLUMNS, placeholders
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(job_from_row).collect())
    }

    /// Create a new job. The request must already be validated.
    pub async fn create_job(&self, request: &CreateJobRequest) -> Result<JobPosting, AppError> {
        let job = new_job(request, Utc::now());
        insert_job(&self.pool, &job).await?;
        self.increment_revision().await?;
        Ok(job)
    }

    /// Apply a partial update to a job.
    pub async fn update_job(
        &self,
        id: &str,
        request: &UpdateJobRequest,
    ) -> Result<JobPosting, AppError> {
        let mut job = self
            .get_job(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))?;

        request.apply_to(&mut job).map_err(AppError::Validation)?;
        job.updated_at = timestamp(Utc::now());

        sqlx::query(
            r#"UPDATE jobs SET
                title = ?, company = ?, location = ?, description = ?, job_type = ?,
                salary = ?, contact_email = ?, skills = ?, updated_at = ?
            WHERE id = ?"#,
        )
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.description)
        .bind(&job.job_type)
        .bind(&job.salary)
        .bind(&job.contact_email)
        .bind(skills_json(&job.skills))
        .bind(&job.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;
        Ok(job)
    }

    /// Delete a job. Its decisions are kept.
    pub async fn delete_job(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Job {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }

    /// Delete every job. Returns the number removed.
    pub async fn clear_jobs(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM jobs").execute(&self.pool).await?;
        self.increment_revision().await?;
        Ok(result.rows_affected())
    }

    /// Replace all jobs with the given postings in one transaction.
    ///
    /// Postings are stamped one second apart in list order so that the newest-first
    /// listing returns them in the order given.
    pub async fn replace_jobs(
        &self,
        requests: &[CreateJobRequest],
    ) -> Result<Vec<JobPosting>, AppError> {
        let now = Utc::now();
        let jobs: Vec<JobPosting> = requests
            .iter()
            .enumerate()
            .map(|(i, request)| new_job(request, now - Duration::seconds(i as i64)))
            .collect();

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM jobs").execute(&mut *tx).await?;
        for job in &jobs {
            insert_job(&mut *tx, job).await?;
        }

        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(timestamp(now))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(jobs)
    }

    // ==================== DECISION OPERATIONS ====================

    /// Append a decision. The job ID is not checked against the jobs table.
    pub async fn record_decision(&self, job_id: &str, applied: bool) -> Result<Decision, AppError> {
        let decision = Decision {
            id: uuid::Uuid::new_v4().to_string(),
            job_id: job_id.to_string(),
            applied,
            created_at: timestamp(Utc::now()),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO job_actions (id, job_id, applied, created_at) VALUES (?, ?, ?, ?)")
            .bind(&decision.id)
            .bind(&decision.job_id)
            .bind(applied as i32)
            .bind(&decision.created_at)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&decision.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(decision)
    }

    /// List decisions in the order they were recorded, optionally for one job.
    pub async fn list_decisions(&self, job_id: Option<&str>) -> Result<Vec<Decision>, AppError> {
        let rows = match job_id {
            Some(job_id) => {
                sqlx::query(
                    "SELECT id, job_id, applied, created_at FROM job_actions WHERE job_id = ? ORDER BY created_at, rowid",
                )
                .bind(job_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, job_id, applied, created_at FROM job_actions ORDER BY created_at, rowid",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(decision_from_row).collect())
    }

    /// Jobs with at least one `applied` decision, newest first.
    pub async fn list_applied_jobs(&self) -> Result<Vec<JobPosting>, AppError> {
        let rows = sqlx::query("SELECT DISTINCT job_id FROM job_actions WHERE applied = 1")
            .fetch_all(&self.pool)
            .await?;
        let ids: Vec<String> = rows.iter().map(|row| row.get("job_id")).collect();

        self.get_jobs_by_ids(&ids).await
    }
}

#[async_trait]
impl JobSource for Repository {
    async fn list_jobs(&self) -> Result<Vec<JobPosting>, AppError> {
        Repository::list_jobs(self).await
    }
}

#[async_trait]
impl DecisionSink for Repository {
    async fn record_decision(&self, job_id: &str, applied: bool) -> Result<Decision, AppError> {
        Repository::record_decision(self, job_id, applied).await
    }
}

// Helper functions for row conversion

fn new_job(request: &CreateJobRequest, created: DateTime<Utc>) -> JobPosting {
    let stamp = timestamp(created);
    JobPosting {
        id: uuid::Uuid::new_v4().to_string(),
        title: request.title.trim().to_string(),
        company: request.company.trim().to_string(),
        location: request.location.clone(),
        description: request.description.clone(),
        job_type: request.job_type.clone(),
        salary: request.salary.clone(),
        contact_email: request.contact_email.clone(),
        skills: request.skills.clone(),
        created_at: stamp.clone(),
        updated_at: stamp,
    }
}

async fn insert_job<'e, E>(executor: E, job: &JobPosting) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO jobs (id, title, company, location, description, job_type, salary, contact_email, skills, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&job.id)
    .bind(&job.title)
    .bind(&job.company)
    .bind(&job.location)
    .bind(&job.description)
    .bind(&job.job_type)
    .bind(&job.salary)
    .bind(&job.contact_email)
    .bind(skills_json(&job.skills))
    .bind(&job.created_at)
    .bind(&job.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Fixed-width UTC timestamps so that string order matches time order.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn skills_json(skills: &[String]) -> Option<String> {
    if skills.is_empty() {
        None
    } else {
        serde_json::to_string(skills).ok()
    }
}

fn job_from_row(row: &sqlx::sqlite::SqliteRow) -> JobPosting {
    let skills: Option<String> = row.get("skills");
    JobPosting {
        id: row.get("id"),
        title: row.get("title"),
        company: row.get("company"),
        location: row.get("location"),
        description: row.get("description"),
        job_type: row.get("job_type"),
        salary: row.get("salary"),
        contact_email: row.get("contact_email"),
        skills: skills
            .map(|s| serde_json::from_str(&s).unwrap_or_default())
            .unwrap_or_default(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn decision_from_row(row: &sqlx::sqlite::SqliteRow) -> Decision {
    let applied: i32 = row.get("applied");
    Decision {
        id: row.get("id"),
        job_id: row.get("job_id"),
        applied: applied != 0,
        created_at: row.get("created_at"),
    }
}
