//! Translation job and subtask records

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use uuid::Uuid;

use crate::error::Result;
use crate::jobs::types::{
    JobStatus, NewSubtask, SubtaskStatus, TranslationJob, TranslationSubtask,
};

/// Rows per multi-row INSERT, well under SQLite's bind limit
const SUBTASK_BATCH: usize = 50;

const JOB_COLUMNS: &str = "id, novel_id, from_lang, target_lang, status, progress, total_subtasks, \
     completed_subtasks, error_message, created_by, started_at, finished_at, created_at, updated_at";

const SUBTASK_COLUMNS: &str = "id, job_id, entity_type, entity_id, parent_volume_id, seq, priority, \
     status, result_text, error_message, started_at, finished_at";

#[derive(Debug, Clone)]
pub struct NewJob {
    pub novel_id: String,
    pub from_lang: String,
    pub target_lang: String,
    pub created_by: String,
}

/// Subtask counts by outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct SubtaskTally {
    pub total: i64,
    pub done: i64,
    pub failed: i64,
    pub open: i64,
}

/// Translation job repository
pub struct JobRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> JobRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&mut self, job: &NewJob) -> Result<TranslationJob> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO translation_jobs (id, novel_id, from_lang, target_lang, status, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&job.novel_id)
        .bind(&job.from_lang)
        .bind(&job.target_lang)
        .bind(JobStatus::Pending.as_str())
        .bind(&job.created_by)
        .bind(&now)
        .bind(&now)
        .execute(&mut *self.conn)
        .await?;

        Ok(TranslationJob {
            id,
            novel_id: job.novel_id.clone(),
            from_lang: job.from_lang.clone(),
            target_lang: job.target_lang.clone(),
            status: JobStatus::Pending,
            progress: 0,
            total_subtasks: 0,
            completed_subtasks: 0,
            error_message: None,
            created_by: job.created_by.clone(),
            started_at: None,
            finished_at: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub async fn get(&mut self, id: &str) -> Result<Option<TranslationJob>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {} FROM translation_jobs WHERE id = ?",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        row.map(JobRow::into_job).transpose()
    }

    /// The PENDING or IN_PROGRESS job for a novel and language, if any
    pub async fn find_active(&mut self, novel_id: &str, target_lang: &str) -> Result<Option<TranslationJob>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {} FROM translation_jobs \
             WHERE novel_id = ? AND target_lang = ? AND status IN ('PENDING', 'IN_PROGRESS') \
             LIMIT 1",
            JOB_COLUMNS
        ))
        .bind(novel_id)
        .bind(target_lang)
        .fetch_optional(&mut *self.conn)
        .await?;

        row.map(JobRow::into_job).transpose()
    }

    /// Newest first, optionally filtered by status
    pub async fn list(
        &mut self,
        limit: i64,
        offset: i64,
        status: Option<JobStatus>,
    ) -> Result<Vec<TranslationJob>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {} FROM translation_jobs \
             WHERE (?1 IS NULL OR status = ?1) \
             ORDER BY created_at DESC, rowid DESC \
             LIMIT ?2 OFFSET ?3",
            JOB_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    pub async fn count(&mut self, status: Option<JobStatus>) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM translation_jobs WHERE (?1 IS NULL OR status = ?1)")
                .bind(status.map(|s| s.as_str()))
                .fetch_one(&mut *self.conn)
                .await?;

        Ok(count)
    }

    pub async fn list_by_novel(&mut self, novel_id: &str, limit: i64, offset: i64) -> Result<Vec<TranslationJob>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {} FROM translation_jobs \
             WHERE novel_id = ? \
             ORDER BY created_at DESC, rowid DESC \
             LIMIT ? OFFSET ?",
            JOB_COLUMNS
        ))
        .bind(novel_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    pub async fn count_by_novel(&mut self, novel_id: &str) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM translation_jobs WHERE novel_id = ?")
            .bind(novel_id)
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(count)
    }

    pub async fn set_total_subtasks(&mut self, id: &str, total: i64) -> Result<()> {
        sqlx::query("UPDATE translation_jobs SET total_subtasks = ?, updated_at = ? WHERE id = ?")
            .bind(total)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        Ok(())
    }

    /// Move a job to `status`, stamping `started_at` on the first start and
    /// `finished_at` on any terminal state.
    pub async fn update_status(
        &mut self,
        id: &str,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let started = (status == JobStatus::InProgress).then(|| now.clone());
        let finished = status.is_terminal().then(|| now.clone());

        sqlx::query(
            r#"
            UPDATE translation_jobs
            SET status = ?,
                error_message = COALESCE(?, error_message),
                started_at = COALESCE(started_at, ?),
                finished_at = COALESCE(?, finished_at),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(error_message)
        .bind(started)
        .bind(finished)
        .bind(&now)
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    pub async fn update_progress(&mut self, id: &str, completed: i64, progress: i64) -> Result<()> {
        sqlx::query(
            "UPDATE translation_jobs SET completed_subtasks = ?, progress = ?, updated_at = ? WHERE id = ?",
        )
        .bind(completed)
        .bind(progress)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Insert all subtasks of a job in multi-row batches
    pub async fn create_subtasks(&mut self, job_id: &str, subtasks: &[NewSubtask]) -> Result<u64> {
        let now = Utc::now().to_rfc3339();
        let mut inserted = 0;

        for chunk in subtasks.chunks(SUBTASK_BATCH) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO translation_subtasks \
                 (id, job_id, entity_type, entity_id, parent_volume_id, seq, priority, status, created_at, updated_at) ",
            );
            builder.push_values(chunk, |mut row, subtask| {
                row.push_bind(Uuid::new_v4().to_string())
                    .push_bind(job_id)
                    .push_bind(subtask.entity_type.as_str())
                    .push_bind(&subtask.entity_id)
                    .push_bind(&subtask.parent_volume_id)
                    .push_bind(subtask.seq)
                    .push_bind(subtask.priority())
                    .push_bind(SubtaskStatus::Pending.as_str())
                    .push_bind(&now)
                    .push_bind(&now);
            });

            inserted += builder.build().execute(&mut *self.conn).await?.rows_affected();
        }

        Ok(inserted)
    }

    /// Subtasks in processing order
    pub async fn list_subtasks(&mut self, job_id: &str) -> Result<Vec<TranslationSubtask>> {
        let rows = sqlx::query_as::<_, SubtaskRow>(&format!(
            "SELECT {} FROM translation_subtasks WHERE job_id = ? ORDER BY priority ASC, seq ASC",
            SUBTASK_COLUMNS
        ))
        .bind(job_id)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.into_iter().map(SubtaskRow::into_subtask).collect()
    }

    pub async fn get_subtask(&mut self, id: &str) -> Result<Option<TranslationSubtask>> {
        let row = sqlx::query_as::<_, SubtaskRow>(&format!(
            "SELECT {} FROM translation_subtasks WHERE id = ?",
            SUBTASK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        row.map(SubtaskRow::into_subtask).transpose()
    }

    pub async fn update_subtask(
        &mut self,
        id: &str,
        status: SubtaskStatus,
        result_text: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let started = (status == SubtaskStatus::InProgress).then(|| now.clone());
        let finished = status.is_terminal().then(|| now.clone());

        sqlx::query(
            r#"
            UPDATE translation_subtasks
            SET status = ?,
                result_text = COALESCE(?, result_text),
                error_message = COALESCE(?, error_message),
                started_at = COALESCE(started_at, ?),
                finished_at = COALESCE(?, finished_at),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(result_text)
        .bind(error_message)
        .bind(started)
        .bind(finished)
        .bind(&now)
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Cancel every subtask that has not reached a terminal state
    pub async fn cancel_open_subtasks(&mut self, job_id: &str) -> Result<u64> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            UPDATE translation_subtasks
            SET status = 'CANCELLED', finished_at = ?, updated_at = ?
            WHERE job_id = ? AND status IN ('PENDING', 'IN_PROGRESS')
            "#,
        )
        .bind(&now)
        .bind(&now)
        .bind(job_id)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn subtask_tally(&mut self, job_id: &str) -> Result<SubtaskTally> {
        let tally = sqlx::query_as::<_, SubtaskTally>(
            r#"
            SELECT COUNT(*) AS total,
                   COALESCE(SUM(CASE WHEN status = 'DONE' THEN 1 ELSE 0 END), 0) AS done,
                   COALESCE(SUM(CASE WHEN status = 'FAILED' THEN 1 ELSE 0 END), 0) AS failed,
                   COALESCE(SUM(CASE WHEN status IN ('PENDING', 'IN_PROGRESS') THEN 1 ELSE 0 END), 0) AS open
            FROM translation_subtasks
            WHERE job_id = ?
            "#,
        )
        .bind(job_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(tally)
    }
}

/// Internal row type for SQLite queries
#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    novel_id: String,
    from_lang: String,
    target_lang: String,
    status: String,
    progress: i64,
    total_subtasks: i64,
    completed_subtasks: i64,
    error_message: Option<String>,
    created_by: String,
    started_at: Option<String>,
    finished_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl JobRow {
    fn into_job(self) -> Result<TranslationJob> {
        Ok(TranslationJob {
            status: self.status.parse()?,
            id: self.id,
            novel_id: self.novel_id,
            from_lang: self.from_lang,
            target_lang: self.target_lang,
            progress: self.progress,
            total_subtasks: self.total_subtasks,
            completed_subtasks: self.completed_subtasks,
            error_message: self.error_message,
            created_by: self.created_by,
            started_at: self.started_at,
            finished_at: self.finished_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SubtaskRow {
    id: String,
    job_id: String,
    entity_type: String,
    entity_id: String,
    parent_volume_id: Option<String>,
    seq: i64,
    priority: i64,
    status: String,
    result_text: Option<String>,
    error_message: Option<String>,
    started_at: Option<String>,
    finished_at: Option<String>,
}

impl SubtaskRow {
    fn into_subtask(self) -> Result<TranslationSubtask> {
        Ok(TranslationSubtask {
            entity_type: self.entity_type.parse()?,
            status: self.status.parse()?,
            id: self.id,
            job_id: self.job_id,
            entity_id: self.entity_id,
            parent_volume_id: self.parent_volume_id,
            seq: self.seq,
            priority: self.priority,
            result_text: self.result_text,
            error_message: self.error_message,
            started_at: self.started_at,
            finished_at: self.finished_at,
        })
    }
}
