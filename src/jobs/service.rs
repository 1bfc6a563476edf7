//! Job decomposition and lifecycle

use crate::db::{JobRepository, NewJob, RepositoryProvider, UnitOfWork};
use crate::error::{persistence, AppError, Result};
use crate::queue::{OutboxRelay, TranslationJobMessage};

use super::types::{
    EntityType, JobDetailDto, JobDto, JobPage, JobStatus, NewSubtask, SubtaskStatus,
    TranslationJob, TranslationSubtask, TARGET_FIELDS,
};

const MAX_PAGE_SIZE: i64 = 100;

/// Creates translation jobs and tracks them to completion
#[derive(Clone)]
pub struct JobService {
    uow: UnitOfWork,
    relay: Option<OutboxRelay>,
    subject: String,
    enable_code_filter: bool,
}

impl JobService {
    pub fn new(uow: UnitOfWork, subject: impl Into<String>) -> Self {
        Self {
            uow,
            relay: None,
            subject: subject.into(),
            enable_code_filter: false,
        }
    }

    /// Publish new jobs right after commit instead of waiting for the relay
    pub fn with_relay(mut self, relay: OutboxRelay) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Ask workers to leave code blocks untranslated
    pub fn with_code_filter(mut self, enabled: bool) -> Self {
        self.enable_code_filter = enabled;
        self
    }

    /// Create a job for `novel_id` into `target_lang`.
    ///
    /// Subtasks, the job row and its queue message are written in one
    /// transaction. With a relay attached the message is then sent right
    /// away; if that fails (or there is no relay) the outbox relay picks it
    /// up later.
    pub async fn create_job(
        &self,
        novel_id: &str,
        target_lang: &str,
        requested_by: &str,
    ) -> Result<JobDetailDto> {
        let mut repos = self.uow.begin().await?;

        let novel = repos
            .novels()
            .get(novel_id)
            .await
            .map_err(|e| persistence("unable to load novel", e))?
            .ok_or_else(|| AppError::NovelNotFound(novel_id.to_string()))?;

        if let Some(active) = repos
            .jobs()
            .find_active(novel_id, target_lang)
            .await
            .map_err(|e| persistence("unable to check for active jobs", e))?
        {
            return Err(AppError::ActiveJobConflict { job_id: active.id });
        }

        let volumes = repos
            .volumes()
            .list_by_novel(novel_id)
            .await
            .map_err(|e| persistence("unable to load volumes", e))?;

        let mut subtasks = Vec::new();
        let mut chapter_seq = 0;
        for volume in &volumes {
            let chapters = repos
                .chapters()
                .list_by_volume(&volume.id)
                .await
                .map_err(|e| persistence("unable to load chapters", e))?;
            for chapter in chapters {
                chapter_seq += 1;
                subtasks.push(
                    NewSubtask::new(EntityType::Chapter, chapter.id, chapter_seq).with_parent(&volume.id),
                );
            }
        }
        if chapter_seq == 0 {
            return Err(AppError::NoChaptersToTranslate(novel_id.to_string()));
        }

        for (i, volume) in volumes.iter().enumerate() {
            subtasks.push(NewSubtask::new(EntityType::Volume, &volume.id, i as i64 + 1));
        }
        subtasks.push(NewSubtask::new(EntityType::Novel, &novel.id, 1));

        let new_job = NewJob {
            novel_id: novel.id.clone(),
            from_lang: novel.original_language.clone(),
            target_lang: target_lang.to_string(),
            created_by: requested_by.to_string(),
        };
        // The job insert is this transaction's first write. A concurrent create
        // that committed first surfaces here as a unique violation or, in WAL
        // mode, as SQLITE_BUSY on a stale snapshot.
        let created = repos.jobs().create(&new_job).await;
        let job = match created {
            Ok(job) => job,
            Err(e) => {
                repos.rollback().await?;
                return Err(self.conflict_after_race(novel_id, target_lang, e).await);
            }
        };

        let total = subtasks.len() as i64;
        repos
            .jobs()
            .create_subtasks(&job.id, &subtasks)
            .await
            .map_err(|e| persistence("unable to create translation subtasks", e))?;
        repos
            .jobs()
            .set_total_subtasks(&job.id, total)
            .await
            .map_err(|e| persistence("unable to update translation job", e))?;

        let message = TranslationJobMessage {
            job_id: job.id.clone(),
            target_lang: job.target_lang.clone(),
            source_lang: job.from_lang.clone(),
            target_fields: TARGET_FIELDS.iter().map(|f| f.to_string()).collect(),
            enable_code_filter: self.enable_code_filter.then_some(true),
        };
        let payload = serde_json::to_string(&message)?;
        let outbox = repos
            .outbox()
            .enqueue(&job.id, &self.subject, &payload)
            .await
            .map_err(|e| persistence("unable to queue translation job", e))?;

        repos.commit().await?;

        tracing::info!(
            job_id = %job.id,
            novel_id = %novel_id,
            target_lang = %target_lang,
            subtasks = total,
            "Created translation job"
        );

        if let Some(relay) = &self.relay {
            if let Err(e) = relay.deliver_by_id(&outbox.id).await {
                tracing::warn!(job_id = %job.id, error = %e, "Immediate publish failed, leaving it to the relay");
            }
        }

        self.get_job(&job.id).await
    }

    /// Map a failed job insert to the concurrent create that won, if any
    async fn conflict_after_race(&self, novel_id: &str, target_lang: &str, insert_err: AppError) -> AppError {
        let active = async {
            let mut conn = self.uow.pool().acquire().await?;
            JobRepository::new(&mut conn).find_active(novel_id, target_lang).await
        }
        .await;

        match active {
            Ok(Some(job)) => {
                tracing::info!(
                    job_id = %job.id,
                    error = %insert_err,
                    "Concurrent create won the race for this novel and language"
                );
                AppError::ActiveJobConflict { job_id: job.id }
            }
            Ok(None) if is_unique_violation(&insert_err) => persistence(
                "unable to create translation job",
                "active job index rejected the insert but no active job was found",
            ),
            Ok(None) => persistence("unable to create translation job", insert_err),
            Err(e) => persistence("unable to check for active jobs", e),
        }
    }

    /// A job with its subtasks in processing order
    pub async fn get_job(&self, job_id: &str) -> Result<JobDetailDto> {
        let mut conn = self.uow.pool().acquire().await?;
        let mut jobs = JobRepository::new(&mut conn);

        let job = jobs
            .get(job_id)
            .await
            .map_err(|e| persistence("unable to load translation job", e))?
            .ok_or_else(|| AppError::JobNotFound(job_id.to_string()))?;
        let subtasks = jobs
            .list_subtasks(job_id)
            .await
            .map_err(|e| persistence("unable to load translation subtasks", e))?;

        Ok(JobDetailDto {
            job: job.into(),
            subtasks: subtasks.into_iter().map(Into::into).collect(),
        })
    }

    /// Newest jobs first, optionally only those in `status`
    pub async fn list_jobs(&self, limit: i64, offset: i64, status: Option<JobStatus>) -> Result<JobPage> {
        let (limit, offset) = page_bounds(limit, offset);
        let mut conn = self.uow.pool().acquire().await?;
        let mut jobs = JobRepository::new(&mut conn);

        let page = jobs
            .list(limit, offset, status)
            .await
            .map_err(|e| persistence("unable to list translation jobs", e))?;
        let total = jobs
            .count(status)
            .await
            .map_err(|e| persistence("unable to count translation jobs", e))?;

        Ok(JobPage {
            jobs: page.into_iter().map(JobDto::from).collect(),
            total,
        })
    }

    pub async fn list_jobs_for_novel(&self, novel_id: &str, limit: i64, offset: i64) -> Result<JobPage> {
        let (limit, offset) = page_bounds(limit, offset);
        let mut conn = self.uow.pool().acquire().await?;
        let mut jobs = JobRepository::new(&mut conn);

        let page = jobs
            .list_by_novel(novel_id, limit, offset)
            .await
            .map_err(|e| persistence("unable to list translation jobs", e))?;
        let total = jobs
            .count_by_novel(novel_id)
            .await
            .map_err(|e| persistence("unable to count translation jobs", e))?;

        Ok(JobPage {
            jobs: page.into_iter().map(JobDto::from).collect(),
            total,
        })
    }

    /// Cancel a job and every subtask still open
    pub async fn cancel_job(&self, job_id: &str) -> Result<JobDto> {
        let mut repos = self.uow.begin().await?;

        let job = repos
            .jobs()
            .get(job_id)
            .await
            .map_err(|e| persistence("unable to load translation job", e))?
            .ok_or_else(|| AppError::JobNotFound(job_id.to_string()))?;
        if job.status.is_terminal() {
            return Err(AppError::AlreadyTerminalJob {
                job_id: job.id,
                status: job.status.to_string(),
            });
        }

        repos
            .jobs()
            .update_status(job_id, JobStatus::Cancelled, None)
            .await
            .map_err(|e| persistence("unable to cancel translation job", e))?;
        let cancelled = repos
            .jobs()
            .cancel_open_subtasks(job_id)
            .await
            .map_err(|e| persistence("unable to cancel translation subtasks", e))?;
        let job = reload_job(&mut repos, job_id).await?;

        repos.commit().await?;

        tracing::info!(job_id = %job_id, subtasks = cancelled, "Cancelled translation job");
        Ok(job.into())
    }

    /// A worker picked the subtask up
    pub async fn start_subtask(&self, subtask_id: &str) -> Result<TranslationSubtask> {
        self.transition_subtask(subtask_id, SubtaskStatus::InProgress, None, None)
            .await
    }

    pub async fn complete_subtask(&self, subtask_id: &str, result_text: Option<&str>) -> Result<TranslationSubtask> {
        self.transition_subtask(subtask_id, SubtaskStatus::Done, result_text, None)
            .await
    }

    pub async fn fail_subtask(&self, subtask_id: &str, error: &str) -> Result<TranslationSubtask> {
        self.transition_subtask(subtask_id, SubtaskStatus::Failed, None, Some(error))
            .await
    }

    /// Move one subtask and roll the outcome up into its job
    async fn transition_subtask(
        &self,
        subtask_id: &str,
        next: SubtaskStatus,
        result_text: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<TranslationSubtask> {
        let mut repos = self.uow.begin().await?;

        let subtask = repos
            .jobs()
            .get_subtask(subtask_id)
            .await
            .map_err(|e| persistence("unable to load translation subtask", e))?
            .ok_or_else(|| AppError::SubtaskNotFound(subtask_id.to_string()))?;
        if !subtask.status.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                from: subtask.status.to_string(),
                to: next.to_string(),
            });
        }

        repos
            .jobs()
            .update_subtask(subtask_id, next, result_text, error_message)
            .await
            .map_err(|e| persistence("unable to update translation subtask", e))?;

        let job = reload_job(&mut repos, &subtask.job_id).await?;
        let mut status = job.status;
        if status.can_transition_to(JobStatus::InProgress) {
            repos
                .jobs()
                .update_status(&job.id, JobStatus::InProgress, None)
                .await
                .map_err(|e| persistence("unable to update translation job", e))?;
            status = JobStatus::InProgress;
        }

        let tally = repos
            .jobs()
            .subtask_tally(&job.id)
            .await
            .map_err(|e| persistence("unable to aggregate translation subtasks", e))?;
        let progress = if tally.total > 0 {
            tally.done * 100 / tally.total
        } else {
            0
        };
        repos
            .jobs()
            .update_progress(&job.id, tally.done, progress)
            .await
            .map_err(|e| persistence("unable to update translation job", e))?;

        if tally.open == 0 {
            let (outcome, error) = if tally.failed == 0 {
                (JobStatus::Completed, None)
            } else {
                (JobStatus::Failed, Some(format!("{} subtasks failed", tally.failed)))
            };
            if status.can_transition_to(outcome) {
                repos
                    .jobs()
                    .update_status(&job.id, outcome, error.as_deref())
                    .await
                    .map_err(|e| persistence("unable to update translation job", e))?;
                tracing::info!(job_id = %job.id, status = %outcome, "Translation job finished");
            }
        }

        let updated = repos
            .jobs()
            .get_subtask(subtask_id)
            .await
            .map_err(|e| persistence("unable to load translation subtask", e))?
            .ok_or_else(|| AppError::SubtaskNotFound(subtask_id.to_string()))?;

        repos.commit().await?;

        tracing::debug!(subtask_id = %subtask_id, job_id = %job.id, status = %next, progress, "Subtask updated");
        Ok(updated)
    }
}

async fn reload_job(repos: &mut RepositoryProvider, job_id: &str) -> Result<TranslationJob> {
    repos
        .jobs()
        .get(job_id)
        .await
        .map_err(|e| persistence("unable to load translation job", e))?
        .ok_or_else(|| AppError::JobNotFound(job_id.to_string()))
}

fn page_bounds(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, MAX_PAGE_SIZE), offset.max(0))
}

fn is_unique_violation(err: &AppError) -> bool {
    match err {
        AppError::Database(sqlx::Error::Database(e)) => e.is_unique_violation(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{Config, DatabaseConfig};
    use crate::db::{test_pool, NewNovel, OutboxRepository};
    use crate::queue::RecordingPublisher;

    struct Fixture {
        service: JobService,
        publisher: Arc<RecordingPublisher>,
        uow: UnitOfWork,
    }

    async fn fixture() -> Fixture {
        let pool = test_pool().await;
        let publisher = Arc::new(RecordingPublisher::new());
        let relay = OutboxRelay::new(pool.clone(), publisher.clone(), Config::default().relay);
        let uow = UnitOfWork::new(pool);
        Fixture {
            service: JobService::new(uow.clone(), "translation_jobs").with_relay(relay),
            publisher,
            uow,
        }
    }

    /// A novel with one volume per entry, holding that many chapters
    async fn seed_novel(uow: &UnitOfWork, chapters_per_volume: &[i64]) -> String {
        let mut repos = uow.begin().await.unwrap();
        let novel = repos
            .novels()
            .create(&NewNovel {
                created_by: "user-1".to_string(),
                original_language: "ja".to_string(),
                original_author: None,
                publisher: None,
                source_type: None,
                cover_media_id: None,
            })
            .await
            .unwrap();
        for (i, count) in chapters_per_volume.iter().enumerate() {
            let volume = repos
                .volumes()
                .create(&novel.id, i as i64 + 1, "ja", false)
                .await
                .unwrap();
            for n in 1..=*count {
                repos.chapters().create(&volume.id, n, 10).await.unwrap();
            }
        }
        repos.commit().await.unwrap();
        novel.id
    }

    #[tokio::test]
    async fn test_create_job_decomposes_bottom_up() {
        let fx = fixture().await;
        let novel_id = seed_novel(&fx.uow, &[2, 3]).await;

        let detail = fx.service.create_job(&novel_id, "en", "user-2").await.unwrap();

        assert_eq!(detail.job.status, JobStatus::Pending);
        assert_eq!(detail.job.from_lang, "ja");
        assert_eq!(detail.job.total_subtasks, 5 + 2 + 1);
        assert_eq!(detail.subtasks.len(), 8);

        let kinds: Vec<EntityType> = detail.subtasks.iter().map(|s| s.entity_type).collect();
        assert!(kinds[..5].iter().all(|k| *k == EntityType::Chapter));
        assert_eq!(&kinds[5..], &[EntityType::Volume, EntityType::Volume, EntityType::Novel]);

        let chapter_seqs: Vec<i64> = detail.subtasks[..5].iter().map(|s| s.seq).collect();
        assert_eq!(chapter_seqs, vec![1, 2, 3, 4, 5]);
        assert!(detail.subtasks[..5].iter().all(|s| s.parent_volume_id.is_some()));
        assert_eq!(detail.subtasks[7].entity_id, novel_id);
    }

    #[tokio::test]
    async fn test_create_job_publishes_message() {
        let fx = fixture().await;
        let novel_id = seed_novel(&fx.uow, &[1]).await;

        let detail = fx.service.create_job(&novel_id, "fr", "user-2").await.unwrap();

        let sent = fx.publisher.messages_for_subject("translation_jobs");
        assert_eq!(sent.len(), 1);
        let message: TranslationJobMessage = serde_json::from_slice(&sent[0].payload).unwrap();
        assert_eq!(message.job_id, detail.job.id);
        assert_eq!(message.source_lang, "ja");
        assert_eq!(message.target_lang, "fr");
        assert_eq!(message.target_fields, vec!["title", "description", "content"]);
        assert_eq!(message.enable_code_filter, None);

        let mut conn = fx.uow.pool().acquire().await.unwrap();
        assert_eq!(OutboxRepository::new(&mut conn).count_pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_job_and_pending_message() {
        let fx = fixture().await;
        fx.publisher.set_failing(true);
        let novel_id = seed_novel(&fx.uow, &[1]).await;

        let detail = fx.service.create_job(&novel_id, "fr", "user-2").await.unwrap();
        assert_eq!(detail.job.status, JobStatus::Pending);

        let mut conn = fx.uow.pool().acquire().await.unwrap();
        assert_eq!(OutboxRepository::new(&mut conn).count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_without_relay_message_waits_in_outbox() {
        let fx = fixture().await;
        let novel_id = seed_novel(&fx.uow, &[1]).await;
        let service = JobService::new(fx.uow.clone(), "translation_jobs").with_code_filter(true);

        service.create_job(&novel_id, "fr", "user-2").await.unwrap();
        assert_eq!(fx.publisher.publish_count(), 0);

        let mut conn = fx.uow.pool().acquire().await.unwrap();
        let pending = OutboxRepository::new(&mut conn).fetch_pending(10, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        let message: TranslationJobMessage = serde_json::from_str(&pending[0].payload).unwrap();
        assert_eq!(message.enable_code_filter, Some(true));
    }

    #[tokio::test]
    async fn test_second_active_job_conflicts() {
        let fx = fixture().await;
        let novel_id = seed_novel(&fx.uow, &[1]).await;

        let first = fx.service.create_job(&novel_id, "en", "user-2").await.unwrap();
        let err = fx.service.create_job(&novel_id, "en", "user-3").await.unwrap_err();
        match err {
            AppError::ActiveJobConflict { job_id } => assert_eq!(job_id, first.job.id),
            other => panic!("unexpected error: {other:?}"),
        }

        // Another language is a different job
        assert!(fx.service.create_job(&novel_id, "de", "user-2").await.is_ok());
    }

    #[tokio::test]
    async fn test_create_job_rejects_missing_or_empty_novel() {
        let fx = fixture().await;
        assert!(matches!(
            fx.service.create_job("nope", "en", "user-2").await,
            Err(AppError::NovelNotFound(_))
        ));

        let empty = seed_novel(&fx.uow, &[0]).await;
        assert!(matches!(
            fx.service.create_job(&empty, "en", "user-2").await,
            Err(AppError::NoChaptersToTranslate(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_job() {
        let fx = fixture().await;
        let novel_id = seed_novel(&fx.uow, &[2]).await;
        let created = fx.service.create_job(&novel_id, "en", "user-2").await.unwrap();

        let cancelled = fx.service.cancel_job(&created.job.id).await.unwrap();
        assert_eq!(cancelled.status, JobStatus::Cancelled);
        assert!(cancelled.finished_at.is_some());

        let detail = fx.service.get_job(&created.job.id).await.unwrap();
        assert!(detail.subtasks.iter().all(|s| s.status == SubtaskStatus::Cancelled));

        assert!(matches!(
            fx.service.cancel_job(&created.job.id).await,
            Err(AppError::AlreadyTerminalJob { .. })
        ));
        assert!(matches!(
            fx.service.cancel_job("missing").await,
            Err(AppError::JobNotFound(_))
        ));

        // The slot is free again
        assert!(fx.service.create_job(&novel_id, "en", "user-2").await.is_ok());
    }

    #[tokio::test]
    async fn test_subtask_progress_completes_job() {
        let fx = fixture().await;
        let novel_id = seed_novel(&fx.uow, &[1]).await;
        let created = fx.service.create_job(&novel_id, "en", "user-2").await.unwrap();
        let ids: Vec<String> = created.subtasks.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids.len(), 3);

        let started = fx.service.start_subtask(&ids[0]).await.unwrap();
        assert_eq!(started.status, SubtaskStatus::InProgress);
        let job = fx.service.get_job(&created.job.id).await.unwrap().job;
        assert_eq!(job.status, JobStatus::InProgress);
        assert!(job.started_at.is_some());

        let done = fx.service.complete_subtask(&ids[0], Some("Chapter one")).await.unwrap();
        assert_eq!(done.result_text.as_deref(), Some("Chapter one"));
        let job = fx.service.get_job(&created.job.id).await.unwrap().job;
        assert_eq!(job.completed_subtasks, 1);
        assert_eq!(job.progress, 33);

        for id in &ids[1..] {
            fx.service.start_subtask(id).await.unwrap();
            fx.service.complete_subtask(id, None).await.unwrap();
        }
        let job = fx.service.get_job(&created.job.id).await.unwrap().job;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_subtask_fails_job() {
        let fx = fixture().await;
        let novel_id = seed_novel(&fx.uow, &[1]).await;
        let created = fx.service.create_job(&novel_id, "en", "user-2").await.unwrap();

        for (i, subtask) in created.subtasks.iter().enumerate() {
            fx.service.start_subtask(&subtask.id).await.unwrap();
            if i == 0 {
                fx.service.fail_subtask(&subtask.id, "model timeout").await.unwrap();
            } else {
                fx.service.complete_subtask(&subtask.id, None).await.unwrap();
            }
        }

        let job = fx.service.get_job(&created.job.id).await.unwrap().job;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("1 subtasks failed"));
    }

    #[tokio::test]
    async fn test_invalid_subtask_transition() {
        let fx = fixture().await;
        let novel_id = seed_novel(&fx.uow, &[1]).await;
        let created = fx.service.create_job(&novel_id, "en", "user-2").await.unwrap();

        assert!(matches!(
            fx.service.complete_subtask(&created.subtasks[0].id, None).await,
            Err(AppError::InvalidTransition { .. })
        ));
        assert!(matches!(
            fx.service.start_subtask("missing").await,
            Err(AppError::SubtaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_jobs_filters_by_status() {
        let fx = fixture().await;
        let a = seed_novel(&fx.uow, &[1]).await;
        let b = seed_novel(&fx.uow, &[1]).await;
        let job_a = fx.service.create_job(&a, "en", "user-2").await.unwrap();
        fx.service.create_job(&b, "en", "user-2").await.unwrap();
        fx.service.cancel_job(&job_a.job.id).await.unwrap();

        let all = fx.service.list_jobs(10, 0, None).await.unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.jobs.len(), 2);

        let pending = fx.service.list_jobs(10, 0, Some(JobStatus::Pending)).await.unwrap();
        assert_eq!(pending.total, 1);
        assert_eq!(pending.jobs[0].novel_id, b);

        let for_a = fx.service.list_jobs_for_novel(&a, 10, 0).await.unwrap();
        assert_eq!(for_a.total, 1);
        assert_eq!(for_a.jobs[0].status, JobStatus::Cancelled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_on_file_database_report_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let pool = crate::db::create_pool(&DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("jobs.db").display()),
            max_connections: 4,
        })
        .await
        .unwrap();
        let uow = UnitOfWork::new(pool);
        let service = JobService::new(uow.clone(), "translation_jobs");
        let novel_id = seed_novel(&uow, &[3, 2]).await;

        for lang in ["fr", "de", "es", "it", "pt"] {
            let first = tokio::spawn({
                let (service, novel_id) = (service.clone(), novel_id.clone());
                async move { service.create_job(&novel_id, lang, "user-1").await }
            });
            let second = tokio::spawn({
                let (service, novel_id) = (service.clone(), novel_id.clone());
                async move { service.create_job(&novel_id, lang, "user-2").await }
            });
            let outcomes = [first.await.unwrap(), second.await.unwrap()];

            let created: Vec<&JobDetailDto> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
            assert_eq!(created.len(), 1, "exactly one create wins for {}", lang);
            let winner = &created[0].job.id;

            let loser = outcomes
                .iter()
                .find_map(|r| r.as_ref().err())
                .unwrap();
            match loser {
                AppError::ActiveJobConflict { job_id } => assert_eq!(job_id, winner),
                other => panic!("expected conflict for {}, got {:?}", lang, other),
            }
        }

        let page = service.list_jobs(100, 0, None).await.unwrap();
        assert_eq!(page.total, 5);
    }
}
