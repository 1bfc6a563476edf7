//! Translation job domain types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Subtasks sort ascending by priority, so lower runs first. Chapters feed
/// the volume and novel passes and go first.
pub const CHAPTER_PRIORITY: i64 = 100;
pub const VOLUME_PRIORITY: i64 = 150;
pub const NOVEL_PRIORITY: i64 = 200;

/// Fields a worker translates for every entity
pub const TARGET_FIELDS: [&str; 3] = ["title", "description", "content"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (InProgress, Cancelled)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(JobStatus::Pending),
            "IN_PROGRESS" => Ok(JobStatus::InProgress),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            "CANCELLED" => Ok(JobStatus::Cancelled),
            _ => Err(AppError::Persistence("unrecognized job status")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubtaskStatus {
    Pending,
    InProgress,
    Done,
    Failed,
    Cancelled,
}

impl SubtaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubtaskStatus::Pending => "PENDING",
            SubtaskStatus::InProgress => "IN_PROGRESS",
            SubtaskStatus::Done => "DONE",
            SubtaskStatus::Failed => "FAILED",
            SubtaskStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubtaskStatus::Done | SubtaskStatus::Failed | SubtaskStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: SubtaskStatus) -> bool {
        use SubtaskStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Cancelled)
                | (InProgress, Done)
                | (InProgress, Failed)
                | (InProgress, Cancelled)
        )
    }
}

impl fmt::Display for SubtaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubtaskStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(SubtaskStatus::Pending),
            "IN_PROGRESS" => Ok(SubtaskStatus::InProgress),
            "DONE" => Ok(SubtaskStatus::Done),
            "FAILED" => Ok(SubtaskStatus::Failed),
            "CANCELLED" => Ok(SubtaskStatus::Cancelled),
            _ => Err(AppError::Persistence("unrecognized subtask status")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Chapter,
    Volume,
    Novel,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Chapter => "chapter",
            EntityType::Volume => "volume",
            EntityType::Novel => "novel",
        }
    }

    pub fn priority(&self) -> i64 {
        match self {
            EntityType::Chapter => CHAPTER_PRIORITY,
            EntityType::Volume => VOLUME_PRIORITY,
            EntityType::Novel => NOVEL_PRIORITY,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chapter" => Ok(EntityType::Chapter),
            "volume" => Ok(EntityType::Volume),
            "novel" => Ok(EntityType::Novel),
            _ => Err(AppError::Persistence("unrecognized entity type")),
        }
    }
}

/// A novel's translation into one target language
#[derive(Debug, Clone, Serialize)]
pub struct TranslationJob {
    pub id: String,
    pub novel_id: String,
    pub from_lang: String,
    pub target_lang: String,
    pub status: JobStatus,
    /// Percentage of subtasks done, 0..=100
    pub progress: i64,
    pub total_subtasks: i64,
    pub completed_subtasks: i64,
    pub error_message: Option<String>,
    pub created_by: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One unit of translation work within a job
#[derive(Debug, Clone, Serialize)]
pub struct TranslationSubtask {
    pub id: String,
    pub job_id: String,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub parent_volume_id: Option<String>,
    /// Order within its entity type
    pub seq: i64,
    pub priority: i64,
    pub status: SubtaskStatus,
    pub result_text: Option<String>,
    pub error_message: Option<String>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

/// Subtask to be inserted alongside a new job
#[derive(Debug, Clone)]
pub struct NewSubtask {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub parent_volume_id: Option<String>,
    pub seq: i64,
}

impl NewSubtask {
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>, seq: i64) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
            parent_volume_id: None,
            seq,
        }
    }

    pub fn with_parent(mut self, volume_id: impl Into<String>) -> Self {
        self.parent_volume_id = Some(volume_id.into());
        self
    }

    pub fn priority(&self) -> i64 {
        self.entity_type.priority()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobDto {
    pub id: String,
    pub novel_id: String,
    pub from_lang: String,
    pub target_lang: String,
    pub status: JobStatus,
    pub progress: i64,
    pub total_subtasks: i64,
    pub completed_subtasks: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_by: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<TranslationJob> for JobDto {
    fn from(job: TranslationJob) -> Self {
        Self {
            id: job.id,
            novel_id: job.novel_id,
            from_lang: job.from_lang,
            target_lang: job.target_lang,
            status: job.status,
            progress: job.progress,
            total_subtasks: job.total_subtasks,
            completed_subtasks: job.completed_subtasks,
            error_message: job.error_message,
            created_by: job.created_by,
            started_at: job.started_at,
            finished_at: job.finished_at,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// Subtask summary; the translated text itself stays out of listings
#[derive(Debug, Clone, Serialize)]
pub struct SubtaskDto {
    pub id: String,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub parent_volume_id: Option<String>,
    pub seq: i64,
    pub priority: i64,
    pub status: SubtaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

impl From<TranslationSubtask> for SubtaskDto {
    fn from(subtask: TranslationSubtask) -> Self {
        Self {
            id: subtask.id,
            entity_type: subtask.entity_type,
            entity_id: subtask.entity_id,
            parent_volume_id: subtask.parent_volume_id,
            seq: subtask.seq,
            priority: subtask.priority,
            status: subtask.status,
            error_message: subtask.error_message,
            started_at: subtask.started_at,
            finished_at: subtask.finished_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobDetailDto {
    #[serde(flatten)]
    pub job: JobDto,
    pub subtasks: Vec<SubtaskDto>,
}

/// Paginated job listing
#[derive(Debug, Clone, Serialize)]
pub struct JobPage {
    pub jobs: Vec<JobDto>,
    pub total: i64,
}
