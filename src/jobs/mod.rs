//! Translation jobs
//!
//! A job covers one novel and one target language. Creating it fans the novel
//! out into per-entity subtasks and queues a message for the translation
//! workers; the workers report back through the subtask hooks on
//! [`JobService`].

mod service;
pub mod types;

pub use service::JobService;
pub use types::*;
