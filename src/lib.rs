//! Novel Ingest
//!
//! Turns scraped web-novel EPUBs into a stored Novel/Volume/Chapter tree and
//! splits novels into translation jobs for a worker queue.
//!
//! # Modules
//!
//! - `epub`: container extraction, OPF parsing and text extraction
//! - `transform`: source detection and vendor-specific layouts
//! - `ingest`: the ingestion pipeline and its transactional persister
//! - `jobs`: translation job decomposition and lifecycle
//! - `queue`: job messages, publishers and the outbox relay

pub mod config;
pub mod db;
pub mod epub;
pub mod error;
pub mod ingest;
pub mod jobs;
pub mod logging;
pub mod media;
pub mod queue;
pub mod transform;

pub use error::{AppError, EpubError, Result};
