//! Messages exchanged with the search worker thread
//!
//! Each search is a job. The orchestrator sends one `Init` or `InitAdvanced`,
//! then one `Chunk` per batch, then `Done`. The worker streams a `Result` per
//! matching line and finishes with exactly one `Complete` for the job.

use crate::query::predicate::SearchTerm;
use serde::{Deserialize, Serialize};

/// Identifies one search job on a worker
pub type JobId = u64;

/// Command from orchestrator to worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerCommand {
    /// Start a single-term job
    Init {
        job_id: JobId,
        term: String,
        whole_word: bool,
        case_sensitive: bool,
    },

    /// Start an include/exclude job
    InitAdvanced { job_id: JobId, terms: Vec<SearchTerm> },

    /// A batch of whole lines; the first is `start_line`
    Chunk {
        job_id: JobId,
        text: String,
        start_line: usize,
        line_count: usize,
    },

    /// No more chunks for this job
    Done { job_id: JobId },
}

impl WorkerCommand {
    pub fn job_id(&self) -> JobId {
        match self {
            WorkerCommand::Init { job_id, .. }
            | WorkerCommand::InitAdvanced { job_id, .. }
            | WorkerCommand::Chunk { job_id, .. }
            | WorkerCommand::Done { job_id } => *job_id,
        }
    }
}

/// Response from worker to orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerResponse {
    /// A matching line
    Result { job_id: JobId, line_number: usize },

    /// All chunks of the job have been evaluated
    Complete { job_id: JobId },

    /// The job could not run, e.g. a term failed to compile
    Failed { job_id: JobId, error: String },
}

impl WorkerResponse {
    pub fn job_id(&self) -> JobId {
        match self {
            WorkerResponse::Result { job_id, .. }
            | WorkerResponse::Complete { job_id }
            | WorkerResponse::Failed { job_id, .. } => *job_id,
        }
    }
}
