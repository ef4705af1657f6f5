//! Error types for scheduling round operations.
//!
//! Every mutator validates before it commits any arithmetic, so a
//! returned error means the round's counters are exactly as they were
//! before the call.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoundError {
    #[error("a queue round already exists for queue {0}")]
    DuplicateQueue(String),

    #[error("no queue round for queue {queue} (job {job_id})")]
    UnknownQueue { queue: String, job_id: String },

    #[error("job {job_id} already marked {state}")]
    DuplicateJobDecision {
        job_id: String,
        state: &'static str,
    },

    #[error("cannot evict job {job_id}: already marked {state}")]
    InvalidEviction {
        job_id: String,
        state: &'static str,
    },

    #[error("job {0} is marked successful but carries no pod requirements")]
    MissingPodRequirements(String),
}
