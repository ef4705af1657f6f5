//! Per-Queue Round Bookkeeping
//!
//! A `QueueRound` captures, for one queue inside one scheduling round,
//! which jobs were scheduled, rejected or preempted and how the queue's
//! allocation moved as a result. Three decision sets (successful,
//! unsuccessful, evicted) stay pairwise disjoint by job id; a job leaving
//! one set on re-scheduling or eviction has its resource flows reversed
//! rather than double-counted.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use convoy_core::{ResourceVector, ResourcesByPriorityClass, SchedulerJob};

use crate::decision::JobDecision;
use crate::error::RoundError;
use crate::fairness::FairnessQueue;
use crate::limiter::RateLimiter;

#[derive(Debug, Clone)]
pub struct QueueRound {
    /// Time at which the queue was registered with the round.
    pub created: DateTime<Utc>,
    /// Executor the round is scheduling for.
    pub executor_id: String,
    /// Queue name.
    pub queue: String,
    /// Fair-share weight relative to other queues.
    pub weight: f64,
    /// Limits scheduling rate for this queue. Consulted by the
    /// enclosing scheduler with the round's start time.
    pub limiter: RateLimiter,
    /// Total resources allocated to the queue, including jobs scheduled
    /// during the ongoing round.
    pub allocated: ResourceVector,
    pub allocated_by_priority_class: ResourcesByPriorityClass,
    /// Resources newly assigned to this queue during the round.
    pub scheduled_resources_by_priority_class: ResourcesByPriorityClass,
    /// Resources preempted from this queue during the round.
    pub evicted_resources_by_priority_class: ResourcesByPriorityClass,
    /// Decisions for jobs scheduled this round, by job id.
    pub successful: HashMap<String, JobDecision>,
    /// Decisions for jobs that could not be scheduled, by job id.
    pub unsuccessful: HashMap<String, JobDecision>,
    /// Ids of jobs evicted this round and not (yet) re-scheduled.
    pub evicted_jobs_by_id: HashSet<String>,
}

impl QueueRound {
    pub(crate) fn new(
        executor_id: String,
        queue: String,
        weight: f64,
        initial_allocated_by_priority_class: ResourcesByPriorityClass,
        limiter: RateLimiter,
    ) -> Self {
        let allocated = initial_allocated_by_priority_class.aggregate();
        Self {
            created: Utc::now(),
            executor_id,
            queue,
            weight,
            limiter,
            allocated,
            allocated_by_priority_class: initial_allocated_by_priority_class,
            scheduled_resources_by_priority_class: ResourcesByPriorityClass::new(),
            evicted_resources_by_priority_class: ResourcesByPriorityClass::new(),
            successful: HashMap::new(),
            unsuccessful: HashMap::new(),
            evicted_jobs_by_id: HashSet::new(),
        }
    }

    /// Records `decision` against this queue.
    ///
    /// Returns whether the job was in the evicted set at entry. A
    /// successful decision for an evicted job undoes the eviction: the
    /// job is removed from the evicted set and its requests flow back
    /// out of the evicted table, without ever touching the scheduled
    /// table, because the job never actually left the queue.
    pub fn add_job_decision(&mut self, decision: JobDecision) -> Result<bool, RoundError> {
        if self.successful.contains_key(&decision.job_id) {
            return Err(RoundError::DuplicateJobDecision {
                job_id: decision.job_id,
                state: "successful",
            });
        }
        if self.unsuccessful.contains_key(&decision.job_id) {
            return Err(RoundError::DuplicateJobDecision {
                job_id: decision.job_id,
                state: "unsuccessful",
            });
        }
        let was_evicted = self.evicted_jobs_by_id.contains(&decision.job_id);
        if decision.is_successful() {
            let requests = match &decision.pod_requirements {
                Some(requirements) => requirements.resource_requests.clone(),
                None => {
                    return Err(RoundError::MissingPodRequirements(decision.job_id));
                }
            };
            let class = decision.priority_class_name.clone();

            // The allocation always moves, evicted or not: fairness
            // ranks queues on post-scheduling allocation.
            self.allocated.add(&requests);
            self.allocated_by_priority_class.add_for(&class, &requests);

            if was_evicted {
                self.evicted_jobs_by_id.remove(&decision.job_id);
                self.evicted_resources_by_priority_class
                    .sub_for(&class, &requests);
            } else {
                self.scheduled_resources_by_priority_class
                    .add_for(&class, &requests);
                debug!(queue = %self.queue, job_id = %decision.job_id, "job scheduled");
                self.successful.insert(decision.job_id.clone(), decision);
            }
        } else {
            self.unsuccessful.insert(decision.job_id.clone(), decision);
        }
        Ok(was_evicted)
    }

    /// Removes `job` from the queue's allocation.
    ///
    /// Returns whether the job had been scheduled during this round, in
    /// which case the eviction simply cancels that scheduling instead of
    /// recording a preemption.
    pub fn evict_job(&mut self, job: &dyn SchedulerJob) -> Result<bool, RoundError> {
        let job_id = job.id();
        if self.unsuccessful.contains_key(job_id) {
            return Err(RoundError::InvalidEviction {
                job_id: job_id.to_string(),
                state: "unsuccessful",
            });
        }
        if self.evicted_jobs_by_id.contains(job_id) {
            return Err(RoundError::InvalidEviction {
                job_id: job_id.to_string(),
                state: "evicted",
            });
        }
        let requests = job.resource_requirements().clone();
        let class = job.priority_class_name();
        let was_scheduled_this_round = self.successful.contains_key(job_id);
        if was_scheduled_this_round {
            self.scheduled_resources_by_priority_class
                .sub_for(class, &requests);
            self.successful.remove(job_id);
        } else {
            self.evicted_resources_by_priority_class
                .add_for(class, &requests);
            self.evicted_jobs_by_id.insert(job_id.to_string());
        }
        self.allocated.sub(&requests);
        self.allocated_by_priority_class.sub_for(class, &requests);
        debug!(queue = %self.queue, job_id, was_scheduled_this_round, "job evicted");
        Ok(was_scheduled_this_round)
    }

    /// Drops job handles from retained decisions, keeping ids, reasons
    /// and pod decisions for reporting.
    pub fn clear_job_specs(&mut self) {
        for decision in self.successful.values_mut() {
            decision.job = None;
        }
        for decision in self.unsuccessful.values_mut() {
            decision.job = None;
        }
    }
}

impl FairnessQueue for QueueRound {
    fn allocation(&self) -> &ResourceVector {
        &self.allocated
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}
