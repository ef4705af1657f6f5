//! Decision Records
//!
//! Value bundles recording what the scheduler decided for a pod, a job,
//! and a gang during one round. These carry no bookkeeping of their own;
//! applying them to a round is what moves counters.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use convoy_core::{
    is_evicted_job, PodRequirements, PriorityClassCatalogue, ResourceVector, SchedulerJob,
    GANG_NODE_UNIFORMITY_LABEL_ANNOTATION,
};

/// Outcome of attempting to place one pod on a node.
#[derive(Debug, Clone, Default)]
pub struct PodDecision {
    pub created: Option<DateTime<Utc>>,
    /// Chosen node, if placement succeeded.
    pub node_id: Option<String>,
    /// How well the pod fits on the selected node.
    pub score: i64,
    /// Priority at which the pod was admitted. Only meaningful when
    /// `node_id` is set.
    pub scheduled_at_priority: i32,
    /// Node types on which this pod could run.
    pub matching_node_types: Vec<String>,
    /// Total nodes considered during the attempt.
    pub num_nodes: usize,
    /// Histogram of why nodes were excluded.
    pub num_excluded_nodes_by_reason: HashMap<String, usize>,
}

/// Decision made for one job during a scheduling round.
#[derive(Debug, Clone)]
pub struct JobDecision {
    pub created: DateTime<Utc>,
    pub job_id: String,
    /// Queue and priority class are captured at construction so the
    /// bookkeeping survives `clear_job_specs`.
    pub queue: String,
    pub priority_class_name: String,
    /// Handle to the job itself; dropped by `clear_job_specs`.
    pub job: Option<Arc<dyn SchedulerJob>>,
    /// Requirements of the job's single pod. Required for successful
    /// decisions, optional otherwise.
    pub pod_requirements: Option<PodRequirements>,
    /// Why the job could not be scheduled. Empty means success.
    pub unschedulable_reason: String,
    pub pod_decision: Option<PodDecision>,
}

impl JobDecision {
    /// Decision shell for `job`, initially successful, with pod
    /// requirements derived through `catalogue`.
    pub fn from_job(job: Arc<dyn SchedulerJob>, catalogue: &PriorityClassCatalogue) -> Self {
        Self::from_job_at(job, catalogue, Utc::now())
    }

    fn from_job_at(
        job: Arc<dyn SchedulerJob>,
        catalogue: &PriorityClassCatalogue,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            created,
            job_id: job.id().to_string(),
            queue: job.queue().to_string(),
            priority_class_name: job.priority_class_name().to_string(),
            pod_requirements: Some(job.pod_requirements(catalogue)),
            job: Some(job),
            unschedulable_reason: String::new(),
            pod_decision: None,
        }
    }

    /// Decision shells for a batch of jobs, stamped with one timestamp.
    pub fn from_jobs(
        catalogue: &PriorityClassCatalogue,
        jobs: impl IntoIterator<Item = Arc<dyn SchedulerJob>>,
    ) -> Vec<Self> {
        let created = Utc::now();
        jobs.into_iter()
            .map(|job| Self::from_job_at(job, catalogue, created))
            .collect()
    }

    pub fn with_unschedulable_reason(mut self, reason: impl Into<String>) -> Self {
        self.unschedulable_reason = reason.into();
        self
    }

    pub fn is_successful(&self) -> bool {
        self.unschedulable_reason.is_empty()
    }
}

/// An ordered bundle of job decisions that succeed or fail together.
#[derive(Debug, Clone)]
pub struct GangDecision {
    pub created: DateTime<Utc>,
    pub queue: String,
    pub priority_class_name: String,
    /// Value of the gang node-uniformity annotation on the first
    /// member's pod requirements, if present.
    pub node_uniformity_label: Option<String>,
    pub job_decisions: Vec<JobDecision>,
    /// Vector sum of all members' pod requests.
    pub total_resource_requests: ResourceVector,
    /// True iff every member carries the evicted-job marker.
    pub all_jobs_evicted: bool,
}

impl GangDecision {
    /// Bundles `job_decisions` into a gang. All members are assumed to
    /// share one queue and priority class (enforced at submission);
    /// queue, class and uniformity label are read off the first member.
    pub fn new(job_decisions: Vec<JobDecision>) -> Self {
        let (queue, priority_class_name, node_uniformity_label) = match job_decisions.first() {
            Some(first) => (
                first.queue.clone(),
                first.priority_class_name.clone(),
                first.pod_requirements.as_ref().and_then(|requirements| {
                    requirements
                        .annotations
                        .get(GANG_NODE_UNIFORMITY_LABEL_ANNOTATION)
                        .cloned()
                }),
            ),
            None => (String::new(), String::new(), None),
        };
        let mut all_jobs_evicted = true;
        let mut total_resource_requests = ResourceVector::new();
        for decision in &job_decisions {
            all_jobs_evicted = all_jobs_evicted
                && decision
                    .job
                    .as_deref()
                    .map(is_evicted_job)
                    .unwrap_or(false);
            if let Some(requirements) = &decision.pod_requirements {
                total_resource_requests.add(&requirements.resource_requests);
            }
        }
        Self {
            created: Utc::now(),
            queue,
            priority_class_name,
            node_uniformity_label,
            job_decisions,
            total_resource_requests,
            all_jobs_evicted,
        }
    }

    /// Number of jobs in the gang.
    pub fn cardinality(&self) -> usize {
        self.job_decisions.len()
    }
}
