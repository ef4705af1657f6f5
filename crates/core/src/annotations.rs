//! Well-known annotations recognised by the scheduling core.

use crate::job::SchedulerJob;

/// Pod-requirement annotation constraining every member of a gang to
/// nodes carrying identical values for the named label key.
pub const GANG_NODE_UNIFORMITY_LABEL_ANNOTATION: &str = "convoy.io/gang-node-uniformity-label";

/// Job annotation (value `"true"`) marking a job that was preempted
/// before the current scheduling round and is being considered for
/// re-scheduling.
pub const IS_EVICTED_ANNOTATION: &str = "convoy.io/is-evicted";

/// True iff `job` carries the evicted-job marker.
pub fn is_evicted_job(job: &dyn SchedulerJob) -> bool {
    job.annotations()
        .get(IS_EVICTED_ANNOTATION)
        .map(|value| value == "true")
        .unwrap_or(false)
}
