//! Domain Core - Scheduling Value Types
//!
//! This crate contains the value types and capability seams shared by the
//! convoy scheduler: sparse resource vectors, priority class catalogues,
//! the job capability trait and the well-known annotations the scheduling
//! core recognises. It has no dependency on infrastructure or transport.

pub mod annotations;
pub mod job;
pub mod priority;
pub mod resources;

pub use crate::annotations::{
    is_evicted_job, GANG_NODE_UNIFORMITY_LABEL_ANNOTATION, IS_EVICTED_ANNOTATION,
};
pub use crate::job::{
    Affinity, JobSpec, MatchExpression, MatchOperator, NodeSelectorTerm, PodRequirements,
    SchedulerJob, Toleration, TolerationOperator,
};
pub use crate::priority::{priority_for_class, PriorityClass, PriorityClassCatalogue};
pub use crate::resources::{ResourceVector, ResourcesByPriorityClass};
