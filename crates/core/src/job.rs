//! Job Capabilities
//!
//! The scheduler never inspects a concrete job type. It sees a job as a
//! capability set: identity, queue, priority class, placement constraints
//! and resource requests. `SchedulerJob` is that seam; `JobSpec` is the
//! plain owned implementation used by callers that hold job data directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::priority::{priority_for_class, PriorityClassCatalogue};
use crate::resources::ResourceVector;

/// Operator of a node-affinity match expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

/// A single label constraint inside a node selector term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchExpression {
    pub key: String,
    pub operator: MatchOperator,
    pub values: Vec<String>,
}

/// One disjunct of a node affinity: all expressions must match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeSelectorTerm {
    pub match_expressions: Vec<MatchExpression>,
}

/// Node affinity constraints: a node must satisfy at least one term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Affinity {
    pub node_affinity: Vec<NodeSelectorTerm>,
}

/// Operator of a taint toleration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TolerationOperator {
    Equal,
    Exists,
}

/// Tolerated node taint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Toleration {
    pub key: String,
    pub operator: TolerationOperator,
    pub value: String,
    pub effect: String,
}

/// Placement-relevant requirements of the single pod backing a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PodRequirements {
    pub node_selector: BTreeMap<String, String>,
    pub affinity: Option<Affinity>,
    pub tolerations: Vec<Toleration>,
    pub annotations: BTreeMap<String, String>,
    /// Priority resolved from the job's priority class at derivation time.
    pub priority: i32,
    pub resource_requests: ResourceVector,
}

/// Capability set through which the scheduler observes a job.
pub trait SchedulerJob: fmt::Debug + Send + Sync {
    fn id(&self) -> &str;
    fn queue(&self) -> &str;
    fn priority_class_name(&self) -> &str;
    fn node_selector(&self) -> &BTreeMap<String, String>;
    fn affinity(&self) -> Option<&Affinity>;
    fn tolerations(&self) -> &[Toleration];
    /// Resource requests of the job's pod.
    fn resource_requirements(&self) -> &ResourceVector;
    /// Derives pod requirements, resolving the priority class through
    /// `catalogue` (unknown classes resolve to priority 0).
    fn pod_requirements(&self, catalogue: &PriorityClassCatalogue) -> PodRequirements;
    fn annotations(&self) -> &BTreeMap<String, String>;
}

/// Plain owned job description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub id: String,
    pub queue: String,
    pub priority_class_name: String,
    pub submitted: DateTime<Utc>,
    pub annotations: BTreeMap<String, String>,
    pub node_selector: BTreeMap<String, String>,
    pub affinity: Option<Affinity>,
    pub tolerations: Vec<Toleration>,
    pub resource_requests: ResourceVector,
}

impl JobSpec {
    pub fn new(
        id: impl Into<String>,
        queue: impl Into<String>,
        priority_class_name: impl Into<String>,
        resource_requests: ResourceVector,
    ) -> Self {
        Self {
            id: id.into(),
            queue: queue.into(),
            priority_class_name: priority_class_name.into(),
            submitted: Utc::now(),
            annotations: BTreeMap::new(),
            node_selector: BTreeMap::new(),
            affinity: None,
            tolerations: Vec::new(),
            resource_requests,
        }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_node_selector(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.node_selector.insert(key.into(), value.into());
        self
    }
}

impl SchedulerJob for JobSpec {
    fn id(&self) -> &str {
        &self.id
    }

    fn queue(&self) -> &str {
        &self.queue
    }

    fn priority_class_name(&self) -> &str {
        &self.priority_class_name
    }

    fn node_selector(&self) -> &BTreeMap<String, String> {
        &self.node_selector
    }

    fn affinity(&self) -> Option<&Affinity> {
        self.affinity.as_ref()
    }

    fn tolerations(&self) -> &[Toleration] {
        &self.tolerations
    }

    fn resource_requirements(&self) -> &ResourceVector {
        &self.resource_requests
    }

    fn pod_requirements(&self, catalogue: &PriorityClassCatalogue) -> PodRequirements {
        PodRequirements {
            node_selector: self.node_selector.clone(),
            affinity: self.affinity.clone(),
            tolerations: self.tolerations.clone(),
            annotations: self.annotations.clone(),
            priority: priority_for_class(catalogue, &self.priority_class_name),
            resource_requests: self.resource_requests.clone(),
        }
    }

    fn annotations(&self) -> &BTreeMap<String, String> {
        &self.annotations
    }
}
