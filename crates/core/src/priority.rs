//! Priority Class Catalogue
//!
//! Named priority tiers used for preemption ordering and per-class
//! resource accounting.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named priority tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriorityClass {
    /// Integer priority used for preemption ordering.
    pub priority: i32,
    /// Whether jobs of this class may be preempted by higher classes.
    pub preemptible: bool,
}

impl PriorityClass {
    pub fn new(priority: i32, preemptible: bool) -> Self {
        Self {
            priority,
            preemptible,
        }
    }
}

/// Mapping from priority class name to its definition.
pub type PriorityClassCatalogue = HashMap<String, PriorityClass>;

/// Priority of `class` in `catalogue`; an unknown class resolves to 0.
pub fn priority_for_class(catalogue: &PriorityClassCatalogue, class: &str) -> i32 {
    catalogue.get(class).map(|pc| pc.priority).unwrap_or(0)
}
