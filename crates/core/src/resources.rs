//! Resource Accounting Types
//!
//! Value-semantic containers used by the scheduler to track how much of
//! each named resource (cpu, memory, accelerators, ...) is requested,
//! allocated, scheduled or preempted. Vectors are sparse: a resource that
//! was never touched is simply absent and reads as zero.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{AddAssign, SubAssign};

/// Sparse map from resource name to a signed scalar quantity.
///
/// Quantities are signed on purpose: preemption bookkeeping subtracts
/// resources that may not have been added through the same table first,
/// and the scheduler relies on those intermediate negatives cancelling
/// out rather than being clamped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceVector {
    quantities: BTreeMap<String, i64>,
}

impl ResourceVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a vector from `(name, quantity)` pairs.
    pub fn from_pairs<N: Into<String>>(pairs: impl IntoIterator<Item = (N, i64)>) -> Self {
        Self {
            quantities: pairs.into_iter().map(|(n, q)| (n.into(), q)).collect(),
        }
    }

    /// Quantity stored under `name`; absent resources read as zero.
    pub fn get(&self, name: &str) -> i64 {
        self.quantities.get(name).copied().unwrap_or(0)
    }

    /// Adds `other` entry-wise.
    pub fn add(&mut self, other: &ResourceVector) {
        for (name, quantity) in &other.quantities {
            *self.quantities.entry(name.clone()).or_insert(0) += quantity;
        }
    }

    /// Subtracts `other` entry-wise. A resource missing on the left is
    /// treated as zero, so the stored result may be negative.
    pub fn sub(&mut self, other: &ResourceVector) {
        for (name, quantity) in &other.quantities {
            *self.quantities.entry(name.clone()).or_insert(0) -= quantity;
        }
    }

    pub fn add_amount(&mut self, name: impl Into<String>, quantity: i64) {
        *self.quantities.entry(name.into()).or_insert(0) += quantity;
    }

    pub fn sub_amount(&mut self, name: impl Into<String>, quantity: i64) {
        *self.quantities.entry(name.into()).or_insert(0) -= quantity;
    }

    /// True iff every stored quantity is zero (an empty vector is zero).
    pub fn is_zero(&self) -> bool {
        self.quantities.values().all(|q| *q == 0)
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.quantities.iter().map(|(n, q)| (n.as_str(), *q))
    }

    /// Compact single-line rendering, e.g. `cpu=2 memory=20`.
    pub fn compact_string(&self) -> String {
        if self.quantities.is_empty() {
            return "none".to_string();
        }
        self.quantities
            .iter()
            .map(|(name, quantity)| format!("{}={}", name, quantity))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl AddAssign<&ResourceVector> for ResourceVector {
    fn add_assign(&mut self, other: &ResourceVector) {
        self.add(other);
    }
}

impl SubAssign<&ResourceVector> for ResourceVector {
    fn sub_assign(&mut self, other: &ResourceVector) {
        self.sub(other);
    }
}

impl fmt::Display for ResourceVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.compact_string())
    }
}

impl<N: Into<String>> FromIterator<(N, i64)> for ResourceVector {
    fn from_iter<I: IntoIterator<Item = (N, i64)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

/// Resource vectors broken down by priority class name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcesByPriorityClass {
    by_class: BTreeMap<String, ResourceVector>,
}

impl ResourcesByPriorityClass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<N: Into<String>>(
        entries: impl IntoIterator<Item = (N, ResourceVector)>,
    ) -> Self {
        Self {
            by_class: entries.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }
    }

    /// Adds `resources` to the entry for `class`, creating it on demand.
    pub fn add_for(&mut self, class: &str, resources: &ResourceVector) {
        self.by_class
            .entry(class.to_string())
            .or_default()
            .add(resources);
    }

    /// Subtracts `resources` from the entry for `class`, creating it on
    /// demand so the signed remainder is kept.
    pub fn sub_for(&mut self, class: &str, resources: &ResourceVector) {
        self.by_class
            .entry(class.to_string())
            .or_default()
            .sub(resources);
    }

    pub fn get(&self, class: &str) -> Option<&ResourceVector> {
        self.by_class.get(class)
    }

    /// Sums every per-class vector into a single total.
    pub fn aggregate(&self) -> ResourceVector {
        let mut total = ResourceVector::new();
        for resources in self.by_class.values() {
            total.add(resources);
        }
        total
    }

    pub fn is_zero(&self) -> bool {
        self.by_class.values().all(|v| v.is_zero())
    }

    pub fn is_empty(&self) -> bool {
        self.by_class.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourceVector)> {
        self.by_class.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl fmt::Display for ResourcesByPriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.by_class.is_empty() {
            return write!(f, "none");
        }
        let rendered = self
            .by_class
            .iter()
            .map(|(class, resources)| format!("{}: {}", class, resources.compact_string()))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{}", rendered)
    }
}


#[cfg(test)]
mod property_based_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_vector() -> impl Strategy<Value = ResourceVector> {
        proptest::collection::btree_map(
            prop::sample::select(vec!["cpu", "memory", "gpu", "disk"]),
            -1_000i64..1_000,
            0..4,
        )
        .prop_map(|m| ResourceVector::from_pairs(m.into_iter()))
    }

    proptest! {
        #[test]
        fn add_then_sub_restores_original(base in arb_vector(), delta in arb_vector()) {
            let mut v = base.clone();
            v.add(&delta);
            v.sub(&delta);
            for (name, quantity) in base.iter() {
                prop_assert_eq!(v.get(name), quantity);
            }
            for (name, _) in delta.iter() {
                prop_assert_eq!(v.get(name), base.get(name));
            }
        }

        #[test]
        fn aggregate_matches_per_class_sum(
            a in arb_vector(),
            b in arb_vector(),
        ) {
            let mut table = ResourcesByPriorityClass::new();
            table.add_for("p1", &a);
            table.add_for("p2", &b);
            let total = table.aggregate();
            for name in ["cpu", "memory", "gpu", "disk"] {
                prop_assert_eq!(total.get(name), a.get(name) + b.get(name));
            }
        }
    }
}
