//! Scheduling Keys
//!
//! A scheduling key is a fingerprint over the placement-relevant
//! attributes of a job: node selector, affinity, tolerations, resource
//! requests and resolved priority. Two jobs with equal keys are
//! interchangeable as far as node selection is concerned, which lets the
//! scheduler reject a job without re-running node selection when an
//! identical job already proved infeasible.
//!
//! The generator interns the hash of each distinct component, so bursts
//! of jobs sharing selectors and requests (the common case) compute
//! their keys in amortised constant time.

use convoy_core::{Affinity, ResourceVector, Toleration};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use xxhash_rust::xxh3::xxh3_64;

/// Opaque fingerprint of a job's placement requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchedulingKey(u64);

impl SchedulingKey {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct SchedulingKeyGenerator {
    selector_hashes: HashMap<BTreeMap<String, String>, u64>,
    affinity_hashes: HashMap<Affinity, u64>,
    toleration_hashes: HashMap<Vec<Toleration>, u64>,
    request_hashes: HashMap<ResourceVector, u64>,
}

impl SchedulingKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint over `(node_selector, affinity, tolerations, requests,
    /// priority)`. Equal inputs always produce equal keys within one
    /// generator.
    pub fn key(
        &mut self,
        node_selector: &BTreeMap<String, String>,
        affinity: Option<&Affinity>,
        tolerations: &[Toleration],
        requests: &ResourceVector,
        priority: i32,
    ) -> SchedulingKey {
        let selector_hash = match self.selector_hashes.get(node_selector) {
            Some(hash) => *hash,
            None => {
                let hash = hash_node_selector(node_selector);
                self.selector_hashes.insert(node_selector.clone(), hash);
                hash
            }
        };
        let affinity_hash = match affinity {
            None => 0,
            Some(affinity) => match self.affinity_hashes.get(affinity) {
                Some(hash) => *hash,
                None => {
                    let hash = hash_affinity(affinity);
                    self.affinity_hashes.insert(affinity.clone(), hash);
                    hash
                }
            },
        };
        let toleration_hash = match self.toleration_hashes.get(tolerations) {
            Some(hash) => *hash,
            None => {
                let hash = hash_tolerations(tolerations);
                self.toleration_hashes
                    .insert(tolerations.to_vec(), hash);
                hash
            }
        };
        let request_hash = match self.request_hashes.get(requests) {
            Some(hash) => *hash,
            None => {
                let hash = hash_requests(requests);
                self.request_hashes.insert(requests.clone(), hash);
                hash
            }
        };

        let mut buffer = Vec::with_capacity(4 * 8 + 4);
        buffer.extend_from_slice(&selector_hash.to_le_bytes());
        buffer.extend_from_slice(&affinity_hash.to_le_bytes());
        buffer.extend_from_slice(&toleration_hash.to_le_bytes());
        buffer.extend_from_slice(&request_hash.to_le_bytes());
        buffer.extend_from_slice(&priority.to_le_bytes());
        SchedulingKey(xxh3_64(&buffer))
    }
}

fn push_str(buffer: &mut Vec<u8>, value: &str) {
    buffer.extend_from_slice(&(value.len() as u64).to_le_bytes());
    buffer.extend_from_slice(value.as_bytes());
}

fn hash_node_selector(selector: &BTreeMap<String, String>) -> u64 {
    let mut buffer = Vec::new();
    for (key, value) in selector {
        push_str(&mut buffer, key);
        push_str(&mut buffer, value);
    }
    xxh3_64(&buffer)
}

fn hash_affinity(affinity: &Affinity) -> u64 {
    let mut buffer = Vec::new();
    for term in &affinity.node_affinity {
        buffer.extend_from_slice(&(term.match_expressions.len() as u64).to_le_bytes());
        for expression in &term.match_expressions {
            push_str(&mut buffer, &expression.key);
            buffer.push(expression.operator as u8);
            for value in &expression.values {
                push_str(&mut buffer, value);
            }
        }
    }
    xxh3_64(&buffer)
}

fn hash_tolerations(tolerations: &[Toleration]) -> u64 {
    let mut buffer = Vec::new();
    for toleration in tolerations {
        push_str(&mut buffer, &toleration.key);
        buffer.push(toleration.operator as u8);
        push_str(&mut buffer, &toleration.value);
        push_str(&mut buffer, &toleration.effect);
    }
    xxh3_64(&buffer)
}

fn hash_requests(requests: &ResourceVector) -> u64 {
    let mut buffer = Vec::new();
    for (name, quantity) in requests.iter() {
        push_str(&mut buffer, name);
        buffer.extend_from_slice(&quantity.to_le_bytes());
    }
    xxh3_64(&buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn equal_inputs_produce_equal_keys() {
        let mut generator = SchedulingKeyGenerator::new();
        let requests = ResourceVector::from_pairs([("cpu", 2), ("memory", 20)]);
        let first = generator.key(&selector(&[("zone", "a")]), None, &[], &requests, 10);
        let second = generator.key(&selector(&[("zone", "a")]), None, &[], &requests, 10);
        assert_eq!(first, second);
    }

    #[test]
    fn any_component_change_changes_the_key() {
        let mut generator = SchedulingKeyGenerator::new();
        let requests = ResourceVector::from_pairs([("cpu", 2)]);
        let base = generator.key(&selector(&[("zone", "a")]), None, &[], &requests, 10);

        let other_selector = generator.key(&selector(&[("zone", "b")]), None, &[], &requests, 10);
        assert_ne!(base, other_selector);

        let other_priority = generator.key(&selector(&[("zone", "a")]), None, &[], &requests, 11);
        assert_ne!(base, other_priority);

        let other_requests = generator.key(
            &selector(&[("zone", "a")]),
            None,
            &[],
            &ResourceVector::from_pairs([("cpu", 3)]),
            10,
        );
        assert_ne!(base, other_requests);
    }

    #[test]
    fn interned_components_keep_keys_stable() {
        let mut generator = SchedulingKeyGenerator::new();
        let node_selector = selector(&[("zone", "a"), ("arch", "amd64")]);
        let requests = ResourceVector::from_pairs([("cpu", 1)]);

        let first = generator.key(&node_selector, None, &[], &requests, 0);
        for _ in 0..16 {
            assert_eq!(generator.key(&node_selector, None, &[], &requests, 0), first);
        }
    }
}
