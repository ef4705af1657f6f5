//! Round Summaries
//!
//! Read-only rendering of a round and its queues at variable verbosity.
//! Verbosity drops by two per nesting level, so a round printed at 2
//! renders its queues at 0 and anything deeper collapses to totals.

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;

use crate::decision::{JobDecision, PodDecision};
use crate::queue::QueueRound;
use crate::round::Round;

const MAX_JOB_IDS_TO_PRINT: usize = 1;

fn indented(text: &str, prefix: &str) -> String {
    let mut out = String::new();
    for line in text.lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            let _ = writeln!(out, "{prefix}{line}");
        }
    }
    out
}

fn sample_of_ids<'a>(ids: impl Iterator<Item = &'a String>) -> (Vec<&'a String>, usize) {
    let mut ids: Vec<&String> = ids.collect();
    ids.sort();
    let total = ids.len();
    ids.truncate(MAX_JOB_IDS_TO_PRINT);
    (ids, total)
}

fn write_job_id_sample(out: &mut String, label: &str, ids: Vec<&String>, total: usize) {
    if total == 0 {
        return;
    }
    let shown = ids
        .iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    if total > ids.len() {
        let _ = writeln!(
            out,
            "{label}: [{shown}] (and {} others not shown)",
            total - ids.len()
        );
    } else {
        let _ = writeln!(out, "{label}: [{shown}]");
    }
}

impl Round {
    /// Renders the round summary. At `verbosity <= 0` the per-queue
    /// sections collapse to queue name lists; higher verbosity nests
    /// full queue blocks, each rendered at `verbosity - 2`.
    pub fn report(&self, verbosity: i32) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Started: {}", self.started);
        match self.finished {
            Some(finished) => {
                let _ = writeln!(out, "Finished: {}", finished);
                let _ = writeln!(out, "Duration: {}", finished - self.started);
            }
            None => {
                let _ = writeln!(out, "Finished: -");
                let _ = writeln!(out, "Duration: -");
            }
        }
        let _ = writeln!(out, "Termination reason: {}", self.termination_reason);
        let _ = writeln!(out, "Total capacity: {}", self.total_resources);
        let _ = writeln!(out, "Scheduled resources: {}", self.scheduled_resources);
        let _ = writeln!(out, "Preempted resources: {}", self.evicted_resources);
        let _ = writeln!(out, "Number of gangs scheduled: {}", self.num_scheduled_gangs);
        let _ = writeln!(out, "Number of jobs scheduled: {}", self.num_scheduled_jobs);
        let _ = writeln!(out, "Number of jobs preempted: {}", self.num_evicted_jobs);

        let mut scheduled: Vec<(&String, &QueueRound)> = self
            .queue_rounds
            .iter()
            .filter(|(_, queue_round)| !queue_round.successful.is_empty())
            .collect();
        scheduled.sort_by(|a, b| a.0.cmp(b.0));
        self.write_queue_section(&mut out, "Scheduled queues", scheduled, verbosity);

        let mut preempted: Vec<(&String, &QueueRound)> = self
            .queue_rounds
            .iter()
            .filter(|(_, queue_round)| !queue_round.evicted_jobs_by_id.is_empty())
            .collect();
        preempted.sort_by(|a, b| a.0.cmp(b.0));
        self.write_queue_section(&mut out, "Preempted queues", preempted, verbosity);

        out
    }

    fn write_queue_section(
        &self,
        out: &mut String,
        label: &str,
        queues: Vec<(&String, &QueueRound)>,
        verbosity: i32,
    ) {
        if verbosity <= 0 {
            let names = queues
                .iter()
                .map(|(queue, _)| queue.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "{label}: [{names}]");
        } else {
            let _ = writeln!(out, "{label}:");
            for (queue, queue_round) in queues {
                let _ = writeln!(out, "  {queue}:");
                out.push_str(&indented(&queue_round.report(verbosity - 2), "    "));
            }
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.report(0))
    }
}

impl QueueRound {
    /// Renders the queue's round summary. Resource flow totals always
    /// print; identity, allocation, counts and per-job detail need
    /// `verbosity >= 0`.
    pub fn report(&self, verbosity: i32) -> String {
        let mut out = String::new();
        if verbosity >= 0 {
            let _ = writeln!(out, "Created: {}", self.created);
            let _ = writeln!(out, "Queue: {}", self.queue);
        }
        let _ = writeln!(
            out,
            "Scheduled resources: {}",
            self.scheduled_resources_by_priority_class.aggregate()
        );
        let _ = writeln!(
            out,
            "Scheduled resources (by priority class): {}",
            self.scheduled_resources_by_priority_class
        );
        let _ = writeln!(
            out,
            "Preempted resources: {}",
            self.evicted_resources_by_priority_class.aggregate()
        );
        let _ = writeln!(
            out,
            "Preempted resources (by priority class): {}",
            self.evicted_resources_by_priority_class
        );
        if verbosity >= 0 {
            let _ = writeln!(out, "Allocated resources after scheduling: {}", self.allocated);
            let _ = writeln!(
                out,
                "Allocated resources after scheduling (by priority class): {}",
                self.allocated_by_priority_class
            );
            let _ = writeln!(out, "Number of jobs scheduled: {}", self.successful.len());
            let _ = writeln!(
                out,
                "Number of jobs preempted: {}",
                self.evicted_jobs_by_id.len()
            );
            let _ = writeln!(
                out,
                "Number of jobs that could not be scheduled: {}",
                self.unsuccessful.len()
            );
            let (ids, total) = sample_of_ids(self.successful.keys());
            write_job_id_sample(&mut out, "Scheduled jobs", ids, total);
            let (ids, total) = sample_of_ids(self.evicted_jobs_by_id.iter());
            write_job_id_sample(&mut out, "Preempted jobs", ids, total);
            self.write_unschedulable_summary(&mut out);
        }
        out
    }

    /// Groups unsuccessful decisions by identical reason, most frequent
    /// first, with one representative job id per reason.
    fn write_unschedulable_summary(&self, out: &mut String) {
        if self.unsuccessful.is_empty() {
            return;
        }
        let mut by_reason: HashMap<&str, (usize, &str)> = HashMap::new();
        for decision in self.unsuccessful.values() {
            let entry = by_reason
                .entry(decision.unschedulable_reason.as_str())
                .or_insert((0, decision.job_id.as_str()));
            entry.0 += 1;
            if decision.job_id.as_str() < entry.1 {
                entry.1 = decision.job_id.as_str();
            }
        }
        let mut groups: Vec<(&str, usize, &str)> = by_reason
            .into_iter()
            .map(|(reason, (count, example))| (reason, count, example))
            .collect();
        groups.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        let _ = writeln!(out, "Unschedulable jobs:");
        for (reason, count, example) in groups {
            let _ = writeln!(out, "  {count}: {reason} (e.g., {example})");
        }
    }
}

impl fmt::Display for QueueRound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.report(0))
    }
}

impl fmt::Display for JobDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Time: {}", self.created)?;
        writeln!(f, "Job ID: {}", self.job_id)?;
        if self.unschedulable_reason.is_empty() {
            writeln!(f, "Unschedulable reason: none")?;
        } else {
            writeln!(f, "Unschedulable reason: {}", self.unschedulable_reason)?;
        }
        if let Some(pod_decision) = &self.pod_decision {
            write!(f, "{pod_decision}")?;
        }
        Ok(())
    }
}

impl fmt::Display for PodDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node_id {
            Some(node_id) => writeln!(f, "Node: {node_id}")?,
            None => writeln!(f, "Node: none")?,
        }
        writeln!(f, "Number of nodes in cluster: {}", self.num_nodes)?;
        if self.num_excluded_nodes_by_reason.is_empty() {
            writeln!(f, "Excluded nodes: none")?;
        } else {
            writeln!(f, "Excluded nodes:")?;
            let mut reasons: Vec<(&String, &usize)> =
                self.num_excluded_nodes_by_reason.iter().collect();
            reasons.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
            for (reason, count) in reasons {
                writeln!(f, "  {count}: {reason}")?;
            }
        }
        Ok(())
    }
}
