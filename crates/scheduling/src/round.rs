//! Scheduling Round Context
//!
//! A `Round` records everything that happens during one scheduler
//! invocation against one executor: which queues participated, which
//! jobs were scheduled or preempted, how resources flowed, and why the
//! round ended. It is the structure fairness ranking, admission control
//! and reporting all read from.
//!
//! A round is single-threaded cooperative: the owning scheduler drives
//! it from one task and no operation suspends. Every mutator validates
//! before committing arithmetic, so counters are mutually consistent
//! after every call, including rejected ones.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use convoy_core::{
    priority_for_class, PriorityClassCatalogue, ResourceVector, ResourcesByPriorityClass,
    SchedulerJob,
};

use crate::decision::{GangDecision, JobDecision};
use crate::error::RoundError;
use crate::fairness::CostProvider;
use crate::keys::{SchedulingKey, SchedulingKeyGenerator};
use crate::limiter::RateLimiter;
use crate::queue::QueueRound;

#[derive(Debug)]
pub struct Round {
    /// Time at which the round started.
    pub started: DateTime<Utc>,
    /// Time at which the round finished, once recorded.
    pub finished: Option<DateTime<Utc>>,
    /// Executor the round is scheduling for.
    pub executor_id: String,
    /// Resource pool of the executor.
    pub pool: String,
    /// Allowed priority classes.
    pub priority_classes: PriorityClassCatalogue,
    /// Class assumed for jobs that name no known class.
    pub default_priority_class: String,
    /// Determines how fairness is computed.
    pub fairness_cost_provider: Arc<dyn CostProvider>,
    /// Limits scheduling rate across all queues. Consulted with the
    /// round's `started` time so limiter state is constant within the
    /// round.
    pub limiter: RateLimiter,
    /// Sum of queue weights across all registered queues.
    pub weight_sum: f64,
    /// Per-queue bookkeeping.
    pub queue_rounds: HashMap<String, QueueRound>,
    /// Total resources available across the executor at round start.
    pub total_resources: ResourceVector,
    /// Resources assigned across all queues during this round.
    pub scheduled_resources: ResourceVector,
    pub scheduled_resources_by_priority_class: ResourcesByPriorityClass,
    /// Resources preempted across all queues during this round.
    pub evicted_resources: ResourceVector,
    pub evicted_resources_by_priority_class: ResourcesByPriorityClass,
    /// Signed on purpose: re-scheduling previously evicted jobs
    /// decrements these, and transients may dip below zero.
    pub num_scheduled_jobs: i64,
    pub num_scheduled_gangs: i64,
    pub num_evicted_jobs: i64,
    /// Why the round finished.
    pub termination_reason: String,
    /// Used to efficiently derive scheduling keys.
    pub scheduling_key_generator: SchedulingKeyGenerator,
    /// Scheduling keys proven infeasible earlier in the round, mapped to
    /// the decision that proved them so. New jobs hashing to a cached
    /// key may be rejected without re-running node selection.
    pub unfeasible_scheduling_keys: HashMap<SchedulingKey, JobDecision>,
}

impl Round {
    pub fn new(
        executor_id: impl Into<String>,
        pool: impl Into<String>,
        priority_classes: PriorityClassCatalogue,
        default_priority_class: impl Into<String>,
        fairness_cost_provider: Arc<dyn CostProvider>,
        limiter: RateLimiter,
        total_resources: &ResourceVector,
    ) -> Self {
        Self {
            started: Utc::now(),
            finished: None,
            executor_id: executor_id.into(),
            pool: pool.into(),
            priority_classes,
            default_priority_class: default_priority_class.into(),
            fairness_cost_provider,
            limiter,
            weight_sum: 0.0,
            queue_rounds: HashMap::new(),
            total_resources: total_resources.clone(),
            scheduled_resources: ResourceVector::new(),
            scheduled_resources_by_priority_class: ResourcesByPriorityClass::new(),
            evicted_resources: ResourceVector::new(),
            evicted_resources_by_priority_class: ResourcesByPriorityClass::new(),
            num_scheduled_jobs: 0,
            num_scheduled_gangs: 0,
            num_evicted_jobs: 0,
            termination_reason: String::new(),
            scheduling_key_generator: SchedulingKeyGenerator::new(),
            unfeasible_scheduling_keys: HashMap::new(),
        }
    }

    /// Registers a participating queue.
    ///
    /// `initial_allocated_by_priority_class` is the queue's allocation
    /// entering the round; `None` means an empty allocation. The
    /// queue's total allocation starts as the sum of the per-class
    /// entries.
    pub fn register_queue(
        &mut self,
        queue: impl Into<String>,
        weight: f64,
        initial_allocated_by_priority_class: Option<ResourcesByPriorityClass>,
        limiter: RateLimiter,
    ) -> Result<(), RoundError> {
        let queue = queue.into();
        if self.queue_rounds.contains_key(&queue) {
            return Err(RoundError::DuplicateQueue(queue));
        }
        let initial = initial_allocated_by_priority_class.unwrap_or_default();
        self.weight_sum += weight;
        info!(queue = %queue, weight, "registered queue for scheduling round");
        self.queue_rounds.insert(
            queue.clone(),
            QueueRound::new(self.executor_id.clone(), queue, weight, initial, limiter),
        );
        Ok(())
    }

    pub fn get_queue(&self, queue: &str) -> Option<&QueueRound> {
        self.queue_rounds.get(queue)
    }

    /// Scheduling key of `job`, with the priority resolved through the
    /// round's catalogue (unknown classes resolve to priority 0).
    pub fn scheduling_key_for_job(&mut self, job: &dyn SchedulerJob) -> SchedulingKey {
        let priority = priority_for_class(&self.priority_classes, job.priority_class_name());
        self.scheduling_key_generator.key(
            job.node_selector(),
            job.affinity(),
            job.tolerations(),
            job.resource_requirements(),
            priority,
        )
    }

    /// Records that jobs hashing to `key` are infeasible, keeping the
    /// decision that proved it as the representative.
    pub fn mark_key_unfeasible(&mut self, key: SchedulingKey, decision: JobDecision) {
        self.unfeasible_scheduling_keys.insert(key, decision);
    }

    /// The decision that proved `key` infeasible, if any.
    pub fn unfeasible_decision(&self, key: &SchedulingKey) -> Option<&JobDecision> {
        self.unfeasible_scheduling_keys.get(key)
    }

    /// Forgets all cached infeasible keys, e.g. after cluster state
    /// changed mid-round.
    pub fn clear_unfeasible_scheduling_keys(&mut self) {
        self.unfeasible_scheduling_keys.clear();
    }

    /// Applies every decision of a gang in order.
    ///
    /// `num_scheduled_gangs` increments only when every member ended up
    /// successful and at least one of them was newly scheduled rather
    /// than a re-scheduled eviction. Returns whether every member was
    /// already evicted entering the call.
    pub fn add_gang_decision(&mut self, gang: GangDecision) -> Result<bool, RoundError> {
        let mut all_jobs_evicted_in_this_round = true;
        let mut all_jobs_successful = true;
        for decision in gang.job_decisions {
            let successful = decision.is_successful();
            let evicted_in_this_round = self.add_job_decision(decision)?;
            all_jobs_evicted_in_this_round = all_jobs_evicted_in_this_round && evicted_in_this_round;
            all_jobs_successful = all_jobs_successful && successful;
        }
        if all_jobs_successful && !all_jobs_evicted_in_this_round {
            self.num_scheduled_gangs += 1;
        }
        Ok(all_jobs_evicted_in_this_round)
    }

    /// Applies one job decision to its queue and folds the outcome into
    /// the round aggregates. Returns whether the job was in the queue's
    /// evicted set at entry.
    pub fn add_job_decision(&mut self, decision: JobDecision) -> Result<bool, RoundError> {
        let queue_round = self.queue_rounds.get_mut(&decision.queue).ok_or_else(|| {
            RoundError::UnknownQueue {
                queue: decision.queue.clone(),
                job_id: decision.job_id.clone(),
            }
        })?;
        let successful = decision.is_successful();
        let class = decision.priority_class_name.clone();
        let requests = decision
            .pod_requirements
            .as_ref()
            .map(|requirements| requirements.resource_requests.clone());
        let job = decision.job.clone();
        let evicted_in_this_round = queue_round.add_job_decision(decision)?;
        if successful {
            // The queue accepted the decision, so requests were present.
            if let Some(requests) = requests {
                if evicted_in_this_round {
                    self.evicted_resources.sub(&requests);
                    self.evicted_resources_by_priority_class
                        .sub_for(&class, &requests);
                    self.num_evicted_jobs -= 1;
                } else {
                    self.scheduled_resources.add(&requests);
                    self.scheduled_resources_by_priority_class
                        .add_for(&class, &requests);
                    self.num_scheduled_jobs += 1;
                }
            }
            // A recorded success invalidates any cached infeasibility
            // for the same scheduling key.
            if !self.unfeasible_scheduling_keys.is_empty() {
                if let Some(job) = job.as_deref() {
                    let key = self.scheduling_key_for_job(job);
                    self.unfeasible_scheduling_keys.remove(&key);
                }
            }
        }
        Ok(evicted_in_this_round)
    }

    /// Evicts every job of a gang.
    ///
    /// When all members had been scheduled during this round the gang's
    /// scheduling is cancelled and `num_scheduled_gangs` decrements.
    /// Returns whether that was the case.
    pub fn evict_gang(&mut self, jobs: &[Arc<dyn SchedulerJob>]) -> Result<bool, RoundError> {
        let mut all_jobs_scheduled_in_this_round = true;
        for job in jobs {
            let scheduled_in_this_round = self.evict_job(job.as_ref())?;
            all_jobs_scheduled_in_this_round =
                all_jobs_scheduled_in_this_round && scheduled_in_this_round;
        }
        if all_jobs_scheduled_in_this_round {
            self.num_scheduled_gangs -= 1;
        }
        Ok(all_jobs_scheduled_in_this_round)
    }

    /// Evicts one job and folds the outcome into the round aggregates.
    /// Returns whether the job had been scheduled during this round.
    pub fn evict_job(&mut self, job: &dyn SchedulerJob) -> Result<bool, RoundError> {
        let queue_round =
            self.queue_rounds
                .get_mut(job.queue())
                .ok_or_else(|| RoundError::UnknownQueue {
                    queue: job.queue().to_string(),
                    job_id: job.id().to_string(),
                })?;
        let scheduled_in_this_round = queue_round.evict_job(job)?;
        let requests = job.resource_requirements();
        let class = job.priority_class_name();
        if scheduled_in_this_round {
            self.scheduled_resources.sub(requests);
            self.scheduled_resources_by_priority_class
                .sub_for(class, requests);
            self.num_scheduled_jobs -= 1;
        } else {
            self.evicted_resources.add(requests);
            self.evicted_resources_by_priority_class
                .add_for(class, requests);
            self.num_evicted_jobs += 1;
        }
        Ok(scheduled_in_this_round)
    }

    /// Sum of fairness costs across all queues.
    pub fn total_cost(&self) -> f64 {
        self.queue_rounds
            .values()
            .map(|queue_round| {
                self.fairness_cost_provider
                    .cost_from_queue(queue_round)
            })
            .sum()
    }

    /// Decisions of every job scheduled this round, across all queues.
    pub fn successful_job_decisions(&self) -> Vec<&JobDecision> {
        self.queue_rounds
            .values()
            .flat_map(|queue_round| queue_round.successful.values())
            .collect()
    }

    /// Deep copy of `{queue -> allocation by priority class}`, skipping
    /// queues whose allocation is entirely zero.
    pub fn allocated_by_queue_and_priority(&self) -> HashMap<String, ResourcesByPriorityClass> {
        self.queue_rounds
            .iter()
            .filter(|(_, queue_round)| !queue_round.allocated_by_priority_class.is_zero())
            .map(|(queue, queue_round)| {
                (queue.clone(), queue_round.allocated_by_priority_class.clone())
            })
            .collect()
    }

    /// Drops job handles from every retained decision so a finished
    /// round can be kept for reporting without pinning job payloads.
    pub fn clear_job_specs(&mut self) {
        for queue_round in self.queue_rounds.values_mut() {
            queue_round.clear_job_specs();
        }
        for decision in self.unfeasible_scheduling_keys.values_mut() {
            decision.job = None;
        }
    }

    /// Records why and when the round ended.
    pub fn finish(&mut self, termination_reason: impl Into<String>) {
        self.termination_reason = termination_reason.into();
        self.finished = Some(Utc::now());
        info!(
            executor_id = %self.executor_id,
            pool = %self.pool,
            num_scheduled_jobs = self.num_scheduled_jobs,
            num_evicted_jobs = self.num_evicted_jobs,
            termination_reason = %self.termination_reason,
            "scheduling round finished"
        );
        debug!(scheduled = %self.scheduled_resources, evicted = %self.evicted_resources, "round resource flows");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fairness::FairnessQueue;
    use convoy_core::{JobSpec, PriorityClass, IS_EVICTED_ANNOTATION};

    /// Cost provider charging the queue's cpu allocation divided by its
    /// weight; enough structure to observe mid-round ranking.
    #[derive(Debug)]
    struct CpuShareCost;

    impl CostProvider for CpuShareCost {
        fn cost_from_queue(&self, queue: &dyn FairnessQueue) -> f64 {
            queue.allocation().get("cpu") as f64 / queue.weight()
        }
    }

    fn create_test_round() -> Round {
        let mut catalogue = PriorityClassCatalogue::new();
        catalogue.insert("p1".to_string(), PriorityClass::new(10, true));
        catalogue.insert("p2".to_string(), PriorityClass::new(20, false));
        Round::new(
            "executor-1",
            "default-pool",
            catalogue,
            "p1",
            Arc::new(CpuShareCost),
            RateLimiter::new(100.0, 1000),
            &ResourceVector::from_pairs([("cpu", 10), ("memory", 100)]),
        )
    }

    fn create_test_job(id: &str, queue: &str, class: &str, cpu: i64, memory: i64) -> Arc<JobSpec> {
        Arc::new(JobSpec::new(
            id,
            queue,
            class,
            ResourceVector::from_pairs([("cpu", cpu), ("memory", memory)]),
        ))
    }

    fn successful_decision(round: &Round, job: Arc<JobSpec>) -> JobDecision {
        JobDecision::from_job(job, &round.priority_classes)
    }

    #[test]
    fn scheduling_a_job_updates_queue_and_round_counters() {
        let mut round = create_test_round();
        round
            .register_queue("A", 1.0, None, RateLimiter::new(10.0, 100))
            .unwrap();

        let decision = successful_decision(&round, create_test_job("j1", "A", "p1", 2, 20));
        let was_evicted = round.add_job_decision(decision).unwrap();
        assert!(!was_evicted);

        let queue = round.get_queue("A").unwrap();
        assert_eq!(queue.allocated, ResourceVector::from_pairs([("cpu", 2), ("memory", 20)]));
        assert_eq!(
            queue.allocated_by_priority_class.get("p1").unwrap(),
            &ResourceVector::from_pairs([("cpu", 2), ("memory", 20)])
        );
        assert_eq!(
            queue
                .scheduled_resources_by_priority_class
                .get("p1")
                .unwrap(),
            &ResourceVector::from_pairs([("cpu", 2), ("memory", 20)])
        );
        assert_eq!(
            round.scheduled_resources,
            ResourceVector::from_pairs([("cpu", 2), ("memory", 20)])
        );
        assert_eq!(round.num_scheduled_jobs, 1);
    }

    #[test]
    fn evicting_a_freshly_scheduled_job_cancels_it() {
        let mut round = create_test_round();
        round
            .register_queue("A", 1.0, None, RateLimiter::new(10.0, 100))
            .unwrap();
        let job = create_test_job("j1", "A", "p1", 2, 20);
        round
            .add_job_decision(successful_decision(&round, job.clone()))
            .unwrap();

        let was_scheduled = round.evict_job(job.as_ref()).unwrap();
        assert!(was_scheduled);

        let queue = round.get_queue("A").unwrap();
        assert!(queue.allocated.is_zero());
        assert!(queue.allocated_by_priority_class.is_zero());
        assert!(queue.scheduled_resources_by_priority_class.is_zero());
        assert!(round.scheduled_resources.is_zero());
        assert_eq!(round.num_scheduled_jobs, 0);
        assert_eq!(round.num_evicted_jobs, 0);
    }

    #[test]
    fn evict_then_schedule_round_trip_cancels_exactly() {
        let mut round = create_test_round();
        round
            .register_queue(
                "B",
                2.0,
                Some(ResourcesByPriorityClass::from_entries([(
                    "p1",
                    ResourceVector::from_pairs([("cpu", 5), ("memory", 50)]),
                )])),
                RateLimiter::new(10.0, 100),
            )
            .unwrap();

        let job = create_test_job("j2", "B", "p1", 5, 50);
        let was_scheduled = round.evict_job(job.as_ref()).unwrap();
        assert!(!was_scheduled);
        assert_eq!(round.num_evicted_jobs, 1);

        let was_evicted = round
            .add_job_decision(successful_decision(&round, job))
            .unwrap();
        assert!(was_evicted);

        let queue = round.get_queue("B").unwrap();
        assert_eq!(
            queue.allocated,
            ResourceVector::from_pairs([("cpu", 5), ("memory", 50)])
        );
        assert!(queue.evicted_jobs_by_id.is_empty());
        assert!(round.evicted_resources.is_zero());
        assert!(round.scheduled_resources.is_zero());
        assert_eq!(round.num_scheduled_jobs, 0);
        assert_eq!(round.num_evicted_jobs, 0);
    }

    #[test]
    fn gang_with_a_failed_member_does_not_count_as_scheduled() {
        let mut round = create_test_round();
        round
            .register_queue("A", 1.0, None, RateLimiter::new(10.0, 100))
            .unwrap();

        let first = successful_decision(&round, create_test_job("g1", "A", "p1", 1, 10));
        let second = successful_decision(&round, create_test_job("g2", "A", "p1", 1, 10))
            .with_unschedulable_reason("node uniformity violated");
        let gang = GangDecision::new(vec![first, second]);
        round.add_gang_decision(gang).unwrap();

        assert_eq!(round.num_scheduled_gangs, 0);
        assert_eq!(round.num_scheduled_jobs, 1);
        assert_eq!(
            round.scheduled_resources,
            ResourceVector::from_pairs([("cpu", 1), ("memory", 10)])
        );
        assert!(round.get_queue("A").unwrap().unsuccessful.contains_key("g2"));
    }

    #[test]
    fn fully_successful_gang_increments_the_gang_counter() {
        let mut round = create_test_round();
        round
            .register_queue("A", 1.0, None, RateLimiter::new(10.0, 100))
            .unwrap();

        let gang = GangDecision::new(vec![
            successful_decision(&round, create_test_job("g1", "A", "p1", 1, 10)),
            successful_decision(&round, create_test_job("g2", "A", "p1", 1, 10)),
        ]);
        let all_pre_evicted = round.add_gang_decision(gang).unwrap();
        assert!(!all_pre_evicted);
        assert_eq!(round.num_scheduled_gangs, 1);
        assert_eq!(round.num_scheduled_jobs, 2);
    }

    #[test]
    fn gang_of_rescheduled_evictions_does_not_increment_the_gang_counter() {
        let mut round = create_test_round();
        round
            .register_queue("A", 1.0, None, RateLimiter::new(10.0, 100))
            .unwrap();
        let job = create_test_job("j1", "A", "p1", 1, 10);
        round.evict_job(job.as_ref()).unwrap();

        let gang = GangDecision::new(vec![successful_decision(&round, job)]);
        let all_pre_evicted = round.add_gang_decision(gang).unwrap();
        assert!(all_pre_evicted);
        assert_eq!(round.num_scheduled_gangs, 0);
        assert_eq!(round.num_scheduled_jobs, 0);
    }

    #[test]
    fn evicting_a_fully_scheduled_gang_cancels_the_gang_counter() {
        let mut round = create_test_round();
        round
            .register_queue("A", 1.0, None, RateLimiter::new(10.0, 100))
            .unwrap();
        let jobs: Vec<Arc<dyn SchedulerJob>> = vec![
            create_test_job("g1", "A", "p1", 1, 10),
            create_test_job("g2", "A", "p1", 1, 10),
        ];
        let gang = GangDecision::new(
            jobs.iter()
                .map(|job| JobDecision::from_job(job.clone(), &round.priority_classes))
                .collect(),
        );
        round.add_gang_decision(gang).unwrap();
        assert_eq!(round.num_scheduled_gangs, 1);

        let all_scheduled = round.evict_gang(&jobs).unwrap();
        assert!(all_scheduled);
        assert_eq!(round.num_scheduled_gangs, 0);
        assert_eq!(round.num_scheduled_jobs, 0);
    }

    #[test]
    fn duplicate_queue_registration_is_rejected() {
        let mut round = create_test_round();
        round
            .register_queue("A", 1.0, None, RateLimiter::new(10.0, 100))
            .unwrap();
        let err = round
            .register_queue("A", 3.0, None, RateLimiter::new(10.0, 100))
            .unwrap_err();
        assert!(matches!(err, RoundError::DuplicateQueue(_)));
        assert_eq!(round.weight_sum, 1.0);
    }

    #[test]
    fn unknown_queue_is_rejected_for_apply_and_evict() {
        let mut round = create_test_round();
        let job = create_test_job("j1", "ghost", "p1", 1, 10);

        let err = round
            .add_job_decision(successful_decision(&round, job.clone()))
            .unwrap_err();
        assert!(matches!(err, RoundError::UnknownQueue { .. }));

        let err = round.evict_job(job.as_ref()).unwrap_err();
        assert!(matches!(err, RoundError::UnknownQueue { .. }));
        assert_eq!(round.num_scheduled_jobs, 0);
        assert_eq!(round.num_evicted_jobs, 0);
    }

    #[test]
    fn unfeasible_key_cache_short_circuits_until_cleared() {
        let mut round = create_test_round();
        round
            .register_queue("A", 1.0, None, RateLimiter::new(10.0, 100))
            .unwrap();

        let job = create_test_job("j1", "A", "p1", 4, 40);
        let key = round.scheduling_key_for_job(job.as_ref());
        let proof = successful_decision(&round, job.clone())
            .with_unschedulable_reason("no node with 4 free cpu");
        round.mark_key_unfeasible(key, proof);

        // An identical job is pre-classified without node selection.
        let twin = create_test_job("j2", "A", "p1", 4, 40);
        let twin_key = round.scheduling_key_for_job(twin.as_ref());
        assert_eq!(twin_key, key);
        let cached = round.unfeasible_decision(&twin_key).unwrap();
        assert_eq!(cached.unschedulable_reason, "no node with 4 free cpu");

        round.clear_unfeasible_scheduling_keys();
        assert!(round.unfeasible_decision(&key).is_none());
    }

    #[test]
    fn recording_a_success_invalidates_the_cached_key() {
        let mut round = create_test_round();
        round
            .register_queue("A", 1.0, None, RateLimiter::new(10.0, 100))
            .unwrap();

        let job = create_test_job("j1", "A", "p1", 4, 40);
        let key = round.scheduling_key_for_job(job.as_ref());
        let proof = successful_decision(&round, job.clone())
            .with_unschedulable_reason("no node with 4 free cpu");
        round.mark_key_unfeasible(key, proof);

        let twin = create_test_job("j2", "A", "p1", 4, 40);
        round
            .add_job_decision(successful_decision(&round, twin))
            .unwrap();
        assert!(round.unfeasible_decision(&key).is_none());
    }

    #[test]
    fn rejected_operations_leave_every_counter_untouched() {
        let mut round = create_test_round();
        round
            .register_queue("A", 1.0, None, RateLimiter::new(10.0, 100))
            .unwrap();
        round
            .add_job_decision(successful_decision(
                &round,
                create_test_job("j1", "A", "p1", 2, 20),
            ))
            .unwrap();

        let snapshot = (
            round.scheduled_resources.clone(),
            round.evicted_resources.clone(),
            round.scheduled_resources_by_priority_class.clone(),
            round.evicted_resources_by_priority_class.clone(),
            round.num_scheduled_jobs,
            round.num_evicted_jobs,
            round.num_scheduled_gangs,
            round.weight_sum,
            round.get_queue("A").unwrap().allocated.clone(),
        );

        // Duplicate decision.
        round
            .add_job_decision(successful_decision(
                &round,
                create_test_job("j1", "A", "p1", 2, 20),
            ))
            .unwrap_err();
        // Missing pod requirements.
        let mut missing = successful_decision(&round, create_test_job("j3", "A", "p1", 1, 1));
        missing.pod_requirements = None;
        round.add_job_decision(missing).unwrap_err();
        // Unknown queue.
        round
            .evict_job(create_test_job("j4", "ghost", "p1", 1, 1).as_ref())
            .unwrap_err();

        assert_eq!(snapshot.0, round.scheduled_resources);
        assert_eq!(snapshot.1, round.evicted_resources);
        assert_eq!(snapshot.2, round.scheduled_resources_by_priority_class);
        assert_eq!(snapshot.3, round.evicted_resources_by_priority_class);
        assert_eq!(snapshot.4, round.num_scheduled_jobs);
        assert_eq!(snapshot.5, round.num_evicted_jobs);
        assert_eq!(snapshot.6, round.num_scheduled_gangs);
        assert_eq!(snapshot.7, round.weight_sum);
        assert_eq!(snapshot.8, round.get_queue("A").unwrap().allocated);
    }

    #[test]
    fn total_cost_sums_provider_costs_over_queues() {
        let mut round = create_test_round();
        round
            .register_queue("A", 1.0, None, RateLimiter::new(10.0, 100))
            .unwrap();
        round
            .register_queue("B", 2.0, None, RateLimiter::new(10.0, 100))
            .unwrap();
        round
            .add_job_decision(successful_decision(
                &round,
                create_test_job("j1", "A", "p1", 4, 0),
            ))
            .unwrap();
        round
            .add_job_decision(successful_decision(
                &round,
                create_test_job("j2", "B", "p1", 6, 0),
            ))
            .unwrap();

        // A: 4 cpu / weight 1; B: 6 cpu / weight 2.
        assert_eq!(round.total_cost(), 4.0 + 3.0);
    }

    #[test]
    fn allocated_by_queue_and_priority_skips_zero_queues() {
        let mut round = create_test_round();
        round
            .register_queue("A", 1.0, None, RateLimiter::new(10.0, 100))
            .unwrap();
        round
            .register_queue("idle", 1.0, None, RateLimiter::new(10.0, 100))
            .unwrap();
        round
            .add_job_decision(successful_decision(
                &round,
                create_test_job("j1", "A", "p2", 3, 30),
            ))
            .unwrap();

        let allocated = round.allocated_by_queue_and_priority();
        assert_eq!(allocated.len(), 1);
        assert_eq!(
            allocated["A"].get("p2").unwrap(),
            &ResourceVector::from_pairs([("cpu", 3), ("memory", 30)])
        );
    }

    #[test]
    fn pre_evicted_annotation_flows_through_gang_construction() {
        let round = create_test_round();
        let job: Arc<JobSpec> = Arc::new(
            JobSpec::new(
                "j1",
                "A",
                "p1",
                ResourceVector::from_pairs([("cpu", 1)]),
            )
            .with_annotation(IS_EVICTED_ANNOTATION, "true"),
        );
        let gang = GangDecision::new(vec![successful_decision(&round, job)]);
        assert!(gang.all_jobs_evicted);
    }

    #[test]
    fn finish_records_reason_and_timestamp() {
        let mut round = create_test_round();
        round.finish("hit per-round scheduling budget");
        assert_eq!(round.termination_reason, "hit per-round scheduling budget");
        assert!(round.finished.is_some());
        assert!(round.finished.unwrap() >= round.started);
    }
}
