//! Fairness Seams
//!
//! The fairness cost function lives outside this crate. Mid-round it
//! ranks queues through these two capabilities: a view of a queue's
//! current allocation and weight, and a single-method provider turning
//! that view into a scalar cost.

use convoy_core::ResourceVector;
use std::fmt;

/// Read-only view of a queue as the fairness cost function sees it.
pub trait FairnessQueue {
    /// Total resources currently allocated to the queue, including jobs
    /// scheduled earlier in the ongoing round.
    fn allocation(&self) -> &ResourceVector;

    /// Fair-share weight of the queue relative to other queues.
    fn weight(&self) -> f64;
}

/// External provider of per-queue fairness costs.
pub trait CostProvider: fmt::Debug + Send + Sync {
    fn cost_from_queue(&self, queue: &dyn FairnessQueue) -> f64;
}
