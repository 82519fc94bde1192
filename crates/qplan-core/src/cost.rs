//! # Cost Estimation
//!
//! The estimator walks a plan depth-first in post-order, derives each node's output
//! descriptor from its children's descriptors (see `stats`), attaches it to the node,
//! and sums every node's tuple count into the plan's total cost.
//!
//! ## Cost Proxy
//!
//! ```text
//! cost(plan) = sum over nodes n of tuple_count(n)
//! ```
//!
//! The total size of all materialised intermediate results is a crude but
//! monotone proxy for work: a plan that shrinks its inputs early produces smaller
//! intermediates everywhere above the shrink.
//!
//! ## Re-estimation
//!
//! Every call resets the running total and overwrites every descriptor in the tree.
//! There is no incremental mode; after any structural edit the whole plan is
//! estimated again. Estimating an unchanged tree twice yields identical descriptors
//! and an identical total.

use crate::error::{PlanError, Result};
use crate::plan::{NodeId, Operator, Plan};
use crate::stats::{self, Relation};
use tracing::{debug, trace};

/// Post-order cardinality estimator.
#[derive(Debug, Default)]
pub struct Estimator {
    /// Running total for the current call.
    total: u64,
}

impl Estimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an output descriptor to every node and return the total cost.
    pub fn estimate(&mut self, plan: &mut Plan) -> Result<u64> {
        self.total = 0;
        for id in plan.post_order() {
            let output = self.evaluate(plan, id)?;
            trace!(node = %id, tuples = output.tuple_count, "estimated node");
            self.total = self
                .total
                .checked_add(output.tuple_count)
                .ok_or(PlanError::Overflow)?;
            plan.set_output(id, output);
        }
        debug!(nodes = plan.len(), cost = self.total, "plan estimated");
        Ok(self.total)
    }

    /// Total of the most recent `estimate` call.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Derive one node's descriptor from its children's cached descriptors.
    pub(crate) fn evaluate(&self, plan: &Plan, id: NodeId) -> Result<Relation> {
        match plan.op(id) {
            Operator::Scan { relation } => Ok(stats::derive_scan(&relation.stats)),
            Operator::Select { input, predicate } => {
                stats::derive_select(resolved(plan, id, *input)?, predicate)
            }
            Operator::Project { input, attributes } => {
                stats::derive_project(resolved(plan, id, *input)?, attributes)
            }
            Operator::Product { left, right } => {
                stats::derive_product(resolved(plan, id, *left)?, resolved(plan, id, *right)?)
            }
            Operator::Join {
                left,
                right,
                predicate,
            } => stats::derive_join(
                resolved(plan, id, *left)?,
                resolved(plan, id, *right)?,
                predicate,
            ),
        }
    }
}

/// A child's descriptor, which post-order guarantees has been computed.
fn resolved(plan: &Plan, parent: NodeId, child: NodeId) -> Result<&Relation> {
    plan.output(child).ok_or(PlanError::MissingOutput(parent))
}

/// Estimate `plan` with a fresh estimator.
pub fn estimate(plan: &mut Plan) -> Result<u64> {
    Estimator::new().estimate(plan)
}
