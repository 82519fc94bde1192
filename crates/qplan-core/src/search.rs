//! # Plan Optimiser and Join-Order Search
//!
//! The optimiser rewrites a plan in three phases:
//!
//! 1. **Decompose** (`decompose`): collect scans, predicates and required attributes.
//! 2. **Push down** (`pushdown`): build one filtered, narrowed chain per relation.
//! 3. **Order joins** (this module): combine the chains using the predicates that
//!    span relations, trying every order of those predicates and keeping the one
//!    the estimator scores cheapest.
//!
//! ## Candidate Construction
//!
//! For one ordering of the leftover predicates, starting from fresh copies of the
//! chains:
//!
//! - take out the chain holding the predicate's left attribute, then the chain
//!   holding its right attribute;
//! - two chains: join them on the predicate. One chain (the other attribute is
//!   already in it because of an earlier join): apply the predicate as a Select on it.
//!   No chain at all is an invariant violation;
//! - narrow the result to the attributes still needed by later predicates or by the
//!   final output, and put it back at the end of the pool.
//!
//! Chains that no predicate connects are then combined by Product, the first two of
//! the pool at a time with the result appended, and a final Project restores the root
//! projection if the result exposes anything else.
//!
//! ## Search Order and Ties
//!
//! Candidate 0 uses the predicates in decomposition order; the following candidates
//! enumerate the remaining permutations of predicate indices in lexicographic order.
//! Among equal-cost candidates the earliest in that order wins, in sequential and
//! parallel mode alike.
//!
//! ## Baseline
//!
//! The estimated input plan is kept aside. When even the cheapest candidate costs
//! more (pushed-down projections are not free), the input is returned unchanged, so
//! optimising never raises the estimated cost.
//!
//! ## Complexity
//!
//! The search is O(p!) in the number p of cross-relation predicates. It is
//! intractable beyond roughly ten predicates, which is why `max_join_predicates`
//! rejects larger inputs up front. `order_joins` is the single entry point for the
//! enumeration and the place to substitute a dynamic-programming enumerator.

use crate::cost::estimate;
use crate::decompose::decompose;
use crate::error::{PlanError, Result};
use crate::expr::{Attribute, Predicate};
use crate::plan::Plan;
use crate::pushdown::{narrow, push_down};
use rayon::iter::{ParallelBridge, ParallelIterator};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Configuration knobs for the optimiser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimiserConfig {
    /// Upper bound on cross-relation predicates; the search evaluates p! candidates.
    pub max_join_predicates: usize,
    /// Score candidates on the rayon thread pool.
    pub parallel: bool,
}

impl Default for OptimiserConfig {
    fn default() -> Self {
        Self {
            max_join_predicates: 10,
            parallel: false,
        }
    }
}

/// Summary of one optimisation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    /// Estimated cost of the input plan.
    pub baseline_cost: u64,
    /// Estimated cost of the returned plan.
    pub best_cost: u64,
    /// Number of candidate plans built and scored.
    pub candidates: usize,
    /// Position of the best search candidate in the enumeration order.
    pub best_candidate: usize,
    /// The input was returned because no candidate was cheaper.
    pub kept_input: bool,
}

#[derive(Debug, Default)]
pub struct Optimiser {
    config: OptimiserConfig,
}

impl Optimiser {
    pub fn new(config: OptimiserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimiserConfig {
        &self.config
    }

    /// Rewrite `plan` into the cheapest equivalent found. The result is estimated.
    pub fn optimise(&self, plan: &Plan) -> Result<Plan> {
        self.optimise_with_stats(plan).map(|(plan, _)| plan)
    }

    pub fn optimise_with_stats(&self, plan: &Plan) -> Result<(Plan, SearchStats)> {
        // Estimating the input validates every attribute reference before rewriting.
        let mut input = plan.clone();
        let baseline_cost = estimate(&mut input)?;

        let decomposition = decompose(&input)?;
        let pushdown = push_down(
            &decomposition.scans,
            decomposition.predicates.clone(),
            &decomposition.required,
        )?;

        let count = pushdown.leftover.len();
        if count > self.config.max_join_predicates {
            return Err(PlanError::TooManyPredicates {
                count,
                limit: self.config.max_join_predicates,
            });
        }

        let search = JoinSearch {
            chains: &pushdown.chains,
            predicates: &pushdown.leftover,
            output: decomposition.output(),
            root_projection: decomposition.root_projection.as_deref(),
        };
        let best = self.order_joins(&search)?;

        // The input competes with the candidates but is not counted among them.
        let kept_input = baseline_cost < best.cost;
        debug!(
            baseline = baseline_cost,
            best = best.cost,
            candidates = best.evaluated,
            kept_input,
            "optimisation complete"
        );
        let stats = SearchStats {
            baseline_cost,
            best_cost: best.cost.min(baseline_cost),
            candidates: best.evaluated,
            best_candidate: best.index,
            kept_input,
        };
        let plan = if kept_input { input } else { best.plan };
        Ok((plan, stats))
    }

    /// Score every permutation of the leftover predicates and keep the cheapest.
    fn order_joins(&self, search: &JoinSearch<'_>) -> Result<Candidate> {
        let orders = Permutations::new(search.predicates.len()).enumerate();

        let best = if self.config.parallel {
            orders
                .par_bridge()
                .map(|(index, order)| search.candidate(index, &order))
                .try_reduce_with(|a, b| Ok(Candidate::better(a, b)))
        } else {
            let mut best: Option<Candidate> = None;
            for (index, order) in orders {
                let candidate = search.candidate(index, &order)?;
                best = Some(match best {
                    Some(current) => Candidate::better(current, candidate),
                    None => candidate,
                });
            }
            best.map(Ok)
        };

        best.unwrap_or_else(|| Err(PlanError::NoScans))
    }
}

/// Inputs shared by every candidate of one search.
struct JoinSearch<'a> {
    chains: &'a [Plan],
    predicates: &'a [Predicate],
    output: &'a [Attribute],
    root_projection: Option<&'a [Attribute]>,
}

/// A scored candidate plan; `evaluated` counts the candidates it was chosen over.
#[derive(Debug)]
struct Candidate {
    index: usize,
    cost: u64,
    plan: Plan,
    evaluated: usize,
}

impl Candidate {
    /// Lower cost wins; equal costs go to the earlier permutation.
    fn better(a: Candidate, b: Candidate) -> Candidate {
        let evaluated = a.evaluated + b.evaluated;
        let mut winner = if (b.cost, b.index) < (a.cost, a.index) { b } else { a };
        winner.evaluated = evaluated;
        winner
    }
}

impl JoinSearch<'_> {
    fn candidate(&self, index: usize, order: &[usize]) -> Result<Candidate> {
        let mut plan = self.build(order)?;
        let cost = estimate(&mut plan)?;
        debug!(candidate = index, cost, "scored candidate");
        Ok(Candidate {
            index,
            cost,
            plan,
            evaluated: 1,
        })
    }

    fn build(&self, order: &[usize]) -> Result<Plan> {
        let mut pool: Vec<Plan> = self.chains.to_vec();

        for (step, &index) in order.iter().enumerate() {
            let predicate = &self.predicates[index];

            let left = take_chain(&mut pool, &predicate.left)?;
            let right = match predicate.right_attribute() {
                Some(attribute) => take_chain(&mut pool, attribute)?,
                None => None,
            };
            let mut combined = match (left, right) {
                (Some(left), Some(right)) => Plan::join(left, right, predicate.clone()),
                (Some(chain), None) | (None, Some(chain)) => {
                    Plan::select(chain, predicate.clone())
                }
                (None, None) => {
                    return Err(PlanError::UnresolvedAttribute(predicate.left.name.clone()))
                }
            };
            estimate(&mut combined)?;

            let later = order[step + 1..].iter().map(|&i| &self.predicates[i]);
            pool.push(narrow(combined, &still_needed(later, self.output))?);
        }

        // Unconnected chains: product of the first two, appended, until one remains.
        let mut pool: VecDeque<Plan> = pool.into();
        while pool.len() > 1 {
            if let (Some(left), Some(right)) = (pool.pop_front(), pool.pop_front()) {
                pool.push_back(Plan::product(left, right));
            }
        }
        let mut plan = pool.pop_front().ok_or(PlanError::NoScans)?;

        if let Some(projection) = self.root_projection {
            estimate(&mut plan)?;
            if !same_attributes(&plan, projection)? {
                plan = Plan::reproject(plan, projection.to_vec());
            }
        }
        Ok(plan)
    }
}

/// Remove and return the only chain exposing `attribute`, if any.
fn take_chain(pool: &mut Vec<Plan>, attribute: &Attribute) -> Result<Option<Plan>> {
    let mut matching = Vec::new();
    let mut rest = Vec::with_capacity(pool.len());
    for chain in pool.drain(..) {
        if exposes(&chain, attribute)? {
            matching.push(chain);
        } else {
            rest.push(chain);
        }
    }
    *pool = rest;

    if matching.len() > 1 {
        return Err(PlanError::AmbiguousAttribute(attribute.name.clone()));
    }
    Ok(matching.pop())
}

fn exposes(chain: &Plan, attribute: &Attribute) -> Result<bool> {
    chain
        .root_output()
        .map(|out| out.contains(attribute))
        .ok_or(PlanError::MissingOutput(chain.root()))
}

fn same_attributes(plan: &Plan, attributes: &[Attribute]) -> Result<bool> {
    let out = plan
        .root_output()
        .ok_or(PlanError::MissingOutput(plan.root()))?;
    Ok(out.attributes.len() == attributes.len() && attributes.iter().all(|a| out.contains(a)))
}

/// Attributes of the predicates not yet applied, plus the final output attributes.
fn still_needed<'a>(
    later: impl Iterator<Item = &'a Predicate>,
    output: &[Attribute],
) -> Vec<Attribute> {
    let mut needed: Vec<Attribute> = output.to_vec();
    for attribute in later.flat_map(|p| p.attributes()) {
        if !needed.contains(attribute) {
            needed.push(attribute.clone());
        }
    }
    needed
}

/// Permutations of `0..n` in lexicographic order, starting from the identity.
/// `n == 0` yields the single empty permutation.
#[derive(Debug, Clone)]
pub struct Permutations {
    next: Option<Vec<usize>>,
}

impl Permutations {
    pub fn new(n: usize) -> Self {
        Self {
            next: Some((0..n).collect()),
        }
    }
}

impl Iterator for Permutations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        let mut successor = current.clone();

        // Classic next-permutation: find the rightmost ascent, swap it with the
        // smallest larger element to its right, then reverse the suffix.
        if let Some(pivot) = successor.windows(2).rposition(|w| w[0] < w[1]) {
            let swap = successor
                .iter()
                .rposition(|&x| x > successor[pivot])
                .unwrap_or(pivot + 1);
            successor.swap(pivot, swap);
            successor[pivot + 1..].reverse();
            self.next = Some(successor);
        }
        Some(current)
    }
}
