//! # Predicate and Projection Pushdown
//!
//! Pushdown rebuilds the plan's leaves as one **chain** per base relation:
//!
//! ```text
//! Project[required ∩ schema]      (only when it narrows the schema)
//!   Select[p_k]
//!     ...
//!       Select[p_1]
//!         Scan(R)
//! ```
//!
//! A predicate is attached to the first chain (in decomposition order) whose schema
//! contains every attribute it references. Once attached it leaves the pending pool,
//! so it is never applied twice. The predicates nobody could absorb are equi-joins
//! between attributes of different relations; they are returned for join-order
//! search.
//!
//! Filtering and narrowing right above the scan shrinks every intermediate result
//! built on top of the chain, which is where almost all of the cost reduction of
//! the optimiser comes from.

use crate::catalog::NamedRelation;
use crate::cost::estimate;
use crate::error::{PlanError, Result};
use crate::expr::{Attribute, Predicate};
use crate::plan::Plan;
use std::sync::Arc;
use tracing::trace;

/// Per-relation chains plus the predicates that span relations.
#[derive(Debug, Clone)]
pub struct Pushdown {
    pub chains: Vec<Plan>,
    pub leftover: Vec<Predicate>,
}

/// Build one estimated chain per scan.
pub fn push_down(
    scans: &[Arc<NamedRelation>],
    predicates: Vec<Predicate>,
    required: &[Attribute],
) -> Result<Pushdown> {
    let mut pending = predicates;
    let mut chains = Vec::with_capacity(scans.len());

    for relation in scans {
        let schema = &relation.stats.attributes;
        let (applicable, rest): (Vec<Predicate>, Vec<Predicate>) =
            pending.into_iter().partition(|p| p.is_covered_by(schema));
        pending = rest;

        let mut chain = Plan::scan(relation.clone());
        for predicate in applicable {
            trace!(relation = %relation.name, predicate = %predicate, "pushed predicate");
            chain = Plan::select(chain, predicate);
        }
        estimate(&mut chain)?;
        chains.push(narrow(chain, required)?);
    }

    Ok(Pushdown {
        chains,
        leftover: pending,
    })
}

/// Project the chain onto the schema attributes found in `needed`, provided that
/// keeps something and drops something. An existing root Project is rewritten rather
/// than stacked. Returns the chain estimated.
pub fn narrow(chain: Plan, needed: &[Attribute]) -> Result<Plan> {
    let schema = chain
        .root_output()
        .ok_or(PlanError::MissingOutput(chain.root()))?;
    let keep: Vec<Attribute> = schema
        .attributes
        .iter()
        .filter(|a| needed.contains(a))
        .map(|a| Attribute::new(a.name.clone()))
        .collect();

    if keep.is_empty() || keep.len() == schema.attributes.len() {
        return Ok(chain);
    }

    let mut projected = Plan::reproject(chain, keep);
    estimate(&mut projected)?;
    Ok(projected)
}
