//! # qplan-core: Cardinality Estimation and Plan Rewriting
//!
//! This crate implements the cost-based planning core of a small relational query
//! processor. Given a tree of relational operators and per-relation statistics, it
//! estimates the size of every intermediate result and searches for a cheaper,
//! logically equivalent plan.
//!
//! ## Module Overview
//!
//! - **`expr`**: Attributes and equality predicates, the leaf vocabulary of a plan.
//! - **`plan`**: The operator sum type and the arena-backed `Plan` tree with its
//!   per-node side table of cached output descriptors.
//! - **`catalog`**: Catalog trait and an in-memory implementation holding base
//!   relation statistics.
//! - **`stats`**: Output descriptors and the per-operator derivation formulas
//!   (uniform distribution, attribute independence).
//! - **`cost`**: The estimator, a post-order walk that attaches descriptors and sums
//!   intermediate result sizes into a total cost.
//! - **`decompose`**: Splits a plan into base scans, predicates and required attributes.
//! - **`pushdown`**: Builds one filtered and narrowed chain per base relation.
//! - **`search`**: Exhaustive join-order search over the leftover join predicates.
//! - **`inspect`**: Text rendering of plans and their descriptors.
//! - **`sample`**: A three-relation workload used by tests and the demo endpoint.
//! - **`error`**: The `PlanError` taxonomy.

pub mod catalog;
pub mod cost;
pub mod decompose;
pub mod error;
pub mod expr;
pub mod inspect;
pub mod plan;
pub mod pushdown;
pub mod sample;
pub mod search;
pub mod stats;

pub use catalog::{Catalog, InMemoryCatalog, NamedRelation};
pub use cost::{estimate, Estimator};
pub use error::{ErrorKind, PlanError, Result};
pub use expr::{Attribute, Operand, Predicate};
pub use plan::{NodeId, OpKind, Operator, Plan};
pub use search::{Optimiser, OptimiserConfig, SearchStats};
pub use stats::Relation;
