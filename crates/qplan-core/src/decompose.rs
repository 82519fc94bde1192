//! # Plan Decomposition
//!
//! The first phase of optimisation flattens a plan into the pieces the rewrite
//! rebuilds from:
//!
//! - the distinct base relations it scans (by relation name, first occurrence wins);
//! - every predicate it applies, whether as a Select or as a Join condition
//!   (a Join is a Select over a Product, so both feed the same pool);
//! - the **required** attributes: everything a predicate references plus the root
//!   projection's list when the root is a Project;
//! - the **output** attributes the rewritten plan must expose.
//!
//! All collections keep post-order encounter order so that the rest of the
//! optimiser is deterministic.

use crate::catalog::NamedRelation;
use crate::error::{PlanError, Result};
use crate::expr::{Attribute, Predicate};
use crate::plan::{Operator, Plan};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Decomposition {
    pub scans: Vec<Arc<NamedRelation>>,
    pub predicates: Vec<Predicate>,
    pub required: Vec<Attribute>,
    /// The root Project's attribute list, if the root is a Project.
    pub root_projection: Option<Vec<Attribute>>,
}

impl Decomposition {
    /// Attributes the final plan exposes: the root projection when there is one,
    /// otherwise every predicate reference.
    pub fn output(&self) -> &[Attribute] {
        self.root_projection.as_deref().unwrap_or(&self.required)
    }
}

pub fn decompose(plan: &Plan) -> Result<Decomposition> {
    let mut scans: Vec<Arc<NamedRelation>> = Vec::new();
    let mut predicates: Vec<Predicate> = Vec::new();

    for id in plan.post_order() {
        match plan.op(id) {
            Operator::Scan { relation } => {
                if !scans.iter().any(|s| s.name == relation.name) {
                    scans.push(relation.clone());
                }
            }
            Operator::Select { predicate, .. } | Operator::Join { predicate, .. } => {
                if !predicates.contains(predicate) {
                    predicates.push(predicate.clone());
                }
            }
            Operator::Project { .. } | Operator::Product { .. } => {}
        }
    }

    if scans.is_empty() {
        return Err(PlanError::NoScans);
    }

    let root_projection = match plan.root_op() {
        Operator::Project { attributes, .. } => Some(dedup(attributes.iter())),
        _ => None,
    };

    let referenced = predicates.iter().flat_map(|p| p.attributes());
    let required = dedup(referenced.chain(root_projection.iter().flatten()));

    Ok(Decomposition {
        scans,
        predicates,
        required,
        root_projection,
    })
}

/// Bare (name-only) copies of `attributes`, first occurrence kept.
fn dedup<'a>(attributes: impl Iterator<Item = &'a Attribute>) -> Vec<Attribute> {
    let mut out: Vec<Attribute> = Vec::new();
    for a in attributes {
        if !out.contains(a) {
            out.push(Attribute::new(a.name.clone()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::sample;

    fn names(attrs: &[Attribute]) -> Vec<&str> {
        attrs.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn test_decompose_sample_query() {
        let catalog = sample::catalog().unwrap();
        let plan = sample::query(&catalog).unwrap();
        let d = decompose(&plan).unwrap();

        let scans: Vec<_> = d.scans.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(scans, vec!["Person", "Department", "Project"]);

        let preds: Vec<_> = d.predicates.iter().map(|p| p.to_string()).collect();
        assert_eq!(preds, vec!["persid=manager", "dept=deptid", "persname=\"Smith\""]);

        assert_eq!(
            names(&d.required),
            vec!["persid", "manager", "dept", "deptid", "persname", "projname", "deptname"]
        );
        assert_eq!(names(d.output()), vec!["projname", "deptname"]);
    }

    #[test]
    fn test_duplicate_scans_and_predicates_collapse() {
        let catalog = sample::catalog().unwrap();
        let person = || Plan::scan(catalog.get_relation("Person").unwrap());
        let filter = Predicate::equals_value("age", "30");
        let plan = Plan::select(
            Plan::product(Plan::select(person(), filter.clone()), person()),
            filter,
        );
        let d = decompose(&plan).unwrap();
        assert_eq!(d.scans.len(), 1);
        assert_eq!(d.predicates.len(), 1);
        assert!(d.root_projection.is_none());
        assert_eq!(names(d.output()), vec!["age"]);
    }

    #[test]
    fn test_join_predicates_are_collected() {
        let catalog = sample::catalog().unwrap();
        let plan = Plan::join(
            Plan::scan(catalog.get_relation("Project").unwrap()),
            Plan::scan(catalog.get_relation("Department").unwrap()),
            Predicate::attributes_equal("dept", "deptid"),
        );
        let d = decompose(&plan).unwrap();
        assert_eq!(d.predicates, vec![Predicate::attributes_equal("dept", "deptid")]);
        assert_eq!(names(&d.required), vec!["dept", "deptid"]);
    }
}
