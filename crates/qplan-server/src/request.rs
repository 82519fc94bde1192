//! # JSON Wire Types
//!
//! A request carries the catalogue it is evaluated against and a plan tree:
//!
//! ```json
//! {
//!   "catalogue": [
//!     {"name": "Person", "tupleCount": 400,
//!      "attributes": [{"name": "persid", "valueCount": 400}]}
//!   ],
//!   "plan": {"select": {
//!     "input": {"scan": "Person"},
//!     "predicate": {"left": "persid", "value": "7"}
//!   }}
//! }
//! ```
//!
//! Plan nodes are externally tagged (`scan`, `select`, `project`, `product`, `join`).
//! A predicate names exactly one of `right` (attribute comparison) or `value`.

use qplan_core::{Attribute, Catalog, InMemoryCatalog, Plan, PlanError, Predicate};
use serde::{Deserialize, Serialize};

/// Request body for `POST /estimate` and `POST /optimise`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub catalogue: Vec<RelationInfo>,
    pub plan: PlanSpec,
}

/// A base relation with its statistics.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationInfo {
    pub name: String,
    pub tuple_count: u64,
    #[serde(default)]
    pub attributes: Vec<AttributeInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeInfo {
    pub name: String,
    pub value_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlanSpec {
    Scan(String),
    Select {
        input: Box<PlanSpec>,
        predicate: PredicateSpec,
    },
    Project {
        input: Box<PlanSpec>,
        attributes: Vec<String>,
    },
    Product {
        left: Box<PlanSpec>,
        right: Box<PlanSpec>,
    },
    Join {
        left: Box<PlanSpec>,
        right: Box<PlanSpec>,
        predicate: PredicateSpec,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredicateSpec {
    pub left: String,
    #[serde(default)]
    pub right: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// Why a request could not be turned into a plan.
#[derive(Debug)]
pub enum RequestError {
    Plan(PlanError),
    Predicate(String),
}

impl From<PlanError> for RequestError {
    fn from(err: PlanError) -> Self {
        RequestError::Plan(err)
    }
}

/// Response body for `POST /estimate`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    pub cost: u64,
    /// One-line algebraic form.
    pub summary: String,
    /// Indented tree with per-node descriptors.
    pub plan: String,
}

/// Response body for `POST /optimise`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimiseResponse {
    pub original_cost: u64,
    pub cost: u64,
    pub candidates: usize,
    /// No candidate beat the input, which is returned unchanged.
    pub kept_input: bool,
    pub summary: String,
    pub plan: String,
}

/// Response body for `GET /sample`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleResponse {
    pub original: EstimateResponse,
    pub optimised: OptimiseResponse,
}

/// Register every relation and attribute of the request in a fresh catalogue.
pub fn build_catalog(relations: &[RelationInfo]) -> Result<InMemoryCatalog, PlanError> {
    let mut catalog = InMemoryCatalog::new();
    for relation in relations {
        catalog.create_relation(&relation.name, relation.tuple_count)?;
        for attribute in &relation.attributes {
            catalog.create_attribute(&relation.name, &attribute.name, attribute.value_count)?;
        }
    }
    Ok(catalog)
}

pub fn build_plan(spec: &PlanSpec, catalog: &impl Catalog) -> Result<Plan, RequestError> {
    let plan = match spec {
        PlanSpec::Scan(name) => Plan::scan(catalog.get_relation(name)?),
        PlanSpec::Select { input, predicate } => {
            Plan::select(build_plan(input, catalog)?, build_predicate(predicate)?)
        }
        PlanSpec::Project { input, attributes } => Plan::project(
            build_plan(input, catalog)?,
            attributes.iter().map(|a| Attribute::new(a.as_str())).collect(),
        ),
        PlanSpec::Product { left, right } => {
            Plan::product(build_plan(left, catalog)?, build_plan(right, catalog)?)
        }
        PlanSpec::Join {
            left,
            right,
            predicate,
        } => {
            let predicate = build_predicate(predicate)?;
            if predicate.is_value() {
                return Err(RequestError::Predicate(format!(
                    "join predicate on `{}` must name a right attribute",
                    predicate.left
                )));
            }
            Plan::join(build_plan(left, catalog)?, build_plan(right, catalog)?, predicate)
        }
    };
    Ok(plan)
}

fn build_predicate(spec: &PredicateSpec) -> Result<Predicate, RequestError> {
    match (&spec.right, &spec.value) {
        (Some(right), None) => Ok(Predicate::attributes_equal(spec.left.as_str(), right.as_str())),
        (None, Some(value)) => Ok(Predicate::equals_value(spec.left.as_str(), value.as_str())),
        _ => Err(RequestError::Predicate(format!(
            "predicate on `{}` needs exactly one of `right` or `value`",
            spec.left
        ))),
    }
}
