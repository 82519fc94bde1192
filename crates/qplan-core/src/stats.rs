//! # Output Descriptors and Derivation Formulas
//!
//! Every operator in a plan produces an output descriptor (`Relation`): an estimated
//! tuple count and an ordered schema whose attributes carry value counts. Descriptors
//! are derived bottom-up from the inputs' descriptors using the formulas below.
//!
//! ## Derivation Formulas
//!
//! All arithmetic is on unsigned integers with floor division.
//!
//! - **Scan**: the base relation's descriptor, verbatim.
//! - **Project**: tuple count unchanged (bag semantics, no duplicate elimination);
//!   schema narrowed to the requested attributes in requested order.
//! - **Select `a = value`**: `T / V(a)` tuples; `V(a)` becomes `min(1, T_out)`.
//! - **Select `a = b`**: `T / max(V(a), V(b))` tuples; both `V(a)` and `V(b)` become
//!   `min(V(a), V(b), T_out)`.
//! - **Product**: `T_l * T_r` tuples; schemas concatenated, statistics unchanged.
//! - **Join `a = b`**: `T_l * T_r / max(V(a), V(b))` tuples; schemas concatenated
//!   with `V(a)` and `V(b)` replaced by `min(V(a), V(b), T_out)`.
//!
//! The model assumes a uniform distribution within each attribute and independence
//! between attributes. The join formula is the usual containment assumption: the
//! smaller value domain is contained in the larger one.
//!
//! ## Empty Relations
//!
//! A tuple count or value count of zero is a legal estimate describing an empty
//! result. Dividing a zero tuple count by a zero value count yields zero. Dividing a
//! non-empty input by a zero value count is rejected as invalid input.

use crate::error::{PlanError, Result};
use crate::expr::{Attribute, Predicate};
use serde::{Deserialize, Serialize};

/// Output descriptor of an operator: estimated tuple count plus schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub tuple_count: u64,
    pub attributes: Vec<Attribute>,
}

impl Relation {
    pub fn new(tuple_count: u64) -> Self {
        Self {
            tuple_count,
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value_count: u64) -> Self {
        self.attributes.push(Attribute::with_value_count(name, value_count));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, attribute: &Attribute) -> bool {
        self.attributes.contains(attribute)
    }

    pub fn value_count(&self, name: &str) -> Result<u64> {
        value_count(&self.attributes, name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }

    /// `(name, value_count)` pairs in schema order. Unlike `Attribute` equality, this
    /// exposes the statistics, so it is what callers compare when checking that two
    /// descriptors agree.
    pub fn statistics(&self) -> Vec<(&str, u64)> {
        self.attributes
            .iter()
            .map(|a| (a.name.as_str(), a.value_count))
            .collect()
    }
}

fn value_count(attributes: &[Attribute], name: &str) -> Result<u64> {
    attributes
        .iter()
        .find(|a| a.name == name)
        .map(|a| a.value_count)
        .ok_or_else(|| PlanError::UnknownAttribute(name.to_string()))
}

/// Floor division by a value count.
fn divide(numerator: u64, divisor: u64, attribute: &str) -> Result<u64> {
    match (numerator, divisor) {
        (0, 0) => Ok(0),
        (_, 0) => Err(PlanError::ZeroValueCount(attribute.to_string())),
        (n, d) => Ok(n / d),
    }
}

/// Copy `attributes`, giving every attribute named in `names` the new value count.
fn replace_value_counts(attributes: &[Attribute], names: &[&str], value_count: u64) -> Vec<Attribute> {
    attributes
        .iter()
        .map(|a| {
            if names.contains(&a.name.as_str()) {
                Attribute::with_value_count(a.name.clone(), value_count)
            } else {
                a.clone()
            }
        })
        .collect()
}

pub fn derive_scan(base: &Relation) -> Relation {
    base.clone()
}

pub fn derive_project(input: &Relation, requested: &[Attribute]) -> Result<Relation> {
    let mut attributes: Vec<Attribute> = Vec::with_capacity(requested.len());
    for wanted in requested {
        let found = input
            .attribute(&wanted.name)
            .ok_or_else(|| PlanError::UnknownAttribute(wanted.name.clone()))?;
        if !attributes.contains(found) {
            attributes.push(found.clone());
        }
    }
    Ok(Relation {
        tuple_count: input.tuple_count,
        attributes,
    })
}

pub fn derive_select(input: &Relation, predicate: &Predicate) -> Result<Relation> {
    let left_name = predicate.left.name.as_str();
    let left = input.value_count(left_name)?;

    match predicate.right_attribute() {
        None => {
            let tuple_count = divide(input.tuple_count, left, left_name)?;
            Ok(Relation {
                tuple_count,
                attributes: replace_value_counts(&input.attributes, &[left_name], tuple_count.min(1)),
            })
        }
        Some(right_attr) => {
            let right_name = right_attr.name.as_str();
            let right = input.value_count(right_name)?;
            let divisor_name = if left >= right { left_name } else { right_name };
            let tuple_count = divide(input.tuple_count, left.max(right), divisor_name)?;
            let distinct = left.min(right).min(tuple_count);
            Ok(Relation {
                tuple_count,
                attributes: replace_value_counts(&input.attributes, &[left_name, right_name], distinct),
            })
        }
    }
}

pub fn derive_product(left: &Relation, right: &Relation) -> Result<Relation> {
    let tuple_count = left
        .tuple_count
        .checked_mul(right.tuple_count)
        .ok_or(PlanError::Overflow)?;
    let mut attributes = left.attributes.clone();
    attributes.extend(right.attributes.iter().cloned());
    Ok(Relation {
        tuple_count,
        attributes,
    })
}

pub fn derive_join(left: &Relation, right: &Relation, predicate: &Predicate) -> Result<Relation> {
    let right_attr = predicate
        .right_attribute()
        .ok_or_else(|| PlanError::InvalidJoinPredicate(predicate.to_string()))?;
    let left_name = predicate.left.name.as_str();
    let right_name = right_attr.name.as_str();

    let mut attributes = left.attributes.clone();
    attributes.extend(right.attributes.iter().cloned());
    let lv = value_count(&attributes, left_name)?;
    let rv = value_count(&attributes, right_name)?;
    let divisor_name = if lv >= rv { left_name } else { right_name };

    // The cross product may exceed u64 even when the join result does not.
    let cross = u128::from(left.tuple_count) * u128::from(right.tuple_count);
    let tuple_count = match (cross, lv.max(rv)) {
        (0, _) => 0,
        (_, 0) => return Err(PlanError::ZeroValueCount(divisor_name.to_string())),
        (n, d) => u64::try_from(n / u128::from(d)).map_err(|_| PlanError::Overflow)?,
    };
    let distinct = lv.min(rv).min(tuple_count);
    Ok(Relation {
        tuple_count,
        attributes: replace_value_counts(&attributes, &[left_name, right_name], distinct),
    })
}
