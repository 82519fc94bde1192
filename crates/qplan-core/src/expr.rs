//! # Attributes and Predicates
//!
//! Attributes are the columns of a relation. Each one carries a value count (the
//! estimated number of distinct values) that is only meaningful inside the output
//! descriptor that holds it: the same attribute name has a different value count
//! after a selective filter than it does in the base relation.
//!
//! Because of this, attribute identity is its **name**. Equality and hashing ignore
//! the value count, and any lookup of an attribute in a schema adopts the schema's
//! statistic rather than the one carried by the reference.
//!
//! Predicates are restricted to equality: `attr = attr` (an equi-join or a
//! same-relation comparison) or `attr = 'value'` (a point filter).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A named column together with its distinct-value estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub name: String,
    /// Estimated number of distinct values. Zero for bare references that have not
    /// been resolved against a schema.
    #[serde(default)]
    pub value_count: u64,
}

impl Attribute {
    /// A bare reference by name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_count: 0,
        }
    }

    pub fn with_value_count(name: impl Into<String>, value_count: u64) -> Self {
        Self {
            name: name.into(),
            value_count,
        }
    }
}

impl From<&str> for Attribute {
    fn from(name: &str) -> Self {
        Attribute::new(name)
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Attribute {}

impl Hash for Attribute {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Right-hand side of an equality predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operand {
    Attribute(Attribute),
    Value(String),
}

/// An equality predicate `left = right`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Predicate {
    pub left: Attribute,
    pub right: Operand,
}

impl Predicate {
    /// `left = right` between two attributes.
    pub fn attributes_equal(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: Attribute::new(left),
            right: Operand::Attribute(Attribute::new(right)),
        }
    }

    /// `left = 'value'`.
    pub fn equals_value(left: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            left: Attribute::new(left),
            right: Operand::Value(value.into()),
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self.right, Operand::Value(_))
    }

    pub fn right_attribute(&self) -> Option<&Attribute> {
        match &self.right {
            Operand::Attribute(a) => Some(a),
            Operand::Value(_) => None,
        }
    }

    /// Every attribute the predicate references, left first.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        std::iter::once(&self.left).chain(self.right_attribute())
    }

    /// True when every referenced attribute appears in `schema`.
    pub fn is_covered_by(&self, schema: &[Attribute]) -> bool {
        self.attributes().all(|a| schema.contains(a))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.right {
            Operand::Attribute(r) => write!(f, "{}={}", self.left, r),
            Operand::Value(v) => write!(f, "{}=\"{}\"", self.left, v),
        }
    }
}
