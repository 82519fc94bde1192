//! # Catalog Interface
//!
//! The catalog supplies base relation statistics: a tuple count and an ordered list of
//! attributes with their distinct-value counts. Scan nodes hold a shared handle to the
//! catalog entry they read, so a plan can be estimated without consulting the catalog
//! again.
//!
//! The `Catalog` trait is the seam for other metadata backends; `InMemoryCatalog` is
//! populated programmatically (by tests, the sample workload and the HTTP service).

use crate::error::{PlanError, Result};
use crate::expr::Attribute;
use crate::stats::Relation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A base relation registered in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedRelation {
    pub name: String,
    pub stats: Relation,
}

/// Catalog provides base relation statistics by name.
pub trait Catalog: Send + Sync {
    fn get_relation(&self, name: &str) -> Result<Arc<NamedRelation>>;
}

/// In-memory catalog for tests, demos and per-request use in the server.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    relations: HashMap<String, Arc<NamedRelation>>,
    /// Relation names in registration order.
    order: Vec<String>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relation with an empty schema.
    pub fn create_relation(&mut self, name: &str, tuple_count: u64) -> Result<()> {
        if self.relations.contains_key(name) {
            return Err(PlanError::DuplicateRelation(name.to_string()));
        }
        let relation = NamedRelation {
            name: name.to_string(),
            stats: Relation::new(tuple_count),
        };
        self.relations.insert(name.to_string(), Arc::new(relation));
        self.order.push(name.to_string());
        Ok(())
    }

    /// Append an attribute to a registered relation's schema.
    pub fn create_attribute(&mut self, relation: &str, name: &str, value_count: u64) -> Result<()> {
        let entry = self
            .relations
            .get_mut(relation)
            .ok_or_else(|| PlanError::UnknownRelation(relation.to_string()))?;
        if entry.stats.attribute(name).is_some() {
            return Err(PlanError::DuplicateAttribute {
                relation: relation.to_string(),
                attribute: name.to_string(),
            });
        }
        Arc::make_mut(entry)
            .stats
            .attributes
            .push(Attribute::with_value_count(name, value_count));
        Ok(())
    }

    /// Registered relations in registration order.
    pub fn relations(&self) -> impl Iterator<Item = &Arc<NamedRelation>> {
        self.order.iter().filter_map(|name| self.relations.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Catalog for InMemoryCatalog {
    fn get_relation(&self, name: &str) -> Result<Arc<NamedRelation>> {
        self.relations
            .get(name)
            .cloned()
            .ok_or_else(|| PlanError::UnknownRelation(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get_relation() {
        let mut catalog = InMemoryCatalog::new();
        catalog.create_relation("Person", 400).unwrap();
        catalog.create_attribute("Person", "persid", 400).unwrap();
        catalog.create_attribute("Person", "age", 47).unwrap();

        let person = catalog.get_relation("Person").unwrap();
        assert_eq!(person.stats.tuple_count, 400);
        assert_eq!(person.stats.statistics(), vec![("persid", 400), ("age", 47)]);
    }

    #[test]
    fn test_handles_are_snapshots() {
        let mut catalog = InMemoryCatalog::new();
        catalog.create_relation("R", 10).unwrap();
        let before = catalog.get_relation("R").unwrap();
        catalog.create_attribute("R", "a", 5).unwrap();

        assert!(before.stats.attributes.is_empty());
        assert_eq!(catalog.get_relation("R").unwrap().stats.attributes.len(), 1);
    }

    #[test]
    fn test_unknown_and_duplicate_names() {
        let mut catalog = InMemoryCatalog::new();
        assert_eq!(
            catalog.get_relation("Nope").unwrap_err(),
            PlanError::UnknownRelation("Nope".into())
        );
        assert!(catalog.create_attribute("Nope", "a", 1).is_err());

        catalog.create_relation("R", 10).unwrap();
        assert_eq!(
            catalog.create_relation("R", 20).unwrap_err(),
            PlanError::DuplicateRelation("R".into())
        );
        catalog.create_attribute("R", "a", 5).unwrap();
        assert!(matches!(
            catalog.create_attribute("R", "a", 6),
            Err(PlanError::DuplicateAttribute { .. })
        ));
    }

    #[test]
    fn test_relations_in_registration_order() {
        let mut catalog = InMemoryCatalog::new();
        for name in ["Zeta", "Alpha", "Mid"] {
            catalog.create_relation(name, 1).unwrap();
        }
        let names: Vec<_> = catalog.relations().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(catalog.len(), 3);
    }
}
