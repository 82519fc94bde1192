//! # Plan Trees
//!
//! A `Plan` is a rooted tree of relational operators stored in an arena. Nodes are
//! addressed by `NodeId` (their index in the arena) and children are referenced by
//! id rather than owned pointers. Because plans are never shared between parents,
//! combining two plans is a matter of appending one arena to the other and shifting
//! the appended ids by an offset.
//!
//! ## Output Descriptor Side Table
//!
//! Each arena slot pairs an operator with an optional cached output descriptor
//! (`Relation`). The estimator overwrites every slot on each run; the inspector and
//! the optimiser read them afterwards.
//!
//! Keeping the descriptors in a side table (rather than recomputing them on demand)
//! lets readers inspect any node in constant time after one estimation pass. The
//! price is explicit invalidation: a descriptor is only valid while the structure
//! beneath its node is unchanged.
//!
//! ## Construction
//!
//! The constructors (`scan`, `select`, `project`, `product`, `join`) take their
//! inputs by value and place a new parent above them. They never alter the subtrees
//! they receive, so descriptors already attached below remain valid; only the new
//! parent starts without one. Children always receive smaller ids than their parent.

use crate::catalog::NamedRelation;
use crate::expr::{Attribute, Predicate};
use crate::stats::Relation;
use std::fmt;
use std::sync::Arc;

/// Index of a node within its plan's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Relational operators. Children are arena ids within the owning plan.
#[derive(Debug, Clone)]
pub enum Operator {
    /// Leaf: reads a base relation registered in the catalog.
    Scan { relation: Arc<NamedRelation> },
    /// Keeps the input tuples satisfying an equality predicate.
    Select { input: NodeId, predicate: Predicate },
    /// Narrows the input schema to the listed attributes (no duplicate elimination).
    Project { input: NodeId, attributes: Vec<Attribute> },
    /// Cartesian product of two inputs.
    Product { left: NodeId, right: NodeId },
    /// Equi-join of two inputs on an `attr = attr` predicate.
    Join {
        left: NodeId,
        right: NodeId,
        predicate: Predicate,
    },
}

/// Operator discriminant without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Scan,
    Select,
    Project,
    Product,
    Join,
}

impl Operator {
    pub fn kind(&self) -> OpKind {
        match self {
            Operator::Scan { .. } => OpKind::Scan,
            Operator::Select { .. } => OpKind::Select,
            Operator::Project { .. } => OpKind::Project,
            Operator::Product { .. } => OpKind::Product,
            Operator::Join { .. } => OpKind::Join,
        }
    }

    /// Child ids, left before right.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Operator::Scan { .. } => vec![],
            Operator::Select { input, .. } | Operator::Project { input, .. } => vec![*input],
            Operator::Product { left, right } | Operator::Join { left, right, .. } => {
                vec![*left, *right]
            }
        }
    }

    /// The predicate carried by a Select or Join.
    pub fn predicate(&self) -> Option<&Predicate> {
        match self {
            Operator::Select { predicate, .. } | Operator::Join { predicate, .. } => Some(predicate),
            _ => None,
        }
    }

    fn shifted(self, offset: usize) -> Operator {
        let shift = |id: NodeId| NodeId(id.0 + offset);
        match self {
            Operator::Scan { relation } => Operator::Scan { relation },
            Operator::Select { input, predicate } => Operator::Select {
                input: shift(input),
                predicate,
            },
            Operator::Project { input, attributes } => Operator::Project {
                input: shift(input),
                attributes,
            },
            Operator::Product { left, right } => Operator::Product {
                left: shift(left),
                right: shift(right),
            },
            Operator::Join {
                left,
                right,
                predicate,
            } => Operator::Join {
                left: shift(left),
                right: shift(right),
                predicate,
            },
        }
    }
}

/// An operator tree with a per-node output descriptor slot.
#[derive(Debug, Clone)]
pub struct Plan {
    nodes: Vec<Operator>,
    outputs: Vec<Option<Relation>>,
    root: NodeId,
}

impl Plan {
    pub fn scan(relation: Arc<NamedRelation>) -> Plan {
        Plan {
            nodes: vec![Operator::Scan { relation }],
            outputs: vec![None],
            root: NodeId(0),
        }
    }

    pub fn select(input: Plan, predicate: Predicate) -> Plan {
        let mut plan = input;
        let input = plan.root;
        plan.push(Operator::Select { input, predicate });
        plan
    }

    pub fn project(input: Plan, attributes: Vec<Attribute>) -> Plan {
        let mut plan = input;
        let input = plan.root;
        plan.push(Operator::Project { input, attributes });
        plan
    }

    pub fn product(left: Plan, right: Plan) -> Plan {
        let mut plan = left;
        let left = plan.root;
        let right = plan.append(right);
        plan.push(Operator::Product { left, right });
        plan
    }

    pub fn join(left: Plan, right: Plan, predicate: Predicate) -> Plan {
        let mut plan = left;
        let left = plan.root;
        let right = plan.append(right);
        plan.push(Operator::Join {
            left,
            right,
            predicate,
        });
        plan
    }

    fn push(&mut self, op: Operator) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(op);
        self.outputs.push(None);
        self.root = id;
        id
    }

    /// Move `other`'s arena onto the end of this one; returns `other`'s shifted root.
    /// Descriptors travel with their nodes.
    fn append(&mut self, other: Plan) -> NodeId {
        let offset = self.nodes.len();
        self.nodes
            .extend(other.nodes.into_iter().map(|op| op.shifted(offset)));
        self.outputs.extend(other.outputs);
        NodeId(other.root.0 + offset)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn op(&self, id: NodeId) -> &Operator {
        &self.nodes[id.0]
    }

    pub fn root_op(&self) -> &Operator {
        self.op(self.root)
    }

    /// Cached output descriptor of a node, if it has been estimated.
    pub fn output(&self, id: NodeId) -> Option<&Relation> {
        self.outputs[id.0].as_ref()
    }

    pub fn root_output(&self) -> Option<&Relation> {
        self.output(self.root)
    }

    pub(crate) fn set_output(&mut self, id: NodeId, output: Relation) {
        self.outputs[id.0] = Some(output);
    }

    /// Build `Project[attributes]` over `input`, or rewrite the list in place when the
    /// root is already a Project. The output list must be a subset of the current one.
    pub fn reproject(input: Plan, attributes: Vec<Attribute>) -> Plan {
        let mut plan = input;
        let root = plan.root.0;
        match &mut plan.nodes[root] {
            Operator::Project {
                attributes: current,
                ..
            } => {
                *current = attributes;
                plan.outputs[root] = None;
                plan
            }
            _ => Plan::project(plan, attributes),
        }
    }

    /// Drop every cached descriptor.
    pub fn invalidate(&mut self) {
        self.outputs.iter_mut().for_each(|o| *o = None);
    }

    /// All nodes with their ids, in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Operator)> {
        self.nodes.iter().enumerate().map(|(i, op)| (NodeId(i), op))
    }

    /// Depth-first post-order from the root: every child precedes its parent and a
    /// left subtree precedes the right one.
    pub fn post_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for child in self.op(id).children().into_iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    /// Base relations read by this plan, in post-order.
    pub fn scans(&self) -> Vec<&Arc<NamedRelation>> {
        self.post_order()
            .into_iter()
            .filter_map(|id| match self.op(id) {
                Operator::Scan { relation } => Some(relation),
                _ => None,
            })
            .collect()
    }
}
