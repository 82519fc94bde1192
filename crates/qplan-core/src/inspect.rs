//! Text rendering of plans.
//!
//! `display` produces an indented tree, one node per line, with the cached output
//! descriptor of every node that has one:
//!
//! ```text
//! PROJECT[projname,deptname]  [0] projname:0,deptname:0
//!   JOIN[dept=deptid]  [0] projname:0,dept:0,deptid:0,deptname:0
//!     ...
//! ```
//!
//! The `Display` impl on `Plan` is the compact algebraic form used in logs.

use crate::expr::Attribute;
use crate::plan::{NodeId, Operator, Plan};
use std::fmt;

/// Indented multi-line rendering of `plan`, including cached descriptors.
pub fn display(plan: &Plan) -> String {
    let mut out = String::new();
    let mut stack = vec![(plan.root(), 0usize)];
    while let Some((id, depth)) = stack.pop() {
        out.push_str(&format!("{:indent$}{}", "", Label(plan.op(id)), indent = depth * 2));
        if let Some(desc) = plan.output(id) {
            let schema: Vec<String> = desc
                .attributes
                .iter()
                .map(|a| format!("{}:{}", a.name, a.value_count))
                .collect();
            out.push_str(&format!("  [{}] {}", desc.tuple_count, schema.join(",")));
        }
        out.push('\n');
        for child in plan.op(id).children().into_iter().rev() {
            stack.push((child, depth + 1));
        }
    }
    out
}

/// Operator name and parameters without children.
struct Label<'a>(&'a Operator);

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Operator::Scan { relation } => write!(f, "SCAN({})", relation.name),
            Operator::Select { predicate, .. } => write!(f, "SELECT[{predicate}]"),
            Operator::Project { attributes, .. } => write!(f, "PROJECT[{}]", join(attributes)),
            Operator::Product { .. } => write!(f, "PRODUCT"),
            Operator::Join { predicate, .. } => write!(f, "JOIN[{predicate}]"),
        }
    }
}

fn join(attributes: &[Attribute]) -> String {
    attributes
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn write_node(plan: &Plan, id: NodeId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let op = plan.op(id);
    match op {
        Operator::Scan { .. } => write!(f, "{}", Label(op)),
        _ => {
            write!(f, "{}(", Label(op))?;
            for (i, child) in op.children().into_iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_node(plan, child, f)?;
            }
            f.write_str(")")
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(self, self.root(), f)
    }
}
