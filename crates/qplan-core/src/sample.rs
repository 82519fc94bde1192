//! A three-relation workload (people, departments, projects) used by tests and the
//! server's `/sample` endpoint.

use crate::catalog::{Catalog, InMemoryCatalog};
use crate::error::Result;
use crate::expr::{Attribute, Predicate};
use crate::plan::Plan;

/// `Person(400)`, `Project(40)` and `Department(5)` with their attribute statistics.
pub fn catalog() -> Result<InMemoryCatalog> {
    let mut catalog = InMemoryCatalog::new();

    catalog.create_relation("Person", 400)?;
    catalog.create_attribute("Person", "persid", 400)?;
    catalog.create_attribute("Person", "persname", 350)?;
    catalog.create_attribute("Person", "age", 47)?;

    catalog.create_relation("Project", 40)?;
    catalog.create_attribute("Project", "projid", 40)?;
    catalog.create_attribute("Project", "projname", 35)?;
    catalog.create_attribute("Project", "dept", 5)?;

    catalog.create_relation("Department", 5)?;
    catalog.create_attribute("Department", "deptid", 5)?;
    catalog.create_attribute("Department", "deptname", 5)?;
    catalog.create_attribute("Department", "manager", 5)?;

    Ok(catalog)
}

/// Names of the projects run by departments managed by Smith, written as products
/// with the filters on top:
///
/// ```text
/// PROJECT[projname,deptname]
///   SELECT[persname="Smith"]
///     SELECT[dept=deptid]
///       PRODUCT
///         SELECT[persid=manager]
///           PRODUCT(SCAN(Person), SCAN(Department))
///         SCAN(Project)
/// ```
pub fn query(catalog: &impl Catalog) -> Result<Plan> {
    let person = Plan::scan(catalog.get_relation("Person")?);
    let department = Plan::scan(catalog.get_relation("Department")?);
    let project = Plan::scan(catalog.get_relation("Project")?);

    let managers = Plan::select(
        Plan::product(person, department),
        Predicate::attributes_equal("persid", "manager"),
    );
    let plan = Plan::select(
        Plan::product(managers, project),
        Predicate::attributes_equal("dept", "deptid"),
    );
    let plan = Plan::select(plan, Predicate::equals_value("persname", "Smith"));

    Ok(Plan::project(
        plan,
        vec![Attribute::new("projname"), Attribute::new("deptname")],
    ))
}
