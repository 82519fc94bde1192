//! Join ordering over chain, star and cyclic join graphs.
//!
//! Each test builds the "naive" plan a parser would produce: a left-deep product of
//! every relation in query-text order with all predicates stacked on top. The
//! optimiser must return a plan that is no more expensive, exposes the same output
//! attributes, and contains no product when the join graph is connected.
//!
//! - Chain: orders - customer - nation - region (3 joins, 6 candidates)
//! - Star: sales fact with item, store and date dimensions (3 joins, 6 candidates)
//! - Triangle: a cycle of three relations, where the last predicate closes the cycle
//!   as a select on an already joined chain
//! - Snowflake: 5 joins, 120 candidates
//! - Already-optimal inputs, where pushed-down projections would only add cost and the
//!   input plan is returned as is

use qplan_core::{
    estimate, sample, Attribute, Catalog, InMemoryCatalog, OpKind, Optimiser, OptimiserConfig, Plan,
    PlanError, Predicate,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Add a relation with the given tuple count and attribute value counts.
fn add_relation(catalog: &mut InMemoryCatalog, name: &str, tuples: u64, attrs: &[(&str, u64)]) {
    catalog.create_relation(name, tuples).unwrap();
    for (attr, value_count) in attrs {
        catalog.create_attribute(name, attr, *value_count).unwrap();
    }
}

/// Left-deep product of `relations` with `predicates` applied on top, in order.
fn naive_plan(
    catalog: &InMemoryCatalog,
    relations: &[&str],
    predicates: Vec<Predicate>,
    output: &[&str],
) -> Plan {
    let mut scans = relations
        .iter()
        .map(|name| Plan::scan(catalog.get_relation(name).unwrap()));
    let first = scans.next().unwrap();
    let mut plan = scans.fold(first, Plan::product);
    for predicate in predicates {
        plan = Plan::select(plan, predicate);
    }
    if output.is_empty() {
        plan
    } else {
        Plan::project(plan, output.iter().map(|a| Attribute::new(*a)).collect())
    }
}

fn sorted_names(plan: &Plan) -> Vec<String> {
    let mut names: Vec<String> = plan
        .root_output()
        .unwrap()
        .names()
        .into_iter()
        .map(String::from)
        .collect();
    names.sort();
    names
}

fn count_kind(plan: &Plan, kind: OpKind) -> usize {
    plan.nodes().filter(|(_, op)| op.kind() == kind).count()
}

/// Optimise sequentially and in parallel, check both agree, and return the result.
fn optimise_both(plan: &Plan) -> (Plan, qplan_core::SearchStats) {
    let sequential = Optimiser::default().optimise_with_stats(plan).unwrap();
    let parallel = Optimiser::new(OptimiserConfig {
        parallel: true,
        ..OptimiserConfig::default()
    })
    .optimise_with_stats(plan)
    .unwrap();
    assert_eq!(sequential.1, parallel.1);
    assert_eq!(sequential.0.to_string(), parallel.0.to_string());
    sequential
}

fn chain_catalog() -> InMemoryCatalog {
    let mut c = InMemoryCatalog::new();
    add_relation(&mut c, "orders", 1500, &[("o_id", 1500), ("o_cust", 100), ("o_total", 900)]);
    add_relation(&mut c, "customer", 100, &[("c_id", 100), ("c_name", 100), ("c_nation", 25)]);
    add_relation(&mut c, "nation", 25, &[("n_id", 25), ("n_name", 25), ("n_region", 5)]);
    add_relation(&mut c, "region", 5, &[("r_id", 5), ("r_name", 5)]);
    c
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

#[test]
fn test_chain_join_ordering() {
    let catalog = chain_catalog();
    let mut naive = naive_plan(
        &catalog,
        &["orders", "customer", "nation", "region"],
        vec![
            Predicate::attributes_equal("o_cust", "c_id"),
            Predicate::attributes_equal("c_nation", "n_id"),
            Predicate::attributes_equal("n_region", "r_id"),
            Predicate::equals_value("r_name", "ASIA"),
        ],
        &["c_name", "o_total"],
    );
    let naive_cost = estimate(&mut naive).unwrap();

    let (best, stats) = optimise_both(&naive);
    assert_eq!(stats.baseline_cost, naive_cost);
    assert_eq!(stats.candidates, 6);
    assert!(stats.best_cost <= naive_cost, "{} > {}", stats.best_cost, naive_cost);

    assert_eq!(sorted_names(&best), vec!["c_name", "o_total"]);
    assert_eq!(count_kind(&best, OpKind::Join), 3);
    assert_eq!(count_kind(&best, OpKind::Product), 0);
    assert_eq!(count_kind(&best, OpKind::Scan), 4);
}

#[test]
fn test_chain_without_projection_exposes_predicate_attributes() {
    let catalog = chain_catalog();
    let naive = naive_plan(
        &catalog,
        &["customer", "nation"],
        vec![Predicate::attributes_equal("c_nation", "n_id")],
        &[],
    );
    let (best, stats) = optimise_both(&naive);

    assert_eq!(stats.candidates, 1);
    assert_eq!(best.root_op().kind(), OpKind::Join);
    assert_eq!(sorted_names(&best), vec!["c_nation", "n_id"]);
    // customer(100) + nation(25) + both narrowed + join(100 * 25 / 25)
    assert_eq!(stats.best_cost, 100 + 100 + 25 + 25 + 100);
}

// ---------------------------------------------------------------------------
// Star
// ---------------------------------------------------------------------------

#[test]
fn test_star_join_ordering() {
    let mut catalog = InMemoryCatalog::new();
    add_relation(
        &mut catalog,
        "sales",
        10_000,
        &[("s_item", 100), ("s_store", 10), ("s_date", 365), ("s_price", 500)],
    );
    add_relation(&mut catalog, "item", 100, &[("i_id", 100), ("i_cat", 10)]);
    add_relation(&mut catalog, "store", 10, &[("st_id", 10), ("st_state", 5)]);
    add_relation(&mut catalog, "date", 365, &[("d_id", 365), ("d_year", 5)]);

    let mut naive = naive_plan(
        &catalog,
        &["sales", "item", "store", "date"],
        vec![
            Predicate::attributes_equal("s_item", "i_id"),
            Predicate::attributes_equal("s_store", "st_id"),
            Predicate::attributes_equal("s_date", "d_id"),
            Predicate::equals_value("i_cat", "Books"),
            Predicate::equals_value("d_year", "2020"),
        ],
        &["st_state", "s_price"],
    );
    let naive_cost = estimate(&mut naive).unwrap();

    let (best, stats) = optimise_both(&naive);
    assert_eq!(stats.candidates, 6);
    assert!(stats.best_cost <= naive_cost);
    assert!(stats.best_candidate < stats.candidates);
    assert_eq!(sorted_names(&best), vec!["s_price", "st_state"]);
    assert_eq!(count_kind(&best, OpKind::Join), 3);
    // Both filters sit directly above their dimension scans.
    assert_eq!(count_kind(&best, OpKind::Select), 2);
}

// ---------------------------------------------------------------------------
// Triangle
// ---------------------------------------------------------------------------

#[test]
fn test_cycle_closes_with_select() {
    let mut catalog = InMemoryCatalog::new();
    add_relation(&mut catalog, "A", 50, &[("a_b", 10), ("a_c", 20)]);
    add_relation(&mut catalog, "B", 40, &[("b_a", 10), ("b_c", 8)]);
    add_relation(&mut catalog, "C", 30, &[("c_a", 20), ("c_b", 8)]);

    let naive = naive_plan(
        &catalog,
        &["A", "B", "C"],
        vec![
            Predicate::attributes_equal("a_b", "b_a"),
            Predicate::attributes_equal("b_c", "c_b"),
            Predicate::attributes_equal("c_a", "a_c"),
        ],
        &[],
    );
    let (best, stats) = optimise_both(&naive);

    assert_eq!(stats.candidates, 6);
    assert!(stats.best_cost <= stats.baseline_cost);
    assert_eq!(count_kind(&best, OpKind::Join), 2);
    assert_eq!(count_kind(&best, OpKind::Select), 1);
    assert_eq!(
        sorted_names(&best),
        vec!["a_b", "a_c", "b_a", "b_c", "c_a", "c_b"]
    );
}

// ---------------------------------------------------------------------------
// Snowflake and search limit
// ---------------------------------------------------------------------------

fn snowflake() -> (InMemoryCatalog, Vec<Predicate>) {
    let mut catalog = InMemoryCatalog::new();
    add_relation(&mut catalog, "fact", 5000, &[("f_d1", 50), ("f_d2", 20), ("f_d3", 10)]);
    add_relation(&mut catalog, "d1", 50, &[("d1_id", 50), ("d1_sub", 5)]);
    add_relation(&mut catalog, "d2", 20, &[("d2_id", 20), ("d2_sub", 4)]);
    add_relation(&mut catalog, "d3", 10, &[("d3_id", 10)]);
    add_relation(&mut catalog, "s1", 5, &[("s1_id", 5), ("s1_name", 5)]);
    add_relation(&mut catalog, "s2", 4, &[("s2_id", 4), ("s2_name", 4)]);
    let predicates = vec![
        Predicate::attributes_equal("f_d1", "d1_id"),
        Predicate::attributes_equal("f_d2", "d2_id"),
        Predicate::attributes_equal("f_d3", "d3_id"),
        Predicate::attributes_equal("d1_sub", "s1_id"),
        Predicate::attributes_equal("d2_sub", "s2_id"),
    ];
    (catalog, predicates)
}

#[test]
fn test_snowflake_join_ordering() {
    let (catalog, predicates) = snowflake();
    let naive = naive_plan(
        &catalog,
        &["fact", "d1", "d2", "d3", "s1", "s2"],
        predicates,
        &["s1_name", "s2_name"],
    );
    let (best, stats) = optimise_both(&naive);

    assert_eq!(stats.candidates, 120);
    assert!(stats.best_cost <= stats.baseline_cost);
    assert_eq!(count_kind(&best, OpKind::Join), 5);
    assert_eq!(count_kind(&best, OpKind::Scan), 6);
    assert_eq!(sorted_names(&best), vec!["s1_name", "s2_name"]);
}

#[test]
fn test_search_limit() {
    let (catalog, predicates) = snowflake();
    let naive = naive_plan(
        &catalog,
        &["fact", "d1", "d2", "d3", "s1", "s2"],
        predicates,
        &[],
    );
    let optimiser = Optimiser::new(OptimiserConfig {
        max_join_predicates: 4,
        ..OptimiserConfig::default()
    });
    assert_eq!(
        optimiser.optimise(&naive).unwrap_err(),
        PlanError::TooManyPredicates { count: 5, limit: 4 }
    );
}

// ---------------------------------------------------------------------------
// Inputs no candidate improves on
// ---------------------------------------------------------------------------

#[test]
fn test_filtered_scan_is_kept() {
    let catalog = sample::catalog().unwrap();
    let plan = Plan::select(
        Plan::scan(catalog.get_relation("Person").unwrap()),
        Predicate::equals_value("age", "30"),
    );
    let (best, stats) = optimise_both(&plan);

    // Narrowing to `age` would add an 8-tuple Project on top: 416 > 408.
    assert_eq!(stats.baseline_cost, 400 + 8);
    assert_eq!(stats.best_cost, stats.baseline_cost);
    assert!(stats.kept_input);
    assert_eq!(stats.candidates, 1);
    assert_eq!(best.to_string(), "SELECT[age=\"30\"](SCAN(Person))");
    assert!(best.nodes().all(|(id, _)| best.output(id).is_some()));
}

#[test]
fn test_direct_join_is_kept() {
    let catalog = sample::catalog().unwrap();
    let plan = Plan::join(
        Plan::scan(catalog.get_relation("Project").unwrap()),
        Plan::scan(catalog.get_relation("Department").unwrap()),
        Predicate::attributes_equal("dept", "deptid"),
    );
    let (best, stats) = optimise_both(&plan);

    // 40 + 5 + 40, against 40 + 40 + 5 + 5 + 40 once both sides are narrowed.
    assert_eq!(stats.baseline_cost, 85);
    assert_eq!(stats.best_cost, 85);
    assert!(stats.kept_input);
    assert_eq!(stats.candidates, 1);
    assert_eq!(
        best.to_string(),
        "JOIN[dept=deptid](SCAN(Project), SCAN(Department))"
    );
}

#[test]
fn test_rewrite_never_costs_more_than_input() {
    let catalog = chain_catalog();
    let naive = naive_plan(
        &catalog,
        &["orders", "customer"],
        vec![Predicate::attributes_equal("o_cust", "c_id")],
        &[],
    );
    let (best, stats) = optimise_both(&naive);
    assert!(!stats.kept_input);
    assert!(stats.best_cost <= stats.baseline_cost);
    assert_eq!(best.root_op().kind(), OpKind::Join);
}
