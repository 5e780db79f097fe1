//! Frame chaining compiled through a recording driver

use graphframe::testing::RecordingDriver;
use graphframe::{
    AccessMode, Condition, Direction, Error, Graph, GraphConfig, Operator, OperatorPolicy,
    TraversalAliases, Value, record,
};
use std::sync::Arc;

fn graph() -> (Graph, Arc<RecordingDriver>) {
    let driver = Arc::new(RecordingDriver::new());
    (Graph::new(GraphConfig::default(), driver.clone()), driver)
}

#[test]
fn test_chain_order_does_not_change_output() {
    let (graph, _) = graph();
    let a = graph
        .nodes("Person")
        .where_([("age__gte", 18)])
        .select(["name", "age"])
        .order_by(["age__desc"])
        .limit(5)
        .offset(10)
        .compile()
        .unwrap();
    let b = graph
        .nodes("Person")
        .offset(10)
        .limit(5)
        .order_by(["age__desc"])
        .select(["name", "age"])
        .where_([("age__gte", 18)])
        .compile()
        .unwrap();
    let c = graph
        .nodes("Person")
        .select(["name", "age"])
        .limit(5)
        .where_([("age__gte", 18)])
        .offset(10)
        .order_by(["age__desc"])
        .compile()
        .unwrap();

    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(
        a.query(),
        "MATCH (n:Person)\n\
         WHERE n.age >= $param_0\n\
         RETURN n.name, n.age\n\
         ORDER BY n.age DESC\n\
         SKIP 10\n\
         LIMIT 5"
    );
}

#[test]
fn test_select_last_write_wins_and_order_by_appends() {
    let (graph, _) = graph();
    let compiled = graph
        .nodes("Person")
        .select(["email"])
        .select(["name"])
        .order_by(["name"])
        .order_by(["age__desc"])
        .compile()
        .unwrap();
    assert!(compiled.query().contains("RETURN n.name\n"));
    assert!(compiled.query().ends_with("ORDER BY n.name ASC , n.age DESC"));
}

#[test]
fn test_filter_accepts_typed_conditions() {
    let (graph, _) = graph();
    let compiled = graph
        .nodes("Person")
        .filter(Condition::new("name", Operator::Startswith, "A"))
        .where_([("active", true)])
        .compile()
        .unwrap();
    assert!(
        compiled
            .query()
            .contains("WHERE n.name STARTS WITH $param_0 AND n.active = $param_1")
    );
}

#[test]
fn test_strict_policy_reports_error_at_compile() {
    let driver = Arc::new(RecordingDriver::new());
    let config = GraphConfig {
        operator_policy: OperatorPolicy::Strict,
        ..GraphConfig::default()
    };
    let graph = Graph::new(config, driver);

    let frame = graph
        .nodes("Person")
        .where_([("name__fuzzy__match", "ann")])
        .limit(1);
    match frame.compile() {
        Err(Error::Compile(graphframe_core::Error::UnknownOperator { key, .. })) => {
            assert_eq!(key, "name__fuzzy__match");
        }
        other => panic!("expected unknown operator error, got {:?}", other),
    }
}

#[test]
fn test_lenient_policy_falls_back_to_equality() {
    let (graph, _) = graph();
    let compiled = graph
        .nodes("Person")
        .where_([("name__fuzzy__match", "ann")])
        .compile()
        .unwrap();
    assert!(compiled.query().contains("WHERE n.name = $param_0"));
}

#[tokio::test]
async fn test_to_records_runs_in_read_mode() {
    let (graph, driver) = graph();
    driver.push_records(vec![
        record([("n.name", Value::from("Ann"))]),
        record([("n.name", Value::from("Bob"))]),
    ]);

    let rows = graph
        .nodes("Person")
        .where_([("country", "US")])
        .select(["name"])
        .to_records()
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    let calls = driver.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].mode, AccessMode::Read);
    assert_eq!(calls[0].params["param_0"], Value::from("US"));
    assert_eq!(graph.open_sessions(), 0);
}

#[tokio::test]
async fn test_invalid_filter_never_reaches_driver() {
    let (graph, driver) = graph();
    let result = graph.nodes("Person").where_([("", 1)]).to_records().await;
    assert!(matches!(result, Err(Error::Compile(_))));
    assert!(driver.calls().is_empty());
}

#[test]
fn test_node_filters_carry_into_traversal() {
    let (graph, _) = graph();
    let compiled = graph
        .nodes("Person")
        .where_([("age__gte", 30)])
        .traverse("WORKS_AT", "Company", Direction::Out)
        .where_([("to__industry", "Tech")])
        .select(["from__name", "to__name"])
        .compile()
        .unwrap();
    assert_eq!(
        compiled.query(),
        "MATCH (from:Person)-rel:WORKS_AT->(to:Company)\n\
         WHERE from.age >= $param_0 AND to.industry = $param_1\n\
         RETURN from.name, to.name"
    );
}

#[test]
fn test_traversal_with_unlabeled_destination() {
    let (graph, _) = graph();
    let compiled = graph
        .nodes("Person")
        .traverse("KNOWS", "", Direction::Both)
        .compile()
        .unwrap();
    assert_eq!(
        compiled.query(),
        "MATCH (from:Person)-rel:KNOWS-(to)\nRETURN from, rel, to"
    );
}

#[test]
fn test_back_returns_origin_nodes() {
    let (graph, _) = graph();
    let frame = graph
        .nodes("Person")
        .traverse("WORKS_AT", "Company", Direction::Out)
        .where_([("to__city", "San Francisco")])
        .back()
        .where_([("age__gte", 30)])
        .select(["name"])
        .order_by(["name"]);
    assert!(frame.is_back_query());
    assert_eq!(frame.label(), "Person");

    let compiled = frame.compile().unwrap();
    assert_eq!(
        compiled.query(),
        "MATCH path = (from:Person)-rel:WORKS_AT->(to:Company)\n\
         WHERE to.city = $param_0 AND from.age >= $param_1\n\
         WITH from\n\
         RETURN from.name\n\
         ORDER BY from.name ASC"
    );
    assert_eq!(compiled.params()["param_0"], Value::from("San Francisco"));
    assert_eq!(compiled.params()["param_1"], Value::from(30));
}

#[test]
fn test_back_rejects_destination_fields() {
    let (graph, _) = graph();
    let result = graph
        .nodes("Person")
        .traverse("WORKS_AT", "Company", Direction::Out)
        .back()
        .select(["to__name"])
        .compile();
    assert!(matches!(
        result,
        Err(Error::Compile(graphframe_core::Error::InvalidField { .. }))
    ));
}

fn back_frame(graph: &Graph) -> graphframe::NodeFrame {
    graph
        .nodes("Person")
        .traverse("WORKS_AT", "Company", Direction::Out)
        .where_([("to__name", "Acme")])
        .back()
        .where_([("age__gte", 30)])
}

fn is_unsupported_after_back(err: &Error, expected: &str) -> bool {
    matches!(
        err,
        Error::Compile(graphframe_core::Error::UnsupportedAfterBack { operation })
            if *operation == expected
    )
}

#[tokio::test]
async fn test_back_frame_delete_is_refused_before_the_driver() {
    let (graph, driver) = graph();
    let mut plan = back_frame(&graph).delete(true);

    let err = plan.compile().unwrap_err();
    assert!(is_unsupported_after_back(&err, "delete"));

    let err = plan.commit().await.unwrap_err();
    assert!(is_unsupported_after_back(&err, "delete"));
    assert!(driver.calls().is_empty());
}

#[test]
fn test_back_frame_patch_and_field_ops_are_refused() {
    let (graph, _) = graph();
    let frame = back_frame(&graph);

    let err = frame.patch(record([("flag", true)])).compile().unwrap_err();
    assert!(is_unsupported_after_back(&err, "patch"));

    let err = frame.inc("visits", 1).compile().unwrap_err();
    assert!(is_unsupported_after_back(&err, "inc"));

    let err = frame.unset("nickname").compile().unwrap_err();
    assert!(is_unsupported_after_back(&err, "unset"));
}

#[test]
fn test_back_frame_cannot_traverse_again() {
    let (graph, _) = graph();
    let result = back_frame(&graph)
        .traverse("KNOWS", "Person", Direction::Both)
        .compile();
    assert!(is_unsupported_after_back(&result.unwrap_err(), "traverse"));
}

#[test]
fn test_back_frame_filter_error_takes_precedence() {
    let (graph, _) = graph();
    let err = back_frame(&graph)
        .where_([("", 1)])
        .delete(false)
        .compile()
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Compile(graphframe_core::Error::InvalidFilter { .. })
    ));
}

#[test]
fn test_back_frame_upsert_still_compiles() {
    let (graph, _) = graph();
    let mut plan = back_frame(&graph).upsert(
        vec![record([("email", "ann@example.com"), ("name", "Ann")])],
        ["email"],
    );
    assert!(plan.compile().unwrap().query().starts_with("UNWIND $batch"));
}

#[test]
fn test_custom_aliases_route_filters() {
    let (graph, _) = graph();
    let compiled = graph
        .nodes("Person")
        .traverse_as(
            "FOLLOWS",
            "Person",
            Direction::In,
            TraversalAliases::new("me", "f", "fan"),
        )
        .where_([("fan__verified", Value::from(true)), ("f__since__gte", Value::from(2020))])
        .select(["fan__name"])
        .compile()
        .unwrap();
    assert_eq!(
        compiled.query(),
        "MATCH (me:Person)<-f:FOLLOWS-(fan:Person)\n\
         WHERE fan.verified = $param_0 AND f.since >= $param_1\n\
         RETURN fan.name"
    );
}

#[test]
fn test_edge_frame_query() {
    let (graph, _) = graph();
    let compiled = graph
        .rels("KNOWS")
        .where_([("since__lt", 2000)])
        .select(["since"])
        .limit(0)
        .compile()
        .unwrap();
    assert_eq!(
        compiled.query(),
        "MATCH ()-[r:KNOWS]-()\nWHERE r.since < $param_0\nRETURN r.since\nLIMIT 0"
    );
}
