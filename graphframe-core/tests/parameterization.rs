use graphframe_core::{
    AdvancedUpdateCompiler, CompiledQuery, Condition, NodeQuery, NullPolicy, Operator,
    QueryCompiler, Record, UpdateCompiler, Value,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Strings that can never occur in compiler output: every one carries a quote
fn adversarial_string() -> impl Strategy<Value = String> {
    prop_oneof![
        "'\\PC{0,64}",
        "\"[à-ÿ一-龥😀-🙏]{1,16}",
        "'.{500,2000}",
        Just("' OR 1=1 //".to_string()),
        Just("\") DETACH DELETE n //".to_string()),
        Just("'}) MATCH (m) DETACH DELETE m RETURN m //".to_string()),
        Just("$param_0'".to_string()),
    ]
}

/// Integers too large to collide with placeholder suffixes
fn large_int() -> impl Strategy<Value = i64> {
    prop_oneof![1_000_000_000i64..i64::MAX, i64::MIN..-1_000_000_000i64]
}

fn placeholders(query: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut rest = query;
    while let Some(pos) = rest.find('$') {
        let tail = &rest[pos + 1..];
        let end = tail
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(tail.len());
        names.insert(tail[..end].to_string());
        rest = &tail[end..];
    }
    names
}

fn assert_bound(compiled: &CompiledQuery) {
    let referenced = placeholders(compiled.query());
    let bound: BTreeSet<String> = compiled.params().keys().cloned().collect();
    assert_eq!(referenced, bound, "query: {}", compiled.query());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn string_filters_never_reach_query_text(
        s in adversarial_string(),
        list in prop::collection::vec(adversarial_string(), 0..20),
    ) {
        let mut query = NodeQuery::new("Person");
        query.selection.conditions = vec![
            Condition::eq("name", s.clone()),
            Condition::new("bio", Operator::Contains, s.clone()),
            Condition::new("nick", Operator::In, list.clone()),
        ];
        let compiled = QueryCompiler.compile_node_query(&query);

        prop_assert!(!compiled.query().contains(&s));
        for item in &list {
            prop_assert!(!compiled.query().contains(item.as_str()));
        }
        prop_assert_eq!(&compiled.params()["param_0"], &Value::from(s));
        prop_assert_eq!(&compiled.params()["param_2"], &Value::from(list));
        assert_bound(&compiled);
    }

    #[test]
    fn numeric_and_boolean_filters_are_parameters(n in large_int(), b in any::<bool>()) {
        let mut query = NodeQuery::new("Account");
        query.selection.conditions = vec![
            Condition::new("balance", Operator::Gte, n),
            Condition::eq("active", b),
        ];
        let compiled = QueryCompiler.compile_node_query(&query);

        prop_assert!(!compiled.query().contains(&n.to_string()));
        prop_assert!(!compiled.query().contains("true"));
        prop_assert!(!compiled.query().contains("false"));
        prop_assert_eq!(&compiled.params()["param_0"], &Value::Int(n));
        assert_bound(&compiled);
    }

    #[test]
    fn update_values_are_parameters(
        s in adversarial_string(),
        n in large_int(),
        tags in prop::collection::vec(adversarial_string(), 1..10),
    ) {
        let mut updates = Record::new();
        updates.insert("name".to_string(), Value::from(s.clone()));
        updates.insert("score".to_string(), Value::from(n));
        updates.insert("prefs".to_string(), Value::from(
            graphframe_core::record([("theme", Value::from(s.clone()))]),
        ));
        let compiled = UpdateCompiler.compile_node_update(
            "Person",
            &updates,
            &[Condition::eq("email", s.clone())],
            NullPolicy::SetNulls,
        );
        prop_assert!(!compiled.query().contains(&s));
        prop_assert!(!compiled.query().contains(&n.to_string()));
        assert_bound(&compiled);

        let compiled = AdvancedUpdateCompiler.compile_list_append(
            "Person",
            "tags",
            tags.clone(),
            &[Condition::eq("email", s.clone())],
        );
        for tag in &tags {
            prop_assert!(!compiled.query().contains(tag.as_str()));
        }
        assert_bound(&compiled);
    }

    #[test]
    fn null_tests_never_bind(field in "[a-z]{1,12}", value in adversarial_string()) {
        let mut query = NodeQuery::new("Person");
        query.selection.conditions = vec![
            Condition::new(field.clone(), Operator::IsNull, value.clone()),
            Condition::new(field.clone(), Operator::NotNull, value.clone()),
            Condition::new(field, Operator::Exists, value),
        ];
        let compiled = QueryCompiler.compile_node_query(&query);
        prop_assert!(compiled.params().is_empty());
    }
}
