//! MERGE-based upserts for nodes and relationships

use super::{
    BATCH_PARAM, BatchSummary, CompiledUpsert, Endpoint, NullPolicy, RelUniquenessPolicy,
    UpsertOptions, item_map,
};
use crate::compiler::finish;
use crate::error::{Error, Result};
use crate::render::{ClauseType, ParamContext, StatementBuilder, ident};
use crate::value::{Record, Value, describe_record};
use std::collections::BTreeSet;

/// Compiles batched `UNWIND ... MERGE ... SET` statements
#[derive(Debug, Clone, Copy, Default)]
pub struct UpsertCompiler;

impl UpsertCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Upsert nodes of `label`, merging on the `key` fields
    pub fn compile_node_upsert<K: AsRef<str>>(
        &self,
        label: &str,
        data: &[Record],
        key: &[K],
        options: &UpsertOptions,
    ) -> Result<CompiledUpsert> {
        if data.is_empty() {
            return Ok(CompiledUpsert::placeholder("No data to upsert"));
        }
        if key.is_empty() {
            return Ok(CompiledUpsert::placeholder(format!(
                "Upsert {} - insufficient arguments",
                label
            )));
        }
        check_keys(data, key, "Key")?;

        let mut stmt = StatementBuilder::new();
        stmt.push(ClauseType::Unwind, format!("UNWIND ${} AS item", BATCH_PARAM));
        stmt.push(
            ClauseType::Merge,
            format!("MERGE (n:{} {})", ident(label), item_map(key)),
        );
        push_set_lines(
            &mut stmt,
            "n",
            set_properties(data, key.iter().map(|k| AsRef::<str>::as_ref(k))),
            options.effective_null_policy(),
        );

        Ok(finish_upsert(stmt, data, options))
    }

    /// Upsert relationships of `rel_type` between merged endpoints
    ///
    /// Each record must carry the key fields of both endpoints. Without a
    /// `rel_key` the relationship is merged on the endpoint pair alone.
    pub fn compile_relationship_upsert<K: AsRef<str>>(
        &self,
        rel_type: &str,
        data: &[Record],
        src: &Endpoint,
        dst: &Endpoint,
        rel_key: &[K],
        options: &UpsertOptions,
        policy: RelUniquenessPolicy,
    ) -> Result<CompiledUpsert> {
        if data.is_empty() {
            return Ok(CompiledUpsert::placeholder("No data to upsert"));
        }
        if rel_key.is_empty() && policy == RelUniquenessPolicy::RequireRelKey {
            return Err(Error::MissingRelKey {
                rel_type: rel_type.to_string(),
            });
        }
        if src.key.is_empty() || dst.key.is_empty() {
            return Ok(CompiledUpsert::placeholder(format!(
                "Relationship upsert {} - insufficient arguments",
                rel_type
            )));
        }
        check_keys(data, &src.key, "Source key")?;
        check_keys(data, &dst.key, "Destination key")?;
        check_keys(data, rel_key, "Relationship key")?;

        let rel_props = if rel_key.is_empty() {
            String::new()
        } else {
            format!(" {}", item_map(rel_key))
        };

        let mut stmt = StatementBuilder::new();
        stmt.push(ClauseType::Unwind, format!("UNWIND ${} AS item", BATCH_PARAM));
        stmt.push(
            ClauseType::Merge,
            format!("MERGE (a:{} {})", ident(&src.label), item_map(&src.key)),
        );
        stmt.push(
            ClauseType::Merge,
            format!("MERGE (b:{} {})", ident(&dst.label), item_map(&dst.key)),
        );
        stmt.push(
            ClauseType::Merge,
            format!("MERGE (a)-[r:{}{}]->(b)", ident(rel_type), rel_props),
        );

        let keys = src
            .key
            .iter()
            .map(String::as_str)
            .chain(dst.key.iter().map(String::as_str))
            .chain(rel_key.iter().map(|k| AsRef::<str>::as_ref(k)));
        push_set_lines(
            &mut stmt,
            "r",
            set_properties(data, keys),
            options.effective_null_policy(),
        );

        Ok(finish_upsert(stmt, data, options))
    }
}

fn check_keys<K: AsRef<str>>(data: &[Record], key: &[K], role: &'static str) -> Result<()> {
    for item in data {
        for k in key {
            let field: &str = k.as_ref();
            if !item.contains_key(field) {
                return Err(Error::MissingKeyField {
                    role,
                    field: field.to_string(),
                    record: describe_record(item),
                });
            }
        }
    }
    Ok(())
}

/// Union of all record fields minus the keys, sorted
fn set_properties<'a>(data: &'a [Record], keys: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let keys: BTreeSet<&str> = keys.collect();
    data.iter()
        .flat_map(|item| item.keys().map(String::as_str))
        .filter(|prop| !keys.contains(prop))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn push_set_lines(stmt: &mut StatementBuilder, alias: &str, props: Vec<&str>, policy: NullPolicy) {
    for prop in props {
        let prop = ident(prop);
        let line = match policy {
            NullPolicy::IgnoreNulls => format!(
                "SET {a}.{p} = case when item.{p} IS NOT NULL then item.{p} else {a}.{p} end",
                a = alias,
                p = prop
            ),
            NullPolicy::SetNulls => format!("SET {a}.{p} = item.{p}", a = alias, p = prop),
        };
        stmt.push(ClauseType::Set, line);
    }
}

fn finish_upsert(stmt: StatementBuilder, data: &[Record], options: &UpsertOptions) -> CompiledUpsert {
    let mut ctx = ParamContext::new();
    let rows = data.iter().cloned().map(Value::Object).collect::<Vec<_>>();
    ctx.bind_named(BATCH_PARAM, Value::Array(rows));
    CompiledUpsert {
        query: finish(stmt, ctx),
        summary: BatchSummary::new(data.len(), options.batch_size),
        batch_size: options.batch_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::record;

    fn people() -> Vec<Record> {
        vec![
            record([
                ("email", Value::from("ann@example.com")),
                ("name", Value::from("Ann")),
                ("age", Value::from(31)),
            ]),
            record([
                ("email", Value::from("bob@example.com")),
                ("name", Value::from("Bob")),
                ("city", Value::Null),
            ]),
        ]
    }

    #[test]
    fn test_node_upsert_sets_sorted_properties() {
        let compiled = UpsertCompiler
            .compile_node_upsert("Person", &people(), &["email"], &UpsertOptions::default())
            .unwrap();
        assert_eq!(
            compiled.query.query(),
            "UNWIND $batch AS item\n\
             MERGE (n:Person {email: item.email})\n\
             SET n.age = item.age\n\
             SET n.city = item.city\n\
             SET n.name = item.name"
        );
        assert_eq!(compiled.query.params().len(), 1);
        assert_eq!(compiled.summary.rows, 2);
        assert_eq!(compiled.summary.batches, 1);
    }

    #[test]
    fn test_patch_upsert_guards_nulls() {
        let compiled = UpsertCompiler
            .compile_node_upsert("Person", &people(), &["email"], &UpsertOptions::patch())
            .unwrap();
        assert!(compiled.query.query().contains(
            "SET n.city = case when item.city IS NOT NULL then item.city else n.city end"
        ));
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let data = vec![record([("name", Value::from("John"))])];
        let err = UpsertCompiler
            .compile_node_upsert("Person", &data, &["email"], &UpsertOptions::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"Key field 'email' not found in data item: {"name":"John"}"#
        );
    }

    #[test]
    fn test_empty_data_is_placeholder() {
        let compiled = UpsertCompiler
            .compile_node_upsert::<&str>("Person", &[], &["email"], &UpsertOptions::default())
            .unwrap();
        assert_eq!(compiled.query.query(), "// No data to upsert");
        assert!(compiled.query.is_placeholder());
    }

    #[test]
    fn test_relationship_upsert_without_rel_key() {
        let data = vec![record([
            ("email", Value::from("ann@example.com")),
            ("company", Value::from("Acme")),
            ("role", Value::from("Engineer")),
        ])];
        let compiled = UpsertCompiler
            .compile_relationship_upsert::<&str>(
                "WORKS_AT",
                &data,
                &Endpoint::new("Person", "email"),
                &Endpoint::new("Company", "company"),
                &[],
                &UpsertOptions::default(),
                RelUniquenessPolicy::SingleEdgePerPair,
            )
            .unwrap();
        assert_eq!(
            compiled.query.query(),
            "UNWIND $batch AS item\n\
             MERGE (a:Person {email: item.email})\n\
             MERGE (b:Company {company: item.company})\n\
             MERGE (a)-[r:WORKS_AT]->(b)\n\
             SET r.role = item.role"
        );
    }

    #[test]
    fn test_relationship_upsert_with_rel_key() {
        let data = vec![record([
            ("email", Value::from("ann@example.com")),
            ("company", Value::from("Acme")),
            ("since", Value::from(2020)),
        ])];
        let compiled = UpsertCompiler
            .compile_relationship_upsert(
                "WORKS_AT",
                &data,
                &Endpoint::new("Person", "email"),
                &Endpoint::new("Company", "company"),
                &["since"],
                &UpsertOptions::default(),
                RelUniquenessPolicy::RequireRelKey,
            )
            .unwrap();
        let text = compiled.query.query();
        assert!(text.contains("MERGE (a)-[r:WORKS_AT {since: item.since}]->(b)"));
        assert!(!text.contains("SET"));
    }

    #[test]
    fn test_relationship_upsert_policy_and_endpoint_keys() {
        let data = vec![record([("email", Value::from("ann@example.com"))])];
        let src = Endpoint::new("Person", "email");
        let dst = Endpoint::new("Company", "company");

        let err = UpsertCompiler
            .compile_relationship_upsert::<&str>(
                "WORKS_AT",
                &data,
                &src,
                &dst,
                &[],
                &UpsertOptions::default(),
                RelUniquenessPolicy::RequireRelKey,
            )
            .unwrap_err();
        assert!(matches!(err, Error::MissingRelKey { .. }));

        let err = UpsertCompiler
            .compile_relationship_upsert::<&str>(
                "WORKS_AT",
                &data,
                &src,
                &dst,
                &[],
                &UpsertOptions::default(),
                RelUniquenessPolicy::AllowMultiple,
            )
            .unwrap_err();
        assert!(err.to_string().starts_with("Destination key field 'company'"));
    }
}
