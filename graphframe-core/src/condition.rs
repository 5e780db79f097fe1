//! Filter-key parsing: `field__op=value` pairs to typed conditions
//!
//! Keys are split on the `__` separator. The tail token wins when it names
//! a recognized operator; otherwise a two-token key is a namespaced field
//! (`to__city`) compared for equality. This lets traversal filters mix
//! namespace routing and operators (`to__age__gte`).

use crate::error::{Error, Result};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between namespace, field and operator tokens
pub const SEPARATOR: &str = "__";

/// Comparison operators accepted in filter keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    Contains,
    Startswith,
    Endswith,
    Regex,
    Exists,
    IsNull,
    NotNull,
}

impl Operator {
    /// Every recognized operator, in documentation order
    pub const ALL: [Operator; 15] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Lt,
        Operator::Lte,
        Operator::Gt,
        Operator::Gte,
        Operator::In,
        Operator::NotIn,
        Operator::Contains,
        Operator::Startswith,
        Operator::Endswith,
        Operator::Regex,
        Operator::Exists,
        Operator::IsNull,
        Operator::NotNull,
    ];

    /// Look up an operator by its filter-key spelling
    pub fn parse(name: &str) -> Option<Operator> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Filter-key spelling (`gte`, `not_in`, ...)
    pub fn name(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Contains => "contains",
            Operator::Startswith => "startswith",
            Operator::Endswith => "endswith",
            Operator::Regex => "regex",
            Operator::Exists => "exists",
            Operator::IsNull => "is_null",
            Operator::NotNull => "not_null",
        }
    }

    /// Cypher text for the operator
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Contains => "CONTAINS",
            Operator::Startswith => "STARTS WITH",
            Operator::Endswith => "ENDS WITH",
            Operator::Regex => "=~",
            Operator::Exists | Operator::NotNull => "IS NOT NULL",
            Operator::IsNull => "IS NULL",
        }
    }

    /// Null tests render without a value and never mint a parameter
    pub fn is_null_test(self) -> bool {
        matches!(
            self,
            Operator::Exists | Operator::IsNull | Operator::NotNull
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One `field <op> value` predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Possibly namespaced field (`age`, `to__city`)
    pub field: String,
    /// Comparison operator
    pub operator: Operator,
    /// Compared value; ignored for null tests
    pub value: Value,
}

impl Condition {
    /// Create a condition
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Shorthand for an equality condition
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, value)
    }
}

/// What to do with an operator suffix outside the recognized set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorPolicy {
    /// Accept it and compare for equality
    #[default]
    Lenient,
    /// Reject the filter
    Strict,
}

/// Parses filter keys into [`Condition`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionParser {
    policy: OperatorPolicy,
}

impl ConditionParser {
    /// Create a parser with the given operator policy
    pub fn new(policy: OperatorPolicy) -> Self {
        Self { policy }
    }

    /// Parser that rejects unknown operators
    pub fn strict() -> Self {
        Self::new(OperatorPolicy::Strict)
    }

    /// Operator policy in effect
    pub fn policy(&self) -> OperatorPolicy {
        self.policy
    }

    /// Parse `(key, value)` pairs, one condition per pair, in input order
    pub fn parse<K, V, I>(&self, filters: I) -> Result<Vec<Condition>>
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        filters
            .into_iter()
            .map(|(key, value)| self.parse_one(key.as_ref(), value.into()))
            .collect()
    }

    /// Parse a single filter key
    pub fn parse_one(&self, key: &str, value: Value) -> Result<Condition> {
        let (field, operator) = self.split_key(key)?;
        Ok(Condition {
            field,
            operator,
            value,
        })
    }

    fn split_key(&self, key: &str) -> Result<(String, Operator)> {
        if key.is_empty() {
            return Err(Error::invalid_filter(key, "empty filter key"));
        }

        let tokens: Vec<&str> = key.split(SEPARATOR).collect();
        match tokens.as_slice() {
            [_] => Ok((key.to_string(), Operator::Eq)),
            [field, op] => match Operator::parse(op) {
                Some(operator) => Ok((non_empty(key, field)?, operator)),
                // namespace__field with implicit equality
                None => Ok((key.to_string(), Operator::Eq)),
            },
            [.., last] => match Operator::parse(last) {
                Some(operator) => {
                    let field = tokens[..tokens.len() - 1].join(SEPARATOR);
                    Ok((non_empty(key, &field)?, operator))
                }
                None => {
                    let raw_op = tokens[1..].join(SEPARATOR);
                    self.fallback(key, non_empty(key, tokens[0])?, raw_op)
                }
            },
            [] => Err(Error::invalid_filter(key, "empty filter key")),
        }
    }

    fn fallback(&self, key: &str, field: String, raw_op: String) -> Result<(String, Operator)> {
        match self.policy {
            OperatorPolicy::Strict => Err(Error::UnknownOperator {
                key: key.to_string(),
                operator: raw_op,
            }),
            OperatorPolicy::Lenient => {
                tracing::warn!(
                    "Filter `{}` uses unrecognized operator `{}`; comparing with `=`",
                    key,
                    raw_op
                );
                Ok((field, Operator::Eq))
            }
        }
    }
}

fn non_empty(key: &str, field: &str) -> Result<String> {
    if field.is_empty() {
        Err(Error::invalid_filter(key, "missing field name"))
    } else {
        Ok(field.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(key: &str) -> Condition {
        ConditionParser::default()
            .parse_one(key, Value::from(1))
            .unwrap()
    }

    #[test]
    fn test_plain_key_is_equality() {
        let c = parse("name");
        assert_eq!(c.field, "name");
        assert_eq!(c.operator, Operator::Eq);
    }

    #[test]
    fn test_two_tokens_with_operator() {
        let c = parse("age__gte");
        assert_eq!(c.field, "age");
        assert_eq!(c.operator, Operator::Gte);
    }

    #[test]
    fn test_two_tokens_namespace_wins_when_ambiguous() {
        let c = parse("to__city");
        assert_eq!(c.field, "to__city");
        assert_eq!(c.operator, Operator::Eq);
    }

    #[test]
    fn test_three_tokens_with_trailing_operator() {
        let c = parse("to__age__gte");
        assert_eq!(c.field, "to__age");
        assert_eq!(c.operator, Operator::Gte);

        let c = parse("rel__since__not_in");
        assert_eq!(c.field, "rel__since");
        assert_eq!(c.operator, Operator::NotIn);
    }

    #[test]
    fn test_three_tokens_unknown_operator_lenient() {
        let c = parse("to__city__near");
        assert_eq!(c.field, "to");
        assert_eq!(c.operator, Operator::Eq);
    }

    #[test]
    fn test_three_tokens_unknown_operator_strict() {
        let err = ConditionParser::strict()
            .parse_one("to__city__near", Value::from(1))
            .unwrap_err();
        assert_eq!(
            err,
            Error::UnknownOperator {
                key: "to__city__near".to_string(),
                operator: "city__near".to_string(),
            }
        );
    }

    #[test]
    fn test_strict_still_accepts_namespaced_fields() {
        let c = ConditionParser::strict()
            .parse_one("to__city", Value::from("SF"))
            .unwrap();
        assert_eq!(c.field, "to__city");
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(ConditionParser::default().parse_one("", Value::Null).is_err());
        assert!(ConditionParser::default()
            .parse_one("__gte", Value::Null)
            .is_err());
    }

    #[test]
    fn test_parse_preserves_order() {
        let conditions = ConditionParser::default()
            .parse([
                ("name", Value::from("John")),
                ("age__gte", Value::from(21)),
                ("country__in", Value::from(vec!["US", "CA"])),
                ("active__ne", Value::from(false)),
            ])
            .unwrap();

        assert_eq!(
            conditions,
            vec![
                Condition::eq("name", "John"),
                Condition::new("age", Operator::Gte, 21),
                Condition::new("country", Operator::In, vec!["US", "CA"]),
                Condition::new("active", Operator::Ne, false),
            ]
        );
    }

    #[test]
    fn test_symbols() {
        assert_eq!(Operator::Startswith.symbol(), "STARTS WITH");
        assert_eq!(Operator::Exists.symbol(), "IS NOT NULL");
        assert_eq!(Operator::Regex.symbol(), "=~");
        assert!(Operator::IsNull.is_null_test());
        assert!(!Operator::In.is_null_test());
    }

    #[test]
    fn test_operator_names_round_trip() {
        for op in Operator::ALL {
            assert_eq!(Operator::parse(op.name()), Some(op));
        }
        assert_eq!(Operator::parse("between"), None);
    }
}
