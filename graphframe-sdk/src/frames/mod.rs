//! Chainable query frames over nodes, relationships and one-hop paths
//!
//! Frames only collect intent. Nothing is compiled until `compile()`,
//! `to_records()` or a write plan asks for it, so chained calls can come
//! in any order.

mod edge;
mod node;
mod path;

pub use edge::EdgeFrame;
pub use node::NodeFrame;
pub use path::PathFrame;

use graphframe_core::{Condition, ConditionParser, OrderKey, Selection, Value};

/// Filter, projection, ordering and paging shared by every frame
#[derive(Debug, Clone, Default)]
pub(crate) struct FrameState {
    pub(crate) selection: Selection,
    /// First filter that failed to parse; reported by `compile()`
    pub(crate) error: Option<graphframe_core::Error>,
}

impl FrameState {
    pub(crate) fn add_filters<K, V, I>(&mut self, parser: ConditionParser, filters: I)
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        match parser.parse(filters) {
            Ok(conditions) => self.selection.conditions.extend(conditions),
            Err(e) => {
                if self.error.is_none() {
                    self.error = Some(e);
                }
            }
        }
    }

    pub(crate) fn add_condition(&mut self, condition: Condition) {
        self.selection.conditions.push(condition);
    }

    pub(crate) fn select<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection.fields = fields.into_iter().map(Into::into).collect();
    }

    pub(crate) fn order_by<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.selection
            .order_by
            .extend(keys.into_iter().map(|k| OrderKey::parse(k.as_ref())));
    }

    pub(crate) fn check(&self) -> graphframe_core::Result<()> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphframe_core::SortDirection;

    #[test]
    fn test_select_replaces_and_order_appends() {
        let mut state = FrameState::default();
        state.select(["a", "b"]);
        state.select(["c"]);
        assert_eq!(state.selection.fields, vec!["c".to_string()]);

        state.order_by(["age__desc"]);
        state.order_by(["name"]);
        assert_eq!(state.selection.order_by.len(), 2);
        assert_eq!(state.selection.order_by[0].direction, SortDirection::Desc);
    }

    #[test]
    fn test_first_parse_error_is_kept() {
        let mut state = FrameState::default();
        state.add_filters(ConditionParser::strict(), [("age__bogus__x", 1)]);
        state.add_filters(ConditionParser::strict(), [("", 1)]);
        state.add_filters(ConditionParser::strict(), [("age", 1)]);
        assert!(matches!(
            state.check(),
            Err(graphframe_core::Error::UnknownOperator { .. })
        ));
        assert_eq!(state.selection.conditions.len(), 1);
    }
}
