//! Ordered conjunction of conditions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::condition::{Condition, ConditionId, Operand, Operator, Tag};
use crate::QueryError;

/// A conjunctive query: every condition must hold.
///
/// Conditions keep the order they were authored in. Order has no effect on
/// which results match, but it decides which duplicate wins where the
/// search layer applies last-writer-wins.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    conditions: Vec<Condition>,
    next_id: u32,
}

impl Query {
    /// The empty query, which matches every stored result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the textual query syntax.
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        crate::parser::parse(input)
    }

    /// Append a condition and return the identifier assigned to it.
    pub fn push(
        &mut self,
        tag: impl Into<Tag>,
        op: Operator,
        operand: Option<Operand>,
    ) -> Result<ConditionId, QueryError> {
        let id = ConditionId::new(self.next_id);
        let condition = Condition::new(id, tag.into(), op, operand)?;
        self.next_id += 1;
        self.conditions.push(condition);
        Ok(id)
    }

    /// Builder form of [`push`](Self::push) for operators that take an operand.
    pub fn and(
        mut self,
        tag: impl Into<Tag>,
        op: Operator,
        operand: impl Into<Operand>,
    ) -> Result<Self, QueryError> {
        self.push(tag, op, Some(operand.into()))?;
        Ok(self)
    }

    /// Builder form of [`push`](Self::push) for `EXISTS`.
    pub fn and_exists(mut self, tag: impl Into<Tag>) -> Result<Self, QueryError> {
        self.push(tag, Operator::Exists, None)?;
        Ok(self)
    }

    /// The ordered list of conditions as authored.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Map each tag to its condition; a later condition on the same tag
    /// replaces an earlier one.
    ///
    /// Only for existence and shape checks: duplicates collapse here, so this
    /// must not be used where the number of conditions on a tag matters.
    pub fn conditions_by_tag(&self) -> HashMap<&Tag, &Condition> {
        let mut map = HashMap::with_capacity(self.conditions.len());
        for cond in &self.conditions {
            map.insert(cond.tag(), cond);
        }
        map
    }

    /// Whether any condition is an equality on `tag`.
    pub fn has_eq(&self, tag: &Tag) -> bool {
        self.conditions.iter().any(|c| c.is_eq_on(tag))
    }

    pub fn get(&self, id: ConditionId) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.id() == id)
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl FromStr for Query {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cond) in self.conditions.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{}", cond)?;
        }
        Ok(())
    }
}
