//! Conditions the generic matcher treats as already resolved.

use std::collections::BTreeSet;

use txindex_query::{Condition, ConditionId};

/// Set of condition identifiers the base store must not re-check as
/// per-result predicates.
///
/// A skipped height-equality condition is still honoured, as a direct key
/// restriction on the scan rather than a filter on each result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SkipSet(BTreeSet<ConditionId>);

impl SkipSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ConditionId) -> bool {
        self.0.insert(id)
    }

    pub fn contains(&self, id: ConditionId) -> bool {
        self.0.contains(&id)
    }

    pub fn is_skipped(&self, cond: &Condition) -> bool {
        self.contains(cond.id())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ConditionId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ConditionId> for SkipSet {
    fn from_iter<I: IntoIterator<Item = ConditionId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
